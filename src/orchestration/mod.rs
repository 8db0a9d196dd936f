//! Orchestration layer for registry migration
//!
//! This module provides the components that turn a stream of package
//! records into an ordered sequence of publish calls.

pub mod completion;
pub mod ordered_publisher;
pub mod record_source;

// Re-export main types for convenience
pub use completion::{Completion, CompletionReceiver, completion};
pub use ordered_publisher::{MigrationReport, OrderedPublisher, RecordReport};
pub use record_source::JsonLinesSource;
