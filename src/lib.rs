pub mod core;
pub mod logging;
pub mod orchestration;
pub mod plugins;
pub mod security;
pub mod validation;

pub use crate::core::*;
pub use orchestration::{MigrationReport, OrderedPublisher, RecordReport};
pub use plugins::NpmRunner;
pub use security::{AuthSecret, Destination};
