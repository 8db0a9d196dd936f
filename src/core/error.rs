//! Error handling for registry migration
//!
//! This module provides the error taxonomy for migrating package versions,
//! with operator guidance attached to each variant via the thiserror crate.

use crate::core::state_machine::IllegalTransition;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for migration operations
#[derive(Error, Debug)]
pub enum MigrateError {
    // Configuration errors
    #[error("invalid destination '{destination}': {reason}")]
    InvalidDestination { destination: String, reason: String },

    #[error("invalid configuration: {message}")]
    InvalidConfig { message: String },

    // Input errors
    #[error("[{package}] invalid version '{version}': {reason}")]
    InvalidVersion {
        package: String,
        version: String,
        reason: String,
    },

    #[error("malformed package record on line {line}: {message}")]
    MalformedRecord { line: usize, message: String },

    // Publish errors
    #[error("failed to write ephemeral config {}: {source}", .path.display())]
    ConfigWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read child stderr: {source}")]
    Stderr {
        #[source]
        source: std::io::Error,
    },

    #[error("Child exited with code {} and signal {}", Sentinel(.code), Sentinel(.signal))]
    NonZeroExit {
        code: Option<i32>,
        signal: Option<i32>,
    },

    #[error(transparent)]
    IllegalTransition(#[from] IllegalTransition),

    #[error("publish completion was dropped without an outcome")]
    CompletionDropped,
}

/// Renders an optional exit code or signal, using `none` when absent.
struct Sentinel<'a>(&'a Option<i32>);

impl fmt::Display for Sentinel<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(value) => write!(f, "{}", value),
            None => f.write_str("none"),
        }
    }
}

impl MigrateError {
    /// Check if this error is recoverable by re-running the migration
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            Self::InvalidDestination { .. } | Self::InvalidConfig { .. }
        )
    }

    /// Get suggested actions for this error
    pub fn suggested_actions(&self) -> Vec<&'static str> {
        match self {
            Self::InvalidDestination { .. } => vec![
                "Check the destination registry URL",
                "Use the form https://[user:pass@]host[:port]/path",
            ],
            Self::InvalidConfig { .. } => vec![
                "Check the configuration file syntax",
                "Make sure every ${VAR} placeholder is set in the environment",
            ],
            Self::InvalidVersion { .. } => {
                vec!["Fix the upstream source so every version key is valid SemVer"]
            }
            Self::MalformedRecord { .. } => vec![
                "Each input line must be a JSON object with `name` and `versions`",
            ],
            Self::ConfigWrite { .. } => vec![
                "Check that the temp directory exists and is writable",
                "Check free disk space",
            ],
            Self::Spawn { .. } => vec![
                "Make sure npm is installed and on PATH",
                "Use --npm to point at the executable explicitly",
            ],
            Self::Stderr { .. } => vec!["Re-run with --verbose to inspect child output"],
            Self::NonZeroExit { .. } => vec![
                "Re-run with --verbose to see the publish tool's stderr",
                "Check the destination credentials",
                "Versions published before the failure are already live",
            ],
            Self::IllegalTransition(_) | Self::CompletionDropped => {
                vec!["Report this as a bug"]
            }
        }
    }

    /// Get error code for this error
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidDestination { .. } => "INVALID_DESTINATION",
            Self::InvalidConfig { .. } => "INVALID_CONFIG",
            Self::InvalidVersion { .. } => "INVALID_VERSION",
            Self::MalformedRecord { .. } => "MALFORMED_RECORD",
            Self::ConfigWrite { .. } => "CONFIG_WRITE",
            Self::Spawn { .. } => "SPAWN_FAILED",
            Self::Stderr { .. } => "STDERR_FAILED",
            Self::NonZeroExit { .. } => "NONZERO_EXIT",
            Self::IllegalTransition(_) => "ILLEGAL_TRANSITION",
            Self::CompletionDropped => "COMPLETION_DROPPED",
        }
    }
}
