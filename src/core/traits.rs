//! Core traits and types for registry migration
//!
//! This module defines the input record shape, the outcome of one publish
//! subprocess, and the two seams the orchestrator is generic over: where
//! records come from and how a single version is published.

use crate::core::error::MigrateError;
use crate::security::credential_context::EphemeralConfig;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;

// ============================================================================
// Input
// ============================================================================

/// One package and the source tree of every version to migrate
///
/// `versions` maps a version string to a directory that is ready to publish.
/// Its iteration order carries no meaning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageRecord {
    pub name: String,
    pub versions: HashMap<String, PathBuf>,
}

impl PackageRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            versions: HashMap::new(),
        }
    }

    /// Builder-style helper to add a version
    pub fn with_version(mut self, version: impl Into<String>, dir: impl Into<PathBuf>) -> Self {
        self.versions.insert(version.into(), dir.into());
        self
    }
}

// ============================================================================
// Publish outcome
// ============================================================================

/// Exit status of one publish subprocess plus its captured stderr
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishOutcome {
    pub code: Option<i32>,
    pub signal: Option<i32>,
    pub stderr: String,
}

impl PublishOutcome {
    pub fn from_status(status: ExitStatus, stderr: String) -> Self {
        #[cfg(unix)]
        let signal = {
            use std::os::unix::process::ExitStatusExt;
            status.signal()
        };
        #[cfg(not(unix))]
        let signal = None;

        Self {
            code: status.code(),
            signal,
            stderr,
        }
    }

    /// Success iff the exit code is exactly 0
    pub fn is_success(&self) -> bool {
        self.code == Some(0)
    }

    /// Map to `Ok` on success, `NonZeroExit` otherwise
    pub fn into_result(self) -> Result<(), MigrateError> {
        if self.is_success() {
            Ok(())
        } else {
            Err(MigrateError::NonZeroExit {
                code: self.code,
                signal: self.signal,
            })
        }
    }
}

// ============================================================================
// Seams
// ============================================================================

/// Publishes one version directory with one ephemeral config
///
/// Implementations run exactly one publish and report its outcome. They must
/// not retry, and must fully drain any output before returning.
#[async_trait]
pub trait PublishRunner: Send + Sync {
    /// Short name used in logs (e.g., "npm")
    fn name(&self) -> &str;

    async fn run(
        &self,
        source_dir: &Path,
        config: &EphemeralConfig,
    ) -> Result<PublishOutcome, MigrateError>;
}

/// A pull-based stream of package records
///
/// The orchestrator pulls the next record only after the previous one has
/// fully completed, which gives upstream producers natural backpressure.
#[async_trait]
pub trait RecordSource: Send {
    /// Next record, or `None` at end of stream
    async fn next_record(&mut self) -> Result<Option<PackageRecord>, MigrateError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_success_only_on_zero() {
        let ok = PublishOutcome {
            code: Some(0),
            ..Default::default()
        };
        assert!(ok.is_success());
        assert!(ok.into_result().is_ok());
    }

    #[test]
    fn test_outcome_nonzero_carries_code_and_sentinel() {
        let failed = PublishOutcome {
            code: Some(1),
            signal: None,
            stderr: "npm ERR! 403".to_string(),
        };

        let error = failed.into_result().unwrap_err();
        let message = error.to_string();
        assert!(message.contains("1"));
        assert!(message.contains("none"));
    }

    #[test]
    fn test_outcome_killed_by_signal_is_failure() {
        let killed = PublishOutcome {
            code: None,
            signal: Some(15),
            ..Default::default()
        };

        assert!(!killed.is_success());
        assert!(matches!(
            killed.into_result(),
            Err(MigrateError::NonZeroExit {
                code: None,
                signal: Some(15)
            })
        ));
    }

    #[test]
    fn test_record_deserializes_from_json() {
        let record: PackageRecord = serde_json::from_str(
            r#"{"name":"left-pad","versions":{"1.0.0":"/tmp/a","1.1.0":"/tmp/b"}}"#,
        )
        .unwrap();

        assert_eq!(record.name, "left-pad");
        assert_eq!(record.versions.len(), 2);
        assert_eq!(record.versions["1.1.0"], PathBuf::from("/tmp/b"));
    }

    #[test]
    fn test_record_builder() {
        let record = PackageRecord::new("pkg")
            .with_version("1.0.0", "/a")
            .with_version("2.0.0", "/b");

        assert_eq!(record.versions.len(), 2);
    }
}
