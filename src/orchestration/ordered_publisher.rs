//! Ordered Publisher - publishes every version of every record, in order
//!
//! Features:
//! - Versions sorted by semantic-version precedence before publishing
//! - Strictly sequential: one child process and one ephemeral config at a time
//! - First failure stops the record and the whole stream
//! - Ephemeral config removed after every publish, success or failure

use crate::core::config::{NpmSettings, PublisherOptions};
use crate::core::error::MigrateError;
use crate::core::state_machine::{RecordProgress, RecordState};
use crate::core::traits::{PackageRecord, PublishRunner, RecordSource};
use crate::plugins::npm_runner::NpmRunner;
use crate::security::{AuthSecret, CredentialContext, Destination, EphemeralConfig};
use crate::validation::VersionValidator;
use std::path::{Path, PathBuf};

/// Result of publishing one record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordReport {
    /// Package name
    pub name: String,

    /// Versions published, in publish order
    pub published: Vec<String>,

    /// Duration in milliseconds
    pub duration: i64,
}

/// Result of draining a whole record source
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    pub records: Vec<RecordReport>,
}

impl MigrationReport {
    /// Total versions published across all records
    pub fn versions_published(&self) -> usize {
        self.records.iter().map(|r| r.published.len()).sum()
    }
}

/// OrderedPublisher - migrates package records into one destination registry
pub struct OrderedPublisher<R: PublishRunner = NpmRunner> {
    destination: Destination,
    secret: Option<AuthSecret>,
    settings: NpmSettings,
    temp_dir: PathBuf,
    runner: R,
    validator: VersionValidator,
    /// Stand-in global config, held for the publisher's lifetime
    inert_global: Option<EphemeralConfig>,
}

impl OrderedPublisher<NpmRunner> {
    /// Create a publisher that shells out to npm
    ///
    /// When the configured global config file does not exist, an empty one
    /// is created under the temp dir and removed with the publisher.
    ///
    /// # Errors
    ///
    /// Returns `MigrateError::InvalidDestination` if the destination URL is
    /// invalid, or `MigrateError::ConfigWrite` if the stand-in global config
    /// cannot be created.
    pub fn new(mut options: PublisherOptions) -> Result<Self, MigrateError> {
        let inert_global = if options.npm.global_config.is_file() {
            None
        } else {
            let fallback = EphemeralConfig::create_empty(&options.temp_dir)?;
            tracing::debug!(
                "global config {} not found, using {}",
                options.npm.global_config.display(),
                fallback.path().display()
            );
            options.npm.global_config = fallback.path().to_path_buf();
            Some(fallback)
        };

        let runner = NpmRunner::new(&options.npm);
        let mut publisher = Self::with_runner(options, runner)?;
        publisher.inert_global = inert_global;
        Ok(publisher)
    }
}

impl<R: PublishRunner> OrderedPublisher<R> {
    /// Create a publisher with a custom runner
    pub fn with_runner(options: PublisherOptions, runner: R) -> Result<Self, MigrateError> {
        let (destination, secret) = Destination::from_config(&options.destination)?;

        Ok(Self {
            destination,
            secret,
            settings: options.npm,
            temp_dir: options.temp_dir,
            runner,
            validator: VersionValidator::new(),
            inert_global: None,
        })
    }

    /// The normalized destination
    pub fn destination(&self) -> &Destination {
        &self.destination
    }

    /// Whether credentials are configured
    pub fn has_auth(&self) -> bool {
        self.secret.is_some()
    }

    /// Versions of `record` in the order they would be published
    pub fn plan<'r>(
        &self,
        record: &'r PackageRecord,
    ) -> Result<Vec<(String, &'r Path)>, MigrateError> {
        let ordered = self
            .validator
            .sort_versions(&record.name, record.versions.keys().cloned())?;

        Ok(ordered
            .into_iter()
            .filter_map(|version| {
                let dir = record.versions.get(&version)?.as_path();
                Some((version, dir))
            })
            .collect())
    }

    /// Publish one version directory
    ///
    /// The ephemeral config is written before the child starts and removed
    /// once it has finished, whatever the outcome. No process is spawned if
    /// the config cannot be written.
    pub async fn publish(&self, source_dir: &Path) -> Result<(), MigrateError> {
        let context = CredentialContext::new(&self.destination, self.secret.as_ref(), &self.settings);
        let config = context.write(&self.temp_dir).await?;

        let outcome = self.runner.run(source_dir, &config).await;
        drop(config);

        let outcome = outcome?;
        let stderr = outcome.stderr.trim();
        if !stderr.is_empty() {
            let redacted = match &self.secret {
                Some(secret) => secret.redact(stderr),
                None => stderr.to_string(),
            };
            tracing::debug!("{} stderr output:\n{}", self.runner.name(), redacted);
        }

        outcome.into_result()
    }

    /// Publish every version of one record in ascending version order
    ///
    /// Stops at the first failing version and returns its error unchanged;
    /// later versions are never attempted.
    pub async fn publish_record(&self, record: &PackageRecord) -> Result<RecordReport, MigrateError> {
        let plan = self.plan(record)?;
        tracing::info!("publishing {} versions of {}", plan.len(), record.name);

        let mut progress = RecordProgress::new();
        let mut published = Vec::with_capacity(plan.len());

        for (index, (version, dir)) in plan.into_iter().enumerate() {
            progress.transition(RecordState::PublishingVersion(index))?;
            tracing::debug!("publishing {}@{} from {}", record.name, version, dir.display());

            if let Err(e) = self.publish(dir).await {
                let completed = progress.completed_versions();
                progress.transition(RecordState::Failed)?;
                tracing::error!(
                    "{}@{} failed after {} published versions: {}",
                    record.name,
                    version,
                    completed,
                    e
                );
                return Err(e);
            }

            tracing::info!("published {}@{}", record.name, version);
            published.push(version);
        }

        progress.transition(RecordState::Done)?;
        tracing::debug!("{} progress:\n{}", record.name, progress.get_history());

        Ok(RecordReport {
            name: record.name.clone(),
            published,
            duration: progress.get_elapsed_time(),
        })
    }

    /// Drain a record source, one record at a time
    ///
    /// The next record is pulled only after the previous one completes. The
    /// first failure ends the migration and is returned as-is.
    pub async fn migrate<S>(&self, source: &mut S) -> Result<MigrationReport, MigrateError>
    where
        S: RecordSource + ?Sized,
    {
        let mut report = MigrationReport::default();

        while let Some(record) = source.next_record().await? {
            let record_report = self.publish_record(&record).await?;
            report.records.push(record_report);
        }

        tracing::info!(
            "migrated {} versions across {} packages to {}",
            report.versions_published(),
            report.records.len(),
            self.destination
        );

        Ok(report)
    }
}


#[cfg(all(test, unix))]
mod process_tests {
    use super::*;
    use crate::plugins::npm_runner::test_support::fake_npm;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_end_to_end_with_fake_npm() {
        let root = TempDir::new().unwrap();
        let temp = root.path().join("tmp");
        std::fs::create_dir_all(&temp).unwrap();

        let mut record = PackageRecord::new("pkg");
        for version in ["1.0.0", "1.5.0", "2.0.0"] {
            let dir = root.path().join(version);
            std::fs::create_dir_all(&dir).unwrap();
            record = record.with_version(version, dir);
        }
        std::fs::write(root.path().join("2.0.0").join("exit_code"), "1").unwrap();

        let global = root.path().join("npmrc-global");
        std::fs::write(&global, "").unwrap();

        let mut options = PublisherOptions::new("https://ci:pw@registry.example/");
        options.temp_dir = temp.clone();
        options.npm.program = fake_npm(root.path()).display().to_string();
        options.npm.global_config = global;
        let publisher = OrderedPublisher::new(options).unwrap();

        let error = publisher.publish_record(&record).await.unwrap_err();

        assert_eq!(error.to_string(), "Child exited with code 1 and signal none");
        let calls = std::fs::read_to_string(root.path().join("calls.log")).unwrap();
        let order: Vec<_> = calls
            .lines()
            .map(|line| line.rsplit('/').next().unwrap_or_default().to_string())
            .collect();
        assert_eq!(order, vec!["1.0.0", "1.5.0", "2.0.0"]);
        assert_eq!(std::fs::read_dir(&temp).unwrap().count(), 0);

        let seen = std::fs::read_to_string(root.path().join("1.0.0").join("seen-npmrc")).unwrap();
        assert!(seen.contains("//registry.example/:username=ci"));
    }
}
