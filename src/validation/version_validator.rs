//! Version Validator - Orders version keys by semantic-version precedence
//!
//! Version keys come from the upstream source as plain strings. They are
//! parsed with the semver crate (a leading `v` or `=` is tolerated) and
//! sorted ascending by precedence, ignoring build metadata.
//!
//! # Example
//!
//! ```
//! use registry_migrate::validation::VersionValidator;
//!
//! let validator = VersionValidator::new();
//! let ordered = validator
//!     .sort_versions("left-pad", ["2.0.0", "1.0.0", "1.5.0"])
//!     .unwrap();
//!
//! assert_eq!(ordered, vec!["1.0.0", "1.5.0", "2.0.0"]);
//! ```

use crate::core::error::MigrateError;
use semver::Version;
use std::cmp::Ordering;

/// Validator and sorter for semantic versions
pub struct VersionValidator;

impl Default for VersionValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl VersionValidator {
    /// Create a new VersionValidator
    pub fn new() -> Self {
        Self
    }

    /// Parse a version key
    ///
    /// Surrounding whitespace and one leading `v` or `=` are accepted, the
    /// way npm reads versions.
    pub fn parse(&self, version_str: &str) -> Result<Version, semver::Error> {
        let trimmed = version_str.trim();
        let trimmed = trimmed
            .strip_prefix('=')
            .or_else(|| trimmed.strip_prefix('v'))
            .unwrap_or(trimmed);
        Version::parse(trimmed)
    }

    /// Compare two parsed versions by precedence
    ///
    /// Build metadata does not participate, so `1.0.0+a` and `1.0.0+b` are equal.
    pub fn compare_precedence(&self, a: &Version, b: &Version) -> Ordering {
        (a.major, a.minor, a.patch, &a.pre).cmp(&(b.major, b.minor, b.patch, &b.pre))
    }

    /// Sort version keys ascending
    ///
    /// Keys with equal precedence are ordered lexically by the raw key, so
    /// the result never depends on the input order.
    ///
    /// # Errors
    ///
    /// Returns `MigrateError::InvalidVersion` for the first key that does not
    /// parse; nothing is sorted in that case.
    pub fn sort_versions<I, S>(&self, package: &str, keys: I) -> Result<Vec<String>, MigrateError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut parsed = keys
            .into_iter()
            .map(|key| {
                let key = key.into();
                match self.parse(&key) {
                    Ok(version) => Ok((version, key)),
                    Err(e) => Err(MigrateError::InvalidVersion {
                        package: package.to_string(),
                        version: key,
                        reason: e.to_string(),
                    }),
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        parsed.sort_by(|(va, ka), (vb, kb)| {
            self.compare_precedence(va, vb).then_with(|| ka.cmp(kb))
        });

        Ok(parsed.into_iter().map(|(_, key)| key).collect())
    }

    /// Check if version is a prerelease
    pub fn is_prerelease(&self, version_str: &str) -> bool {
        self.parse(version_str)
            .map(|version| !version.pre.is_empty())
            .unwrap_or(false)
    }
}
