//! Configuration structures and types for registry-migrate
//!
//! This module provides type-safe configuration management with serde support.
//! A [`MigrateConfig`] is one partial layer (file, environment or CLI); the
//! loader merges layers and resolves them into [`PublisherOptions`].

use crate::core::error::MigrateError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Publish executable used when none is configured
pub const DEFAULT_NPM_PROGRAM: &str = "npm";

/// Log level written into every ephemeral config
pub const DEFAULT_LOGLEVEL: &str = "info";

/// Placeholder email some publish tools insist on.
///
/// `.invalid` is a reserved TLD, so nothing is ever delivered to it.
pub const PLACEHOLDER_EMAIL: &str = "registry-migrate@registry-migrate.invalid";

/// Empty global config shipped with the crate.
///
/// Pointing `--globalconfig` here keeps npm from falling back to a real
/// system-wide npmrc. It is never written. An installed binary may no longer
/// find it; the publisher then creates an empty stand-in under the temp dir.
pub const INERT_GLOBAL_NPMRC: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/assets/npmrc-global");

/// Destination as accepted by the constructor: a bare URL or a URL plus auth
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum DestinationConfig {
    /// `https://[user:pass@]host/path`
    Url(String),

    /// `{ destination, auth? }`
    Detailed {
        destination: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        auth: Option<String>,
    },
}

impl DestinationConfig {
    /// The destination URL as written
    pub fn url(&self) -> &str {
        match self {
            Self::Url(url) => url,
            Self::Detailed { destination, .. } => destination,
        }
    }

    /// Explicit `user:pass` auth, if any
    pub fn auth(&self) -> Option<&str> {
        match self {
            Self::Url(_) => None,
            Self::Detailed { auth, .. } => auth.as_deref(),
        }
    }
}

impl From<&str> for DestinationConfig {
    fn from(url: &str) -> Self {
        Self::Url(url.to_string())
    }
}

impl From<String> for DestinationConfig {
    fn from(url: String) -> Self {
        Self::Url(url)
    }
}

/// Root configuration layer
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MigrateConfig {
    /// Destination registry (required after merging)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<DestinationConfig>,

    /// `user:pass` auth; overrides auth carried by `destination`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth: Option<String>,

    /// Publish tool settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub npm: Option<NpmConfig>,

    /// Directory for ephemeral configs (default: system temp dir)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temp_dir: Option<PathBuf>,
}

/// Publish tool configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NpmConfig {
    /// Executable name or path (default: "npm")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub program: Option<String>,

    /// Inert global config path (default: the shipped empty file)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub global_config: Option<PathBuf>,

    /// npm loglevel (default: "info")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loglevel: Option<String>,

    /// Placeholder email (default: an address on the `.invalid` TLD)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Fully resolved publish tool settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NpmSettings {
    pub program: String,
    pub global_config: PathBuf,
    pub loglevel: String,
    pub email: String,
}

impl Default for NpmSettings {
    fn default() -> Self {
        Self {
            program: DEFAULT_NPM_PROGRAM.to_string(),
            global_config: PathBuf::from(INERT_GLOBAL_NPMRC),
            loglevel: DEFAULT_LOGLEVEL.to_string(),
            email: PLACEHOLDER_EMAIL.to_string(),
        }
    }
}

impl From<NpmConfig> for NpmSettings {
    fn from(config: NpmConfig) -> Self {
        let defaults = Self::default();
        Self {
            program: config.program.unwrap_or(defaults.program),
            global_config: config.global_config.unwrap_or(defaults.global_config),
            loglevel: config.loglevel.unwrap_or(defaults.loglevel),
            email: config.email.unwrap_or(defaults.email),
        }
    }
}

/// Everything an [`OrderedPublisher`](crate::orchestration::OrderedPublisher) needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublisherOptions {
    pub destination: DestinationConfig,
    pub npm: NpmSettings,
    pub temp_dir: PathBuf,
}

impl PublisherOptions {
    /// Options for a destination with every other setting defaulted
    pub fn new(destination: impl Into<DestinationConfig>) -> Self {
        Self {
            destination: destination.into(),
            npm: NpmSettings::default(),
            temp_dir: std::env::temp_dir(),
        }
    }
}

impl MigrateConfig {
    /// Resolve a merged layer into publisher options
    ///
    /// # Errors
    ///
    /// Returns `MigrateError::InvalidConfig` when no destination is set.
    pub fn resolve(self) -> Result<PublisherOptions, MigrateError> {
        let destination = self.destination.ok_or_else(|| MigrateError::InvalidConfig {
            message: "destination is required".to_string(),
        })?;

        let destination = match self.auth {
            Some(auth) => DestinationConfig::Detailed {
                destination: destination.url().to_string(),
                auth: Some(auth),
            },
            None => destination,
        };

        Ok(PublisherOptions {
            destination,
            npm: self.npm.unwrap_or_default().into(),
            temp_dir: self.temp_dir.unwrap_or_else(std::env::temp_dir),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_destination_from_bare_string_yaml() {
        let config: MigrateConfig =
            serde_yaml::from_str("destination: https://registry.example/").unwrap();

        assert_eq!(
            config.destination,
            Some(DestinationConfig::Url("https://registry.example/".to_string()))
        );
    }

    #[test]
    fn test_destination_from_object_yaml() {
        let yaml = r#"
destination:
  destination: https://registry.example/
  auth: "alice:s3cret"
npm:
  program: /usr/local/bin/npm
  globalConfig: /etc/inert-npmrc
tempDir: /var/tmp
"#;
        let config: MigrateConfig = serde_yaml::from_str(yaml).unwrap();
        let destination = config.destination.as_ref().unwrap();

        assert_eq!(destination.url(), "https://registry.example/");
        assert_eq!(destination.auth(), Some("alice:s3cret"));

        let npm = config.npm.as_ref().unwrap();
        assert_eq!(npm.program.as_deref(), Some("/usr/local/bin/npm"));
        assert_eq!(npm.global_config, Some(PathBuf::from("/etc/inert-npmrc")));
        assert_eq!(config.temp_dir, Some(PathBuf::from("/var/tmp")));
    }

    #[test]
    fn test_resolve_requires_destination() {
        let result = MigrateConfig::default().resolve();
        assert!(matches!(result, Err(MigrateError::InvalidConfig { .. })));
    }

    #[test]
    fn test_resolve_top_level_auth_overrides_destination_auth() {
        let config = MigrateConfig {
            destination: Some(DestinationConfig::Detailed {
                destination: "https://registry.example".to_string(),
                auth: Some("old:pw".to_string()),
            }),
            auth: Some("new:pw".to_string()),
            ..Default::default()
        };

        let options = config.resolve().unwrap();
        assert_eq!(options.destination.auth(), Some("new:pw"));
        assert_eq!(options.destination.url(), "https://registry.example");
    }

    #[test]
    fn test_npm_settings_defaults() {
        let settings = NpmSettings::from(NpmConfig {
            loglevel: Some("warn".to_string()),
            ..Default::default()
        });

        assert_eq!(settings.program, "npm");
        assert_eq!(settings.loglevel, "warn");
        assert!(settings.email.ends_with(".invalid"));
        assert!(settings.global_config.ends_with("assets/npmrc-global"));
    }
}
