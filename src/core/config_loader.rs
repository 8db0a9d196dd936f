//! Configuration file loader for registry-migrate
//!
//! This module provides configuration loading, merging and `${VAR}` expansion.

use super::config::*;
use crate::core::error::MigrateError;
use regex::Regex;
use std::collections::HashMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Configuration file names searched for, in order
const CONFIG_FILENAMES: &[&str] = &[
    ".registry-migrate.yaml",
    ".registry-migrate.yml",
    ".registry-migrate.toml",
];

/// Environment variable pattern (${VAR_NAME})
const ENV_VAR_PATTERN: &str = r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}";

const ENV_DESTINATION: &str = "REGISTRY_MIGRATE_DESTINATION";
const ENV_AUTH: &str = "REGISTRY_MIGRATE_AUTH";
const ENV_NPM: &str = "REGISTRY_MIGRATE_NPM";

/// Configuration load options
#[derive(Debug, Clone, Default)]
pub struct ConfigLoadOptions {
    /// Explicit config file; when unset, `search_dir` is searched
    pub config_path: Option<PathBuf>,

    /// Directory searched for a config file
    pub search_dir: PathBuf,

    /// CLI arguments (highest priority)
    pub cli_args: Option<MigrateConfig>,

    /// Environment variables
    pub env: HashMap<String, String>,
}

/// Configuration file loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Snapshot of the process environment
    pub fn process_env() -> HashMap<String, String> {
        Self::unicode_env(std::env::vars_os())
    }

    /// Keep only the variables whose name and value are both valid Unicode
    ///
    /// Lookups are by name only, so dropping the rest loses nothing.
    pub fn unicode_env<I>(vars: I) -> HashMap<String, String>
    where
        I: IntoIterator<Item = (OsString, OsString)>,
    {
        vars.into_iter()
            .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)))
            .collect()
    }

    /// Load configuration from multiple sources with priority
    ///
    /// Priority (high to low):
    /// 1. CLI arguments
    /// 2. Environment variables
    /// 3. Config file (explicit path, or searched in `search_dir`)
    /// 4. Default values
    pub async fn load(options: ConfigLoadOptions) -> Result<PublisherOptions, MigrateError> {
        let mut configs: Vec<MigrateConfig> = Vec::new();

        let file_config = match &options.config_path {
            Some(path) => Some(Self::load_config_file(path).await?.ok_or_else(|| {
                MigrateError::InvalidConfig {
                    message: format!("config file not found: {}", path.display()),
                }
            })?),
            None => Self::find_config(&options.search_dir).await?,
        };
        if let Some(file_config) = file_config {
            configs.push(file_config);
        }

        if let Some(env_config) = Self::load_env_config(&options.env) {
            configs.push(env_config);
        }

        if let Some(cli_config) = options.cli_args {
            configs.push(cli_config);
        }

        let merged = Self::merge_configs(configs);
        let expanded = Self::expand_env_vars(merged, &options.env)?;

        expanded.resolve()
    }

    /// Search a directory for the first known config file name
    async fn find_config(dir: &Path) -> Result<Option<MigrateConfig>, MigrateError> {
        for name in CONFIG_FILENAMES {
            if let Some(config) = Self::load_config_file(&dir.join(name)).await? {
                tracing::debug!("Loaded configuration from {}", dir.join(name).display());
                return Ok(Some(config));
            }
        }
        Ok(None)
    }

    /// Load configuration from a YAML or TOML file, chosen by extension
    async fn load_config_file(file_path: &Path) -> Result<Option<MigrateConfig>, MigrateError> {
        if !file_path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(file_path)
            .await
            .map_err(|e| MigrateError::InvalidConfig {
                message: format!("Failed to read config file {}: {}", file_path.display(), e),
            })?;

        Self::parse_config(file_path, &content).map(Some)
    }

    fn parse_config(file_path: &Path, content: &str) -> Result<MigrateConfig, MigrateError> {
        let is_toml = file_path.extension().and_then(|e| e.to_str()) == Some("toml");

        if is_toml {
            toml::from_str(content).map_err(|e| MigrateError::InvalidConfig {
                message: format!("Failed to parse TOML config: {}", e),
            })
        } else {
            serde_yaml::from_str(content).map_err(|e| MigrateError::InvalidConfig {
                message: format!("Failed to parse YAML config: {}", e),
            })
        }
    }

    /// Load configuration from environment variables
    fn load_env_config(env: &HashMap<String, String>) -> Option<MigrateConfig> {
        let mut config = MigrateConfig::default();
        let mut has_changes = false;

        if let Some(destination) = env.get(ENV_DESTINATION) {
            config.destination = Some(DestinationConfig::Url(destination.clone()));
            has_changes = true;
        }

        if let Some(auth) = env.get(ENV_AUTH) {
            config.auth = Some(auth.clone());
            has_changes = true;
        }

        if let Some(program) = env.get(ENV_NPM) {
            config.npm = Some(NpmConfig {
                program: Some(program.clone()),
                ..Default::default()
            });
            has_changes = true;
        }

        if has_changes { Some(config) } else { None }
    }

    /// Merge multiple configurations with priority
    fn merge_configs(configs: Vec<MigrateConfig>) -> MigrateConfig {
        let mut result = MigrateConfig::default();

        for config in configs {
            Self::merge_into(&mut result, config);
        }

        result
    }

    /// Merge source config into target
    fn merge_into(target: &mut MigrateConfig, source: MigrateConfig) {
        if source.destination.is_some() {
            target.destination = source.destination;
        }

        if source.auth.is_some() {
            target.auth = source.auth;
        }

        if let Some(source_npm) = source.npm {
            let target_npm = target.npm.get_or_insert_with(NpmConfig::default);

            if source_npm.program.is_some() {
                target_npm.program = source_npm.program;
            }
            if source_npm.global_config.is_some() {
                target_npm.global_config = source_npm.global_config;
            }
            if source_npm.loglevel.is_some() {
                target_npm.loglevel = source_npm.loglevel;
            }
            if source_npm.email.is_some() {
                target_npm.email = source_npm.email;
            }
        }

        if source.temp_dir.is_some() {
            target.temp_dir = source.temp_dir;
        }
    }

    /// Expand environment variables in every string field that may carry one
    fn expand_env_vars(
        mut config: MigrateConfig,
        env: &HashMap<String, String>,
    ) -> Result<MigrateConfig, MigrateError> {
        let env_var_regex = Regex::new(ENV_VAR_PATTERN).map_err(|e| MigrateError::InvalidConfig {
            message: e.to_string(),
        })?;
        let expand = |input: &str| Self::expand_string(&env_var_regex, input, env);

        config.destination = match config.destination {
            Some(DestinationConfig::Url(url)) => Some(DestinationConfig::Url(expand(&url)?)),
            Some(DestinationConfig::Detailed { destination, auth }) => {
                Some(DestinationConfig::Detailed {
                    destination: expand(&destination)?,
                    auth: auth.as_deref().map(expand).transpose()?,
                })
            }
            None => None,
        };

        config.auth = config.auth.as_deref().map(expand).transpose()?;

        if let Some(npm) = &mut config.npm {
            npm.program = npm.program.as_deref().map(expand).transpose()?;
            npm.email = npm.email.as_deref().map(expand).transpose()?;
        }

        Ok(config)
    }

    /// Expand `${VAR}` placeholders in a single string
    fn expand_string(
        env_var_regex: &Regex,
        input: &str,
        env: &HashMap<String, String>,
    ) -> Result<String, MigrateError> {
        let mut result = String::with_capacity(input.len());
        let mut last = 0;

        for captures in env_var_regex.captures_iter(input) {
            let (Some(whole), Some(name)) = (captures.get(0), captures.get(1)) else {
                continue;
            };
            let value = env.get(name.as_str()).ok_or_else(|| MigrateError::InvalidConfig {
                message: format!("environment variable {} is not set", name.as_str()),
            })?;

            result.push_str(&input[last..whole.start()]);
            result.push_str(value);
            last = whole.end();
        }

        result.push_str(&input[last..]);
        Ok(result)
    }
}
