//! Credential Context Builder - ephemeral, registry-scoped npmrc files
//!
//! # Security Features
//!
//! - **Scoped credentials**: auth fields are keyed to the destination's scope key
//! - **Owner-only file**: created with mode `0o600` at open time, never widened
//! - **Unique names**: a fresh UUID per call, so concurrent callers never collide
//! - **Guaranteed cleanup**: [`EphemeralConfig`] removes the file when dropped

use crate::core::config::NpmSettings;
use crate::core::error::MigrateError;
use crate::security::auth_secret::AuthSecret;
use crate::security::destination::Destination;
use secrecy::{ExposeSecret, SecretString};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

/// Everything needed to render one ephemeral config
pub struct CredentialContext<'a> {
    destination: &'a Destination,
    secret: Option<&'a AuthSecret>,
    settings: &'a NpmSettings,
}

/// A written ephemeral config; the file is deleted when this is dropped
#[derive(Debug)]
pub struct EphemeralConfig {
    path: PathBuf,
}

impl<'a> CredentialContext<'a> {
    pub fn new(
        destination: &'a Destination,
        secret: Option<&'a AuthSecret>,
        settings: &'a NpmSettings,
    ) -> Self {
        Self {
            destination,
            secret,
            settings,
        }
    }

    /// Render the npmrc document
    ///
    /// # Errors
    ///
    /// Returns `MigrateError::InvalidConfig` if `loglevel` or `email` spans
    /// more than one line.
    pub fn render(&self) -> Result<SecretString, MigrateError> {
        for (key, value) in [
            ("loglevel", &self.settings.loglevel),
            ("email", &self.settings.email),
        ] {
            if value.contains(['\n', '\r']) {
                return Err(MigrateError::InvalidConfig {
                    message: format!("npm {} must be a single line", key),
                });
            }
        }

        let auth = self
            .secret
            .map(|s| s.encoded().expose_secret().to_string())
            .unwrap_or_default();
        let (user, password) = match self.secret {
            Some(secret) => {
                let credentials = secret.decode();
                let password = credentials.encoded_password().expose_secret().to_string();
                (credentials.user, password)
            }
            None => (String::new(), String::new()),
        };
        let scope = self.destination.scope_key();

        let lines = [
            "# generated by registry-migrate".to_string(),
            format!("_auth={}", auth),
            format!("registry={}", self.destination),
            format!("loglevel={}", self.settings.loglevel),
            "always-auth=false".to_string(),
            format!("{}:_auth={}", scope, auth),
            format!("{}:username={}", scope, user),
            format!("{}:_password={}", scope, password),
            format!("{}:always-auth=false", scope),
            "# email is required by npm; .invalid never delivers, info purposes only".to_string(),
            format!("{}:email={}", scope, self.settings.email),
        ];

        Ok(SecretString::from(lines.join("\n") + "\n"))
    }

    /// Write the rendered config to a fresh file under `temp_dir`
    ///
    /// # Errors
    ///
    /// Returns `MigrateError::ConfigWrite` if the file cannot be created or
    /// fully written. A partially written file is removed before returning.
    /// Nothing is created when the config cannot be rendered.
    pub async fn write(&self, temp_dir: &Path) -> Result<EphemeralConfig, MigrateError> {
        let rendered = self.render()?;
        let path = temp_dir.join(Uuid::new_v4().to_string());

        let mut options = tokio::fs::OpenOptions::new();
        options.write(true).create_new(true);
        // Owner read/write only, applied at creation so the file is never wider
        #[cfg(unix)]
        options.mode(0o600);

        let mut file = options
            .open(&path)
            .await
            .map_err(|source| MigrateError::ConfigWrite {
                path: path.clone(),
                source,
            })?;
        let config = EphemeralConfig { path };

        let written: std::io::Result<()> = async {
            file.write_all(rendered.expose_secret().as_bytes()).await?;
            file.flush().await?;
            Ok(())
        }
        .await;
        drop(file);

        match written {
            Ok(()) => {
                tracing::debug!("Wrote ephemeral config {}", config.path.display());
                Ok(config)
            }
            Err(source) => Err(MigrateError::ConfigWrite {
                path: config.path.clone(),
                source,
            }),
        }
    }
}

impl EphemeralConfig {
    /// Create an empty owner-only file under `dir`, removed on drop
    ///
    /// # Errors
    ///
    /// Returns `MigrateError::ConfigWrite` if the file cannot be created.
    pub fn create_empty(dir: &Path) -> Result<Self, MigrateError> {
        let path = dir.join(Uuid::new_v4().to_string());

        let mut options = std::fs::OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        options
            .open(&path)
            .map_err(|source| MigrateError::ConfigWrite {
                path: path.clone(),
                source,
            })?;

        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for EphemeralConfig {
    fn drop(&mut self) {
        // Best effort: a leftover file is logged, never escalated
        if let Err(e) = std::fs::remove_file(&self.path) {
            tracing::debug!(
                "Failed to remove ephemeral config {}: {}",
                self.path.display(),
                e
            );
        }
    }
}
