//! NPM Runner - runs `npm publish` for one version directory
//!
//! # Security Features
//!
//! - **No ambient config**: `--userconfig` points at the ephemeral config and
//!   `--globalconfig` at an inert file, so no system npmrc is read
//! - **No lifecycle scripts**: `--ignore-scripts`
//! - **Minimal environment**: the child sees only [`ENV_ALLOWLIST`]
//! - **Injection prevention**: arguments are passed as a vector, never through a shell

use crate::core::config::NpmSettings;
use crate::core::error::MigrateError;
use crate::core::traits::{PublishOutcome, PublishRunner};
use crate::orchestration::completion::completion;
use crate::security::credential_context::EphemeralConfig;
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::AsyncReadExt;
use tokio::process::Command;

/// Environment variables passed through to the publish child.
///
/// Everything else is cleared so unrelated credentials in the parent
/// environment never reach npm.
pub const ENV_ALLOWLIST: &[&str] = &["PATH", "HOME"];

/// Runs the npm CLI's publish subcommand
#[derive(Debug, Clone)]
pub struct NpmRunner {
    program: String,
    global_config: PathBuf,
}

impl NpmRunner {
    pub fn new(settings: &NpmSettings) -> Self {
        Self {
            program: settings.program.clone(),
            global_config: settings.global_config.clone(),
        }
    }

    /// Arguments for one publish call
    pub fn publish_args(&self, config: &Path) -> Vec<OsString> {
        let mut userconfig = OsString::from("--userconfig=");
        userconfig.push(config);
        let mut globalconfig = OsString::from("--globalconfig=");
        globalconfig.push(&self.global_config);

        vec![
            OsString::from("publish"),
            OsString::from("--ignore-scripts"),
            userconfig,
            globalconfig,
        ]
    }

    /// The allow-listed subset of the current environment
    pub fn child_env() -> Vec<(&'static str, OsString)> {
        ENV_ALLOWLIST
            .iter()
            .filter_map(|key| std::env::var_os(key).map(|value| (*key, value)))
            .collect()
    }
}

#[async_trait]
impl PublishRunner for NpmRunner {
    fn name(&self) -> &str {
        "npm"
    }

    async fn run(
        &self,
        source_dir: &Path,
        config: &EphemeralConfig,
    ) -> Result<PublishOutcome, MigrateError> {
        let mut child = Command::new(&self.program)
            .args(self.publish_args(config.path()))
            .current_dir(source_dir)
            .env_clear()
            .envs(Self::child_env())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| MigrateError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let (done, outcome) = completion::<Result<PublishOutcome, MigrateError>>();

        // Drain stderr concurrently so the child never blocks on a full pipe
        let stderr = child.stderr.take();
        let drain_done = done.clone();
        let drain = tokio::spawn(async move {
            let mut buffer = Vec::new();
            if let Some(mut stderr) = stderr
                && let Err(source) = stderr.read_to_end(&mut buffer).await
            {
                drain_done.complete(Err(MigrateError::Stderr { source }));
            }
            buffer
        });

        let status = child.wait().await;

        // The outcome is final only once stderr is fully drained
        let stderr = match drain.await {
            Ok(buffer) => String::from_utf8_lossy(&buffer).into_owned(),
            Err(e) => {
                tracing::debug!("stderr drain task failed: {}", e);
                String::new()
            }
        };

        match status {
            Ok(status) => done.complete(Ok(PublishOutcome::from_status(status, stderr))),
            Err(source) => done.complete(Err(MigrateError::Spawn {
                program: self.program.clone(),
                source,
            })),
        };

        outcome.wait().await?
    }
}

#[cfg(all(test, unix))]
pub(crate) mod test_support {
    use std::os::unix::fs::PermissionsExt;
    use std::path::{Path, PathBuf};

    /// Write an executable `/bin/sh` script that stands in for npm.
    ///
    /// It appends `$PWD` to `<dir>/calls.log`, copies the `--userconfig` file
    /// to `$PWD/seen-npmrc`, records its argv and environment next to it, and
    /// exits with the number in `$PWD/exit_code` (0 if absent).
    pub fn fake_npm(dir: &Path) -> PathBuf {
        let log = dir.join("calls.log");
        let script = format!(
            r#"#!/bin/sh
echo "$PWD" >> "{log}"
for arg in "$@"; do
  case "$arg" in
    --userconfig=*) cfg="${{arg#--userconfig=}}" ;;
  esac
done
if [ -n "$cfg" ] && [ -f "$cfg" ]; then cat "$cfg" > seen-npmrc; fi
echo "$@" > seen-args
env > seen-env
if [ -f stderr_text ]; then cat stderr_text >&2; fi
if [ -f exit_code ]; then exit "$(cat exit_code)"; fi
exit 0
"#,
            log = log.display()
        );

        let path = dir.join("fake-npm");
        std::fs::write(&path, script).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }
}
