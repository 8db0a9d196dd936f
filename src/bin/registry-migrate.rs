//! registry-migrate CLI
//!
//! Reads package records as newline-delimited JSON and publishes every
//! version, in version order, to a destination registry.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use registry_migrate::core::{ConfigLoadOptions, ConfigLoader, MigrateConfig, NpmConfig};
use registry_migrate::core::{MigrateError, RecordSource};
use registry_migrate::logging::init_logging;
use registry_migrate::orchestration::JsonLinesSource;
use registry_migrate::validation::VersionValidator;
use registry_migrate::{DestinationConfig, OrderedPublisher};
use std::path::PathBuf;
use std::process;
use tokio::io::{AsyncBufRead, BufReader};

/// Migrate package versions into a destination registry
#[derive(Parser)]
#[command(name = "registry-migrate")]
#[command(version)]
#[command(about = "Migrate package versions into a destination registry, in version order", long_about = None)]
struct Cli {
    /// Log publish tool stderr and per-version progress
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Publish every record to the destination registry
    Migrate {
        /// NDJSON file of package records (defaults to stdin)
        #[arg(value_name = "INPUT")]
        input: Option<PathBuf>,

        #[command(flatten)]
        config: ConfigArgs,
    },

    /// Print the publish order of every record without publishing
    Plan {
        /// NDJSON file of package records (defaults to stdin)
        #[arg(value_name = "INPUT")]
        input: Option<PathBuf>,
    },
}

#[derive(Args)]
struct ConfigArgs {
    /// Destination registry URL (may embed user:pass)
    #[arg(short, long)]
    destination: Option<String>,

    /// Credentials as user:pass (overrides credentials in the URL)
    #[arg(long)]
    auth: Option<String>,

    /// Config file (.yaml, .yml or .toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Publish executable (defaults to npm)
    #[arg(long)]
    npm: Option<String>,

    /// Inert global npmrc
    #[arg(long)]
    global_config: Option<PathBuf>,

    /// Directory for ephemeral configs
    #[arg(long)]
    temp_dir: Option<PathBuf>,
}

impl ConfigArgs {
    fn into_load_options(self) -> Result<ConfigLoadOptions> {
        let npm = if self.npm.is_some() || self.global_config.is_some() {
            Some(NpmConfig {
                program: self.npm,
                global_config: self.global_config,
                ..Default::default()
            })
        } else {
            None
        };

        let cli_args = MigrateConfig {
            destination: self.destination.map(DestinationConfig::Url),
            auth: self.auth,
            npm,
            temp_dir: self.temp_dir,
        };

        Ok(ConfigLoadOptions {
            config_path: self.config,
            search_dir: std::env::current_dir().context("cannot read current directory")?,
            cli_args: Some(cli_args),
            env: ConfigLoader::process_env(),
        })
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli).await {
        Ok(exit_code) => process::exit(exit_code),
        Err(e) => {
            eprintln!("\n❌ Error");
            eprintln!("{:#}", e);
            process::exit(1);
        }
    }
}

async fn run(cli: Cli) -> Result<i32> {
    match cli.command {
        Commands::Migrate { input, config } => migrate_command(input, config).await,
        Commands::Plan { input } => plan_command(input).await,
    }
}

async fn open_input(input: Option<PathBuf>) -> Result<Box<dyn AsyncBufRead + Unpin + Send>> {
    match input {
        Some(path) => {
            let file = tokio::fs::File::open(&path)
                .await
                .with_context(|| format!("cannot open {}", path.display()))?;
            Ok(Box::new(BufReader::new(file)))
        }
        None => Ok(Box::new(BufReader::new(tokio::io::stdin()))),
    }
}

async fn migrate_command(input: Option<PathBuf>, config: ConfigArgs) -> Result<i32> {
    let options = match ConfigLoader::load(config.into_load_options()?).await {
        Ok(options) => options,
        Err(e) => return Ok(report_error(&e)),
    };

    let publisher = match OrderedPublisher::new(options) {
        Ok(publisher) => publisher,
        Err(e) => return Ok(report_error(&e)),
    };

    let auth = if publisher.has_auth() {
        "with credentials"
    } else {
        "without credentials"
    };
    println!("\n📦 registry-migrate → {} ({})\n", publisher.destination(), auth);

    let mut source = JsonLinesSource::new(open_input(input).await?);

    match publisher.migrate(&mut source).await {
        Ok(report) => {
            for record in &report.records {
                println!(
                    "✅ {}: {} versions ({}ms)",
                    record.name,
                    record.published.len(),
                    record.duration
                );
            }
            println!(
                "\n✅ Migrated {} versions across {} packages",
                report.versions_published(),
                report.records.len()
            );
            Ok(0)
        }
        Err(e) => Ok(report_error(&e)),
    }
}

async fn plan_command(input: Option<PathBuf>) -> Result<i32> {
    let validator = VersionValidator::new();
    let mut source = JsonLinesSource::new(open_input(input).await?);

    loop {
        let record = match source.next_record().await {
            Ok(Some(record)) => record,
            Ok(None) => break,
            Err(e) => return Ok(report_error(&e)),
        };

        let ordered = match validator.sort_versions(&record.name, record.versions.keys().cloned()) {
            Ok(ordered) => ordered,
            Err(e) => return Ok(report_error(&e)),
        };

        println!("📦 {}", record.name);
        for version in ordered {
            let marker = if validator.is_prerelease(&version) {
                " (prerelease)"
            } else {
                ""
            };
            let dir = record
                .versions
                .get(&version)
                .map(|d| d.display().to_string())
                .unwrap_or_default();
            println!("   {}{} ← {}", version, marker, dir);
        }
    }

    Ok(0)
}

fn report_error(error: &MigrateError) -> i32 {
    eprintln!("\n❌ {} [{}]", error, error.code());
    for action in error.suggested_actions() {
        eprintln!("  - {}", action);
    }
    if !error.is_recoverable() {
        eprintln!("  Nothing was published; fix the configuration and re-run");
    }
    1
}
