use clap::{Parser, Subcommand};
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

pub mod check_config;
pub mod config;
pub mod replay;
pub mod version;

use config::LoggingConfig;

#[derive(Parser)]
#[command(name = "trustdao")]
#[command(author = "TrustDAO Project")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Operator CLI for the TrustDAO trusted-node governance engine", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Replay a JSON command log against a fresh governance state
    Replay {
        /// Path to the JSON command log
        #[arg(long)]
        log: String,

        /// Path to config file (initial settings and logging)
        #[arg(long)]
        config: Option<String>,

        /// Write the final state as a CBOR snapshot
        #[arg(long)]
        snapshot: Option<String>,
    },

    /// Validate a config file and print the effective settings
    CheckConfig {
        /// Path to config file
        #[arg(long)]
        config: String,
    },

    /// Write a commented default config file
    InitConfig {
        /// Output path for the config file
        #[arg(long, default_value = "trustdao.toml")]
        path: String,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Display version information
    Version,
}

pub async fn execute(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Replay {
            log,
            config,
            snapshot,
        } => replay::execute(config, log, snapshot).await,
        Commands::CheckConfig { config } => check_config::execute(config),
        Commands::InitConfig { path, force } => check_config::init(path, force),
        Commands::Version => {
            version::execute();
            Ok(())
        }
    }
}

/// Install the global tracing subscriber from the `[logging]` table.
///
/// `RUST_LOG` takes precedence over the configured level.
pub fn init_logging(logging: &LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
    let filter = match std::env::var("RUST_LOG") {
        Ok(directive) => EnvFilter::try_new(directive),
        Err(_) => EnvFilter::try_new(&logging.level),
    }
    .map_err(|e| format!("Invalid log level '{}': {}", logging.level, e))?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let installed = match &logging.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| format!("Failed to open log file '{}': {}", path.display(), e))?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
        }
        None => builder.with_writer(std::io::stderr).try_init(),
    };

    // Already installed (e.g. by a test harness) is fine
    if let Err(e) = installed {
        tracing::debug!(error = %e, "Tracing subscriber already installed");
    }
    Ok(())
}
