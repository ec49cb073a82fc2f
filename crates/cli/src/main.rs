//! CampusConnect CLI

mod commands;
mod logging;

use anyhow::{Context, Result};
use campus_client::{CampusClient, ClientConfig, FileTokenStore, StateDir};
use clap::{Parser, ValueEnum};
use commands::Commands;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{Level, debug, error};

#[derive(Parser)]
#[command(name = "campus")]
#[command(about = "Command-line client for the CampusConnect API")]
#[command(version)]
struct Cli {
    /// Set logging level
    #[arg(short = 'l', long, global = true, default_value = "warn")]
    log_level: LogLevel,

    /// State directory for config, tokens and logs
    #[arg(short = 'd', long, global = true, env = "CAMPUS_STATE_DIR")]
    data_dir: Option<PathBuf>,

    /// Configuration file (defaults to campus.toml in the state config dir)
    #[arg(short = 'c', long, global = true)]
    config: Option<PathBuf>,

    /// API base URL override
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Timeout for the whole command in seconds (0 = no timeout)
    #[arg(short = 't', long, global = true, default_value = "30")]
    timeout: u64,

    /// Disable file logging (only log to stderr)
    #[arg(long, global = true)]
    no_file_log: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let state_dir = cli
        .data_dir
        .as_ref()
        .map_or_else(StateDir::new, |dir| StateDir::with_override(dir));
    state_dir
        .create_directories()
        .await
        .context("Failed to create state directories")?;
    logging::init_logging(cli.log_level.clone().into(), &state_dir, cli.no_file_log)?;

    let client = build_client(&cli, &state_dir)?;

    let result = if cli.timeout == 0 {
        cli.command.execute(&client).await
    } else {
        let timeout_duration = Duration::from_secs(cli.timeout);
        match tokio::time::timeout(timeout_duration, cli.command.execute(&client)).await {
            Ok(result) => result,
            Err(_) => {
                error!("Command timed out after {} seconds", cli.timeout);
                std::process::exit(1);
            }
        }
    };

    if let Err(e) = result {
        error!("Command failed: {e:#}");
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }

    Ok(())
}

fn load_config(cli: &Cli, state_dir: &StateDir) -> Result<ClientConfig> {
    let mut config = match &cli.config {
        Some(path) => ClientConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None if state_dir.config_path().exists() => {
            ClientConfig::load_from_file(state_dir.config_path())
                .context("Failed to load config from state directory")?
        }
        None => ClientConfig::load().context("Failed to load config")?,
    };

    if let Some(base_url) = &cli.base_url {
        config.base_url.clone_from(base_url);
    }

    Ok(config)
}

fn build_client(cli: &Cli, state_dir: &StateDir) -> Result<CampusClient> {
    let config = load_config(cli, state_dir)?;
    let tokens_path = config
        .storage
        .path
        .clone()
        .unwrap_or_else(|| state_dir.tokens_path());
    debug!(
        base_url = %config.base_url,
        tokens = %tokens_path.display(),
        "Using configuration"
    );

    let store = Arc::new(FileTokenStore::new(tokens_path));
    CampusClient::from_config(&config, store).context("Failed to build API client")
}

#[derive(Clone, Debug, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for Level {
    fn from(log_level: LogLevel) -> Self {
        match log_level {
            LogLevel::Error => Self::ERROR,
            LogLevel::Warn => Self::WARN,
            LogLevel::Info => Self::INFO,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Trace => Self::TRACE,
        }
    }
}
