//! Command-line interface for the registry server

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use crate::config::Config;
use crate::server;

const DEFAULT_CONFIG_PATH: &str = "config.json";

#[derive(Debug, Parser)]
#[command(name = "registry-server")]
#[command(about = "Package registry ingestion server")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Start the HTTP server
    Start {
        /// Host to bind to (overrides config and REGISTRY_HOST)
        #[arg(long)]
        host: Option<String>,
        /// Port to listen on (overrides config and REGISTRY_PORT)
        #[arg(short, long)]
        port: Option<u16>,
        /// Configuration file; embedded defaults are used when it is missing
        #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,
    },
    /// Print the effective configuration as JSON
    Config {
        #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,
    },
}

/// Execute a parsed command.
pub async fn execute(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Start { host, port, config } => {
            let config = effective_config(&config, host, port)?;
            server::run_server(config).await
        }
        Commands::Config { config } => {
            let config = effective_config(&config, None, None)?;
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

/// File (or embedded defaults), then environment, then command-line flags.
pub fn effective_config(path: &Path, host: Option<String>, port: Option<u16>) -> Result<Config> {
    effective_config_with(path, host, port, |key| std::env::var(key).ok())
}

/// [`effective_config`] with the environment read through `lookup`.
pub fn effective_config_with<F>(
    path: &Path,
    host: Option<String>,
    port: Option<u16>,
    lookup: F,
) -> Result<Config>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = Config::load_or_default(path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
    config.apply_overrides(lookup);

    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    info!(path = %path.display(), "Configuration loaded");
    Ok(config)
}
