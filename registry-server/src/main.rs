//! `registry-server` binary

use anyhow::Result;
use clap::Parser;
use registry_server::cli::{self, Cli};

#[tokio::main]
async fn main() -> Result<()> {
    // Keep the guard alive so buffered file logs are flushed on exit
    let _log_guard = registry_logging::init_subscriber();

    let cli = Cli::parse();
    cli::execute(cli).await
}
