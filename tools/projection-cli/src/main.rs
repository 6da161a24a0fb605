//! # Projection CLI Binary
//!
//! Command-line interface for projections and playoff odds.

mod cli;
mod league;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, CliHandler};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging; RUST_LOG overrides the default level
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Parse CLI arguments
    let cli = Cli::parse();

    // Create CLI handler
    let handler = CliHandler::new(cli.config.as_ref())?;

    // Handle command
    handler.handle_command(cli.command).await?;

    Ok(())
}
