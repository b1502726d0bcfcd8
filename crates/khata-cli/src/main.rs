//! Khata CLI - Bank statement import and ledger tool
//!
//! Usage:
//!   khata init                      Initialize database
//!   khata profiles                  List saved format profiles
//!   khata parse --file stmt.xlsx --profile 1   Parse a statement to staging
//!   khata serve --port 3000         Start web server

mod cli;
mod commands;

#[cfg(test)]
mod tests;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    match cli.command {
        Commands::Init => commands::cmd_init(&cli.db),
        Commands::Profiles => commands::cmd_profiles(&cli.db),
        Commands::Parse {
            file,
            profile,
            account,
            json,
        } => commands::cmd_parse(&cli.db, &file, profile, account, json),
        Commands::Serve { port, host, cors } => {
            commands::cmd_serve(&cli.db, &host, port, cors).await
        }
    }
}
