//! CLI argument definitions using clap
//!
//! This module contains the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Khata - Import bank statements into a personal ledger
#[derive(Parser)]
#[command(name = "khata")]
#[command(about = "Self-hosted finance tracker with spreadsheet statement import", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path
    #[arg(long, default_value = "khata.db", global = true)]
    pub db: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database
    Init,

    /// List saved format profiles
    Profiles,

    /// Parse a statement file into staged transactions (no commit)
    Parse {
        /// Statement file (.xlsx, .xls, or .csv)
        #[arg(short, long)]
        file: PathBuf,

        /// Saved format profile id to parse with
        #[arg(short, long)]
        profile: i64,

        /// Account whose committed history is checked for duplicates
        #[arg(short, long)]
        account: Option<i64>,

        /// Print staged rows as JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Start the web server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Allowed CORS origin (repeatable)
        #[arg(long)]
        cors: Vec<String>,
    },
}
