//! Core command implementations and shared utilities
//!
//! This module contains:
//! - `open_db` - Shared utility to open the database
//! - `cmd_init` - Initialize the database
//! - `cmd_profiles` - List saved format profiles

use std::path::Path;

use anyhow::{Context, Result};
use khata_core::db::Database;

/// Open the database, creating it (and running migrations) if needed
pub fn open_db(db_path: &Path) -> Result<Database> {
    let path_str = db_path
        .to_str()
        .context("Database path is not valid UTF-8")?;
    Database::new(path_str).context("Failed to open database")
}

pub fn cmd_init(db_path: &Path) -> Result<()> {
    println!("Initializing database at {}...", db_path.display());

    open_db(db_path)?;

    println!("Database initialized.");
    println!();
    println!("Next steps:");
    println!("  1. Start the web UI: khata serve");
    println!("  2. Save a format profile for your bank, then import a statement");

    Ok(())
}

pub fn cmd_profiles(db_path: &Path) -> Result<()> {
    let db = open_db(db_path)?;
    let profiles = db.list_profiles()?;

    if profiles.is_empty() {
        println!("No format profiles saved yet.");
        return Ok(());
    }

    println!("{:<5} {:<20} {:<30} {:<6}", "ID", "Bank", "Scheme", "Date");
    for p in profiles {
        println!(
            "{:<5} {:<20} {:<30} {:<6}",
            p.id,
            super::truncate(&p.bank_name, 20),
            p.scheme,
            p.date_col,
        );
    }

    Ok(())
}
