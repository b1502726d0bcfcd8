//! Statement parse command

use std::collections::HashSet;
use std::path::Path;

use anyhow::{bail, Context, Result};
use khata_core::rules::RuleSet;

use super::{open_db, truncate};

pub fn cmd_parse(
    db_path: &Path,
    file: &Path,
    profile_id: i64,
    account_id: Option<i64>,
    json: bool,
) -> Result<()> {
    let db = open_db(db_path)?;

    let profile = match db.get_profile(profile_id)? {
        Some(p) => p.mapping(),
        None => bail!("Format profile {} not found", profile_id),
    };

    let committed_ids = match account_id {
        Some(id) => db.committed_transaction_ids(id)?,
        None => HashSet::new(),
    };

    let rules = RuleSet::compile(&db.list_rules()?);

    let bytes =
        std::fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;
    let rows = khata_core::parse_statement(&bytes, &profile, &rules, &committed_ids)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    let flagged = rows.iter().filter(|r| r.review_flag.is_some()).count();
    println!(
        "Parsed {} rows from {} ({} need review)",
        rows.len(),
        file.display(),
        flagged
    );
    println!();
    println!(
        "{:<5} {:<12} {:<40} {:>12} {:<8} {}",
        "Row", "Date", "Description", "Amount", "Side", "Flags"
    );
    for row in &rows {
        let direction = row
            .direction
            .map(|d| d.to_string())
            .unwrap_or_else(|| "?".into());
        let mut flags = Vec::new();
        if let Some(flag) = &row.review_flag {
            flags.push(format!("{:?}", flag));
        }
        if row.duplicate {
            flags.push("duplicate".into());
        }
        println!(
            "{:<5} {:<12} {:<40} {:>12.2} {:<8} {}",
            row.row,
            row.date,
            truncate(&row.description, 40),
            row.amount,
            direction,
            flags.join(", "),
        );
    }

    Ok(())
}
