//! Format profile store
//!
//! Persists named bank statement format definitions. The scheme-required-
//! fields invariant is enforced here, at save time, so an invalid profile
//! never reaches parsing.

use rusqlite::params;

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{AmountScheme, ColumnRef, FormatProfile, NewFormatProfile};

fn join_tokens(tokens: &[String]) -> String {
    tokens
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(",")
}

fn split_tokens(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

fn opt_col(s: Option<String>) -> Option<ColumnRef> {
    s.and_then(|s| s.parse().ok())
}

fn row_to_profile(row: &rusqlite::Row<'_>) -> rusqlite::Result<FormatProfile> {
    let date_col: String = row.get(2)?;
    let desc_col: String = row.get(3)?;
    let scheme_str: String = row.get(4)?;
    let debit_tokens: String = row.get(9)?;
    let credit_tokens: String = row.get(10)?;
    let created_at_str: String = row.get(12)?;

    Ok(FormatProfile {
        id: row.get(0)?,
        bank_name: row.get(1)?,
        date_col: date_col.parse().unwrap_or(ColumnRef(0)),
        desc_col: desc_col.parse().unwrap_or(ColumnRef(1)),
        scheme: scheme_str
            .parse()
            .unwrap_or(AmountScheme::SeparateDebitCredit),
        debit_col: opt_col(row.get(5)?),
        credit_col: opt_col(row.get(6)?),
        amount_col: opt_col(row.get(7)?),
        indicator_col: opt_col(row.get(8)?),
        debit_tokens: split_tokens(&debit_tokens),
        credit_tokens: split_tokens(&credit_tokens),
        trans_id_col: opt_col(row.get(11)?),
        created_at: parse_datetime(&created_at_str),
    })
}

const PROFILE_COLUMNS: &str = "id, bank_name, date_col, desc_col, scheme, debit_col, \
     credit_col, amount_col, indicator_col, debit_tokens, credit_tokens, trans_id_col, created_at";

impl Database {
    /// Create a profile. Rejects with `InvalidFormatProfile` if fields the
    /// selected scheme requires are missing.
    pub fn create_profile(&self, profile: &NewFormatProfile) -> Result<FormatProfile> {
        profile.validate()?;

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO format_profiles \
             (bank_name, date_col, desc_col, scheme, debit_col, credit_col, \
              amount_col, indicator_col, debit_tokens, credit_tokens, trans_id_col) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                profile.bank_name.trim(),
                profile.date_col.to_string(),
                profile.desc_col.to_string(),
                profile.scheme.as_str(),
                profile.debit_col.map(|c| c.to_string()),
                profile.credit_col.map(|c| c.to_string()),
                profile.amount_col.map(|c| c.to_string()),
                profile.indicator_col.map(|c| c.to_string()),
                join_tokens(&profile.debit_tokens),
                join_tokens(&profile.credit_tokens),
                profile.trans_id_col.map(|c| c.to_string()),
            ],
        )?;
        let id = conn.last_insert_rowid();
        drop(conn);

        self.get_profile(id)?
            .ok_or_else(|| Error::NotFound(format!("Profile {} not found after create", id)))
    }

    /// List all profiles, newest first
    pub fn list_profiles(&self) -> Result<Vec<FormatProfile>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM format_profiles ORDER BY id DESC",
            PROFILE_COLUMNS
        ))?;
        let profiles = stmt
            .query_map([], row_to_profile)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(profiles)
    }

    /// Get a profile by ID
    pub fn get_profile(&self, id: i64) -> Result<Option<FormatProfile>> {
        let conn = self.conn()?;
        let profile = conn
            .query_row(
                &format!("SELECT {} FROM format_profiles WHERE id = ?", PROFILE_COLUMNS),
                params![id],
                row_to_profile,
            )
            .ok();
        Ok(profile)
    }

    /// Replace a profile's definition. Same validation as create.
    pub fn update_profile(&self, id: i64, profile: &NewFormatProfile) -> Result<FormatProfile> {
        profile.validate()?;

        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE format_profiles SET \
             bank_name = ?, date_col = ?, desc_col = ?, scheme = ?, debit_col = ?, \
             credit_col = ?, amount_col = ?, indicator_col = ?, debit_tokens = ?, \
             credit_tokens = ?, trans_id_col = ? \
             WHERE id = ?",
            params![
                profile.bank_name.trim(),
                profile.date_col.to_string(),
                profile.desc_col.to_string(),
                profile.scheme.as_str(),
                profile.debit_col.map(|c| c.to_string()),
                profile.credit_col.map(|c| c.to_string()),
                profile.amount_col.map(|c| c.to_string()),
                profile.indicator_col.map(|c| c.to_string()),
                join_tokens(&profile.debit_tokens),
                join_tokens(&profile.credit_tokens),
                profile.trans_id_col.map(|c| c.to_string()),
                id,
            ],
        )?;
        if changed == 0 {
            return Err(Error::NotFound(format!("Profile {} not found", id)));
        }
        drop(conn);

        self.get_profile(id)?
            .ok_or_else(|| Error::NotFound(format!("Profile {} not found", id)))
    }

    /// Delete a profile
    pub fn delete_profile(&self, id: i64) -> Result<()> {
        let conn = self.conn()?;
        let changed = conn.execute("DELETE FROM format_profiles WHERE id = ?", params![id])?;
        if changed == 0 {
            return Err(Error::NotFound(format!("Profile {} not found", id)));
        }
        Ok(())
    }
}
