//! Keyword category rule operations

use rusqlite::params;

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::CategoryRule;

fn row_to_rule(row: &rusqlite::Row<'_>) -> rusqlite::Result<CategoryRule> {
    let created_at_str: String = row.get(3)?;
    Ok(CategoryRule {
        id: row.get(0)?,
        pattern: row.get(1)?,
        category_id: row.get(2)?,
        created_at: parse_datetime(&created_at_str),
    })
}

impl Database {
    /// Create a rule. The pattern must compile so a bad regex is caught at
    /// save time rather than on every import.
    pub fn create_rule(&self, pattern: &str, category_id: i64) -> Result<i64> {
        let pattern = pattern.trim();
        if pattern.is_empty() {
            return Err(Error::InvalidData("Rule pattern cannot be empty".into()));
        }
        regex::RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()?;

        if self.get_category(category_id)?.is_none() {
            return Err(Error::NotFound(format!(
                "Category {} not found",
                category_id
            )));
        }

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO category_rules (pattern, category_id) VALUES (?, ?)",
            params![pattern, category_id],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// List rules in creation order (the order they are applied in)
    pub fn list_rules(&self) -> Result<Vec<CategoryRule>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, pattern, category_id, created_at FROM category_rules ORDER BY id",
        )?;
        let rules = stmt
            .query_map([], row_to_rule)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rules)
    }

    /// Delete a rule
    pub fn delete_rule(&self, id: i64) -> Result<()> {
        let conn = self.conn()?;
        let changed = conn.execute("DELETE FROM category_rules WHERE id = ?", params![id])?;
        if changed == 0 {
            return Err(Error::NotFound(format!("Rule {} not found", id)));
        }
        Ok(())
    }
}
