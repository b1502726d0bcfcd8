//! Income source / expense category operations

use rusqlite::params;

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{Category, Direction};

fn row_to_category(row: &rusqlite::Row<'_>) -> rusqlite::Result<Category> {
    let kind_str: String = row.get(2)?;
    let created_at_str: String = row.get(3)?;
    Ok(Category {
        id: row.get(0)?,
        name: row.get(1)?,
        kind: kind_str.parse().unwrap_or(Direction::Expense),
        created_at: parse_datetime(&created_at_str),
    })
}

impl Database {
    /// Create an income source or expense category
    pub fn create_category(&self, name: &str, kind: Direction) -> Result<i64> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::InvalidData("Category name cannot be empty".into()));
        }
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO categories (name, kind) VALUES (?, ?)",
            params![name, kind.as_str()],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// List categories, optionally restricted to one kind
    pub fn list_categories(&self, kind: Option<Direction>) -> Result<Vec<Category>> {
        let conn = self.conn()?;
        let categories = match kind {
            Some(kind) => {
                let mut stmt = conn.prepare(
                    "SELECT id, name, kind, created_at FROM categories WHERE kind = ? ORDER BY name",
                )?;
                let rows = stmt
                    .query_map(params![kind.as_str()], row_to_category)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                rows
            }
            None => {
                let mut stmt = conn.prepare(
                    "SELECT id, name, kind, created_at FROM categories ORDER BY kind, name",
                )?;
                let rows = stmt
                    .query_map([], row_to_category)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                rows
            }
        };
        Ok(categories)
    }

    /// Get a category by ID
    pub fn get_category(&self, id: i64) -> Result<Option<Category>> {
        let conn = self.conn()?;
        let category = conn
            .query_row(
                "SELECT id, name, kind, created_at FROM categories WHERE id = ?",
                params![id],
                row_to_category,
            )
            .ok();
        Ok(category)
    }

    /// Delete a category (rules referencing it cascade)
    pub fn delete_category(&self, id: i64) -> Result<()> {
        let conn = self.conn()?;
        let changed = conn.execute("DELETE FROM categories WHERE id = ?", params![id])?;
        if changed == 0 {
            return Err(Error::NotFound(format!("Category {} not found", id)));
        }
        Ok(())
    }
}
