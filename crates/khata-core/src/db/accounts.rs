//! Account operations

use rusqlite::params;

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::Account;

impl Database {
    /// Create an account, returning its id
    pub fn create_account(&self, name: &str) -> Result<i64> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::InvalidData("Account name cannot be empty".into()));
        }
        let conn = self.conn()?;
        conn.execute("INSERT INTO accounts (name) VALUES (?)", params![name])?;
        Ok(conn.last_insert_rowid())
    }

    /// List all accounts
    pub fn list_accounts(&self) -> Result<Vec<Account>> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT id, name, created_at FROM accounts ORDER BY name")?;

        let accounts = stmt
            .query_map([], |row| {
                let created_at_str: String = row.get(2)?;
                Ok(Account {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    created_at: parse_datetime(&created_at_str),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(accounts)
    }

    /// Get an account by ID
    pub fn get_account(&self, id: i64) -> Result<Option<Account>> {
        let conn = self.conn()?;
        let account = conn
            .query_row(
                "SELECT id, name, created_at FROM accounts WHERE id = ?",
                params![id],
                |row| {
                    let created_at_str: String = row.get(2)?;
                    Ok(Account {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        created_at: parse_datetime(&created_at_str),
                    })
                },
            )
            .ok();
        Ok(account)
    }

    /// Rename an account
    pub fn update_account(&self, id: i64, name: &str) -> Result<()> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE accounts SET name = ? WHERE id = ?",
            params![name.trim(), id],
        )?;
        if changed == 0 {
            return Err(Error::NotFound(format!("Account {} not found", id)));
        }
        Ok(())
    }

    /// Delete an account
    pub fn delete_account(&self, id: i64) -> Result<()> {
        let conn = self.conn()?;
        let changed = conn.execute("DELETE FROM accounts WHERE id = ?", params![id])?;
        if changed == 0 {
            return Err(Error::NotFound(format!("Account {} not found", id)));
        }
        Ok(())
    }
}
