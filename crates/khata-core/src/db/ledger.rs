//! Ledger operations: committed income and expense records
//!
//! This is the collaborator side of the bulk committer: one create call per
//! staged row. `Database` implements `LedgerSink` so the committer can fan
//! out against sqlite directly; a remote ledger would implement the same
//! trait.

use std::collections::HashSet;

use async_trait::async_trait;
use rusqlite::params;

use super::{parse_datetime, parse_stored_date, Database};
use crate::commit::LedgerSink;
use crate::error::{Error, Result};
use crate::models::{Direction, ExpenseRecord, IncomeRecord, LedgerEntry};

fn row_to_income(row: &rusqlite::Row<'_>) -> rusqlite::Result<IncomeRecord> {
    let date_str: String = row.get(3)?;
    let created_at_str: String = row.get(7)?;
    Ok(IncomeRecord {
        id: row.get(0)?,
        account_id: row.get(1)?,
        source_id: row.get(2)?,
        date: parse_stored_date(&date_str),
        amount: row.get(4)?,
        description: row.get(5)?,
        transaction_id: row.get(6)?,
        created_at: parse_datetime(&created_at_str),
    })
}

fn row_to_expense(row: &rusqlite::Row<'_>) -> rusqlite::Result<ExpenseRecord> {
    let date_str: String = row.get(3)?;
    let created_at_str: String = row.get(7)?;
    Ok(ExpenseRecord {
        id: row.get(0)?,
        account_id: row.get(1)?,
        category_id: row.get(2)?,
        date: parse_stored_date(&date_str),
        amount: row.get(4)?,
        description: row.get(5)?,
        transaction_id: row.get(6)?,
        created_at: parse_datetime(&created_at_str),
    })
}

impl Database {
    fn check_entry(&self, entry: &LedgerEntry, expected_kind: Direction) -> Result<()> {
        if entry.amount <= 0.0 {
            return Err(Error::InvalidData(format!(
                "Ledger amount must be positive, got {}",
                entry.amount
            )));
        }
        if self.get_account(entry.account_id)?.is_none() {
            return Err(Error::NotFound(format!(
                "Account {} not found",
                entry.account_id
            )));
        }
        let category = self
            .get_category(entry.category_id)?
            .ok_or_else(|| Error::NotFound(format!("Category {} not found", entry.category_id)))?;
        if category.kind != expected_kind {
            return Err(Error::InvalidData(format!(
                "Category '{}' is {}-side, not {}-side",
                category.name, category.kind, expected_kind
            )));
        }
        Ok(())
    }

    /// Insert one income record, returning its id
    pub fn insert_income(&self, entry: &LedgerEntry) -> Result<i64> {
        self.check_entry(entry, Direction::Income)?;
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO incomes (account_id, source_id, date, amount, description, transaction_id) \
             VALUES (?, ?, ?, ?, ?, ?)",
            params![
                entry.account_id,
                entry.category_id,
                entry.date.to_string(),
                entry.amount,
                entry.description,
                entry.transaction_id,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Insert one expense record, returning its id
    pub fn insert_expense(&self, entry: &LedgerEntry) -> Result<i64> {
        self.check_entry(entry, Direction::Expense)?;
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO expenses (account_id, category_id, date, amount, description, transaction_id) \
             VALUES (?, ?, ?, ?, ?, ?)",
            params![
                entry.account_id,
                entry.category_id,
                entry.date.to_string(),
                entry.amount,
                entry.description,
                entry.transaction_id,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// List income records, optionally for one account, newest date first
    pub fn list_incomes(&self, account_id: Option<i64>) -> Result<Vec<IncomeRecord>> {
        let conn = self.conn()?;
        let sql = "SELECT id, account_id, source_id, date, amount, description, \
                   transaction_id, created_at FROM incomes";
        let records = match account_id {
            Some(id) => {
                let mut stmt =
                    conn.prepare(&format!("{} WHERE account_id = ? ORDER BY date DESC", sql))?;
                let rows = stmt
                    .query_map(params![id], row_to_income)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                rows
            }
            None => {
                let mut stmt = conn.prepare(&format!("{} ORDER BY date DESC", sql))?;
                let rows = stmt
                    .query_map([], row_to_income)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                rows
            }
        };
        Ok(records)
    }

    /// List expense records, optionally for one account, newest date first
    pub fn list_expenses(&self, account_id: Option<i64>) -> Result<Vec<ExpenseRecord>> {
        let conn = self.conn()?;
        let sql = "SELECT id, account_id, category_id, date, amount, description, \
                   transaction_id, created_at FROM expenses";
        let records = match account_id {
            Some(id) => {
                let mut stmt =
                    conn.prepare(&format!("{} WHERE account_id = ? ORDER BY date DESC", sql))?;
                let rows = stmt
                    .query_map(params![id], row_to_expense)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                rows
            }
            None => {
                let mut stmt = conn.prepare(&format!("{} ORDER BY date DESC", sql))?;
                let rows = stmt
                    .query_map([], row_to_expense)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                rows
            }
        };
        Ok(records)
    }

    /// Bank transaction ids already committed for an account, across both
    /// ledger sides. Used to mark duplicates at parse time.
    pub fn committed_transaction_ids(&self, account_id: i64) -> Result<HashSet<String>> {
        let conn = self.conn()?;
        let mut ids = HashSet::new();
        for table in ["incomes", "expenses"] {
            let mut stmt = conn.prepare(&format!(
                "SELECT transaction_id FROM {} WHERE account_id = ? AND transaction_id IS NOT NULL",
                table
            ))?;
            let rows = stmt.query_map(params![account_id], |row| row.get::<_, String>(0))?;
            for id in rows {
                ids.insert(id?);
            }
        }
        Ok(ids)
    }
}

#[async_trait]
impl LedgerSink for Database {
    async fn create_income(&self, entry: LedgerEntry) -> Result<i64> {
        self.insert_income(&entry)
    }

    async fn create_expense(&self, entry: LedgerEntry) -> Result<i64> {
        self.insert_expense(&entry)
    }
}
