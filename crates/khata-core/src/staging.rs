//! Staging batch: the reviewable, editable, not-yet-persisted set of
//! transactions produced from one upload
//!
//! The batch is single-writer (the reviewing user) and lives only between
//! parse and commit; it is never persisted. Rows are addressed by their
//! physical sheet row index, which stays stable across edits and removals.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::{Direction, StagedTransaction};

/// One manual override of a staged row's fields
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum FieldEdit {
    Date(NaiveDate),
    Description(String),
    Amount(f64),
    Direction(Direction),
    Note(Option<String>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StagingBatch {
    /// Single target account for the whole batch
    pub account_id: i64,
    /// Original sheet order; relevant for review, irrelevant for persistence
    pub rows: Vec<StagedTransaction>,
}

impl StagingBatch {
    pub fn new(account_id: i64, rows: Vec<StagedTransaction>) -> Self {
        Self { account_id, rows }
    }

    /// Assign the category (income source or expense category) for one row
    pub fn set_category(&mut self, row: usize, category_id: i64) -> Result<()> {
        self.row_mut(row)?.category_id = Some(category_id);
        Ok(())
    }

    /// Manually override one field of a staged row.
    ///
    /// This is the only mutation path before commit. Once the edit leaves the
    /// row with a positive amount and a definite direction, any outstanding
    /// review flag is cleared.
    pub fn edit_field(&mut self, row: usize, edit: FieldEdit) -> Result<()> {
        let tx = self.row_mut(row)?;
        match edit {
            FieldEdit::Date(date) => tx.date = date,
            FieldEdit::Description(desc) => tx.description = desc,
            FieldEdit::Amount(amount) => {
                if amount <= 0.0 {
                    return Err(Error::InvalidData(format!(
                        "Amount must be positive, got {}",
                        amount
                    )));
                }
                tx.amount = amount;
            }
            FieldEdit::Direction(direction) => tx.direction = Some(direction),
            FieldEdit::Note(note) => tx.note = note.filter(|n| !n.trim().is_empty()),
        }

        if tx.amount > 0.0 && tx.direction.is_some() {
            tx.review_flag = None;
        }
        Ok(())
    }

    /// Drop one row from the batch entirely
    pub fn remove_row(&mut self, row: usize) -> Result<()> {
        let pos = self
            .rows
            .iter()
            .position(|tx| tx.row == row)
            .ok_or_else(|| Error::NotFound(format!("No staged row {}", row)))?;
        self.rows.remove(pos);
        Ok(())
    }

    /// True iff no row carries a review flag and every row has a category.
    /// Duplicate warnings do not block commit.
    pub fn is_ready_to_commit(&self) -> bool {
        self.rows
            .iter()
            .all(|tx| tx.review_flag.is_none() && tx.category_id.is_some())
    }

    /// Rows still blocking commit, for surfacing to the reviewer
    pub fn pending_rows(&self) -> Vec<usize> {
        self.rows
            .iter()
            .filter(|tx| tx.review_flag.is_some() || tx.category_id.is_none())
            .map(|tx| tx.row)
            .collect()
    }

    fn row_mut(&mut self, row: usize) -> Result<&mut StagedTransaction> {
        self.rows
            .iter_mut()
            .find(|tx| tx.row == row)
            .ok_or_else(|| Error::NotFound(format!("No staged row {}", row)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ReviewFlag;

    fn staged(row: usize, flag: Option<ReviewFlag>) -> StagedTransaction {
        StagedTransaction {
            row,
            date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            description: "ATM WDL".into(),
            amount: if flag == Some(ReviewFlag::MissingAmount) {
                0.0
            } else {
                100.0
            },
            direction: if flag.is_some() {
                None
            } else {
                Some(Direction::Expense)
            },
            transaction_id: None,
            category_id: None,
            note: None,
            review_flag: flag,
            duplicate: false,
        }
    }

    #[test]
    fn test_ready_requires_categories_and_no_flags() {
        let mut batch = StagingBatch::new(1, vec![staged(3, None), staged(4, None)]);
        assert!(!batch.is_ready_to_commit());

        batch.set_category(3, 10).unwrap();
        assert!(!batch.is_ready_to_commit());

        batch.set_category(4, 11).unwrap();
        assert!(batch.is_ready_to_commit());
    }

    #[test]
    fn test_flagged_row_blocks_until_resolved() {
        let mut batch = StagingBatch::new(
            1,
            vec![staged(3, Some(ReviewFlag::AmbiguousDirection))],
        );
        batch.set_category(3, 10).unwrap();
        assert!(!batch.is_ready_to_commit());
        assert_eq!(batch.pending_rows(), vec![3]);

        // Amount already positive; supplying a direction resolves the flag
        batch.edit_field(3, FieldEdit::Direction(Direction::Income)).unwrap();
        assert!(batch.is_ready_to_commit());
        assert_eq!(batch.rows[0].review_flag, None);
    }

    #[test]
    fn test_missing_amount_needs_both_amount_and_direction() {
        let mut batch = StagingBatch::new(1, vec![staged(3, Some(ReviewFlag::MissingAmount))]);
        batch.set_category(3, 10).unwrap();

        batch.edit_field(3, FieldEdit::Amount(250.0)).unwrap();
        // Still no direction, flag stays
        assert_eq!(batch.rows[0].review_flag, Some(ReviewFlag::MissingAmount));
        assert!(!batch.is_ready_to_commit());

        batch.edit_field(3, FieldEdit::Direction(Direction::Expense)).unwrap();
        assert!(batch.is_ready_to_commit());
    }

    #[test]
    fn test_edit_rejects_nonpositive_amount() {
        let mut batch = StagingBatch::new(1, vec![staged(3, None)]);
        assert!(batch.edit_field(3, FieldEdit::Amount(0.0)).is_err());
        assert!(batch.edit_field(3, FieldEdit::Amount(-5.0)).is_err());
    }

    #[test]
    fn test_remove_row_by_sheet_index() {
        let mut batch = StagingBatch::new(1, vec![staged(3, None), staged(7, None)]);
        batch.remove_row(3).unwrap();
        assert_eq!(batch.rows.len(), 1);
        assert_eq!(batch.rows[0].row, 7);
        assert!(batch.remove_row(3).is_err());
    }

    #[test]
    fn test_note_edit_does_not_touch_flag_state() {
        let mut batch = StagingBatch::new(
            1,
            vec![staged(3, Some(ReviewFlag::AmbiguousDirection))],
        );
        batch
            .edit_field(3, FieldEdit::Note(Some("check with bank".into())))
            .unwrap();
        assert_eq!(
            batch.rows[0].review_flag,
            Some(ReviewFlag::AmbiguousDirection)
        );
        assert_eq!(batch.rows[0].note.as_deref(), Some("check with bank"));
    }
}
