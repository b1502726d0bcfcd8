//! Khata Core Library
//!
//! Shared functionality for the Khata finance tracker:
//! - Database access and migrations (accounts, categories, profiles, ledger)
//! - Statement import: spreadsheet reader, amount resolver, row normalizer
//! - Staging batch review surface
//! - Bulk committer with bounded-concurrency ledger fan-out
//! - Deterministic keyword category rules

pub mod commit;
pub mod db;
pub mod error;
pub mod models;
pub mod normalize;
pub mod resolve;
pub mod rules;
pub mod sheet;
pub mod staging;

use std::collections::HashSet;

pub use commit::{
    commit_batch, CommitReport, LedgerSink, RowOutcome, RowResult, DEFAULT_COMMIT_CONCURRENCY,
};
pub use db::Database;
pub use error::{Error, Result};
pub use models::{
    Account, AmountScheme, Category, CategoryRule, Cell, ColumnRef, Direction, ExpenseRecord,
    FormatProfile, IncomeRecord, LedgerEntry, NewFormatProfile, RawRow, ReviewFlag,
    StagedTransaction,
};
pub use normalize::normalize_rows;
pub use resolve::{resolve_amount, Resolved};
pub use rules::RuleSet;
pub use sheet::read_rows;
pub use staging::{FieldEdit, StagingBatch};

/// Run the whole parse pipeline over uploaded statement bytes: read rows,
/// resolve amounts, normalize into staged candidates.
///
/// Structural failures (unreadable container) abort before anything is
/// staged; per-row ambiguity comes back as review flags on the candidates.
pub fn parse_statement(
    bytes: &[u8],
    profile: &NewFormatProfile,
    rules: &RuleSet,
    committed_ids: &HashSet<String>,
) -> Result<Vec<StagedTransaction>> {
    profile.validate()?;
    let rows = read_rows(bytes, profile)?;
    Ok(normalize_rows(&rows, profile, rules, committed_ids))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Three debit/credit rows, one clean and
    /// two ambiguous
    #[test]
    fn test_parse_statement_end_to_end() {
        let csv = "Date,Narration,Debit,Credit\n\
                   15/01/2024,POS PURCHASE,500.00,0\n\
                   16/01/2024,MYSTERY ROW,0,0\n\
                   17/01/2024,DOUBLE ENTRY,200.00,300.00\n";

        let profile = NewFormatProfile {
            bank_name: "Test".into(),
            date_col: ColumnRef(0),
            desc_col: ColumnRef(1),
            scheme: AmountScheme::SeparateDebitCredit,
            debit_col: Some(ColumnRef(2)),
            credit_col: Some(ColumnRef(3)),
            amount_col: None,
            indicator_col: None,
            debit_tokens: vec![],
            credit_tokens: vec![],
            trans_id_col: None,
        };

        let staged =
            parse_statement(csv.as_bytes(), &profile, &RuleSet::empty(), &HashSet::new())
                .unwrap();

        assert_eq!(staged.len(), 3);
        assert_eq!(staged[0].direction, Some(Direction::Expense));
        assert_eq!(staged[0].amount, 500.0);
        assert_eq!(staged[0].review_flag, None);
        assert_eq!(staged[1].review_flag, Some(ReviewFlag::AmbiguousDirection));
        assert_eq!(staged[2].review_flag, Some(ReviewFlag::AmbiguousDirection));
    }

    #[test]
    fn test_parse_statement_validates_profile_first() {
        let profile = NewFormatProfile {
            bank_name: "Test".into(),
            date_col: ColumnRef(0),
            desc_col: ColumnRef(1),
            scheme: AmountScheme::SeparateDebitCredit,
            debit_col: None,
            credit_col: None,
            amount_col: None,
            indicator_col: None,
            debit_tokens: vec![],
            credit_tokens: vec![],
            trans_id_col: None,
        };
        assert!(matches!(
            parse_statement(b"Date\n", &profile, &RuleSet::empty(), &HashSet::new()),
            Err(Error::InvalidFormatProfile(_))
        ));
    }
}
