//! Row normalizer: raw rows in, staged transaction candidates out

use std::collections::HashSet;

use tracing::debug;

use crate::models::{NewFormatProfile, RawRow, StagedTransaction};
use crate::resolve::resolve_amount;
use crate::rules::RuleSet;
use crate::sheet::cell_date;

/// Normalize parsed rows into staged transaction candidates.
///
/// A row whose date cell does not parse is dropped entirely: statements end
/// with "Total"/"Closing Balance" footer lines that look like data rows but
/// are not. A row the amount resolver could not classify is kept with its
/// review flag attached, so the reviewer sees and fixes it instead of
/// silently losing it.
///
/// `rules` prefill the category hint from the description; `committed_ids`
/// holds bank transaction ids already present in the target ledger, used to
/// mark duplicates (a warning, never a rejection).
pub fn normalize_rows(
    rows: &[RawRow],
    profile: &NewFormatProfile,
    rules: &RuleSet,
    committed_ids: &HashSet<String>,
) -> Vec<StagedTransaction> {
    let mut seen_ids: HashSet<String> = HashSet::new();
    let mut staged = Vec::new();
    let mut dropped = 0usize;

    for row in rows {
        let Some(date) = cell_date(row.cell(profile.date_col)) else {
            dropped += 1;
            continue;
        };

        let description = row.cell(profile.desc_col).as_text();

        let transaction_id = profile
            .trans_id_col
            .map(|col| row.cell(col).as_text())
            .filter(|s| !s.is_empty());

        let duplicate = match &transaction_id {
            Some(id) => !seen_ids.insert(id.clone()) || committed_ids.contains(id),
            None => false,
        };

        let resolved = resolve_amount(row, profile);

        let category_id = if resolved.flag.is_none() {
            rules.categorize(&description)
        } else {
            None
        };

        staged.push(StagedTransaction {
            row: row.index,
            date,
            description,
            amount: resolved.amount,
            direction: resolved.direction,
            transaction_id,
            category_id,
            note: None,
            review_flag: resolved.flag,
            duplicate,
        });
    }

    debug!(
        "Normalized {} candidates ({} non-data rows dropped)",
        staged.len(),
        dropped
    );
    staged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AmountScheme, Cell, ColumnRef, Direction, ReviewFlag};

    fn profile() -> NewFormatProfile {
        NewFormatProfile {
            bank_name: "HDFC".into(),
            date_col: ColumnRef(0),
            desc_col: ColumnRef(1),
            scheme: AmountScheme::SeparateDebitCredit,
            debit_col: Some(ColumnRef(2)),
            credit_col: Some(ColumnRef(3)),
            amount_col: None,
            indicator_col: None,
            debit_tokens: vec![],
            credit_tokens: vec![],
            trans_id_col: Some(ColumnRef(4)),
        }
    }

    fn row(index: usize, cells: &[&str]) -> RawRow {
        RawRow {
            index,
            cells: cells
                .iter()
                .map(|s| {
                    if s.is_empty() {
                        Cell::Empty
                    } else {
                        Cell::Text(s.to_string())
                    }
                })
                .collect(),
        }
    }

    #[test]
    fn test_footer_rows_dropped_flagged_rows_kept() {
        let rows = vec![
            row(3, &["15/01/2024", "ATM WDL", "500.00", "", "T1"]),
            row(4, &["16/01/2024", "??", "", "", "T2"]),
            row(5, &["Total", "", "500.00", "", ""]),
        ];
        let staged = normalize_rows(&rows, &profile(), &RuleSet::empty(), &HashSet::new());

        assert_eq!(staged.len(), 2);
        assert_eq!(staged[0].direction, Some(Direction::Expense));
        assert_eq!(staged[0].amount, 500.0);
        assert_eq!(staged[0].transaction_id.as_deref(), Some("T1"));
        assert_eq!(staged[1].review_flag, Some(ReviewFlag::AmbiguousDirection));
    }

    #[test]
    fn test_drop_is_idempotent() {
        let rows = vec![
            row(3, &["15/01/2024", "OK", "100.00", "", ""]),
            row(4, &["Closing Balance", "", "", "9000.00", ""]),
        ];
        let first = normalize_rows(&rows, &profile(), &RuleSet::empty(), &HashSet::new());
        let second = normalize_rows(&rows, &profile(), &RuleSet::empty(), &HashSet::new());
        assert_eq!(first.len(), second.len());
        assert_eq!(first[0].row, second[0].row);
    }

    #[test]
    fn test_duplicate_within_batch_marked_on_later_row() {
        let rows = vec![
            row(3, &["15/01/2024", "A", "100.00", "", "TXN9"]),
            row(4, &["16/01/2024", "B", "200.00", "", "TXN9"]),
        ];
        let staged = normalize_rows(&rows, &profile(), &RuleSet::empty(), &HashSet::new());
        assert!(!staged[0].duplicate);
        assert!(staged[1].duplicate);
    }

    #[test]
    fn test_duplicate_against_committed_ledger() {
        let rows = vec![row(3, &["15/01/2024", "A", "100.00", "", "TXN9"])];
        let committed: HashSet<String> = ["TXN9".to_string()].into_iter().collect();
        let staged = normalize_rows(&rows, &profile(), &RuleSet::empty(), &committed);
        assert!(staged[0].duplicate);
        // A duplicate is a warning, not a flag
        assert_eq!(staged[0].review_flag, None);
    }

    #[test]
    fn test_category_hint_from_rules() {
        use crate::models::CategoryRule;
        let rules = RuleSet::compile(&[CategoryRule {
            id: 1,
            pattern: "atm".into(),
            category_id: 42,
            created_at: chrono::Utc::now(),
        }]);
        let rows = vec![row(3, &["15/01/2024", "ATM WDL", "500.00", "", ""])];
        let staged = normalize_rows(&rows, &profile(), &rules, &HashSet::new());
        assert_eq!(staged[0].category_id, Some(42));
    }
}
