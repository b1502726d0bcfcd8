//! Bulk committer: persists a reviewed staging batch into the ledger
//!
//! Each staged row becomes one create request against the income or expense
//! endpoint, dispatched concurrently with a bounded in-flight limit. The
//! batch is not transactional: a row that fails does not roll back its
//! siblings, and the caller re-submits only the failed rows. Outcomes are
//! keyed by row identity, never by completion order, and every dispatched
//! row is accounted for even if its task is torn down mid-flight.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::models::{Direction, LedgerEntry, StagedTransaction};
use crate::staging::StagingBatch;

/// Default bound on in-flight ledger requests
pub const DEFAULT_COMMIT_CONCURRENCY: usize = 8;

/// Free-text notes are folded into the description, capped at this length
const MAX_DESCRIPTION_LEN: usize = 1000;

/// The ledger collaborator: whatever actually stores income/expense records
#[async_trait]
pub trait LedgerSink: Send + Sync {
    async fn create_income(&self, entry: LedgerEntry) -> Result<i64>;
    async fn create_expense(&self, entry: LedgerEntry) -> Result<i64>;
}

/// Per-row commit result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RowResult {
    Committed { record_id: i64 },
    Failed { reason: String },
}

/// Outcome of one staged row, keyed by its sheet row index
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RowOutcome {
    pub row: usize,
    #[serde(flatten)]
    pub result: RowResult,
}

/// Aggregate result of committing one batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitReport {
    pub committed: usize,
    pub failed: usize,
    /// One entry per staged row, ordered by row index
    pub outcomes: Vec<RowOutcome>,
}

impl CommitReport {
    /// Row indices to re-offer for retry
    pub fn failed_rows(&self) -> Vec<usize> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.result, RowResult::Failed { .. }))
            .map(|o| o.row)
            .collect()
    }
}

/// Commit every row of a ready batch through `sink`.
///
/// Refuses batches that still have flagged or uncategorized rows. In-flight
/// requests run to completion; a task that is nevertheless lost is reported
/// as failed for its row rather than silently dropped.
pub async fn commit_batch(
    sink: Arc<dyn LedgerSink>,
    batch: StagingBatch,
    concurrency: usize,
) -> Result<CommitReport> {
    if !batch.is_ready_to_commit() {
        return Err(Error::InvalidData(format!(
            "Batch is not ready to commit: rows {:?} still need review",
            batch.pending_rows()
        )));
    }

    let expected: Vec<usize> = batch.rows.iter().map(|tx| tx.row).collect();

    // The fan-out runs detached from the caller: dropping this future (a
    // disconnected HTTP request) must not abort ledger writes in flight.
    let handle = tokio::spawn(fan_out(sink, batch, concurrency));
    match handle.await {
        Ok(report) => Ok(report),
        Err(e) => {
            warn!(error = %e, "Commit task did not complete");
            let total = expected.len();
            let mut outcomes: Vec<RowOutcome> = expected
                .into_iter()
                .map(|row| RowOutcome {
                    row,
                    result: RowResult::Failed {
                        reason: "commit task did not complete".into(),
                    },
                })
                .collect();
            outcomes.sort_by_key(|o| o.row);
            Ok(CommitReport {
                committed: 0,
                failed: total,
                outcomes,
            })
        }
    }
}

/// The bounded fan-out itself; once spawned it runs to completion
async fn fan_out(
    sink: Arc<dyn LedgerSink>,
    batch: StagingBatch,
    concurrency: usize,
) -> CommitReport {
    let account_id = batch.account_id;
    let expected: Vec<usize> = batch.rows.iter().map(|tx| tx.row).collect();
    let total = expected.len();

    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut tasks: JoinSet<RowOutcome> = JoinSet::new();

    for tx in batch.rows {
        let sink = Arc::clone(&sink);
        let semaphore = Arc::clone(&semaphore);
        tasks.spawn(async move {
            let row = tx.row;
            let _permit = match semaphore.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    return RowOutcome {
                        row,
                        result: RowResult::Failed {
                            reason: "commit aborted before dispatch".into(),
                        },
                    }
                }
            };
            let result = commit_row(sink.as_ref(), account_id, tx).await;
            RowOutcome { row, result }
        });
    }

    let mut by_row: HashMap<usize, RowResult> = HashMap::with_capacity(total);
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(outcome) => {
                by_row.insert(outcome.row, outcome.result);
            }
            Err(e) => {
                // Row identity is lost with the task; reconciled below
                warn!(error = %e, "Commit task did not complete");
            }
        }
    }

    let mut outcomes: Vec<RowOutcome> = expected
        .into_iter()
        .map(|row| RowOutcome {
            result: by_row.remove(&row).unwrap_or(RowResult::Failed {
                reason: "commit task did not complete".into(),
            }),
            row,
        })
        .collect();
    outcomes.sort_by_key(|o| o.row);

    let committed = outcomes
        .iter()
        .filter(|o| matches!(o.result, RowResult::Committed { .. }))
        .count();
    let failed = total - committed;

    info!(committed, failed, "Batch commit finished");
    CommitReport {
        committed,
        failed,
        outcomes,
    }
}

async fn commit_row(sink: &dyn LedgerSink, account_id: i64, tx: StagedTransaction) -> RowResult {
    // is_ready_to_commit guarantees these; a hole here is a bug upstream,
    // reported per-row instead of tearing down the batch
    let Some(direction) = tx.direction else {
        return RowResult::Failed {
            reason: "row has no direction".into(),
        };
    };
    let Some(category_id) = tx.category_id else {
        return RowResult::Failed {
            reason: "row has no category".into(),
        };
    };

    let entry = LedgerEntry {
        account_id,
        category_id,
        date: tx.date,
        amount: tx.amount,
        description: compose_description(&tx.description, tx.note.as_deref()),
        transaction_id: tx.transaction_id,
    };

    let result = match direction {
        Direction::Income => sink.create_income(entry).await,
        Direction::Expense => sink.create_expense(entry).await,
    };

    match result {
        Ok(record_id) => RowResult::Committed { record_id },
        Err(e) => RowResult::Failed {
            reason: e.to_string(),
        },
    }
}

/// "<description> - <note>", truncated to the ledger's description cap
fn compose_description(description: &str, note: Option<&str>) -> String {
    let full = match note {
        Some(note) if !note.trim().is_empty() => format!("{} - {}", description, note.trim()),
        _ => description.to_string(),
    };
    if full.chars().count() > MAX_DESCRIPTION_LEN {
        full.chars().take(MAX_DESCRIPTION_LEN).collect()
    } else {
        full
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StagedTransaction;
    use chrono::NaiveDate;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// In-memory sink that fails rows whose description contains "FAIL" and
    /// tracks the maximum number of concurrent in-flight requests
    struct MockSink {
        incomes: Mutex<Vec<LedgerEntry>>,
        expenses: Mutex<Vec<LedgerEntry>>,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl MockSink {
        fn new() -> Self {
            Self {
                incomes: Mutex::new(Vec::new()),
                expenses: Mutex::new(Vec::new()),
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
            }
        }

        async fn handle(&self, entry: LedgerEntry, store: &Mutex<Vec<LedgerEntry>>) -> Result<i64> {
            let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(current, Ordering::SeqCst);
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if entry.description.contains("FAIL") {
                return Err(Error::InvalidData("ledger rejected the record".into()));
            }
            let mut store = store.lock().unwrap();
            store.push(entry);
            Ok(store.len() as i64)
        }
    }

    #[async_trait]
    impl LedgerSink for MockSink {
        async fn create_income(&self, entry: LedgerEntry) -> Result<i64> {
            self.handle(entry, &self.incomes).await
        }

        async fn create_expense(&self, entry: LedgerEntry) -> Result<i64> {
            self.handle(entry, &self.expenses).await
        }
    }

    fn ready_row(row: usize, direction: Direction, description: &str) -> StagedTransaction {
        StagedTransaction {
            row,
            date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            description: description.to_string(),
            amount: 100.0,
            direction: Some(direction),
            transaction_id: None,
            category_id: Some(1),
            note: None,
            review_flag: None,
            duplicate: false,
        }
    }

    #[tokio::test]
    async fn test_commit_routes_by_direction() {
        let sink = Arc::new(MockSink::new());
        let batch = StagingBatch::new(
            7,
            vec![
                ready_row(3, Direction::Expense, "ATM WDL"),
                ready_row(4, Direction::Income, "SALARY"),
            ],
        );

        let report = commit_batch(sink.clone(), batch, 4).await.unwrap();
        assert_eq!(report.committed, 2);
        assert_eq!(report.failed, 0);

        assert_eq!(sink.expenses.lock().unwrap().len(), 1);
        assert_eq!(sink.incomes.lock().unwrap().len(), 1);
        assert_eq!(sink.incomes.lock().unwrap()[0].account_id, 7);
    }

    #[tokio::test]
    async fn test_dropped_caller_does_not_abort_in_flight_writes() {
        let sink = Arc::new(MockSink::new());
        let rows = (1..=4)
            .map(|i| ready_row(i, Direction::Expense, "POS PURCHASE"))
            .collect();
        let batch = StagingBatch::new(1, rows);

        // Caller goes away mid-commit (client disconnect)
        let result = tokio::time::timeout(
            std::time::Duration::from_millis(1),
            commit_batch(sink.clone(), batch, 4),
        )
        .await;
        assert!(result.is_err());

        // The detached fan-out still runs every write to completion
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        assert_eq!(sink.expenses.lock().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_partial_failure_isolated_per_row() {
        let sink = Arc::new(MockSink::new());
        let rows = vec![
            ready_row(1, Direction::Expense, "OK A"),
            ready_row(2, Direction::Expense, "FAIL ME"),
            ready_row(3, Direction::Income, "OK B"),
            ready_row(4, Direction::Income, "OK C"),
        ];
        let batch = StagingBatch::new(1, rows);

        let report = commit_batch(sink.clone(), batch, 2).await.unwrap();
        assert_eq!(report.committed, 3);
        assert_eq!(report.failed, 1);
        assert_eq!(report.failed_rows(), vec![2]);

        // No sibling was duplicate-submitted
        assert_eq!(
            sink.incomes.lock().unwrap().len() + sink.expenses.lock().unwrap().len(),
            3
        );

        // Outcomes are keyed and ordered by row identity
        let rows: Vec<usize> = report.outcomes.iter().map(|o| o.row).collect();
        assert_eq!(rows, vec![1, 2, 3, 4]);
        assert!(matches!(
            report.outcomes[1].result,
            RowResult::Failed { .. }
        ));
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let sink = Arc::new(MockSink::new());
        let rows = (0..20)
            .map(|i| ready_row(i, Direction::Expense, "BULK"))
            .collect();
        let batch = StagingBatch::new(1, rows);

        commit_batch(sink.clone(), batch, 3).await.unwrap();
        assert!(sink.max_in_flight.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn test_refuses_unready_batch() {
        let sink = Arc::new(MockSink::new());
        let mut row = ready_row(1, Direction::Expense, "X");
        row.category_id = None;
        let batch = StagingBatch::new(1, vec![row]);

        match commit_batch(sink.clone(), batch, 4).await {
            Err(Error::InvalidData(_)) => {}
            other => panic!("expected InvalidData, got {:?}", other),
        }
        assert!(sink.expenses.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_note_folded_into_description() {
        let sink = Arc::new(MockSink::new());
        let mut row = ready_row(1, Direction::Expense, "ATM WDL");
        row.note = Some("cash for rent".into());
        let batch = StagingBatch::new(1, vec![row]);

        commit_batch(sink.clone(), batch, 1).await.unwrap();
        assert_eq!(
            sink.expenses.lock().unwrap()[0].description,
            "ATM WDL - cash for rent"
        );
    }

    #[test]
    fn test_compose_description_truncates() {
        let long_note = "x".repeat(2000);
        let composed = compose_description("desc", Some(&long_note));
        assert_eq!(composed.chars().count(), MAX_DESCRIPTION_LEN);
        assert!(composed.starts_with("desc - x"));
    }

    #[test]
    fn test_compose_description_skips_blank_note() {
        assert_eq!(compose_description("desc", Some("  ")), "desc");
        assert_eq!(compose_description("desc", None), "desc");
    }
}
