//! Statement import handlers: parse to staging, then bulk commit
//!
//! Parsing is stateless: the multipart form carries either an inline column
//! mapping or a saved profile id, and the response is the full staged batch
//! for client-side review. Nothing touches the ledger until commit.

use std::collections::HashSet;
use std::sync::Arc;

use axum::{
    extract::{Multipart, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::{core_error, AppError, AppState, MAX_UPLOAD_SIZE};
use khata_core::commit::{commit_batch, CommitReport, DEFAULT_COMMIT_CONCURRENCY};
use khata_core::models::{AmountScheme, ColumnRef, NewFormatProfile, StagedTransaction};
use khata_core::rules::RuleSet;
use khata_core::staging::StagingBatch;

#[derive(Debug, Serialize)]
pub struct ParseResponse {
    pub bank_name: String,
    pub rows: Vec<StagedTransaction>,
    /// Total staged rows
    pub total: usize,
    /// Rows carrying a review flag
    pub flagged: usize,
}

#[derive(Debug, Deserialize)]
pub struct CommitRequest {
    pub account_id: i64,
    pub rows: Vec<StagedTransaction>,
}

/// Accumulates the multipart form fields for a parse request
#[derive(Debug, Default)]
struct ParseForm {
    file: Option<Vec<u8>>,
    profile_id: Option<i64>,
    account_id: Option<i64>,
    bank_name: Option<String>,
    date_col: Option<String>,
    desc_col: Option<String>,
    scheme: Option<String>,
    debit_col: Option<String>,
    credit_col: Option<String>,
    amount_col: Option<String>,
    indicator_col: Option<String>,
    debit_tokens: Option<String>,
    credit_tokens: Option<String>,
    trans_id_col: Option<String>,
}

fn parse_col(value: &Option<String>, label: &str) -> Result<Option<ColumnRef>, AppError> {
    match value.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => s
            .parse()
            .map(Some)
            .map_err(|_| AppError::bad_request(&format!("Invalid {}: {}", label, s))),
    }
}

fn split_tokens(value: &Option<String>) -> Vec<String> {
    value
        .as_deref()
        .unwrap_or("")
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

impl ParseForm {
    /// Build the column mapping from the inline form fields
    fn into_profile(self) -> Result<NewFormatProfile, AppError> {
        let date_col = parse_col(&self.date_col, "date_col")?
            .ok_or_else(|| AppError::bad_request("Missing date_col field"))?;
        let desc_col = parse_col(&self.desc_col, "desc_col")?
            .ok_or_else(|| AppError::bad_request("Missing desc_col field"))?;
        let scheme: AmountScheme = self
            .scheme
            .as_deref()
            .ok_or_else(|| AppError::bad_request("Missing amount_format_type field"))?
            .parse()
            .map_err(|e: String| AppError::bad_request(&e))?;
        Ok(NewFormatProfile {
            bank_name: self.bank_name.unwrap_or_default(),
            date_col,
            desc_col,
            scheme,
            debit_col: parse_col(&self.debit_col, "debit_col")?,
            credit_col: parse_col(&self.credit_col, "credit_col")?,
            amount_col: parse_col(&self.amount_col, "amount_col")?,
            indicator_col: parse_col(&self.indicator_col, "drcr_col")?,
            debit_tokens: split_tokens(&self.debit_tokens),
            credit_tokens: split_tokens(&self.credit_tokens),
            trans_id_col: parse_col(&self.trans_id_col, "trans_id_col")?,
        })
    }
}

/// POST /api/import/parse - Parse a statement file into staged transactions
///
/// Expects multipart form with:
/// - file: spreadsheet or CSV file (required, max 10MB)
/// - profile_id: saved format profile to use (optional)
/// - account_id: account whose committed history is checked for duplicates
///   (optional)
/// - inline mapping fields when no profile_id is given: bank_name, date_col,
///   desc_col, amount_format_type, debit_col, credit_col, amount_col,
///   drcr_col, debit_texts, credit_texts (comma-delimited), trans_id_col
pub async fn parse_statement(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<ParseResponse>, AppError> {
    let mut form = ParseForm::default();
    let mut total_size: usize = 0;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::bad_request(&format!("Failed to read form field: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();
        if name == "file" {
            let bytes = field
                .bytes()
                .await
                .map_err(|_| AppError::bad_request("Failed to read file data"))?;
            total_size += bytes.len();
            if total_size > MAX_UPLOAD_SIZE {
                return Err(AppError::bad_request(&format!(
                    "File too large. Maximum size is {} MB",
                    MAX_UPLOAD_SIZE / 1024 / 1024
                )));
            }
            form.file = Some(bytes.to_vec());
            continue;
        }

        let value = field
            .text()
            .await
            .map_err(|_| AppError::bad_request(&format!("Failed to read {}", name)))?;
        match name.as_str() {
            "profile_id" => {
                form.profile_id = Some(value.parse().map_err(|_| {
                    AppError::bad_request(&format!("Invalid profile_id: {}", value))
                })?);
            }
            "account_id" => {
                form.account_id = Some(value.parse().map_err(|_| {
                    AppError::bad_request(&format!("Invalid account_id: {}", value))
                })?);
            }
            "bank_name" => form.bank_name = Some(value),
            "date_col" => form.date_col = Some(value),
            "desc_col" => form.desc_col = Some(value),
            "amount_format_type" => form.scheme = Some(value),
            "debit_col" => form.debit_col = Some(value),
            "credit_col" => form.credit_col = Some(value),
            "amount_col" => form.amount_col = Some(value),
            "drcr_col" => form.indicator_col = Some(value),
            "debit_texts" => form.debit_tokens = Some(value),
            "credit_texts" => form.credit_tokens = Some(value),
            "trans_id_col" => form.trans_id_col = Some(value),
            _ => {}
        }
    }

    let file = form
        .file
        .take()
        .ok_or_else(|| AppError::bad_request("Missing file field"))?;

    let account_id = form.account_id;
    let profile = match form.profile_id {
        Some(id) => state
            .db
            .get_profile(id)
            .map_err(core_error)?
            .ok_or_else(|| AppError::not_found(&format!("Profile {} not found", id)))?
            .mapping(),
        None => form.into_profile()?,
    };

    let committed_ids = match account_id {
        Some(account_id) => state
            .db
            .committed_transaction_ids(account_id)
            .map_err(core_error)?,
        None => HashSet::new(),
    };

    let rules = RuleSet::compile(&state.db.list_rules().map_err(core_error)?);

    let rows =
        khata_core::parse_statement(&file, &profile, &rules, &committed_ids).map_err(core_error)?;
    let flagged = rows.iter().filter(|r| r.review_flag.is_some()).count();

    Ok(Json(ParseResponse {
        bank_name: profile.bank_name,
        total: rows.len(),
        flagged,
        rows,
    }))
}

/// POST /api/import/commit - Commit a reviewed batch to the ledger
///
/// Refuses batches with flagged or uncategorized rows (400). Otherwise every
/// row is attempted; per-row failures are reported in the outcome list and
/// never abort the rest of the batch.
pub async fn commit_statement(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CommitRequest>,
) -> Result<Json<CommitReport>, AppError> {
    if req.rows.is_empty() {
        return Err(AppError::bad_request("No rows to commit"));
    }
    if state
        .db
        .get_account(req.account_id)
        .map_err(core_error)?
        .is_none()
    {
        return Err(AppError::not_found(&format!(
            "Account {} not found",
            req.account_id
        )));
    }

    let batch = StagingBatch::new(req.account_id, req.rows);
    let sink = Arc::new(state.db.clone());
    let report = commit_batch(sink, batch, DEFAULT_COMMIT_CONCURRENCY)
        .await
        .map_err(core_error)?;
    Ok(Json(report))
}
