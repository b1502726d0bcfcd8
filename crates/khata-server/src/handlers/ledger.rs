//! Ledger handlers: committed income and expense records

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;

use crate::{core_error, AppError, AppState};
use khata_core::models::{ExpenseRecord, IncomeRecord, LedgerEntry};

#[derive(Debug, Deserialize)]
pub struct LedgerQuery {
    pub account_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct CreateIncomeRequest {
    pub account_id: i64,
    pub source_id: i64,
    pub date: NaiveDate,
    pub amount: f64,
    pub description: String,
    pub transaction_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateExpenseRequest {
    pub account_id: i64,
    pub category_id: i64,
    pub date: NaiveDate,
    pub amount: f64,
    pub description: String,
    pub transaction_id: Option<String>,
}

/// GET /api/incomes - List income records, optionally filtered by account
pub async fn list_incomes(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LedgerQuery>,
) -> Result<Json<Vec<IncomeRecord>>, AppError> {
    let incomes = state
        .db
        .list_incomes(query.account_id)
        .map_err(core_error)?;
    Ok(Json(incomes))
}

/// POST /api/incomes - Record a single income manually
pub async fn create_income(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateIncomeRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let entry = LedgerEntry {
        account_id: req.account_id,
        category_id: req.source_id,
        date: req.date,
        amount: req.amount,
        description: req.description,
        transaction_id: req.transaction_id,
    };
    let id = state.db.insert_income(&entry).map_err(core_error)?;
    Ok(Json(serde_json::json!({ "id": id })))
}

/// GET /api/expenses - List expense records, optionally filtered by account
pub async fn list_expenses(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LedgerQuery>,
) -> Result<Json<Vec<ExpenseRecord>>, AppError> {
    let expenses = state
        .db
        .list_expenses(query.account_id)
        .map_err(core_error)?;
    Ok(Json(expenses))
}

/// POST /api/expenses - Record a single expense manually
pub async fn create_expense(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateExpenseRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let entry = LedgerEntry {
        account_id: req.account_id,
        category_id: req.category_id,
        date: req.date,
        amount: req.amount,
        description: req.description,
        transaction_id: req.transaction_id,
    };
    let id = state.db.insert_expense(&entry).map_err(core_error)?;
    Ok(Json(serde_json::json!({ "id": id })))
}
