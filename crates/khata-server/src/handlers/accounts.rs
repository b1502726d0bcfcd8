//! Account management handlers

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;

use crate::{core_error, AppError, AppState, SuccessResponse};
use khata_core::models::Account;

/// Request body for creating or renaming an account
#[derive(Debug, Deserialize)]
pub struct AccountRequest {
    pub name: String,
}

/// GET /api/accounts - List all accounts
pub async fn list_accounts(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Account>>, AppError> {
    let accounts = state.db.list_accounts().map_err(core_error)?;
    Ok(Json(accounts))
}

/// POST /api/accounts - Create a new account
pub async fn create_account(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AccountRequest>,
) -> Result<Json<Account>, AppError> {
    let id = state.db.create_account(&req.name).map_err(core_error)?;
    let account = state
        .db
        .get_account(id)
        .map_err(core_error)?
        .ok_or_else(|| AppError::internal("Account not found after creation"))?;
    Ok(Json(account))
}

/// GET /api/accounts/:id - Get a single account
pub async fn get_account(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Account>, AppError> {
    let account = state
        .db
        .get_account(id)
        .map_err(core_error)?
        .ok_or_else(|| AppError::not_found(&format!("Account {} not found", id)))?;
    Ok(Json(account))
}

/// PUT /api/accounts/:id - Rename an account
pub async fn update_account(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<AccountRequest>,
) -> Result<Json<Account>, AppError> {
    state.db.update_account(id, &req.name).map_err(core_error)?;
    let account = state
        .db
        .get_account(id)
        .map_err(core_error)?
        .ok_or_else(|| AppError::not_found(&format!("Account {} not found", id)))?;
    Ok(Json(account))
}

/// DELETE /api/accounts/:id - Delete an account
pub async fn delete_account(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<SuccessResponse>, AppError> {
    state.db.delete_account(id).map_err(core_error)?;
    Ok(SuccessResponse::ok())
}
