//! Keyword category rule handlers

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;

use crate::{core_error, AppError, AppState, SuccessResponse};
use khata_core::models::CategoryRule;

#[derive(Debug, Deserialize)]
pub struct CreateRuleRequest {
    pub pattern: String,
    pub category_id: i64,
}

/// GET /api/rules - List category rules in application order
pub async fn list_rules(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<CategoryRule>>, AppError> {
    let rules = state.db.list_rules().map_err(core_error)?;
    Ok(Json(rules))
}

/// POST /api/rules - Create a keyword rule mapping a pattern to a category
pub async fn create_rule(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateRuleRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    if req.pattern.trim().is_empty() {
        return Err(AppError::bad_request("Rule pattern cannot be empty"));
    }
    let id = state
        .db
        .create_rule(&req.pattern, req.category_id)
        .map_err(core_error)?;
    Ok(Json(serde_json::json!({ "id": id })))
}

/// DELETE /api/rules/:id - Delete a rule
pub async fn delete_rule(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<SuccessResponse>, AppError> {
    state.db.delete_rule(id).map_err(core_error)?;
    Ok(SuccessResponse::ok())
}
