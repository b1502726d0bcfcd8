//! Income source / expense category handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use crate::{core_error, AppError, AppState, SuccessResponse};
use khata_core::models::{Category, Direction};

#[derive(Debug, Deserialize)]
pub struct CategoryQuery {
    /// Restrict to one side of the ledger ("income" or "expense")
    pub kind: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateCategoryRequest {
    pub name: String,
    pub kind: String,
}

/// GET /api/categories - List categories, optionally filtered by kind
pub async fn list_categories(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CategoryQuery>,
) -> Result<Json<Vec<Category>>, AppError> {
    let kind = match params.kind.as_deref() {
        Some(s) => Some(
            s.parse::<Direction>()
                .map_err(|e| AppError::bad_request(&e))?,
        ),
        None => None,
    };
    let categories = state.db.list_categories(kind).map_err(core_error)?;
    Ok(Json(categories))
}

/// POST /api/categories - Create a category
pub async fn create_category(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateCategoryRequest>,
) -> Result<Json<Category>, AppError> {
    let kind: Direction = req
        .kind
        .parse()
        .map_err(|e: String| AppError::bad_request(&e))?;
    let id = state
        .db
        .create_category(&req.name, kind)
        .map_err(core_error)?;
    let category = state
        .db
        .get_category(id)
        .map_err(core_error)?
        .ok_or_else(|| AppError::internal("Category not found after creation"))?;
    Ok(Json(category))
}

/// DELETE /api/categories/:id - Delete a category
pub async fn delete_category(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<SuccessResponse>, AppError> {
    state.db.delete_category(id).map_err(core_error)?;
    Ok(SuccessResponse::ok())
}
