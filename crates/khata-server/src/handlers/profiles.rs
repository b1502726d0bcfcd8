//! Format profile handlers

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};

use crate::{core_error, AppError, AppState, SuccessResponse};
use khata_core::models::{FormatProfile, NewFormatProfile};

/// GET /api/profiles - List saved format profiles
pub async fn list_profiles(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<FormatProfile>>, AppError> {
    let profiles = state.db.list_profiles().map_err(core_error)?;
    Ok(Json(profiles))
}

/// POST /api/profiles - Save a new format profile
///
/// Rejects profiles missing fields their amount scheme requires, listing
/// every missing field in the error.
pub async fn create_profile(
    State(state): State<Arc<AppState>>,
    Json(req): Json<NewFormatProfile>,
) -> Result<Json<FormatProfile>, AppError> {
    let profile = state.db.create_profile(&req).map_err(core_error)?;
    Ok(Json(profile))
}

/// PUT /api/profiles/:id - Replace a profile's definition
pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<NewFormatProfile>,
) -> Result<Json<FormatProfile>, AppError> {
    let profile = state.db.update_profile(id, &req).map_err(core_error)?;
    Ok(Json(profile))
}

/// DELETE /api/profiles/:id - Delete a profile
pub async fn delete_profile(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<SuccessResponse>, AppError> {
    state.db.delete_profile(id).map_err(core_error)?;
    Ok(SuccessResponse::ok())
}
