use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use pantry_core::Category;
use pantry_inventory::CategoryInput;
use std::sync::Arc;

use super::error::{ApiError, ApiJson};
use crate::app::AppState;

pub async fn list_categories(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Category>>, ApiError> {
    Ok(Json(state.inventory.list_categories()?))
}

pub async fn get_category(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Category>, ApiError> {
    Ok(Json(state.inventory.get_category(id)?))
}

pub async fn create_category(
    State(state): State<Arc<AppState>>,
    ApiJson(input): ApiJson<CategoryInput>,
) -> Result<(StatusCode, Json<Category>), ApiError> {
    let category = state.inventory.create_category(&input)?;
    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn update_category(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    ApiJson(input): ApiJson<CategoryInput>,
) -> Result<Json<Category>, ApiError> {
    Ok(Json(state.inventory.update_category(id, &input)?))
}

/// DELETE /categories/{id}: refused with 409 while foods still reference it.
pub async fn delete_category(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.inventory.delete_category(id)?;
    Ok(StatusCode::NO_CONTENT)
}
