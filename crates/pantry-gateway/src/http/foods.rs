use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use pantry_core::Food;
use pantry_inventory::{FoodInput, PageRequest};
use serde::Deserialize;
use std::sync::Arc;

use super::error::{ApiError, ApiJson};
use crate::app::AppState;

const DEFAULT_PAGE_SIZE: u32 = 10;

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub page: Option<u32>,
    pub size: Option<u32>,
}

/// GET /foods: plain list, or a page envelope when `page`/`size` is given.
pub async fn list_foods(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Response, ApiError> {
    if query.page.is_none() && query.size.is_none() {
        return Ok(Json(state.inventory.list_foods()?).into_response());
    }
    let req = PageRequest {
        page: query.page.unwrap_or(1),
        size: query.size.unwrap_or(DEFAULT_PAGE_SIZE),
    };
    Ok(Json(state.inventory.list_foods_page(req)?).into_response())
}

pub async fn get_food(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Food>, ApiError> {
    Ok(Json(state.inventory.get_food(id)?))
}

pub async fn create_food(
    State(state): State<Arc<AppState>>,
    ApiJson(input): ApiJson<FoodInput>,
) -> Result<(StatusCode, Json<Food>), ApiError> {
    let food = state.inventory.create_food(&input)?;
    Ok((StatusCode::CREATED, Json(food)))
}

pub async fn update_food(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    ApiJson(input): ApiJson<FoodInput>,
) -> Result<Json<Food>, ApiError> {
    Ok(Json(state.inventory.update_food(id, &input)?))
}

pub async fn delete_food(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.inventory.delete_food(id)?;
    Ok(StatusCode::NO_CONTENT)
}
