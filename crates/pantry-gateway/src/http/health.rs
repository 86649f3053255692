use axum::{extract::State, Json};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::app::AppState;

/// GET /health: liveness probe, returns server metadata.
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "app_name": state.config.alerts.app_name,
        "scheduler_running": state.scheduler.is_running(),
        "transport_available": state.pipeline.transport_available(),
    }))
}
