//! Alert endpoints under `/alerts`.
//!
//! | Route                          | Effect                                   |
//! |--------------------------------|------------------------------------------|
//! | `GET  /alerts/check`           | evaluate + format, nothing is sent       |
//! | `POST /alerts/send`            | full run to an explicit recipient        |
//! | `POST /alerts/trigger`         | full run to the admin, via the scheduler |
//! | `GET  /alerts/status`          | scheduler and transport state            |
//! | `POST /alerts/scheduler/start` | register the daily job                   |
//! | `POST /alerts/scheduler/stop`  | cancel the daily job                     |

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use chrono::{Local, NaiveDate};
use pantry_alerts::{window, CheckReport, NotificationStatus, RunReport};
use pantry_scheduler::ScheduleState;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::error::{send_status, ApiError, ApiJson};
use crate::app::AppState;

/// Query values stay raw so malformed input gets the JSON error body.
#[derive(Debug, Default, Deserialize)]
pub struct CheckQuery {
    pub days_ahead: Option<String>,
    pub today: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SendRequest {
    pub recipient: String,
    pub days_ahead: Option<i64>,
}

#[derive(Serialize)]
pub struct StatusResponse {
    pub scheduler: ScheduleState,
    pub notifications: NotificationStatus,
}

#[derive(Serialize)]
pub struct StartResponse {
    pub started: bool,
    pub scheduler: ScheduleState,
}

fn today_or(raw: Option<&str>) -> Result<NaiveDate, ApiError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(s) => Ok(window::parse_date("today", s)?),
        None => Ok(Local::now().date_naive()),
    }
}

/// GET /alerts/check?days_ahead=&today=
pub async fn check(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CheckQuery>,
) -> Result<Json<CheckReport>, ApiError> {
    let today = today_or(query.today.as_deref())?;
    let days_ahead = window::parse_days_ahead(
        query.days_ahead.as_deref(),
        state.pipeline.settings().days_ahead,
    )?;
    Ok(Json(state.pipeline.check(today, Some(days_ahead)).await?))
}

/// POST /alerts/send {recipient, days_ahead?}
pub async fn send(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<SendRequest>,
) -> Result<(StatusCode, Json<RunReport>), ApiError> {
    let today = Local::now().date_naive();
    let report = state
        .pipeline
        .send_manual(today, &req.recipient, req.days_ahead)
        .await?;
    Ok((send_status(report.send.error_kind), Json(report)))
}

/// POST /alerts/trigger
pub async fn trigger(
    State(state): State<Arc<AppState>>,
) -> Result<(StatusCode, Json<RunReport>), ApiError> {
    let report = state.scheduler.trigger_now().await?;
    Ok((send_status(report.send.error_kind), Json(report)))
}

/// GET /alerts/status
pub async fn status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    Json(StatusResponse {
        scheduler: state.scheduler.status(),
        notifications: state.pipeline.notification_status(),
    })
}

/// POST /alerts/scheduler/start
pub async fn start_scheduler(State(state): State<Arc<AppState>>) -> Json<StartResponse> {
    let started = state.scheduler.start().is_some();
    Json(StartResponse {
        started,
        scheduler: state.scheduler.status(),
    })
}

/// POST /alerts/scheduler/stop
pub async fn stop_scheduler(State(state): State<Arc<AppState>>) -> Json<ScheduleState> {
    state.scheduler.stop();
    Json(state.scheduler.status())
}
