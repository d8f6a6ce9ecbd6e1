//! Schedule routes.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use skycast_common::error::AppError;
use skycast_common::types::Schedule;

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ScheduleRequest {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub city: String,
    /// RFC 3339 timestamp
    pub time: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/schedules", post(create_schedule))
        .route("/api/schedules/{id}", get(get_schedule))
}

/// POST /api/schedules — Schedule a forecast notification.
async fn create_schedule(
    State(state): State<AppState>,
    Json(body): Json<ScheduleRequest>,
) -> Result<(StatusCode, Json<Schedule>), AppError> {
    let time = DateTime::parse_from_rfc3339(&body.time)
        .map_err(|e| AppError::Decode(format!("invalid schedule time {:?}: {}", body.time, e)))?
        .with_timezone(&Utc);

    let schedule = state
        .schedules
        .schedule(&body.user_id, &body.city, time)
        .await
        .inspect_err(|e| {
            tracing::warn!(user_id = %body.user_id, city = %body.city, error = %e, "Failed to schedule notification")
        })?;

    Ok((StatusCode::CREATED, Json(schedule)))
}

/// GET /api/schedules/:id — Look up one schedule.
async fn get_schedule(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Schedule>, AppError> {
    let schedule = state.schedules.find(&id).await?;
    Ok(Json(schedule))
}
