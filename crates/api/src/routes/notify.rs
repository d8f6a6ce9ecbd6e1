//! Immediate and queued notification routes.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;

use skycast_common::error::AppError;
use skycast_common::types::{Channel, Notification};

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct NotifyUserRequest {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub city: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/notify", post(notify_user))
        .route("/api/notifications", post(enqueue_notification))
}

/// POST /api/notify — Send the forecast for a city to a user now.
async fn notify_user(
    State(state): State<AppState>,
    Json(body): Json<NotifyUserRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    state
        .notifier
        .notify_user(&body.user_id, &body.city)
        .await
        .inspect_err(|e| {
            tracing::error!(user_id = %body.user_id, city = %body.city, error = %e, "Error notifying user")
        })?;

    tracing::info!(user_id = %body.user_id, city = %body.city, "Weather info sent to user");
    Ok(Json(json!({"sent": true})))
}

/// POST /api/notifications — Queue a pre-rendered notification for delivery.
async fn enqueue_notification(
    State(state): State<AppState>,
    Json(notification): Json<Notification>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    // Unknown channels never reach the queue
    notification.channel.parse::<Channel>()?;

    state.notification_queue.publish(&notification).await?;

    Ok((StatusCode::ACCEPTED, Json(json!({"queued": true}))))
}
