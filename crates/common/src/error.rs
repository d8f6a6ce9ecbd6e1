use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

/// Common error types used across the application.
///
/// `FailedToSave`, `FailedToProcess` and `PublishFailed` are stable markers
/// wrapping the error that caused them. Classification helpers look through
/// the markers to the root kind.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Schedule time cannot be in the past")]
    ScheduleInPast,

    #[error("Unknown channel: {0}")]
    UnknownChannel(String),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("City not found: {0}")]
    CityNotFound(String),

    #[error("Multiple cities found with name: {0}")]
    MultipleCities(String),

    #[error("Schedule not found: {0}")]
    ScheduleNotFound(String),

    #[error("User opted out of {0} notifications")]
    OptedOut(String),

    #[error("Failed to save schedule: {0}")]
    FailedToSave(#[source] Box<AppError>),

    #[error("Failed to process: {0}")]
    FailedToProcess(#[source] Box<AppError>),

    #[error("Failed to publish message: {0}")]
    PublishFailed(#[source] Box<AppError>),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn failed_to_save(err: AppError) -> Self {
        AppError::FailedToSave(Box::new(err))
    }

    pub fn failed_to_process(err: AppError) -> Self {
        AppError::FailedToProcess(Box::new(err))
    }

    pub fn publish_failed(err: AppError) -> Self {
        AppError::PublishFailed(Box::new(err))
    }

    /// The innermost error below any `FailedToSave` / `FailedToProcess` /
    /// `PublishFailed` markers.
    pub fn root(&self) -> &AppError {
        match self {
            AppError::FailedToSave(inner)
            | AppError::FailedToProcess(inner)
            | AppError::PublishFailed(inner) => inner.root(),
            other => other,
        }
    }

    /// True when the root cause is a missing user, city or schedule.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self.root(),
            AppError::UserNotFound(_)
                | AppError::CityNotFound(_)
                | AppError::MultipleCities(_)
                | AppError::ScheduleNotFound(_)
        )
    }

    /// True when retrying can never succeed: not-found and validation kinds,
    /// plus undecodable payloads.
    pub fn is_permanent(&self) -> bool {
        self.is_not_found()
            || matches!(
                self.root(),
                AppError::ScheduleInPast | AppError::UnknownChannel(_) | AppError::Decode(_)
            )
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self.root() {
            AppError::ScheduleInPast
            | AppError::UnknownChannel(_)
            | AppError::Decode(_)
            | AppError::OptedOut(_) => StatusCode::BAD_REQUEST,
            AppError::UserNotFound(_)
            | AppError::CityNotFound(_)
            | AppError::ScheduleNotFound(_) => StatusCode::NOT_FOUND,
            AppError::MultipleCities(_) => StatusCode::CONFLICT,
            AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = json!({ "error": self.to_string() });
        (status, Json(body)).into_response()
    }
}
