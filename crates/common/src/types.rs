use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

/// Lifecycle status of a schedule. Transitions only move forward:
/// `Active` → `Processing` → `Completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "text", rename_all = "lowercase")]
pub enum ScheduleStatus {
    Active,
    Processing,
    Completed,
}

impl std::fmt::Display for ScheduleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScheduleStatus::Active => write!(f, "active"),
            ScheduleStatus::Processing => write!(f, "processing"),
            ScheduleStatus::Completed => write!(f, "completed"),
        }
    }
}

/// A persisted request to deliver a forecast notification at a future time.
///
/// The serde shape is the queue payload:
/// `{id, userID, cityName, status, scheduledTime}` with an RFC 3339 time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Schedule {
    pub id: String,
    #[serde(rename = "userID")]
    pub user_id: String,
    #[serde(rename = "cityName")]
    pub city_name: String,
    pub status: ScheduleStatus,
    #[serde(rename = "scheduledTime")]
    pub scheduled_time: DateTime<Utc>,
}

impl Schedule {
    /// Build a fresh `Active` schedule with a newly generated id.
    pub fn new(user_id: &str, city_name: &str, scheduled_time: DateTime<Utc>) -> Self {
        Self {
            id: format!("SCHEDULE-{}", Uuid::new_v4()),
            user_id: user_id.to_string(),
            city_name: city_name.to_string(),
            status: ScheduleStatus::Active,
            scheduled_time,
        }
    }

    /// Copy of this schedule carrying a different status.
    pub fn with_status(&self, status: ScheduleStatus) -> Self {
        Self {
            status,
            ..self.clone()
        }
    }
}

/// Delivery channels a notification can be sent through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Web,
    Email,
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Channel::Web => write!(f, "web"),
            Channel::Email => write!(f, "email"),
        }
    }
}

impl std::str::FromStr for Channel {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "web" => Ok(Channel::Web),
            "email" => Ok(Channel::Email),
            other => Err(AppError::UnknownChannel(other.to_string())),
        }
    }
}

/// A rendered notification request, as carried on the notification queue.
///
/// `channel` stays a plain string on the wire so that an unknown channel is
/// reported as `UnknownChannel` rather than as an undecodable payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    #[serde(rename = "userID")]
    pub user_id: String,
    pub content: String,
    pub channel: String,
}

/// A user as returned by the user service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    #[serde(rename = "notification", default)]
    pub notifications: NotificationSettings,
}

/// Per-user notification preferences. Missing sections mean "disabled".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NotificationSettings {
    /// Global switch; when false nothing is sent on any channel.
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub web: WebSettings,
    #[serde(default)]
    pub email: EmailSettings,
}

/// Web notification preferences.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WebSettings {
    #[serde(default)]
    pub enabled: bool,
    /// Recipient id understood by the web notification API.
    #[serde(default)]
    pub id: String,
}

/// Email notification preferences.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmailSettings {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub address: String,
}

/// A city resolved by the forecast provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct City {
    pub id: String,
    pub name: String,
    pub state: String,
}
