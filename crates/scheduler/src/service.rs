use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use skycast_common::error::AppError;
use skycast_common::types::{Schedule, ScheduleStatus};
use skycast_notifier::NotificationService;

use crate::store::ScheduleStore;
use crate::validator::Validator;

/// Delivers the forecast for a city to a user.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify_user(&self, user_id: &str, city_name: &str) -> Result<(), AppError>;
}

#[async_trait]
impl Notifier for NotificationService {
    async fn notify_user(&self, user_id: &str, city_name: &str) -> Result<(), AppError> {
        NotificationService::notify_user(self, user_id, city_name).await
    }
}

/// Owns schedule creation and completion.
pub struct ScheduleService {
    validator: Arc<dyn Validator>,
    store: Arc<dyn ScheduleStore>,
    notifier: Arc<dyn Notifier>,
}

impl ScheduleService {
    pub fn new(
        validator: Arc<dyn Validator>,
        store: Arc<dyn ScheduleStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            validator,
            store,
            notifier,
        }
    }

    /// Create an `Active` schedule for `time`, which must be in the future.
    pub async fn schedule(
        &self,
        user_id: &str,
        city_name: &str,
        time: DateTime<Utc>,
    ) -> Result<Schedule, AppError> {
        if time <= Utc::now() {
            return Err(AppError::ScheduleInPast);
        }

        self.validator.validate(user_id, city_name).await?;

        let schedule = Schedule::new(user_id, city_name, time);
        self.store
            .save(&schedule)
            .await
            .map_err(AppError::failed_to_save)?;

        tracing::info!(
            schedule_id = %schedule.id,
            user_id,
            city = city_name,
            scheduled_time = %schedule.scheduled_time,
            "Schedule created"
        );

        Ok(schedule)
    }

    /// Notify the schedule's user, then mark the schedule `Completed`.
    pub async fn process(&self, schedule: &Schedule) -> Result<(), AppError> {
        self.notifier
            .notify_user(&schedule.user_id, &schedule.city_name)
            .await
            .map_err(|e| match e {
                AppError::FailedToProcess(_) => e,
                other => AppError::failed_to_process(other),
            })?;

        self.store
            .save(&schedule.with_status(ScheduleStatus::Completed))
            .await
            .map_err(AppError::failed_to_save)?;

        tracing::info!(schedule_id = %schedule.id, "Schedule completed");
        Ok(())
    }

    pub async fn find(&self, id: &str) -> Result<Schedule, AppError> {
        self.store.find(id).await
    }
}
