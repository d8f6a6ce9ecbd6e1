use std::sync::Arc;

use skycast_common::error::AppError;
use skycast_common::types::{Schedule, ScheduleStatus};
use skycast_queue::DurableQueue;

use crate::store::ScheduleStore;

/// Hands a due schedule over to the schedule queue.
pub struct SchedulePublisher {
    store: Arc<dyn ScheduleStore>,
    queue: DurableQueue,
}

impl SchedulePublisher {
    pub fn new(store: Arc<dyn ScheduleStore>, queue: DurableQueue) -> Self {
        Self { store, queue }
    }

    /// Mark the schedule `Processing`, then enqueue it.
    ///
    /// Nothing is enqueued when the status change cannot be persisted. When
    /// the enqueue fails the schedule is put back to `Active` so the next
    /// recovery tick picks it up again.
    pub async fn publish(&self, schedule: &Schedule) -> Result<(), AppError> {
        let processing = schedule.with_status(ScheduleStatus::Processing);

        self.store
            .save(&processing)
            .await
            .map_err(AppError::failed_to_save)?;

        if let Err(e) = self.queue.publish(&processing).await {
            tracing::error!(
                schedule_id = %schedule.id,
                queue = %self.queue.name(),
                error = %e,
                "Failed to enqueue schedule, restoring active status"
            );

            let active = schedule.with_status(ScheduleStatus::Active);
            if let Err(restore) = self.store.save(&active).await {
                tracing::error!(
                    schedule_id = %schedule.id,
                    error = %restore,
                    "Failed to restore schedule status"
                );
            }

            return Err(e);
        }

        tracing::info!(
            schedule_id = %schedule.id,
            queue = %self.queue.name(),
            "Schedule published"
        );
        Ok(())
    }
}
