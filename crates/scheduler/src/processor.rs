use async_trait::async_trait;

use skycast_common::error::AppError;
use skycast_common::types::Schedule;
use skycast_queue::Processor;

use crate::service::ScheduleService;

/// Schedule queue messages are processed by the schedule service.
#[async_trait]
impl Processor for ScheduleService {
    type Message = Schedule;

    async fn handle(&self, message: Schedule) -> Result<(), AppError> {
        tracing::debug!(schedule_id = %message.id, "Processing schedule");
        self.process(&message).await
    }
}
