//! Shared application state for the Axum API server.

use std::sync::Arc;

use skycast_queue::DurableQueue;
use skycast_scheduler::{Notifier, ScheduleService};

/// Application state shared across all route handlers via Axum `State`.
#[derive(Clone)]
pub struct AppState {
    pub schedules: Arc<ScheduleService>,
    pub notifier: Arc<dyn Notifier>,
    pub notification_queue: DurableQueue,
}

impl AppState {
    pub fn new(
        schedules: Arc<ScheduleService>,
        notifier: Arc<dyn Notifier>,
        notification_queue: DurableQueue,
    ) -> Self {
        Self {
            schedules,
            notifier,
            notification_queue,
        }
    }
}
