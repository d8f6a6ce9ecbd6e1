//! Recovery job: periodically finds schedules due within the next interval
//! and arms one timer per schedule that publishes it when due.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use skycast_common::error::AppError;

use crate::lease::PollerLease;
use crate::publisher::SchedulePublisher;
use crate::store::ScheduleStore;
use crate::timers::TimerArena;

pub struct RecoveryJob {
    store: Arc<dyn ScheduleStore>,
    publisher: Arc<SchedulePublisher>,
    lease: Arc<dyn PollerLease>,
    timers: TimerArena,
    interval: Duration,
}

impl RecoveryJob {
    pub fn new(
        store: Arc<dyn ScheduleStore>,
        publisher: Arc<SchedulePublisher>,
        lease: Arc<dyn PollerLease>,
        interval: Duration,
    ) -> Self {
        Self {
            store,
            publisher,
            lease,
            timers: TimerArena::new(),
            interval,
        }
    }

    pub fn timers(&self) -> &TimerArena {
        &self.timers
    }

    /// Tick every interval, starting immediately, until `shutdown` turns
    /// `true` or its sender is dropped. On exit, timers still waiting are
    /// stopped and publishes already under way run to completion.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(
            interval_secs = self.interval.as_secs(),
            "Recovery job started"
        );

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.tick().await {
                        tracing::error!(error = %e, "Recovery job tick failed");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        let cancelled = self.timers.cancel_all().await;
        if let Err(e) = self.lease.release().await {
            tracing::warn!(error = %e, "Failed to release poller lease");
        }

        tracing::info!(cancelled, "Recovery job stopped");
    }

    /// Run one poll; returns how many new timers were armed.
    pub async fn tick(&self) -> Result<usize, AppError> {
        if !self.lease.acquire().await? {
            tracing::debug!("Poller lease held by another instance, skipping tick");
            return Ok(0);
        }

        let now = Utc::now();
        let lookahead = chrono::Duration::from_std(self.interval)
            .map_err(|e| AppError::Config(format!("invalid job interval: {}", e)))?;
        let due = self.store.find_all_before(now + lookahead).await?;

        let found = due.len();
        let mut armed = 0;

        for schedule in due {
            let delay = (schedule.scheduled_time - now)
                .to_std()
                .unwrap_or(Duration::ZERO);
            let id = schedule.id.clone();
            let publisher = Arc::clone(&self.publisher);

            let fire = async move {
                if let Err(e) = publisher.publish(&schedule).await {
                    tracing::error!(
                        schedule_id = %schedule.id,
                        error = %e,
                        "Failed to publish due schedule"
                    );
                }
            };

            if self.timers.arm(&id, delay, fire) {
                tracing::debug!(schedule_id = %id, delay_ms = delay.as_millis() as u64, "Timer armed");
                armed += 1;
            }
        }

        if found > 0 {
            tracing::info!(found, armed, "Due schedules found");
        }

        Ok(armed)
    }
}
