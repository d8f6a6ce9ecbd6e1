//! Schedule persistence.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use sqlx::PgPool;

use skycast_common::error::AppError;
use skycast_common::types::{Schedule, ScheduleStatus};

/// Durable store for schedules. Writes are last-write-wins upserts keyed by id.
#[async_trait]
pub trait ScheduleStore: Send + Sync {
    async fn save(&self, schedule: &Schedule) -> Result<(), AppError>;

    /// Fails with `AppError::ScheduleNotFound` for an unknown id.
    async fn find(&self, id: &str) -> Result<Schedule, AppError>;

    /// Active schedules due strictly before `threshold`, earliest first.
    async fn find_all_before(&self, threshold: DateTime<Utc>) -> Result<Vec<Schedule>, AppError>;
}

/// PostgreSQL-backed store over the `schedules` table.
pub struct PgScheduleStore {
    pool: PgPool,
}

impl PgScheduleStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ScheduleStore for PgScheduleStore {
    async fn save(&self, schedule: &Schedule) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO schedules (id, user_id, city_name, status, scheduled_time)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO UPDATE SET
                user_id = EXCLUDED.user_id,
                city_name = EXCLUDED.city_name,
                status = EXCLUDED.status,
                scheduled_time = EXCLUDED.scheduled_time,
                updated_at = NOW()
            "#,
        )
        .bind(&schedule.id)
        .bind(&schedule.user_id)
        .bind(&schedule.city_name)
        .bind(schedule.status.to_string())
        .bind(schedule.scheduled_time)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find(&self, id: &str) -> Result<Schedule, AppError> {
        sqlx::query_as::<_, Schedule>(
            r#"
            SELECT id, user_id, city_name, status, scheduled_time
            FROM schedules
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::ScheduleNotFound(id.to_string()))
    }

    async fn find_all_before(&self, threshold: DateTime<Utc>) -> Result<Vec<Schedule>, AppError> {
        let schedules = sqlx::query_as::<_, Schedule>(
            r#"
            SELECT id, user_id, city_name, status, scheduled_time
            FROM schedules
            WHERE status = 'active' AND scheduled_time < $1
            ORDER BY scheduled_time ASC
            "#,
        )
        .bind(threshold)
        .fetch_all(&self.pool)
        .await?;

        Ok(schedules)
    }
}

/// In-process store used by tests and local wiring.
#[derive(Default)]
pub struct MemoryScheduleStore {
    schedules: Mutex<HashMap<String, Schedule>>,
    failing: AtomicBool,
    saves: AtomicUsize,
}

impl MemoryScheduleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `save` fail until reset.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of `save` calls attempted, failed ones included.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn get(&self, id: &str) -> Option<Schedule> {
        self.schedules.lock().get(id).cloned()
    }

    pub fn all(&self) -> Vec<Schedule> {
        self.schedules.lock().values().cloned().collect()
    }
}

#[async_trait]
impl ScheduleStore for MemoryScheduleStore {
    async fn save(&self, schedule: &Schedule) -> Result<(), AppError> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(AppError::Internal("schedule store unavailable".to_string()));
        }

        self.schedules
            .lock()
            .insert(schedule.id.clone(), schedule.clone());
        Ok(())
    }

    async fn find(&self, id: &str) -> Result<Schedule, AppError> {
        self.get(id)
            .ok_or_else(|| AppError::ScheduleNotFound(id.to_string()))
    }

    async fn find_all_before(&self, threshold: DateTime<Utc>) -> Result<Vec<Schedule>, AppError> {
        let mut due: Vec<Schedule> = self
            .schedules
            .lock()
            .values()
            .filter(|s| s.status == ScheduleStatus::Active && s.scheduled_time < threshold)
            .cloned()
            .collect();
        due.sort_by_key(|s| s.scheduled_time);
        Ok(due)
    }
}
