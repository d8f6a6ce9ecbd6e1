//! Poller lease: which instance may arm timers for the current interval.
//!
//! Uses Redis `SET NX PX` to take the lease and a compare-and-extend script so
//! only the current holder can renew or release it.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use uuid::Uuid;

use skycast_common::error::AppError;

const RENEW_SCRIPT: &str = r#"
if redis.call('GET', KEYS[1]) == ARGV[1] then
    return redis.call('PEXPIRE', KEYS[1], ARGV[2])
else
    return 0
end
"#;

const RELEASE_SCRIPT: &str = r#"
if redis.call('GET', KEYS[1]) == ARGV[1] then
    return redis.call('DEL', KEYS[1])
else
    return 0
end
"#;

#[async_trait]
pub trait PollerLease: Send + Sync {
    /// Take or renew the lease. `false` means another instance holds it.
    async fn acquire(&self) -> Result<bool, AppError>;

    async fn release(&self) -> Result<(), AppError>;
}

/// Redis-backed lease stored at `<prefix>:poller-lease`.
pub struct RedisLease {
    redis: ConnectionManager,
    key: String,
    holder: String,
    ttl: Duration,
}

impl RedisLease {
    pub fn new(redis: ConnectionManager, prefix: &str, ttl: Duration) -> Self {
        Self {
            redis,
            key: format!("{}:poller-lease", prefix),
            holder: Uuid::new_v4().to_string(),
            ttl,
        }
    }

    pub fn holder(&self) -> &str {
        &self.holder
    }

    fn ttl_ms(&self) -> u64 {
        self.ttl.as_millis().max(1) as u64
    }
}

#[async_trait]
impl PollerLease for RedisLease {
    async fn acquire(&self) -> Result<bool, AppError> {
        let mut redis = self.redis.clone();

        // SET key holder NX PX ttl
        let taken: Option<String> = redis::cmd("SET")
            .arg(&self.key)
            .arg(&self.holder)
            .arg("NX")
            .arg("PX")
            .arg(self.ttl_ms())
            .query_async(&mut redis)
            .await?;

        if taken.is_some() {
            tracing::info!(key = %self.key, holder = %self.holder, "Poller lease acquired");
            return Ok(true);
        }

        let renewed: i64 = redis::Script::new(RENEW_SCRIPT)
            .key(&self.key)
            .arg(&self.holder)
            .arg(self.ttl_ms())
            .invoke_async(&mut redis)
            .await?;

        Ok(renewed == 1)
    }

    async fn release(&self) -> Result<(), AppError> {
        let mut redis = self.redis.clone();
        let _: i64 = redis::Script::new(RELEASE_SCRIPT)
            .key(&self.key)
            .arg(&self.holder)
            .invoke_async(&mut redis)
            .await?;
        Ok(())
    }
}

/// Lease that is always granted, for deployments running a single worker.
pub struct SingleInstanceLease;

#[async_trait]
impl PollerLease for SingleInstanceLease {
    async fn acquire(&self) -> Result<bool, AppError> {
        Ok(true)
    }

    async fn release(&self) -> Result<(), AppError> {
        Ok(())
    }
}
