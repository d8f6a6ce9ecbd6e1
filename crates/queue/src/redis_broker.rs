//! Redis reliable-queue broker.
//!
//! Key layout for queue `q`:
//! - `q` — ready list. Producers `LPUSH`, consumers take from the right.
//! - `q:processing:<consumer>` — in-flight list of one worker.
//! - `q:dead` — messages dropped with `nack(requeue = false)`.
//!
//! Receiving is an atomic `LMOVE` from the ready list into the worker's
//! in-flight list, so a crash between receive and settle leaves the message
//! recoverable. Durability across Redis restarts depends on the server's
//! AOF/RDB settings.

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;

use skycast_common::error::AppError;

use crate::{Broker, Receipt};

/// Broker backed by Redis lists.
#[derive(Clone)]
pub struct RedisBroker {
    redis: ConnectionManager,
    queue: String,
}

impl RedisBroker {
    pub fn new(redis: ConnectionManager, queue: &str) -> Self {
        Self {
            redis,
            queue: queue.to_string(),
        }
    }

    fn processing_key(&self, consumer: &str) -> String {
        format!("{}:processing:{}", self.queue, consumer)
    }

    fn dead_letter_key(&self) -> String {
        format!("{}:dead", self.queue)
    }
}

#[async_trait]
impl Broker for RedisBroker {
    fn queue_name(&self) -> &str {
        &self.queue
    }

    async fn publish(&self, payload: &[u8]) -> Result<(), AppError> {
        let mut conn = self.redis.clone();
        let _: i64 = conn.lpush(&self.queue, payload).await?;
        Ok(())
    }

    async fn receive(&self, consumer: &str) -> Result<Option<Receipt>, AppError> {
        let mut conn = self.redis.clone();

        // LMOVE ready processing RIGHT LEFT
        // Returns nil when the ready list is empty
        let payload: Option<Vec<u8>> = redis::cmd("LMOVE")
            .arg(&self.queue)
            .arg(self.processing_key(consumer))
            .arg("RIGHT")
            .arg("LEFT")
            .query_async(&mut conn)
            .await?;

        Ok(payload.map(|payload| Receipt {
            consumer: consumer.to_string(),
            payload,
        }))
    }

    async fn ack(&self, receipt: &Receipt) -> Result<(), AppError> {
        let mut conn = self.redis.clone();
        let removed: i64 = conn
            .lrem(self.processing_key(&receipt.consumer), 1, &receipt.payload)
            .await?;

        if removed == 0 {
            tracing::warn!(
                queue = %self.queue,
                consumer = %receipt.consumer,
                "Acked message was not in the in-flight list"
            );
        }

        Ok(())
    }

    async fn nack(&self, receipt: &Receipt, requeue: bool) -> Result<(), AppError> {
        let mut conn = self.redis.clone();
        let target = if requeue {
            self.queue.clone()
        } else {
            self.dead_letter_key()
        };

        let _: () = redis::pipe()
            .atomic()
            .lrem(self.processing_key(&receipt.consumer), 1, &receipt.payload)
            .ignore()
            .lpush(target, &receipt.payload)
            .ignore()
            .query_async(&mut conn)
            .await?;

        Ok(())
    }

    async fn recover(&self, consumer: &str) -> Result<usize, AppError> {
        let mut conn = self.redis.clone();
        let processing = self.processing_key(consumer);
        let mut moved = 0;

        // Newest leftover first onto the consuming end, so the oldest is retried first
        loop {
            let payload: Option<Vec<u8>> = redis::cmd("LMOVE")
                .arg(&processing)
                .arg(&self.queue)
                .arg("LEFT")
                .arg("RIGHT")
                .query_async(&mut conn)
                .await?;

            if payload.is_none() {
                break;
            }
            moved += 1;
        }

        Ok(moved)
    }
}
