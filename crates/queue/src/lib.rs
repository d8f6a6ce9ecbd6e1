//! Durable, at-least-once message queue.
//!
//! A [`Broker`] owns one logical queue. Producers go through
//! [`DurableQueue::publish`]; consumers pull [`Delivery`] handles, each of
//! which must be settled exactly once with [`Delivery::ack`] or
//! [`Delivery::nack`]. The [`consumer`] module runs worker pools on top.

pub mod consumer;
pub mod memory;
pub mod redis_broker;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use skycast_common::error::AppError;

pub use consumer::{Consumer, Processor, Settlement};
pub use memory::MemoryBroker;
pub use redis_broker::RedisBroker;

/// Broker-side identity of one in-flight message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    /// Worker that pulled the message.
    pub consumer: String,
    /// Raw payload, exactly as published.
    pub payload: Vec<u8>,
}

/// Storage backend of a single durable queue.
///
/// Implementations must persist a message before `publish` returns and keep
/// a received message in a per-consumer in-flight area until it is acked or
/// nacked.
#[async_trait]
pub trait Broker: Send + Sync {
    /// Name of the logical queue this broker serves.
    fn queue_name(&self) -> &str;

    async fn publish(&self, payload: &[u8]) -> Result<(), AppError>;

    /// Move the oldest ready message into `consumer`'s in-flight area.
    /// Returns `None` when the queue is empty.
    async fn receive(&self, consumer: &str) -> Result<Option<Receipt>, AppError>;

    async fn ack(&self, receipt: &Receipt) -> Result<(), AppError>;

    /// `requeue = true` makes the message ready again; `false` drops it to
    /// the dead-letter area.
    async fn nack(&self, receipt: &Receipt, requeue: bool) -> Result<(), AppError>;

    /// Return everything left in `consumer`'s in-flight area to the ready
    /// list. Returns the number of messages moved.
    async fn recover(&self, consumer: &str) -> Result<usize, AppError>;
}

/// One dequeued message. Settling consumes the handle, so a delivery can be
/// acked or nacked only once.
#[must_use = "a delivery must be settled with ack() or nack()"]
pub struct Delivery {
    receipt: Receipt,
    broker: Arc<dyn Broker>,
}

impl Delivery {
    pub fn body(&self) -> &[u8] {
        &self.receipt.payload
    }

    pub fn consumer(&self) -> &str {
        &self.receipt.consumer
    }

    /// Remove the message permanently.
    pub async fn ack(self) -> Result<(), AppError> {
        self.broker.ack(&self.receipt).await
    }

    /// Re-deliver later (`requeue = true`) or drop as poison (`false`).
    pub async fn nack(self, requeue: bool) -> Result<(), AppError> {
        self.broker.nack(&self.receipt, requeue).await
    }
}

impl std::fmt::Debug for Delivery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Delivery")
            .field("queue", &self.broker.queue_name())
            .field("consumer", &self.receipt.consumer)
            .field("bytes", &self.receipt.payload.len())
            .finish()
    }
}

/// Typed front of a broker: JSON-encodes outgoing messages and wraps
/// incoming ones in [`Delivery`] handles.
#[derive(Clone)]
pub struct DurableQueue {
    broker: Arc<dyn Broker>,
}

impl DurableQueue {
    pub fn new(broker: Arc<dyn Broker>) -> Self {
        Self { broker }
    }

    pub fn name(&self) -> &str {
        self.broker.queue_name()
    }

    /// Encode `message` as JSON and publish it.
    ///
    /// Fails with `PublishFailed` when encoding or the broker write fails.
    pub async fn publish<T: Serialize + Sync>(&self, message: &T) -> Result<(), AppError> {
        let body = serde_json::to_vec(message).map_err(|e| {
            AppError::publish_failed(AppError::Internal(format!(
                "failed to encode message: {}",
                e
            )))
        })?;

        self.broker
            .publish(&body)
            .await
            .map_err(AppError::publish_failed)?;

        tracing::debug!(queue = %self.name(), bytes = body.len(), "Message published");
        Ok(())
    }

    /// Pull the next message for `consumer`, if any is ready.
    pub async fn next_delivery(&self, consumer: &str) -> Result<Option<Delivery>, AppError> {
        let receipt = self.broker.receive(consumer).await?;

        Ok(receipt.map(|receipt| Delivery {
            receipt,
            broker: Arc::clone(&self.broker),
        }))
    }

    /// Hand back messages a previous run of `consumer` never settled.
    pub async fn recover(&self, consumer: &str) -> Result<usize, AppError> {
        self.broker.recover(consumer).await
    }
}

impl std::fmt::Debug for DurableQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DurableQueue")
            .field("name", &self.name())
            .finish()
    }
}
