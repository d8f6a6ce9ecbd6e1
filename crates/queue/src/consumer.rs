//! Worker pool draining a [`DurableQueue`].
//!
//! Each worker runs a strictly sequential loop: pull one delivery, decode the
//! JSON payload, hand it to the [`Processor`], then settle the delivery
//! according to [`Settlement::for_result`]. Workers run in parallel with no
//! ordering guarantee between them.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use skycast_common::error::AppError;

use crate::{Delivery, DurableQueue};

/// Default sleep of an idle worker before it polls the broker again.
const DEFAULT_POLL_INTERVAL_MS: u64 = 250;

const DEFAULT_INSTANCE: &str = "local";

/// Business logic invoked for every decoded message.
///
/// May be called more than once for the same logical message.
#[async_trait]
pub trait Processor: Send + Sync + 'static {
    type Message: DeserializeOwned + Send + 'static;

    async fn handle(&self, message: Self::Message) -> Result<(), AppError>;
}

/// Terminal action chosen for a delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    /// Processed; remove permanently.
    Ack,
    /// Transient failure; deliver again later.
    Requeue,
    /// Poison or permanently failing message; drop.
    Reject,
}

impl Settlement {
    /// Map a processing outcome to its settlement.
    pub fn for_result(result: &Result<(), AppError>) -> Self {
        match result {
            Ok(()) => Settlement::Ack,
            Err(e) if e.is_permanent() => Settlement::Reject,
            Err(_) => Settlement::Requeue,
        }
    }
}

/// Decode `body` and run it through `processor`.
///
/// An undecodable body is rejected without calling the processor.
pub async fn settle_body<P: Processor>(processor: &P, consumer: &str, body: &[u8]) -> Settlement {
    let message: P::Message = match serde_json::from_slice(body) {
        Ok(message) => message,
        Err(e) => {
            tracing::error!(
                consumer,
                body = %String::from_utf8_lossy(body),
                error = %e,
                "Error reading message body"
            );
            return Settlement::Reject;
        }
    };

    let result = processor.handle(message).await;
    let settlement = Settlement::for_result(&result);

    match (&result, settlement) {
        (Err(e), Settlement::Reject) => {
            tracing::error!(consumer, error = %e, "Non retryable error processing message")
        }
        (Err(e), _) => tracing::error!(consumer, error = %e, "Error processing message"),
        (Ok(()), _) => tracing::debug!(consumer, "Message processed"),
    }

    settlement
}

/// A pool of workers consuming one queue.
pub struct Consumer<P: Processor> {
    queue: DurableQueue,
    processor: Arc<P>,
    instance: String,
    poll_interval: Duration,
}

impl<P: Processor> Consumer<P> {
    pub fn new(queue: DurableQueue, processor: Arc<P>) -> Self {
        Self {
            queue,
            processor,
            instance: DEFAULT_INSTANCE.to_string(),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        }
    }

    /// Scope worker names to one process. Each live process needs its own
    /// instance, and a restarted process must reuse the one it had.
    pub fn with_instance(mut self, instance: &str) -> Self {
        self.instance = instance.to_string();
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Stable worker name; a restarted worker reclaims its predecessor's
    /// in-flight messages.
    pub fn worker_name(&self, index: usize) -> String {
        format!("{}-consumer-{}-{}", self.queue.name(), self.instance, index)
    }

    /// Spawn `workers` independent pull loops. They stop once `shutdown`
    /// turns `true` or its sender is dropped.
    pub async fn start(
        &self,
        workers: usize,
        shutdown: watch::Receiver<bool>,
    ) -> Result<Vec<JoinHandle<()>>, AppError> {
        if workers == 0 {
            return Err(AppError::Config(format!(
                "consumer for queue {} needs at least one worker",
                self.queue.name()
            )));
        }

        let names: Vec<String> = (0..workers).map(|index| self.worker_name(index)).collect();

        // Nothing is spawned until every predecessor's leftovers are back
        for name in &names {
            let recovered = self.queue.recover(name).await?;
            if recovered > 0 {
                tracing::warn!(
                    consumer = %name,
                    recovered,
                    "Returned unsettled messages from a previous run to the queue"
                );
            }
        }

        let handles = names
            .into_iter()
            .map(|name| {
                let worker = Worker {
                    name,
                    queue: self.queue.clone(),
                    processor: Arc::clone(&self.processor),
                    poll_interval: self.poll_interval,
                    shutdown: shutdown.clone(),
                    closed: false,
                };
                tokio::spawn(worker.run())
            })
            .collect();

        Ok(handles)
    }
}

struct Worker<P: Processor> {
    name: String,
    queue: DurableQueue,
    processor: Arc<P>,
    poll_interval: Duration,
    shutdown: watch::Receiver<bool>,
    closed: bool,
}

impl<P: Processor> Worker<P> {
    async fn run(mut self) {
        tracing::info!(consumer = %self.name, queue = %self.queue.name(), "Starting consumer");

        while !self.stopping() {
            match self.queue.next_delivery(&self.name).await {
                Ok(Some(delivery)) => self.consume(delivery).await,
                Ok(None) => self.idle().await,
                Err(e) => {
                    tracing::error!(consumer = %self.name, error = %e, "Failed to pull delivery");
                    self.idle().await;
                }
            }
        }

        tracing::info!(consumer = %self.name, "Consumer stopped");
    }

    fn stopping(&self) -> bool {
        self.closed || *self.shutdown.borrow()
    }

    async fn idle(&mut self) {
        tokio::select! {
            _ = tokio::time::sleep(self.poll_interval) => {}
            changed = self.shutdown.changed() => {
                if changed.is_err() {
                    self.closed = true;
                }
            }
        }
    }

    async fn consume(&self, delivery: Delivery) {
        let settlement = settle_body(self.processor.as_ref(), &self.name, delivery.body()).await;

        let result = match settlement {
            Settlement::Ack => delivery.ack().await,
            Settlement::Requeue => delivery.nack(true).await,
            Settlement::Reject => delivery.nack(false).await,
        };

        if let Err(e) = result {
            tracing::error!(
                consumer = %self.name,
                settlement = ?settlement,
                error = %e,
                "Failed to settle delivery"
            );
        }
    }
}
