//! In-process broker with the same ack/nack semantics as the Redis one.
//! Nothing survives a restart; used by tests and local runs.

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use parking_lot::Mutex;

use skycast_common::error::AppError;

use crate::{Broker, Receipt};

#[derive(Default)]
struct MemoryState {
    /// Newest at the front, next to deliver at the back.
    ready: VecDeque<Vec<u8>>,
    in_flight: HashMap<String, Vec<Vec<u8>>>,
    dead: Vec<Vec<u8>>,
    acked: usize,
    unavailable: bool,
}

/// Broker keeping every list in memory.
pub struct MemoryBroker {
    name: String,
    state: Mutex<MemoryState>,
}

impl MemoryBroker {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            state: Mutex::new(MemoryState::default()),
        }
    }

    /// Make every publish fail, simulating an unreachable broker.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.state.lock().unavailable = unavailable;
    }

    pub fn ready_len(&self) -> usize {
        self.state.lock().ready.len()
    }

    pub fn in_flight_len(&self) -> usize {
        self.state.lock().in_flight.values().map(Vec::len).sum()
    }

    pub fn acked_count(&self) -> usize {
        self.state.lock().acked
    }

    pub fn dead_letters(&self) -> Vec<Vec<u8>> {
        self.state.lock().dead.clone()
    }

    /// Ready payloads in delivery order.
    pub fn ready_messages(&self) -> Vec<Vec<u8>> {
        self.state.lock().ready.iter().rev().cloned().collect()
    }

    fn take_in_flight(state: &mut MemoryState, receipt: &Receipt) -> Result<(), AppError> {
        let pending = state
            .in_flight
            .get_mut(&receipt.consumer)
            .ok_or_else(|| AppError::Internal(format!("unknown consumer {}", receipt.consumer)))?;

        let position = pending
            .iter()
            .position(|payload| *payload == receipt.payload)
            .ok_or_else(|| AppError::Internal("delivery already settled".to_string()))?;

        pending.remove(position);
        Ok(())
    }
}

#[async_trait]
impl Broker for MemoryBroker {
    fn queue_name(&self) -> &str {
        &self.name
    }

    async fn publish(&self, payload: &[u8]) -> Result<(), AppError> {
        let mut state = self.state.lock();
        if state.unavailable {
            return Err(AppError::Internal("broker unavailable".to_string()));
        }
        state.ready.push_front(payload.to_vec());
        Ok(())
    }

    async fn receive(&self, consumer: &str) -> Result<Option<Receipt>, AppError> {
        let mut state = self.state.lock();
        let Some(payload) = state.ready.pop_back() else {
            return Ok(None);
        };

        state
            .in_flight
            .entry(consumer.to_string())
            .or_default()
            .push(payload.clone());

        Ok(Some(Receipt {
            consumer: consumer.to_string(),
            payload,
        }))
    }

    async fn ack(&self, receipt: &Receipt) -> Result<(), AppError> {
        let mut state = self.state.lock();
        Self::take_in_flight(&mut state, receipt)?;
        state.acked += 1;
        Ok(())
    }

    async fn nack(&self, receipt: &Receipt, requeue: bool) -> Result<(), AppError> {
        let mut state = self.state.lock();
        Self::take_in_flight(&mut state, receipt)?;
        if requeue {
            state.ready.push_front(receipt.payload.clone());
        } else {
            state.dead.push(receipt.payload.clone());
        }
        Ok(())
    }

    async fn recover(&self, consumer: &str) -> Result<usize, AppError> {
        let mut state = self.state.lock();
        let leftovers = state.in_flight.remove(consumer).unwrap_or_default();
        let count = leftovers.len();
        // Oldest leftover ends up next in line
        for payload in leftovers.into_iter().rev() {
            state.ready.push_back(payload);
        }
        Ok(count)
    }
}
