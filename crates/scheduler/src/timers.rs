//! Registry of armed delivery timers.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

struct Timer {
    stop: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

/// One delayed task per schedule id. An entry lives from `arm` until its task
/// finishes or the arena is cancelled.
#[derive(Clone, Default)]
pub struct TimerArena {
    timers: Arc<Mutex<HashMap<String, Timer>>>,
}

impl TimerArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `fire` after `delay` unless a timer for `id` is already armed.
    ///
    /// Returns `false` when the id was already armed.
    pub fn arm<F>(&self, id: &str, delay: Duration, fire: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        // Held across the spawn so the task cannot deregister before it is registered
        let mut timers = self.timers.lock();
        if timers.contains_key(id) {
            return false;
        }

        let (stop, stopped) = oneshot::channel();
        let arena = Arc::clone(&self.timers);
        let key = id.to_string();
        let task = tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = stopped => return,
                _ = tokio::time::sleep(delay) => {}
            }
            fire.await;
            arena.lock().remove(&key);
        });

        timers.insert(id.to_string(), Timer { stop, task });
        true
    }

    pub fn is_armed(&self, id: &str) -> bool {
        self.timers.lock().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.timers.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stop every timer still waiting and wait for the ones already firing
    /// to finish. Returns how many were stopped before they fired.
    pub async fn cancel_all(&self) -> usize {
        let drained: Vec<Timer> = self.timers.lock().drain().map(|(_, t)| t).collect();

        let mut cancelled = 0;
        let mut tasks = Vec::with_capacity(drained.len());
        for timer in drained {
            // The receiver is gone once the sleep is over
            if timer.stop.send(()).is_ok() {
                cancelled += 1;
            }
            tasks.push(timer.task);
        }

        for task in tasks {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "Timer task ended abnormally");
            }
        }

        cancelled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test(start_paused = true)]
    async fn test_same_id_is_armed_once() {
        let arena = TimerArena::new();
        let fired = Arc::new(AtomicUsize::new(0));

        for _ in 0..2 {
            let fired = fired.clone();
            arena.arm("SCHEDULE-1", Duration::from_secs(10), async move {
                fired.fetch_add(1, Ordering::SeqCst);
            });
        }
        assert_eq!(arena.len(), 1);

        tokio::time::sleep(Duration::from_secs(11)).await;

        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(arena.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_id_can_be_rearmed_after_firing() {
        let arena = TimerArena::new();

        assert!(arena.arm("SCHEDULE-1", Duration::from_secs(1), async {}));
        tokio::time::sleep(Duration::from_secs(2)).await;

        assert!(!arena.is_armed("SCHEDULE-1"));
        assert!(arena.arm("SCHEDULE-1", Duration::from_secs(1), async {}));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_all_prevents_firing() {
        let arena = TimerArena::new();
        let fired = Arc::new(AtomicUsize::new(0));

        for id in ["a", "b", "c"] {
            let fired = fired.clone();
            arena.arm(id, Duration::from_secs(5), async move {
                fired.fetch_add(1, Ordering::SeqCst);
            });
        }

        assert_eq!(arena.cancel_all().await, 3);
        tokio::time::sleep(Duration::from_secs(10)).await;

        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert!(arena.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_all_waits_for_timer_already_firing() {
        let arena = TimerArena::new();
        let fired = Arc::new(AtomicUsize::new(0));

        {
            let fired = fired.clone();
            arena.arm("slow", Duration::from_secs(1), async move {
                tokio::time::sleep(Duration::from_millis(500)).await;
                fired.fetch_add(1, Ordering::SeqCst);
            });
        }
        arena.arm("waiting", Duration::from_secs(30), async {});

        // "slow" is halfway through its fire future
        tokio::time::sleep(Duration::from_millis(1200)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        assert_eq!(arena.cancel_all().await, 1);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(arena.is_empty());
    }
}
