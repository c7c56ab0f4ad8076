//! Periodic scheduler — runs named tasks on fixed intervals.
//!
//! Each task gets its own tokio loop. Tick boundaries are wall-clock periodic,
//! but the loop awaits the running invocation before looking at the next tick,
//! so a task never overlaps with itself: ticks that pass while an invocation
//! is still running are skipped.

use futures::FutureExt;
use herald_core::error::Result;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::{Instant, MissedTickBehavior};

struct Shared {
    cancelled: Mutex<bool>,
    wake: Notify,
    invocations: AtomicU64,
}

impl Shared {
    fn is_cancelled(&self) -> bool {
        match self.cancelled.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

/// Handle to one periodic task.
pub struct TaskHandle {
    name: String,
    shared: Arc<Shared>,
    join: tokio::task::JoinHandle<()>,
}

impl TaskHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stop the task. No invocation starts after this returns; one already
    /// running is left to finish.
    pub fn cancel(&self) {
        let mut cancelled = match self.shared.cancelled.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *cancelled = true;
        self.shared.wake.notify_one();
    }

    pub fn is_cancelled(&self) -> bool {
        self.shared.is_cancelled()
    }

    /// Number of invocations started so far.
    pub fn invocations(&self) -> u64 {
        self.shared.invocations.load(Ordering::SeqCst)
    }

    /// Wait for the loop to exit. Only returns after `cancel`.
    pub async fn join(self) {
        if let Err(e) = self.join.await {
            tracing::error!("Scheduler loop '{}' ended abnormally: {e}", self.name);
        }
    }
}

/// Registry of running periodic tasks.
#[derive(Default)]
pub struct PeriodicScheduler {
    handles: Vec<TaskHandle>,
}

impl PeriodicScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start `task` every `every`, first firing one interval from now.
    pub fn start<F, Fut>(name: &str, every: Duration, task: F) -> TaskHandle
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let shared = Arc::new(Shared {
            cancelled: Mutex::new(false),
            wake: Notify::new(),
            invocations: AtomicU64::new(0),
        });
        let join = tokio::spawn(run_loop(name.to_string(), every, shared.clone(), task));
        tracing::debug!("Scheduled '{name}' every {}s", every.as_secs_f64());

        TaskHandle {
            name: name.to_string(),
            shared,
            join,
        }
    }

    /// Start a task and keep its handle in the registry.
    pub fn spawn<F, Fut>(&mut self, name: &str, every: Duration, task: F)
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.handles.push(Self::start(name, every, task));
    }

    pub fn task_names(&self) -> Vec<&str> {
        self.handles.iter().map(|h| h.name()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&TaskHandle> {
        self.handles.iter().find(|h| h.name() == name)
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Cancel every task, then wait for in-flight invocations to finish.
    pub async fn shutdown(self) {
        for handle in &self.handles {
            handle.cancel();
        }
        for handle in self.handles {
            let name = handle.name.clone();
            handle.join().await;
            tracing::debug!("Task '{name}' stopped");
        }
        tracing::info!("Scheduler stopped");
    }
}

async fn run_loop<F, Fut>(name: String, every: Duration, shared: Arc<Shared>, mut task: F)
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    let mut ticker = tokio::time::interval_at(Instant::now() + every, every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = shared.wake.notified() => break,
            _ = ticker.tick() => {}
        }

        // The cancel flag is checked and the invocation started under one lock,
        // so `cancel` either sees this invocation as in flight or prevents it.
        let invocation = {
            let cancelled = match shared.cancelled.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            if *cancelled {
                break;
            }
            shared.invocations.fetch_add(1, Ordering::SeqCst);
            // A panic while building the future is caught here, before it can
            // poison the lock or unwind out of the loop.
            std::panic::catch_unwind(AssertUnwindSafe(|| task()))
        };
        let Ok(invocation) = invocation else {
            tracing::error!("Task '{name}' panicked, continuing");
            continue;
        };

        match AssertUnwindSafe(invocation).catch_unwind().await {
            Ok(Ok(())) => tracing::trace!("Task '{name}' tick done"),
            Ok(Err(e)) => tracing::warn!("Task '{name}' failed: {e}"),
            Err(_) => tracing::error!("Task '{name}' panicked, continuing"),
        }
    }
}
