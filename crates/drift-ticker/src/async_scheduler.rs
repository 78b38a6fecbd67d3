//! Tokio-backed one-shot scheduler.
//!
//! Each one-shot is a spawned task that sleeps and then runs; cancelling
//! aborts it. On a multi-threaded runtime two one-shots can run
//! concurrently, but the ticker only ever keeps one in flight.

use std::time::Duration;
use tokio::runtime::{Handle, TryCurrentError};
use tokio::task::JoinHandle;

use crate::scheduler::{OneShotScheduler, Task};

/// Scheduler spawning one-shots onto a Tokio runtime.
#[derive(Debug, Clone)]
pub struct TokioScheduler {
    runtime: Handle,
}

impl TokioScheduler {
    /// Schedule onto the given runtime.
    pub fn new(runtime: Handle) -> Self {
        Self { runtime }
    }

    /// Schedule onto the runtime of the calling context.
    ///
    /// # Errors
    ///
    /// Returns an error when called outside a Tokio runtime.
    pub fn current() -> Result<Self, TryCurrentError> {
        Handle::try_current().map(Self::new)
    }
}

impl OneShotScheduler for TokioScheduler {
    type Handle = JoinHandle<()>;

    fn schedule(&self, delay_ms: u64, task: Task) -> JoinHandle<()> {
        self.runtime.spawn(async move {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            task();
        })
    }

    fn cancel(&self, handle: JoinHandle<()>) {
        handle.abort();
    }
}
