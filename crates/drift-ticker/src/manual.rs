//! Deterministic clock and scheduler for tests and simulations.
//!
//! Both types are cheap to clone and share their state, so a test keeps one
//! copy to drive time while the ticker owns another.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::clock::Clock;
use crate::scheduler::{OneShotScheduler, Task};

/// Synthetic clock whose reading only changes when told to.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now_bits: Arc<AtomicU64>,
}

impl ManualClock {
    /// Create a clock reading `start_ms`.
    pub fn new(start_ms: f64) -> Self {
        Self {
            now_bits: Arc::new(AtomicU64::new(start_ms.to_bits())),
        }
    }

    /// Set the current reading.
    pub fn set(&self, now_ms: f64) {
        self.now_bits.store(now_ms.to_bits(), Ordering::Release);
    }

    /// Move the reading forward by `delta_ms`.
    pub fn advance(&self, delta_ms: f64) {
        self.set(self.now_ms() + delta_ms);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> f64 {
        f64::from_bits(self.now_bits.load(Ordering::Acquire))
    }
}

/// Handle to a task queued on a [`ManualScheduler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ManualHandle(u64);

struct QueuedTask {
    id: u64,
    delay_ms: u64,
    task: Task,
}

#[derive(Default)]
struct ManualState {
    next_id: u64,
    queue: VecDeque<QueuedTask>,
    scheduled_delays: Vec<u64>,
    cancelled: u64,
}

/// Scheduler that only runs tasks when the test fires them.
///
/// Tasks are fired in the order they were scheduled, regardless of their
/// delay; the delay is recorded so tests can assert what the ticker asked
/// for.
#[derive(Clone, Default)]
pub struct ManualScheduler {
    state: Arc<Mutex<ManualState>>,
}

impl ManualScheduler {
    /// Create an empty scheduler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Run the oldest pending task. Returns `false` if nothing was pending.
    pub fn fire_next(&self) -> bool {
        let next = self.state.lock().queue.pop_front();
        match next {
            Some(queued) => {
                (queued.task)();
                true
            }
            None => false,
        }
    }

    /// Fire up to `count` tasks; returns how many ran.
    pub fn fire(&self, count: usize) -> usize {
        (0..count).take_while(|_| self.fire_next()).count()
    }

    /// Number of tasks waiting to be fired.
    pub fn pending(&self) -> usize {
        self.state.lock().queue.len()
    }

    /// Delay of the oldest pending task.
    pub fn next_delay_ms(&self) -> Option<u64> {
        self.state.lock().queue.front().map(|queued| queued.delay_ms)
    }

    /// Every delay ever passed to `schedule`, in order.
    pub fn scheduled_delays(&self) -> Vec<u64> {
        self.state.lock().scheduled_delays.clone()
    }

    /// Number of successful cancellations.
    pub fn cancelled(&self) -> u64 {
        self.state.lock().cancelled
    }
}

impl std::fmt::Debug for ManualScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("ManualScheduler")
            .field("pending", &state.queue.len())
            .field("scheduled", &state.scheduled_delays.len())
            .field("cancelled", &state.cancelled)
            .finish()
    }
}

impl OneShotScheduler for ManualScheduler {
    type Handle = ManualHandle;

    fn schedule(&self, delay_ms: u64, task: Task) -> ManualHandle {
        let mut state = self.state.lock();
        let id = state.next_id;
        state.next_id = state.next_id.wrapping_add(1);
        state.scheduled_delays.push(delay_ms);
        state.queue.push_back(QueuedTask { id, delay_ms, task });
        ManualHandle(id)
    }

    fn cancel(&self, handle: ManualHandle) {
        let removed = {
            let mut state = self.state.lock();
            let position = state.queue.iter().position(|queued| queued.id == handle.0);
            let removed = position.and_then(|index| state.queue.remove(index));
            if removed.is_some() {
                state.cancelled = state.cancelled.saturating_add(1);
            }
            removed
        };
        drop(removed);
    }
}
