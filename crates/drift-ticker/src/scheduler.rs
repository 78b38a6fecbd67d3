//! One-shot delayed execution.
//!
//! The ticker never sleeps itself. Each tick hands the next one to a
//! [`OneShotScheduler`] and keeps the returned handle so `stop()` can cancel
//! it. Cancelling strictly before the task fires guarantees it never runs.
//!
//! [`ThreadScheduler`] runs every task on one dedicated timer thread, so
//! tasks never overlap.

use parking_lot::{Condvar, Mutex, MutexGuard};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Work item run by a scheduler once its delay has elapsed.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// External primitive that runs a task once after a delay.
pub trait OneShotScheduler: Send + Sync + 'static {
    /// Opaque cancellation handle.
    type Handle: Send + 'static;

    /// Run `task` after `delay_ms` milliseconds.
    fn schedule(&self, delay_ms: u64, task: Task) -> Self::Handle;

    /// Prevent a scheduled task from running. Has no effect if it already ran.
    fn cancel(&self, handle: Self::Handle);
}

/// Handle to a task scheduled on a [`ThreadScheduler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

#[derive(Default)]
struct TimerQueue {
    next_id: u64,
    deadlines: BinaryHeap<Reverse<(Instant, u64)>>,
    tasks: HashMap<u64, Task>,
    shutdown: bool,
}

#[derive(Default)]
struct TimerShared {
    queue: Mutex<TimerQueue>,
    wakeup: Condvar,
}

/// Scheduler backed by a dedicated timer thread.
///
/// Deadlines live in a min-heap; the thread waits on a condvar until the
/// earliest one or until a new task is inserted. Cancelled tasks are removed
/// from the task table and their heap entries skipped lazily.
pub struct ThreadScheduler {
    shared: Arc<TimerShared>,
    worker: Option<JoinHandle<()>>,
}

impl ThreadScheduler {
    /// Spawn the timer thread.
    ///
    /// # Errors
    ///
    /// Returns the I/O error from the OS if the thread cannot be spawned.
    pub fn new() -> std::io::Result<Self> {
        let shared = Arc::new(TimerShared::default());
        let worker_shared = Arc::clone(&shared);
        let worker = thread::Builder::new()
            .name("drift-ticker-timer".to_string())
            .spawn(move || run_timer_loop(&worker_shared))?;

        Ok(Self {
            shared,
            worker: Some(worker),
        })
    }

    /// Number of tasks waiting to fire.
    pub fn pending(&self) -> usize {
        self.shared.queue.lock().tasks.len()
    }
}

impl std::fmt::Debug for ThreadScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadScheduler")
            .field("pending", &self.pending())
            .finish_non_exhaustive()
    }
}

impl OneShotScheduler for ThreadScheduler {
    type Handle = TimerId;

    fn schedule(&self, delay_ms: u64, task: Task) -> TimerId {
        let deadline = Instant::now() + Duration::from_millis(delay_ms);
        let mut queue = self.shared.queue.lock();
        let id = queue.next_id;
        queue.next_id = queue.next_id.wrapping_add(1);
        queue.deadlines.push(Reverse((deadline, id)));
        queue.tasks.insert(id, task);
        drop(queue);

        self.shared.wakeup.notify_one();
        TimerId(id)
    }

    fn cancel(&self, handle: TimerId) {
        let removed = self.shared.queue.lock().tasks.remove(&handle.0);
        // Dropped outside the lock; the task may own arbitrary state.
        drop(removed);
    }
}

impl Drop for ThreadScheduler {
    fn drop(&mut self) {
        let tasks = {
            let mut queue = self.shared.queue.lock();
            queue.shutdown = true;
            queue.deadlines.clear();
            std::mem::take(&mut queue.tasks)
        };
        drop(tasks);
        self.shared.wakeup.notify_all();

        if let Some(worker) = self.worker.take() {
            // The last owner can be released from inside a task; joining
            // the timer thread from itself would never return.
            if worker.thread().id() != thread::current().id() && worker.join().is_err() {
                tracing::warn!("Timer thread panicked during shutdown");
            }
        }
    }
}

fn run_timer_loop(shared: &TimerShared) {
    let mut queue = shared.queue.lock();
    loop {
        if queue.shutdown {
            break;
        }

        let Some(&Reverse((deadline, id))) = queue.deadlines.peek() else {
            shared.wakeup.wait(&mut queue);
            continue;
        };

        if !queue.tasks.contains_key(&id) {
            queue.deadlines.pop();
            continue;
        }

        if Instant::now() < deadline {
            let _timed_out = shared.wakeup.wait_until(&mut queue, deadline);
            continue;
        }

        queue.deadlines.pop();
        if let Some(task) = queue.tasks.remove(&id) {
            MutexGuard::unlocked(&mut queue, task);
        }
    }
}
