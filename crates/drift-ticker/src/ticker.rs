//! Self-correcting periodic ticker.
//!
//! A [`Ticker`] invokes its callback every `period` milliseconds using a
//! one-shot scheduler, and compensates for the lateness such schedulers
//! accumulate. On every tick it compares the actual elapsed time with the
//! ideal *logical* time and feeds the error into a [`DriftCorrector`], which
//! shortens the delay of the next one-shot while the ticker runs late.
//!
//! # Tick step
//!
//! 1. read `now` from the clock resolved at construction
//! 2. `error = (now - start_time) - logical_time`
//! 3. let the corrector adjust the effective period
//! 4. schedule the next tick after the effective period
//! 5. invoke the callback with `(logical_time, now, error)`
//! 6. advance `logical_time` by the *requested* period
//!
//! The next tick is scheduled before the callback runs so callback latency
//! never delays the cadence. Logical time only advances by the requested
//! period in force after the callback returns, keeping the reference against
//! which error is measured undrifted. The advance is skipped when the
//! callback stopped or restarted the ticker.
//!
//! # Concurrency
//!
//! State sits behind a mutex that is released before the callback runs, so
//! the callback may call [`Ticker::stop`], [`Ticker::start`] or
//! [`Ticker::set_period`] on its own ticker (through a [`WeakTicker`] to
//! avoid a reference cycle). Each `start()` opens a new generation; one-shots
//! from an earlier generation, or that fire after `stop()`, do nothing.
//!
//! Tick steps are serialized by a re-entrant dispatch lock held from the
//! clock read to the logical-time advance. A one-shot firing on another
//! thread while the callback runs waits for the advance; a `start()` issued
//! from inside the callback ticks on the same thread without blocking.
//!
//! # Example
//!
//! ```
//! use drift_ticker::manual::{ManualClock, ManualScheduler};
//! use drift_ticker::{Ticker, TickerConfig};
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! let clock = ManualClock::new(0.0);
//! let scheduler = ManualScheduler::new();
//! let ticks = Arc::new(AtomicUsize::new(0));
//! let counter = Arc::clone(&ticks);
//!
//! let ticker = Ticker::with_clock(
//!     20.0,
//!     move |_tick| {
//!         counter.fetch_add(1, Ordering::SeqCst);
//!     },
//!     TickerConfig::default(),
//!     Arc::new(clock.clone()),
//!     scheduler.clone(),
//! )?;
//!
//! ticker.start();
//! clock.set(20.0);
//! scheduler.fire_next();
//! ticker.stop();
//!
//! assert_eq!(ticks.load(Ordering::SeqCst), 2);
//! # Ok::<(), drift_ticker::TickerError>(())
//! ```

use parking_lot::{Mutex, ReentrantMutex};
use std::sync::{Arc, Weak};

use crate::clock::{Clock, ClockKind};
use crate::config::TickerConfig;
use crate::corrector::{Correction, DriftCorrector, truncate_period};
use crate::error::TickerResult;
use crate::scheduler::{OneShotScheduler, ThreadScheduler};
use crate::stats::DriftStats;

/// Values passed to the callback on every tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tick {
    /// Ideal time since `start()` (milliseconds).
    pub logical_time_ms: f64,
    /// Clock reading when the tick ran (milliseconds).
    pub now_ms: f64,
    /// Actual elapsed time minus logical time (milliseconds).
    ///
    /// Positive when the tick fired late, negative when early.
    pub error_ms: f64,
}

/// Shared callback invoked on every tick.
pub type TickCallback = Arc<dyn Fn(Tick) + Send + Sync>;

struct TickerState<H> {
    corrector: DriftCorrector,
    running: bool,
    generation: u64,
    start_time_ms: f64,
    logical_time_ms: f64,
    pending: Option<H>,
    stats: DriftStats,
}

struct Inner<S: OneShotScheduler> {
    dispatch: ReentrantMutex<()>,
    state: Mutex<TickerState<S::Handle>>,
    callback: TickCallback,
    clock: Arc<dyn Clock>,
    clock_kind: ClockKind,
    scheduler: S,
}

/// Periodic ticker with drift correction.
///
/// Cloning yields another handle to the same ticker. When the last handle
/// is dropped the pending one-shot is cancelled.
pub struct Ticker<S: OneShotScheduler = ThreadScheduler> {
    inner: Arc<Inner<S>>,
}

/// Non-owning handle to a [`Ticker`], for use inside its own callback.
pub struct WeakTicker<S: OneShotScheduler = ThreadScheduler> {
    inner: Weak<Inner<S>>,
}

impl Ticker<ThreadScheduler> {
    /// Create a ticker driven by a dedicated timer thread.
    ///
    /// `period_ms` is truncated toward zero. The clock named by
    /// `config.clock` is resolved here and used for the ticker's lifetime.
    ///
    /// # Errors
    ///
    /// - [`crate::TickerError::InvalidPeriod`] for a NaN, infinite or negative period
    /// - [`crate::TickerError::InvalidErrorThreshold`] for a bad threshold
    /// - [`crate::TickerError::ClockUnavailable`] if the clock cannot be resolved
    /// - [`crate::TickerError::SchedulerUnavailable`] if the timer thread cannot start
    pub fn new<F>(period_ms: f64, callback: F, config: TickerConfig) -> TickerResult<Self>
    where
        F: Fn(Tick) + Send + Sync + 'static,
    {
        Self::with_scheduler(period_ms, callback, config, ThreadScheduler::new()?)
    }
}

impl<S: OneShotScheduler> Ticker<S> {
    /// Create a ticker on a caller-supplied one-shot scheduler.
    ///
    /// # Errors
    ///
    /// Same as [`Ticker::new`], except for scheduler creation.
    pub fn with_scheduler<F>(
        period_ms: f64,
        callback: F,
        config: TickerConfig,
        scheduler: S,
    ) -> TickerResult<Self>
    where
        F: Fn(Tick) + Send + Sync + 'static,
    {
        let (clock_kind, clock) = config.clock.resolve()?;
        Self::build(period_ms, Arc::new(callback), &config, clock, clock_kind, scheduler)
    }

    /// Create a ticker with an injected clock.
    ///
    /// `config.clock` is ignored and [`Ticker::clock_kind`] reports
    /// [`ClockKind::Custom`].
    ///
    /// # Errors
    ///
    /// Returns an error for an invalid period or error threshold.
    pub fn with_clock<F>(
        period_ms: f64,
        callback: F,
        config: TickerConfig,
        clock: Arc<dyn Clock>,
        scheduler: S,
    ) -> TickerResult<Self>
    where
        F: Fn(Tick) + Send + Sync + 'static,
    {
        Self::build(
            period_ms,
            Arc::new(callback),
            &config,
            clock,
            ClockKind::Custom,
            scheduler,
        )
    }

    fn build(
        period_ms: f64,
        callback: TickCallback,
        config: &TickerConfig,
        clock: Arc<dyn Clock>,
        clock_kind: ClockKind,
        scheduler: S,
    ) -> TickerResult<Self> {
        config.validate()?;
        let period_ms = truncate_period(period_ms)?;
        let corrector = DriftCorrector::new(period_ms, config.error_threshold_ms)?;

        tracing::debug!(
            period_ms,
            error_threshold_ms = config.error_threshold_ms,
            clock = ?clock_kind,
            "Ticker created"
        );

        Ok(Self {
            inner: Arc::new(Inner {
                dispatch: ReentrantMutex::new(()),
                state: Mutex::new(TickerState {
                    corrector,
                    running: false,
                    generation: 0,
                    start_time_ms: 0.0,
                    logical_time_ms: 0.0,
                    pending: None,
                    stats: DriftStats::with_capacity(config.stats_capacity),
                }),
                callback,
                clock,
                clock_kind,
                scheduler,
            }),
        })
    }

    /// Start ticking.
    ///
    /// Captures the start time, resets logical time to zero and runs the
    /// first tick synchronously before returning. Does nothing if the ticker
    /// is already running.
    pub fn start(&self) {
        let generation = {
            let mut state = self.inner.state.lock();
            if state.running {
                return;
            }
            state.running = true;
            state.generation = state.generation.wrapping_add(1);
            state.start_time_ms = self.inner.clock.now_ms();
            state.logical_time_ms = 0.0;

            tracing::debug!(
                generation = state.generation,
                start_time_ms = state.start_time_ms,
                period_ms = state.corrector.requested_period_ms(),
                "Ticker started"
            );
            state.generation
        };

        Inner::tick(&self.inner, generation);
    }

    /// Stop ticking and cancel the pending one-shot.
    ///
    /// Safe to call at any time and any number of times.
    pub fn stop(&self) {
        let (was_running, pending) = {
            let mut state = self.inner.state.lock();
            let was_running = std::mem::replace(&mut state.running, false);
            (was_running, state.pending.take())
        };

        if let Some(handle) = pending {
            self.inner.scheduler.cancel(handle);
        }

        if was_running {
            tracing::debug!("Ticker stopped");
        }
    }

    /// Requested period in milliseconds.
    pub fn period(&self) -> u64 {
        self.inner.state.lock().corrector.requested_period_ms()
    }

    /// Change the period.
    ///
    /// The value is truncated toward zero and overwrites both the requested
    /// and the effective period, discarding any accumulated correction. A
    /// one-shot already pending keeps its old delay; the new period is used
    /// from the next schedule on.
    ///
    /// # Errors
    ///
    /// Returns [`crate::TickerError::InvalidPeriod`] for a NaN, infinite or
    /// negative value; the ticker is left unchanged.
    pub fn set_period(&self, period_ms: f64) -> TickerResult {
        let period_ms = truncate_period(period_ms)?;
        self.inner
            .state
            .lock()
            .corrector
            .set_requested_period_ms(period_ms);
        tracing::debug!(period_ms, "Ticker period changed");
        Ok(())
    }

    /// Corrected period that will be used for the next schedule.
    pub fn effective_period(&self) -> i64 {
        self.inner.state.lock().corrector.effective_period_ms()
    }

    /// Dead-band half-width of the correction loop.
    pub fn error_threshold(&self) -> f64 {
        self.inner.state.lock().corrector.error_threshold_ms()
    }

    /// Whether the ticker is running.
    pub fn is_running(&self) -> bool {
        self.inner.state.lock().running
    }

    /// Current logical time, or `None` while stopped.
    ///
    /// Inside the callback this is the tick being delivered; between ticks
    /// it is the value the next tick will report.
    pub fn logical_time(&self) -> Option<f64> {
        let state = self.inner.state.lock();
        state.running.then_some(state.logical_time_ms)
    }

    /// Clock source chosen at construction.
    pub fn clock_kind(&self) -> ClockKind {
        self.inner.clock_kind
    }

    /// Snapshot of the drift statistics.
    pub fn stats(&self) -> DriftStats {
        self.inner.state.lock().stats.clone()
    }

    /// Clear the drift statistics.
    pub fn reset_stats(&self) {
        self.inner.state.lock().stats.reset();
    }

    /// Scheduler driving this ticker.
    pub fn scheduler(&self) -> &S {
        &self.inner.scheduler
    }

    /// Create a non-owning handle.
    pub fn downgrade(&self) -> WeakTicker<S> {
        WeakTicker {
            inner: Arc::downgrade(&self.inner),
        }
    }
}

impl<S: OneShotScheduler> Inner<S> {
    fn tick(inner: &Arc<Self>, generation: u64) {
        let _dispatch = inner.dispatch.lock();

        let tick = {
            let mut state = inner.state.lock();
            if !state.running || state.generation != generation {
                return;
            }

            let now_ms = inner.clock.now_ms();
            let elapsed_ms = now_ms - state.start_time_ms;
            let error_ms = elapsed_ms - state.logical_time_ms;

            let correction = state.corrector.update(error_ms);
            let delay_ms = state.corrector.next_delay_ms();

            let weak = Arc::downgrade(inner);
            let handle = inner.scheduler.schedule(
                delay_ms,
                Box::new(move || {
                    if let Some(inner) = weak.upgrade() {
                        Inner::tick(&inner, generation);
                    }
                }),
            );
            state.pending = Some(handle);
            state.stats.record_tick(error_ms, correction);

            if correction == Correction::Reset {
                tracing::debug!(
                    error_ms,
                    period_ms = state.corrector.requested_period_ms(),
                    "Ticker ahead of schedule, correction reset"
                );
            }
            tracing::trace!(
                logical_time_ms = state.logical_time_ms,
                now_ms,
                error_ms,
                delay_ms,
                correction = ?correction,
                "Tick"
            );

            Tick {
                logical_time_ms: state.logical_time_ms,
                now_ms,
                error_ms,
            }
        };

        (inner.callback)(tick);

        let mut state = inner.state.lock();
        if state.running && state.generation == generation {
            state.logical_time_ms += state.corrector.requested_period_ms() as f64;
        }
    }
}

impl<S: OneShotScheduler> Drop for Inner<S> {
    fn drop(&mut self) {
        if let Some(handle) = self.state.get_mut().pending.take() {
            self.scheduler.cancel(handle);
        }
    }
}

impl<S: OneShotScheduler> Clone for Ticker<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: OneShotScheduler> std::fmt::Debug for Ticker<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("Ticker")
            .field("period_ms", &state.corrector.requested_period_ms())
            .field("effective_period_ms", &state.corrector.effective_period_ms())
            .field("running", &state.running)
            .field("clock", &self.inner.clock_kind)
            .finish_non_exhaustive()
    }
}

impl<S: OneShotScheduler> WeakTicker<S> {
    /// Recover a [`Ticker`] if it still exists.
    pub fn upgrade(&self) -> Option<Ticker<S>> {
        self.inner.upgrade().map(|inner| Ticker { inner })
    }
}

impl<S: OneShotScheduler> Clone for WeakTicker<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Weak::clone(&self.inner),
        }
    }
}

impl<S: OneShotScheduler> std::fmt::Debug for WeakTicker<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeakTicker")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}
