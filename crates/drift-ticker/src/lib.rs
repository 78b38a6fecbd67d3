//! Self-correcting periodic ticker.
//!
//! Coarse one-shot timers fire late, and a periodic loop built from them
//! drifts further behind on every iteration. This crate keeps a logical
//! reference time, measures how far each tick lands from it, and shortens
//! the next delay while the loop is running late.
//!
//! - **Ticker**: lifecycle, tick step and callback dispatch
//! - **DriftCorrector**: one-sided ratchet with reset driving the effective period
//! - **Clock**: monotonic time source, resolved once per ticker
//! - **OneShotScheduler**: external delayed-execution primitive
//! - **DriftStats**: error counters and percentiles
//!
//! The ticker does not give hard real-time guarantees; feedback only keeps
//! the average drift small.
//!
//! # Example
//!
//! ```no_run
//! use drift_ticker::{Ticker, TickerConfig};
//!
//! let ticker = Ticker::new(
//!     20.0,
//!     |tick| println!("{:.1} ms (error {:+.3} ms)", tick.logical_time_ms, tick.error_ms),
//!     TickerConfig::default(),
//! )?;
//!
//! ticker.start();
//! std::thread::sleep(std::time::Duration::from_secs(1));
//! ticker.stop();
//! # Ok::<(), drift_ticker::TickerError>(())
//! ```

#![deny(clippy::unwrap_used)]
#![deny(static_mut_refs)]
#![deny(unused_must_use)]

pub mod clock;
pub mod config;
pub mod corrector;
pub mod error;
pub mod manual;
pub mod scheduler;
pub mod stats;
pub mod ticker;

#[cfg(feature = "tokio")]
pub mod async_scheduler;

pub mod prelude;

pub use clock::{Clock, ClockKind, HighResolutionClock, PlatformClock, WallClock};
pub use config::{TickerConfig, TickerConfigBuilder};
pub use corrector::{Correction, DEFAULT_ERROR_THRESHOLD_MS, DriftCorrector};
pub use error::{TickerError, TickerResult};
pub use scheduler::{OneShotScheduler, Task, ThreadScheduler, TimerId};
pub use stats::DriftStats;
pub use ticker::{Tick, TickCallback, Ticker, WeakTicker};

#[cfg(feature = "tokio")]
pub use async_scheduler::TokioScheduler;
