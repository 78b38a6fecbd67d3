//! Prelude module for common ticker types.
//!
//! This module provides a convenient way to import the most commonly used
//! types from the ticker crate.

pub use crate::clock::{Clock, ClockKind};
pub use crate::config::TickerConfig;
pub use crate::corrector::{Correction, DEFAULT_ERROR_THRESHOLD_MS};
pub use crate::error::{TickerError, TickerResult};
pub use crate::scheduler::{OneShotScheduler, ThreadScheduler};
pub use crate::stats::DriftStats;
pub use crate::ticker::{Tick, Ticker, WeakTicker};

#[cfg(feature = "tokio")]
pub use crate::async_scheduler::TokioScheduler;
