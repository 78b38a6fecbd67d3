//! Error types for the ticker crate.
//!
//! Only construction and argument validation can fail. Once a ticker exists
//! with a valid period and threshold, starting, stopping and ticking are
//! infallible.

use thiserror::Error;

use crate::clock::ClockKind;

/// Errors raised when a ticker is configured with unusable values.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TickerError {
    /// Period is NaN, infinite or negative.
    #[error("Invalid period: {0} ms (must be a finite, non-negative number)")]
    InvalidPeriod(f64),

    /// Error threshold is NaN, infinite, zero or negative.
    #[error("Invalid error threshold: {0} ms (must be a finite, positive number)")]
    InvalidErrorThreshold(f64),

    /// Statistics window is larger than [`crate::stats::MAX_STATS_CAPACITY`].
    #[error("Invalid stats capacity: {0} samples (must be at most {max})", max = crate::stats::MAX_STATS_CAPACITY)]
    InvalidStatsCapacity(usize),

    /// The requested clock source cannot be read on this platform.
    #[error("Clock source unavailable: {kind:?} ({reason})")]
    ClockUnavailable {
        /// The clock that was requested.
        kind: ClockKind,
        /// Why probing failed.
        reason: String,
    },

    /// The one-shot scheduler could not be created.
    #[error("Scheduler unavailable: {0}")]
    SchedulerUnavailable(String),
}

impl TickerError {
    /// Create an invalid period error.
    #[must_use]
    pub fn invalid_period(period_ms: f64) -> Self {
        Self::InvalidPeriod(period_ms)
    }

    /// Create an invalid error threshold error.
    #[must_use]
    pub fn invalid_error_threshold(threshold_ms: f64) -> Self {
        Self::InvalidErrorThreshold(threshold_ms)
    }

    /// Create an invalid stats capacity error.
    #[must_use]
    pub fn invalid_stats_capacity(capacity: usize) -> Self {
        Self::InvalidStatsCapacity(capacity)
    }

    /// Create a clock unavailable error.
    #[must_use]
    pub fn clock_unavailable(kind: ClockKind, reason: impl Into<String>) -> Self {
        Self::ClockUnavailable {
            kind,
            reason: reason.into(),
        }
    }
}

impl From<std::io::Error> for TickerError {
    fn from(err: std::io::Error) -> Self {
        Self::SchedulerUnavailable(err.to_string())
    }
}

/// A specialized `Result` type for ticker operations.
pub type TickerResult<T = ()> = std::result::Result<T, TickerError>;
