//! Drift correction for the ticker's scheduling period.
//!
//! The corrector is a one-sided ratchet with reset. Every tick reports the
//! measured error between actual elapsed time and logical time:
//!
//! - `error >= threshold`: the schedule is late, shorten the effective period
//!   by one millisecond. Repeated late ticks keep shortening it.
//! - `error < -threshold`: the schedule overshot, discard the accumulated
//!   shortening and go back to the requested period.
//! - otherwise the ticker is inside the dead-band and nothing changes.
//!
//! The effective period never exceeds the requested one. No floor is applied
//! to the shortening; a negative effective period is scheduled as 0.

use crate::error::{TickerError, TickerResult};

/// Default dead-band half-width in milliseconds.
pub const DEFAULT_ERROR_THRESHOLD_MS: f64 = 0.4;

/// Adjustment applied by a single [`DriftCorrector::update`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Correction {
    /// Error inside the dead-band.
    Hold,
    /// Effective period shortened by one millisecond.
    Shorten,
    /// Effective period restored to the requested period.
    Reset,
}

/// Feedback loop deriving the effective period from measured error.
#[derive(Debug, Clone)]
pub struct DriftCorrector {
    /// Period the user asked for (milliseconds)
    requested_period_ms: u64,

    /// Period used for the next schedule (milliseconds)
    effective_period_ms: i64,

    /// Dead-band half-width (milliseconds)
    error_threshold_ms: f64,
}

impl DriftCorrector {
    /// Create a corrector for a validated period and threshold.
    ///
    /// # Errors
    ///
    /// Returns [`TickerError::InvalidErrorThreshold`] if the threshold is not
    /// a finite positive number.
    pub fn new(requested_period_ms: u64, error_threshold_ms: f64) -> TickerResult<Self> {
        validate_error_threshold(error_threshold_ms)?;
        Ok(Self {
            requested_period_ms,
            effective_period_ms: period_as_signed(requested_period_ms),
            error_threshold_ms,
        })
    }

    /// Feed one error sample and adjust the effective period.
    pub fn update(&mut self, error_ms: f64) -> Correction {
        if error_ms >= self.error_threshold_ms {
            self.effective_period_ms = self.effective_period_ms.saturating_sub(1);
            Correction::Shorten
        } else if error_ms < -self.error_threshold_ms {
            self.effective_period_ms = period_as_signed(self.requested_period_ms);
            Correction::Reset
        } else {
            Correction::Hold
        }
    }

    /// Overwrite both the requested and the effective period.
    pub fn set_requested_period_ms(&mut self, period_ms: u64) {
        self.requested_period_ms = period_ms;
        self.effective_period_ms = period_as_signed(period_ms);
    }

    /// Delay for the next one-shot, clamped at zero.
    #[inline]
    pub fn next_delay_ms(&self) -> u64 {
        u64::try_from(self.effective_period_ms).unwrap_or(0)
    }

    /// Period the user asked for.
    #[inline]
    pub fn requested_period_ms(&self) -> u64 {
        self.requested_period_ms
    }

    /// Current corrected period. May be negative after long runs of late ticks.
    #[inline]
    pub fn effective_period_ms(&self) -> i64 {
        self.effective_period_ms
    }

    /// Dead-band half-width.
    #[inline]
    pub fn error_threshold_ms(&self) -> f64 {
        self.error_threshold_ms
    }

    /// Accumulated shortening, in milliseconds.
    #[inline]
    pub fn shortening_ms(&self) -> i64 {
        period_as_signed(self.requested_period_ms).saturating_sub(self.effective_period_ms)
    }
}

/// Truncate a period toward zero.
///
/// # Errors
///
/// Returns [`TickerError::InvalidPeriod`] for NaN, infinite or negative input.
/// Zero is accepted and ticks at maximum frequency.
pub fn truncate_period(period_ms: f64) -> TickerResult<u64> {
    if !period_ms.is_finite() || period_ms < 0.0 {
        return Err(TickerError::invalid_period(period_ms));
    }
    #[expect(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "value is finite and non-negative; saturating float-to-int cast is intended"
    )]
    let truncated = period_ms.trunc() as u64;
    Ok(truncated)
}

/// Check a dead-band threshold.
///
/// # Errors
///
/// Returns [`TickerError::InvalidErrorThreshold`] unless the value is finite
/// and strictly positive.
pub fn validate_error_threshold(threshold_ms: f64) -> TickerResult {
    if !threshold_ms.is_finite() || threshold_ms <= 0.0 {
        return Err(TickerError::invalid_error_threshold(threshold_ms));
    }
    Ok(())
}

fn period_as_signed(period_ms: u64) -> i64 {
    i64::try_from(period_ms).unwrap_or(i64::MAX)
}
