//! Drift statistics collection.
//!
//! Every tick contributes its measured error and the correction the ratchet
//! applied. Absolute errors are kept in a bounded ring buffer for percentile
//! estimation; counters and extremes cover the whole run.

use std::vec::Vec;

use crate::corrector::Correction;

/// Default number of error samples retained for percentiles.
pub const DEFAULT_STATS_CAPACITY: usize = 4_096;

/// Largest accepted sample window.
pub const MAX_STATS_CAPACITY: usize = 1 << 20;

/// Drift statistics for a ticker run.
///
/// # Percentiles
///
/// Percentiles are computed over the most recent samples only, using
/// quickselect on a reused scratch buffer. The sample buffer grows as ticks
/// arrive, so a large capacity costs nothing up front.
#[derive(Debug)]
pub struct DriftStats {
    /// Total number of ticks recorded
    pub total_ticks: u64,

    /// Ticks that shortened the effective period
    pub shortened_ticks: u64,

    /// Ticks that reset the effective period
    pub reset_ticks: u64,

    /// Error of the most recent tick (milliseconds, signed)
    pub last_error_ms: f64,

    /// Largest absolute error observed (milliseconds)
    pub max_abs_error_ms: f64,

    /// Running sum of signed errors, for the mean
    error_sum_ms: f64,

    /// Running sum of squared errors, for the RMS
    error_sum_squared: f64,

    /// Recent absolute error samples (ring buffer)
    recent_abs_errors: Vec<f64>,

    /// Maximum samples to keep
    max_samples: usize,

    /// Ring buffer write index
    next_sample_index: usize,

    /// Reused scratch storage for percentile selection
    percentile_scratch: Vec<f64>,
}

impl Default for DriftStats {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_STATS_CAPACITY)
    }
}

impl Clone for DriftStats {
    fn clone(&self) -> Self {
        Self {
            total_ticks: self.total_ticks,
            shortened_ticks: self.shortened_ticks,
            reset_ticks: self.reset_ticks,
            last_error_ms: self.last_error_ms,
            max_abs_error_ms: self.max_abs_error_ms,
            error_sum_ms: self.error_sum_ms,
            error_sum_squared: self.error_sum_squared,
            recent_abs_errors: self.recent_abs_errors.clone(),
            max_samples: self.max_samples,
            next_sample_index: self.next_sample_index,
            // Scratch contents are rebuilt on every percentile query.
            percentile_scratch: Vec::new(),
        }
    }
}

impl DriftStats {
    /// Create a collector with the default capacity.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a collector retaining at most `max_samples` recent errors.
    pub fn with_capacity(max_samples: usize) -> Self {
        Self {
            total_ticks: 0,
            shortened_ticks: 0,
            reset_ticks: 0,
            last_error_ms: 0.0,
            max_abs_error_ms: 0.0,
            error_sum_ms: 0.0,
            error_sum_squared: 0.0,
            recent_abs_errors: Vec::new(),
            max_samples,
            next_sample_index: 0,
            percentile_scratch: Vec::new(),
        }
    }

    /// Record one tick.
    pub fn record_tick(&mut self, error_ms: f64, correction: Correction) {
        self.total_ticks = self.total_ticks.saturating_add(1);
        match correction {
            Correction::Shorten => self.shortened_ticks = self.shortened_ticks.saturating_add(1),
            Correction::Reset => self.reset_ticks = self.reset_ticks.saturating_add(1),
            Correction::Hold => {}
        }

        let abs_error = error_ms.abs();
        self.last_error_ms = error_ms;
        self.max_abs_error_ms = self.max_abs_error_ms.max(abs_error);
        self.error_sum_ms += error_ms;
        self.error_sum_squared += error_ms * error_ms;

        if self.max_samples == 0 {
            return;
        }

        if self.recent_abs_errors.len() < self.max_samples {
            self.recent_abs_errors.push(abs_error);
        } else if let Some(slot) = self.recent_abs_errors.get_mut(self.next_sample_index) {
            *slot = abs_error;
            self.next_sample_index = (self.next_sample_index + 1) % self.max_samples;
        }
    }

    /// Mean signed error in milliseconds.
    ///
    /// Close to zero when the correction loop is keeping up; persistently
    /// positive when the scheduler lags faster than the ratchet can shorten.
    pub fn mean_error_ms(&self) -> f64 {
        if self.total_ticks == 0 {
            return 0.0;
        }
        self.error_sum_ms / self.total_ticks as f64
    }

    /// Root-mean-square error in milliseconds.
    pub fn rms_error_ms(&self) -> f64 {
        if self.total_ticks == 0 {
            return 0.0;
        }
        (self.error_sum_squared / self.total_ticks as f64).sqrt()
    }

    /// Fraction of ticks that required a correction (0.0 to 1.0).
    pub fn correction_rate(&self) -> f64 {
        if self.total_ticks == 0 {
            return 0.0;
        }
        self.shortened_ticks.saturating_add(self.reset_ticks) as f64 / self.total_ticks as f64
    }

    /// Median absolute error.
    pub fn p50_abs_error_ms(&mut self) -> f64 {
        self.percentile_abs_error_ms(0.50)
    }

    /// 95th percentile absolute error.
    pub fn p95_abs_error_ms(&mut self) -> f64 {
        self.percentile_abs_error_ms(0.95)
    }

    /// 99th percentile absolute error.
    pub fn p99_abs_error_ms(&mut self) -> f64 {
        self.percentile_abs_error_ms(0.99)
    }

    /// Arbitrary percentile (0.0 to 1.0) of recent absolute errors.
    ///
    /// Returns 0 if no samples have been recorded.
    pub fn percentile_abs_error_ms(&mut self, percentile: f64) -> f64 {
        if self.recent_abs_errors.is_empty() {
            return 0.0;
        }

        let percentile = percentile.clamp(0.0, 1.0);

        self.percentile_scratch.clear();
        self.percentile_scratch
            .extend_from_slice(&self.recent_abs_errors);

        let len = self.percentile_scratch.len();
        #[expect(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            reason = "percentile is clamped to [0, 1] so the product is a valid index"
        )]
        let index = ((len as f64 * percentile) as usize).min(len.saturating_sub(1));
        let (_, value, _) = self
            .percentile_scratch
            .select_nth_unstable_by(index, f64::total_cmp);
        *value
    }

    /// Number of samples currently retained.
    pub fn sample_count(&self) -> usize {
        self.recent_abs_errors.len()
    }

    /// Check whether recent drift stays within a bound.
    pub fn within_bound(&mut self, max_p99_abs_error_ms: f64) -> bool {
        self.p99_abs_error_ms() <= max_p99_abs_error_ms
    }

    /// Reset all statistics.
    pub fn reset(&mut self) {
        self.total_ticks = 0;
        self.shortened_ticks = 0;
        self.reset_ticks = 0;
        self.last_error_ms = 0.0;
        self.max_abs_error_ms = 0.0;
        self.error_sum_ms = 0.0;
        self.error_sum_squared = 0.0;
        self.recent_abs_errors.clear();
        self.next_sample_index = 0;
        self.percentile_scratch.clear();
    }
}
