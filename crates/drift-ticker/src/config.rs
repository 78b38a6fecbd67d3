//! Ticker configuration.

use serde::{Deserialize, Serialize};

use crate::clock::ClockKind;
use crate::corrector::{DEFAULT_ERROR_THRESHOLD_MS, validate_error_threshold};
use crate::error::{TickerError, TickerResult};
use crate::stats::{DEFAULT_STATS_CAPACITY, MAX_STATS_CAPACITY};

/// Options recognised when constructing a [`crate::Ticker`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TickerConfig {
    /// Dead-band half-width of the correction loop (milliseconds).
    ///
    /// Smaller values correct more aggressively but can oscillate; larger
    /// values tolerate more drift before correcting.
    pub error_threshold_ms: f64,
    /// Time source selection, resolved once at construction.
    pub clock: ClockKind,
    /// Number of recent errors retained for drift percentiles.
    pub stats_capacity: usize,
}

impl Default for TickerConfig {
    fn default() -> Self {
        Self {
            error_threshold_ms: DEFAULT_ERROR_THRESHOLD_MS,
            clock: ClockKind::Auto,
            stats_capacity: DEFAULT_STATS_CAPACITY,
        }
    }
}

impl TickerConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// - [`TickerError::InvalidErrorThreshold`] if the threshold is not a
    ///   finite positive number
    /// - [`TickerError::InvalidStatsCapacity`] if `stats_capacity` exceeds
    ///   [`MAX_STATS_CAPACITY`]
    pub fn validate(&self) -> TickerResult {
        validate_error_threshold(self.error_threshold_ms)?;
        if self.stats_capacity > MAX_STATS_CAPACITY {
            return Err(TickerError::invalid_stats_capacity(self.stats_capacity));
        }
        Ok(())
    }

    /// Create a configuration builder.
    #[must_use]
    pub fn builder() -> TickerConfigBuilder {
        TickerConfigBuilder::default()
    }
}

/// Builder for [`TickerConfig`].
#[derive(Debug, Default)]
pub struct TickerConfigBuilder {
    config: TickerConfig,
}

impl TickerConfigBuilder {
    /// Set the error threshold in milliseconds.
    #[must_use]
    pub fn error_threshold_ms(mut self, threshold_ms: f64) -> Self {
        self.config.error_threshold_ms = threshold_ms;
        self
    }

    /// Set the clock source.
    #[must_use]
    pub fn clock(mut self, clock: ClockKind) -> Self {
        self.config.clock = clock;
        self
    }

    /// Set the drift statistics capacity.
    #[must_use]
    pub fn stats_capacity(mut self, capacity: usize) -> Self {
        self.config.stats_capacity = capacity;
        self
    }

    /// Build the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build(self) -> TickerResult<TickerConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
