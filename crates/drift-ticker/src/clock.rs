//! Monotonic time sources.
//!
//! A ticker reads time through the [`Clock`] trait and resolves its source
//! exactly once, at construction. [`ClockKind::Auto`] probes the available
//! sources in priority order:
//!
//! 1. [`HighResolutionClock`] - process-level `Instant`, anchored at creation
//! 2. [`PlatformClock`] - the OS monotonic timer (`CLOCK_MONOTONIC` on unix)
//! 3. [`WallClock`] - `SystemTime`, clamped so readings never go backwards
//!
//! Tests inject a synthetic clock (see [`crate::manual::ManualClock`]).

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use crate::error::{TickerError, TickerResult};

/// Source of the current time in milliseconds.
///
/// Implementations must be monotonically non-decreasing; the drift error is
/// computed as a difference of two readings and a clock that jumps backwards
/// would be read as the ticker running ahead of schedule.
pub trait Clock: Send + Sync {
    /// Current time in milliseconds.
    fn now_ms(&self) -> f64;
}

impl<F> Clock for F
where
    F: Fn() -> f64 + Send + Sync,
{
    fn now_ms(&self) -> f64 {
        self()
    }
}

/// Clock selection for a ticker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClockKind {
    /// Probe sources in priority order and use the first available one.
    #[default]
    Auto,
    /// Process-level high-resolution timer.
    HighResolution,
    /// Platform monotonic timer.
    Platform,
    /// Coarse wall-clock fallback.
    WallClock,
    /// Caller-supplied clock.
    Custom,
}

impl ClockKind {
    /// Resolve this selection into a concrete clock.
    ///
    /// Returns the kind that was actually chosen alongside the clock, so
    /// `Auto` reports which source won the probe.
    ///
    /// # Errors
    ///
    /// Returns [`TickerError::ClockUnavailable`] when an explicitly requested
    /// source cannot be read, or when `Custom` is resolved without a clock.
    pub fn resolve(self) -> TickerResult<(ClockKind, Arc<dyn Clock>)> {
        match self {
            ClockKind::Auto => {
                if let Some(clock) = HighResolutionClock::probe() {
                    return Ok((ClockKind::HighResolution, Arc::new(clock)));
                }
                if let Some(clock) = PlatformClock::probe() {
                    return Ok((ClockKind::Platform, Arc::new(clock)));
                }
                Ok((ClockKind::WallClock, Arc::new(WallClock::new())))
            }
            ClockKind::HighResolution => HighResolutionClock::probe()
                .map(|clock| (self, Arc::new(clock) as Arc<dyn Clock>))
                .ok_or_else(|| TickerError::clock_unavailable(self, "monotonic instant missing")),
            ClockKind::Platform => PlatformClock::probe()
                .map(|clock| (self, Arc::new(clock) as Arc<dyn Clock>))
                .ok_or_else(|| {
                    TickerError::clock_unavailable(self, "platform monotonic timer not readable")
                }),
            ClockKind::WallClock => Ok((self, Arc::new(WallClock::new()))),
            ClockKind::Custom => Err(TickerError::clock_unavailable(
                self,
                "custom clocks must be injected with Ticker::with_clock",
            )),
        }
    }
}

/// Process-level high-resolution clock based on [`Instant`].
///
/// Readings are milliseconds since the clock was created.
#[derive(Debug, Clone, Copy)]
pub struct HighResolutionClock {
    origin: Instant,
}

impl HighResolutionClock {
    /// Create a clock anchored at the current instant.
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    /// `Instant` is part of `std` on every supported target.
    fn probe() -> Option<Self> {
        Some(Self::new())
    }
}

impl Default for HighResolutionClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for HighResolutionClock {
    fn now_ms(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1e3
    }
}

/// Platform monotonic timer.
///
/// On unix this reads `CLOCK_MONOTONIC` directly. Other targets have no
/// implementation and the probe fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlatformClock;

impl PlatformClock {
    fn probe() -> Option<Self> {
        platform::read_monotonic_ms().map(|_| Self)
    }
}

impl Clock for PlatformClock {
    fn now_ms(&self) -> f64 {
        // The probe at construction proved the timer readable.
        platform::read_monotonic_ms().unwrap_or(0.0)
    }
}

#[cfg(unix)]
mod platform {
    #[expect(unsafe_code, reason = "clock_gettime is only reachable through libc")]
    pub(super) fn read_monotonic_ms() -> Option<f64> {
        let mut ts = libc::timespec {
            tv_sec: 0,
            tv_nsec: 0,
        };
        // SAFETY: `ts` is a valid, writable timespec for the duration of the call.
        let rc = unsafe { libc::clock_gettime(libc::CLOCK_MONOTONIC, &mut ts) };
        if rc != 0 {
            return None;
        }
        Some(ts.tv_sec as f64 * 1e3 + ts.tv_nsec as f64 * 1e-6)
    }
}

#[cfg(not(unix))]
mod platform {
    pub(super) fn read_monotonic_ms() -> Option<f64> {
        None
    }
}

/// Wall-clock fallback.
///
/// `SystemTime` can step backwards when the system clock is adjusted; the
/// last reading is kept and never undercut.
#[derive(Debug, Default)]
pub struct WallClock {
    last_bits: AtomicU64,
}

impl WallClock {
    /// Create a new wall clock.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clock for WallClock {
    fn now_ms(&self) -> f64 {
        let raw = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0.0, |d| d.as_secs_f64() * 1e3);
        // Non-negative f64 values order the same as their bit patterns.
        let bits = raw.max(0.0).to_bits();
        let previous = self.last_bits.fetch_max(bits, Ordering::AcqRel);
        f64::from_bits(previous.max(bits))
    }
}
