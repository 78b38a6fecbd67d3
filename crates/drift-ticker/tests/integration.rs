//! Integration tests for the ticker crate.

use drift_ticker::manual::{ManualClock, ManualScheduler};
use drift_ticker::{ClockKind, Tick, Ticker, TickerConfig, TickerError, WeakTicker};
use parking_lot::Mutex;
use std::sync::Arc;

type TestResult = Result<(), Box<dyn std::error::Error>>;

struct Rig {
    ticker: Ticker<ManualScheduler>,
    clock: ManualClock,
    scheduler: ManualScheduler,
    ticks: Arc<Mutex<Vec<Tick>>>,
}

fn rig(period_ms: f64, config: TickerConfig) -> Result<Rig, TickerError> {
    let clock = ManualClock::new(0.0);
    let scheduler = ManualScheduler::new();
    let ticks = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&ticks);

    let ticker = Ticker::with_clock(
        period_ms,
        move |tick| sink.lock().push(tick),
        config,
        Arc::new(clock.clone()),
        scheduler.clone(),
    )?;

    Ok(Rig {
        ticker,
        clock,
        scheduler,
        ticks,
    })
}

impl Rig {
    /// Fire the pending one-shot with the clock at `now_ms`.
    fn tick_at(&self, now_ms: f64) -> bool {
        self.clock.set(now_ms);
        self.scheduler.fire_next()
    }

    fn errors(&self) -> Vec<f64> {
        self.ticks.lock().iter().map(|t| t.error_ms).collect()
    }
}

#[test]
fn test_drift_scenario_period_20() -> TestResult {
    let rig = rig(20.0, TickerConfig::default())?;
    rig.ticker.start();

    let mut effective = vec![rig.ticker.effective_period()];
    for now in [19.5, 40.0, 60.6] {
        assert!(rig.tick_at(now));
        effective.push(rig.ticker.effective_period());
    }

    let logical: Vec<f64> = rig.ticks.lock().iter().map(|t| t.logical_time_ms).collect();
    assert_eq!(logical, vec![0.0, 20.0, 40.0, 60.0]);

    for (actual, expected) in rig.errors().iter().zip([0.0, -0.5, 0.0, 0.6]) {
        assert!((actual - expected).abs() < 1e-9, "{actual} != {expected}");
    }

    assert_eq!(effective, vec![20, 20, 20, 19]);
    assert_eq!(rig.scheduler.scheduled_delays(), vec![20, 20, 20, 19]);
    Ok(())
}

#[test]
fn test_stop_after_start_fires_exactly_once() -> TestResult {
    let rig = rig(10.0, TickerConfig::default())?;
    rig.ticker.start();
    rig.ticker.stop();

    for now in [10.0, 20.0, 30.0] {
        assert!(!rig.tick_at(now));
    }
    assert_eq!(rig.ticks.lock().len(), 1);
    Ok(())
}

#[test]
fn test_logical_time_ignores_drift() -> TestResult {
    let rig = rig(10.0, TickerConfig::default())?;
    rig.ticker.start();

    // Wildly irregular firing times.
    for now in [13.0, 14.0, 45.0, 46.0, 47.5, 90.0] {
        rig.tick_at(now);
    }

    let logical: Vec<f64> = rig.ticks.lock().iter().map(|t| t.logical_time_ms).collect();
    for pair in logical.windows(2) {
        if let [a, b] = pair {
            assert!((b - a - 10.0).abs() < f64::EPSILON);
        }
    }
    Ok(())
}

#[test]
fn test_double_start_does_not_double_schedule() -> TestResult {
    let rig = rig(10.0, TickerConfig::default())?;
    rig.ticker.start();
    rig.ticker.start();
    rig.ticker.start();

    assert_eq!(rig.scheduler.pending(), 1);
    assert_eq!(rig.ticks.lock().len(), 1);

    rig.tick_at(10.0);
    rig.ticker.start();
    assert_eq!(rig.scheduler.pending(), 1);
    assert_eq!(rig.ticks.lock().len(), 2);
    Ok(())
}

#[test]
fn test_stop_on_never_started_ticker() -> TestResult {
    let rig = rig(10.0, TickerConfig::default())?;
    for _ in 0..5 {
        rig.ticker.stop();
    }
    assert!(!rig.ticker.is_running());
    assert_eq!(rig.scheduler.cancelled(), 0);
    Ok(())
}

#[test]
fn test_fractional_period_is_truncated() -> TestResult {
    let rig = rig(20.0, TickerConfig::default())?;
    rig.ticker.set_period(100.7)?;
    assert_eq!(rig.ticker.period(), 100);

    rig.ticker.start();
    assert_eq!(rig.scheduler.next_delay_ms(), Some(100));
    Ok(())
}

#[test]
fn test_constructor_truncates_period() -> TestResult {
    let rig = rig(33.9, TickerConfig::default())?;
    assert_eq!(rig.ticker.period(), 33);
    assert_eq!(rig.ticker.effective_period(), 33);
    Ok(())
}

#[test]
fn test_persistent_lag_ratchets_then_resets() -> TestResult {
    let rig = rig(50.0, TickerConfig::default())?;
    rig.ticker.start();

    // Every tick lands 2ms late relative to its logical time.
    let mut expected = 50;
    for n in 1..=10u32 {
        rig.tick_at(f64::from(n) * 50.0 + 2.0);
        expected -= 1;
        assert_eq!(rig.ticker.effective_period(), expected);
    }

    // Overshoot: lands 1ms early.
    rig.tick_at(11.0 * 50.0 - 1.0);
    assert_eq!(rig.ticker.effective_period(), 50);

    let stats = rig.ticker.stats();
    assert_eq!(stats.shortened_ticks, 10);
    assert_eq!(stats.reset_ticks, 1);
    Ok(())
}

#[test]
fn test_dead_band_keeps_period() -> TestResult {
    let config = TickerConfig::builder().error_threshold_ms(1.0).build()?;
    let rig = rig(25.0, config)?;
    rig.ticker.start();

    for (n, jitter) in (1..=20u32).zip([0.5, -0.9, 0.99, -1.0, 0.0].into_iter().cycle()) {
        rig.tick_at(f64::from(n) * 25.0 + jitter);
        assert_eq!(rig.ticker.effective_period(), 25);
    }
    assert!(rig.ticker.stats().correction_rate().abs() < f64::EPSILON);
    Ok(())
}

#[test]
fn test_period_change_while_running() -> TestResult {
    let rig = rig(10.0, TickerConfig::default())?;
    rig.ticker.start();
    rig.tick_at(12.0);
    assert_eq!(rig.ticker.effective_period(), 9);

    rig.ticker.set_period(40.0)?;
    assert_eq!(rig.ticker.effective_period(), 40);
    // Already-pending one-shot keeps the shortened delay.
    assert_eq!(rig.scheduler.next_delay_ms(), Some(9));

    rig.tick_at(20.0);
    let ticks = rig.ticks.lock().clone();
    let logical: Vec<f64> = ticks.iter().map(|t| t.logical_time_ms).collect();
    // Logical time advanced by the old period, then by the new one.
    assert_eq!(logical, vec![0.0, 10.0, 20.0]);
    assert_eq!(rig.ticker.logical_time(), Some(60.0));
    assert_eq!(rig.scheduler.next_delay_ms(), Some(40));
    Ok(())
}

#[test]
fn test_restart_begins_new_reference() -> TestResult {
    let rig = rig(10.0, TickerConfig::default())?;
    rig.ticker.start();
    rig.tick_at(10.0);
    rig.ticker.stop();
    assert_eq!(rig.ticker.logical_time(), None);

    rig.clock.set(1_000.0);
    rig.ticker.start();
    rig.tick_at(1_010.0);

    let ticks = rig.ticks.lock().clone();
    let restarted: Vec<(f64, f64)> = ticks
        .iter()
        .skip(2)
        .map(|t| (t.logical_time_ms, t.error_ms))
        .collect();
    assert_eq!(restarted, vec![(0.0, 0.0), (10.0, 0.0)]);
    Ok(())
}

#[test]
fn test_callback_restart_from_inside() -> TestResult {
    let clock = ManualClock::new(0.0);
    let scheduler = ManualScheduler::new();
    let handle: Arc<Mutex<Option<WeakTicker<ManualScheduler>>>> = Arc::new(Mutex::new(None));
    let seen = Arc::new(Mutex::new(Vec::new()));

    let callback_handle = Arc::clone(&handle);
    let sink = Arc::clone(&seen);
    let ticker = Ticker::with_clock(
        10.0,
        move |tick: Tick| {
            sink.lock().push(tick.logical_time_ms);
            let restart = (tick.logical_time_ms - 20.0).abs() < f64::EPSILON;
            if !restart {
                return;
            }
            let ticker = callback_handle.lock().as_ref().and_then(WeakTicker::upgrade);
            if let Some(ticker) = ticker {
                ticker.stop();
                ticker.start();
            }
        },
        TickerConfig::default(),
        Arc::new(clock.clone()),
        scheduler.clone(),
    )?;
    *handle.lock() = Some(ticker.downgrade());

    ticker.start();
    scheduler.fire(3);

    // The restart ticks synchronously at logical 0; the stale one-shot
    // from before the restart was cancelled.
    assert_eq!(*seen.lock(), vec![0.0, 10.0, 20.0, 0.0, 10.0]);
    assert_eq!(scheduler.pending(), 1);
    Ok(())
}

#[test]
fn test_explicit_wall_clock_selection() -> TestResult {
    let config = TickerConfig::builder().clock(ClockKind::WallClock).build()?;
    let ticker = Ticker::with_scheduler(10.0, |_| {}, config, ManualScheduler::new())?;
    assert_eq!(ticker.clock_kind(), ClockKind::WallClock);
    Ok(())
}

#[test]
fn test_injected_clock_reports_custom() -> TestResult {
    let rig = rig(10.0, TickerConfig::default())?;
    assert_eq!(rig.ticker.clock_kind(), ClockKind::Custom);
    Ok(())
}

#[test]
fn test_long_lag_clamps_delay_to_zero() -> TestResult {
    let rig = rig(2.0, TickerConfig::default())?;
    rig.ticker.start();

    for n in 1..=5u32 {
        rig.tick_at(f64::from(n) * 2.0 + 10.0);
    }

    assert_eq!(rig.ticker.effective_period(), -3);
    assert_eq!(rig.scheduler.next_delay_ms(), Some(0));
    Ok(())
}

#[test]
fn test_next_tick_scheduled_before_callback() -> TestResult {
    let clock = ManualClock::new(0.0);
    let scheduler = ManualScheduler::new();
    let observed = Arc::new(Mutex::new(Vec::new()));

    let queue = scheduler.clone();
    let sink = Arc::clone(&observed);
    let ticker = Ticker::with_clock(
        20.0,
        move |_tick| {
            sink.lock().push((queue.pending(), queue.next_delay_ms()));
        },
        TickerConfig::default(),
        Arc::new(clock.clone()),
        scheduler.clone(),
    )?;

    ticker.start();
    for now in [19.5, 40.0, 60.6] {
        clock.set(now);
        assert!(scheduler.fire_next());
    }

    // The corrected one-shot is already queued while the callback runs.
    assert_eq!(
        *observed.lock(),
        vec![(1, Some(20)), (1, Some(20)), (1, Some(20)), (1, Some(19))]
    );
    Ok(())
}

#[test]
fn test_period_change_in_callback_advances_by_new_period() -> TestResult {
    let clock = ManualClock::new(0.0);
    let scheduler = ManualScheduler::new();
    let handle: Arc<Mutex<Option<WeakTicker<ManualScheduler>>>> = Arc::new(Mutex::new(None));
    let seen = Arc::new(Mutex::new(Vec::new()));
    let set_result = Arc::new(Mutex::new(None));

    let callback_handle = Arc::clone(&handle);
    let sink = Arc::clone(&seen);
    let result_slot = Arc::clone(&set_result);
    let ticker = Ticker::with_clock(
        20.0,
        move |tick: Tick| {
            let ticker = callback_handle.lock().as_ref().and_then(WeakTicker::upgrade);
            let Some(ticker) = ticker else {
                return;
            };
            sink.lock().push((tick.logical_time_ms, ticker.logical_time()));
            if tick.logical_time_ms.abs() < f64::EPSILON {
                *result_slot.lock() = Some(ticker.set_period(50.0));
            }
        },
        TickerConfig::default(),
        Arc::new(clock.clone()),
        scheduler.clone(),
    )?;
    *handle.lock() = Some(ticker.downgrade());

    ticker.start();
    assert!(matches!(*set_result.lock(), Some(Ok(()))));
    // Logical time advanced after the callback, by the period it set.
    assert_eq!(ticker.logical_time(), Some(50.0));

    clock.set(50.0);
    assert!(scheduler.fire_next());
    assert_eq!(ticker.logical_time(), Some(100.0));

    // Inside the callback the ticker still reports the tick being delivered.
    assert_eq!(*seen.lock(), vec![(0.0, Some(0.0)), (50.0, Some(50.0))]);
    Ok(())
}

#[test]
fn test_stop_in_callback_skips_advance() -> TestResult {
    let clock = ManualClock::new(0.0);
    let scheduler = ManualScheduler::new();
    let handle: Arc<Mutex<Option<WeakTicker<ManualScheduler>>>> = Arc::new(Mutex::new(None));

    let callback_handle = Arc::clone(&handle);
    let ticker = Ticker::with_clock(
        10.0,
        move |tick: Tick| {
            if tick.logical_time_ms < 10.0 {
                return;
            }
            let ticker = callback_handle.lock().as_ref().and_then(WeakTicker::upgrade);
            if let Some(ticker) = ticker {
                ticker.stop();
            }
        },
        TickerConfig::default(),
        Arc::new(clock.clone()),
        scheduler.clone(),
    )?;
    *handle.lock() = Some(ticker.downgrade());

    ticker.start();
    clock.set(10.0);
    assert!(scheduler.fire_next());

    assert!(!ticker.is_running());
    assert_eq!(ticker.logical_time(), None);
    assert_eq!(scheduler.pending(), 0);

    // A later start begins from logical zero and advances past it.
    ticker.start();
    assert_eq!(ticker.logical_time(), Some(10.0));
    Ok(())
}

#[test]
fn test_oversized_stats_capacity_is_rejected() {
    let config = TickerConfig {
        stats_capacity: usize::MAX,
        ..TickerConfig::default()
    };
    let result = Ticker::with_clock(
        10.0,
        |_| {},
        config,
        Arc::new(ManualClock::new(0.0)),
        ManualScheduler::new(),
    );
    assert!(matches!(result, Err(TickerError::InvalidStatsCapacity(_))));
}
