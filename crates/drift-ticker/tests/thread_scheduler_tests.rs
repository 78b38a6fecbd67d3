//! Wall-time tests running tickers on the dedicated timer thread.
//!
//! Bounds are loose: CI machines under load delay timers arbitrarily, so
//! these tests only check cadence and lifecycle, not precision.

use drift_ticker::{ClockKind, Tick, Ticker, TickerConfig};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

type TestResult = Result<(), Box<dyn std::error::Error>>;

#[test]
fn test_ticker_runs_on_timer_thread() -> TestResult {
    let (tx, rx) = mpsc::channel::<Tick>();
    let ticker = Ticker::new(
        5.0,
        move |tick| {
            let _ = tx.send(tick);
        },
        TickerConfig::default(),
    )?;
    assert_eq!(ticker.clock_kind(), ClockKind::HighResolution);

    ticker.start();
    let mut ticks = Vec::new();
    for _ in 0..10 {
        ticks.push(rx.recv_timeout(Duration::from_secs(5))?);
    }
    ticker.stop();

    for (n, tick) in ticks.iter().enumerate() {
        assert!((tick.logical_time_ms - n as f64 * 5.0).abs() < f64::EPSILON);
    }
    for pair in ticks.windows(2) {
        if let [a, b] = pair {
            assert!(b.now_ms >= a.now_ms);
        }
    }
    Ok(())
}

#[test]
fn test_stop_halts_ticks() -> TestResult {
    let (tx, rx) = mpsc::channel::<Tick>();
    let ticker = Ticker::new(
        2.0,
        move |tick| {
            let _ = tx.send(tick);
        },
        TickerConfig::default(),
    )?;

    ticker.start();
    let _first = rx.recv_timeout(Duration::from_secs(5))?;
    let _second = rx.recv_timeout(Duration::from_secs(5))?;
    ticker.stop();

    // Drain anything that raced the stop, then expect silence.
    thread::sleep(Duration::from_millis(20));
    while rx.try_recv().is_ok() {}
    thread::sleep(Duration::from_millis(50));
    assert!(rx.try_recv().is_err());
    assert!(!ticker.is_running());
    Ok(())
}

#[test]
fn test_drop_stops_ticking() -> TestResult {
    let (tx, rx) = mpsc::channel::<Tick>();
    {
        let ticker = Ticker::new(
            2.0,
            move |tick| {
                let _ = tx.send(tick);
            },
            TickerConfig::default(),
        )?;
        ticker.start();
        let _first = rx.recv_timeout(Duration::from_secs(5))?;
    }

    // The sender lives in the callback; once the ticker is gone the
    // channel disconnects.
    let deadline = std::time::Instant::now() + Duration::from_secs(5);
    loop {
        match rx.recv_timeout(Duration::from_millis(100)) {
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
            _ if std::time::Instant::now() > deadline => {
                return Err("ticker callback outlived the ticker".into());
            }
            _ => {}
        }
    }
    Ok(())
}

#[test]
fn test_correction_keeps_average_drift_bounded() -> TestResult {
    let (tx, rx) = mpsc::channel::<Tick>();
    let ticker = Ticker::new(
        10.0,
        move |tick| {
            let _ = tx.send(tick);
        },
        TickerConfig::default(),
    )?;

    ticker.start();
    let mut last = None;
    for _ in 0..30 {
        last = Some(rx.recv_timeout(Duration::from_secs(5))?);
    }
    ticker.stop();

    // Without correction a timer thread accumulates lateness every tick.
    // With it, the final error stays well under one period per ten ticks.
    let last = last.ok_or("no ticks received")?;
    assert!(
        last.error_ms < 3.0 * 10.0,
        "error after 30 ticks: {} ms",
        last.error_ms
    );

    let stats = ticker.stats();
    assert!(stats.total_ticks >= 30);
    Ok(())
}
