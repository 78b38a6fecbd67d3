//! `tickctl run`: drive a live ticker and report drift.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use drift_ticker::{
    ClockKind, OneShotScheduler, Tick, Ticker, TickerConfig, TokioScheduler,
};
use tracing::{debug, info, trace};

use crate::error::CliError;
use crate::output::{self, RunSummary, TickLine};

/// Clock sources selectable from the command line.
///
/// Custom clocks only exist in code, so they are not offered here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ClockArg {
    Auto,
    HighResolution,
    Platform,
    WallClock,
}

impl From<ClockArg> for ClockKind {
    fn from(arg: ClockArg) -> Self {
        match arg {
            ClockArg::Auto => ClockKind::Auto,
            ClockArg::HighResolution => ClockKind::HighResolution,
            ClockArg::Platform => ClockKind::Platform,
            ClockArg::WallClock => ClockKind::WallClock,
        }
    }
}

/// One-shot timer backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum SchedulerArg {
    /// Dedicated timer thread
    #[default]
    Thread,
    /// Tokio runtime timers
    Tokio,
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Requested period in milliseconds (fractions are truncated)
    #[arg(
        short,
        long,
        env = "TICKCTL_PERIOD_MS",
        allow_negative_numbers = true
    )]
    pub period: f64,

    /// How long to run, in milliseconds
    #[arg(short, long, default_value_t = 1_000, env = "TICKCTL_DURATION_MS")]
    pub duration: u64,

    /// Dead-band half-width of the correction loop, in milliseconds
    #[arg(long, env = "TICKCTL_ERROR_THRESHOLD_MS", allow_negative_numbers = true)]
    pub error_threshold: Option<f64>,

    /// Clock source
    #[arg(long, value_enum, env = "TICKCTL_CLOCK")]
    pub clock: Option<ClockArg>,

    /// Timer backend
    #[arg(long, value_enum, default_value_t = SchedulerArg::Thread, env = "TICKCTL_SCHEDULER")]
    pub scheduler: SchedulerArg,

    /// JSON ticker configuration file; flags override its fields
    #[arg(long, env = "TICKCTL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Print only the summary
    #[arg(short, long)]
    pub quiet: bool,
}

/// Build the effective ticker configuration for a run.
///
/// Starts from the config file (or defaults) and applies command-line
/// overrides on top.
pub fn resolve_config(args: &RunArgs) -> Result<TickerConfig, CliError> {
    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => TickerConfig::default(),
    };

    if let Some(threshold) = args.error_threshold {
        config.error_threshold_ms = threshold;
    }
    if let Some(clock) = args.clock {
        config.clock = clock.into();
    }

    if config.clock == ClockKind::Custom {
        return Err(CliError::InvalidConfiguration(
            "clock \"custom\" cannot be selected from a configuration file".to_string(),
        ));
    }
    config.validate()?;
    Ok(config)
}

fn load_config(path: &Path) -> Result<TickerConfig, CliError> {
    let text = fs::read_to_string(path)?;
    let config = serde_json::from_str(&text)?;
    debug!(path = %path.display(), "loaded ticker configuration");
    Ok(config)
}

/// Execute `tickctl run`.
pub fn execute(args: &RunArgs, json: bool) -> Result<()> {
    let config = resolve_config(args)?;
    let duration = Duration::from_millis(args.duration);

    let (tx, rx) = mpsc::channel::<Tick>();
    let callback = move |tick: Tick| {
        if tx.send(tick).is_err() {
            trace!(logical_time_ms = tick.logical_time_ms, "run finished, tick dropped");
        }
    };

    match args.scheduler {
        SchedulerArg::Thread => {
            let ticker = Ticker::new(args.period, callback, config).map_err(CliError::from)?;
            drive(&ticker, &rx, duration, args.quiet, json)
        }
        SchedulerArg::Tokio => {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .worker_threads(1)
                .thread_name("tickctl-timer")
                .enable_time()
                .build()
                .map_err(|e| CliError::RuntimeUnavailable(e.to_string()))?;
            let scheduler = TokioScheduler::new(runtime.handle().clone());
            let ticker = Ticker::with_scheduler(args.period, callback, config, scheduler)
                .map_err(CliError::from)?;
            drive(&ticker, &rx, duration, args.quiet, json)
        }
    }
}

fn drive<S: OneShotScheduler>(
    ticker: &Ticker<S>,
    ticks: &Receiver<Tick>,
    duration: Duration,
    quiet: bool,
    json: bool,
) -> Result<()> {
    let deadline = Instant::now()
        .checked_add(duration)
        .context("run duration is out of range")?;

    info!(
        period_ms = ticker.period(),
        error_threshold_ms = ticker.error_threshold(),
        clock = ?ticker.clock_kind(),
        duration_ms = duration.as_millis(),
        "starting ticker"
    );
    ticker.start();

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }
        match ticks.recv_timeout(remaining) {
            Ok(tick) => report_tick(ticker, &tick, quiet, json),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => break,
        }
    }

    ticker.stop();
    // Ticks already queued when the ticker stopped still belong to the run.
    while let Ok(tick) = ticks.try_recv() {
        report_tick(ticker, &tick, quiet, json);
    }

    let mut stats = ticker.stats();
    info!(ticks = stats.total_ticks, "ticker stopped");
    let summary = RunSummary::new(
        ticker.clock_kind(),
        ticker.period(),
        ticker.effective_period(),
        ticker.error_threshold(),
        &mut stats,
    );
    output::print_summary(&summary, json);
    Ok(())
}

fn report_tick<S: OneShotScheduler>(ticker: &Ticker<S>, tick: &Tick, quiet: bool, json: bool) {
    if quiet {
        return;
    }
    let line = TickLine {
        logical_time_ms: tick.logical_time_ms,
        now_ms: tick.now_ms,
        error_ms: tick.error_ms,
        effective_period_ms: ticker.effective_period(),
    };
    output::print_tick(&line, ticker.error_threshold(), json);
}
