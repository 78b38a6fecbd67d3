//! Output formatting for CLI responses

use anyhow::Error;
use colored::*;
use drift_ticker::{ClockKind, DriftStats};
use serde::Serialize;
use serde_json::json;

use crate::commands::clocks::ClockProbe;

/// One tick as reported on the console.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct TickLine {
    pub logical_time_ms: f64,
    pub now_ms: f64,
    pub error_ms: f64,
    pub effective_period_ms: i64,
}

/// Drift summary for a finished run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub clock: ClockKind,
    pub period_ms: u64,
    pub effective_period_ms: i64,
    pub error_threshold_ms: f64,
    pub total_ticks: u64,
    pub shortened_ticks: u64,
    pub reset_ticks: u64,
    pub correction_rate: f64,
    pub last_error_ms: f64,
    pub mean_error_ms: f64,
    pub rms_error_ms: f64,
    pub p50_abs_error_ms: f64,
    pub p95_abs_error_ms: f64,
    pub p99_abs_error_ms: f64,
    pub max_abs_error_ms: f64,
}

impl RunSummary {
    pub fn new(
        clock: ClockKind,
        period_ms: u64,
        effective_period_ms: i64,
        error_threshold_ms: f64,
        stats: &mut DriftStats,
    ) -> Self {
        Self {
            clock,
            period_ms,
            effective_period_ms,
            error_threshold_ms,
            total_ticks: stats.total_ticks,
            shortened_ticks: stats.shortened_ticks,
            reset_ticks: stats.reset_ticks,
            correction_rate: stats.correction_rate(),
            last_error_ms: stats.last_error_ms,
            mean_error_ms: stats.mean_error_ms(),
            rms_error_ms: stats.rms_error_ms(),
            p50_abs_error_ms: stats.p50_abs_error_ms(),
            p95_abs_error_ms: stats.p95_abs_error_ms(),
            p99_abs_error_ms: stats.p99_abs_error_ms(),
            max_abs_error_ms: stats.max_abs_error_ms,
        }
    }
}

/// Print error in JSON format
pub fn print_error_json(error: &Error) {
    let error_json = json!({
        "success": false,
        "error": {
            "message": error.to_string(),
        }
    });
    match serde_json::to_string_pretty(&error_json) {
        Ok(s) => println!("{s}"),
        Err(e) => eprintln!("Failed to format error as JSON: {e}"),
    }
}

/// Print error in human-readable format
pub fn print_error_human(error: &Error) {
    eprintln!("{} {}", "Error:".red().bold(), error);

    let mut source = error.source();
    while let Some(err) = source {
        eprintln!("  {} {}", "Caused by:".yellow(), err);
        source = err.source();
    }
}

/// Print a single tick.
///
/// JSON output is one compact object per line so a run can be streamed.
pub fn print_tick(line: &TickLine, error_threshold_ms: f64, json: bool) {
    if json {
        match serde_json::to_string(line) {
            Ok(s) => println!("{s}"),
            Err(e) => eprintln!("Failed to format tick as JSON: {e}"),
        }
        return;
    }

    let error = format!("{:+8.3} ms", line.error_ms);
    let error = if line.error_ms.abs() < error_threshold_ms {
        error.green()
    } else {
        error.yellow()
    };
    println!(
        "{:>10.1} ms  now {:>12.3} ms  error {}  next {} ms",
        line.logical_time_ms, line.now_ms, error, line.effective_period_ms
    );
}

/// Print the end-of-run drift summary.
pub fn print_summary(summary: &RunSummary, json: bool) {
    if json {
        let output = json!({
            "success": true,
            "summary": summary,
        });
        match serde_json::to_string_pretty(&output) {
            Ok(s) => println!("{s}"),
            Err(e) => eprintln!("Failed to format summary as JSON: {e}"),
        }
        return;
    }

    println!();
    println!("{}", "Drift Summary:".bold());
    println!("  Clock: {:?}", summary.clock);
    println!(
        "  Period: {} ms (effective {} ms, threshold {} ms)",
        summary.period_ms, summary.effective_period_ms, summary.error_threshold_ms
    );
    println!("  Ticks: {}", summary.total_ticks);
    println!(
        "  Corrections: {} shortened, {} reset ({:.1}%)",
        summary.shortened_ticks,
        summary.reset_ticks,
        summary.correction_rate * 100.0
    );
    println!(
        "  Error: mean {:+.3} ms, rms {:.3} ms, last {:+.3} ms",
        summary.mean_error_ms, summary.rms_error_ms, summary.last_error_ms
    );
    println!(
        "  Abs error: p50 {:.3} ms, p95 {:.3} ms, p99 {:.3} ms, max {:.3} ms",
        summary.p50_abs_error_ms,
        summary.p95_abs_error_ms,
        summary.p99_abs_error_ms,
        summary.max_abs_error_ms
    );
}

/// Print clock probe results.
pub fn print_clocks(probes: &[ClockProbe], json: bool) {
    if json {
        let output = json!({
            "success": true,
            "clocks": probes,
        });
        match serde_json::to_string_pretty(&output) {
            Ok(s) => println!("{s}"),
            Err(e) => eprintln!("Failed to format clocks as JSON: {e}"),
        }
        return;
    }

    println!("{}", "Clock Sources:".bold());
    for probe in probes {
        match (probe.resolved, probe.reading_ms) {
            (Some(resolved), Some(reading)) => println!(
                "  {} {:?} -> {:?} ({:.3} ms)",
                "✓".green(),
                probe.requested,
                resolved,
                reading
            ),
            _ => println!(
                "  {} {:?}: {}",
                "✗".red(),
                probe.requested,
                probe.error.as_deref().unwrap_or("unavailable")
            ),
        }
    }
}
