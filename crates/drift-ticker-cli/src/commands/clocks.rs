//! `tickctl clocks`: report which clock sources resolve on this machine.

use anyhow::Result;
use drift_ticker::ClockKind;
use serde::Serialize;

use crate::output;

/// Outcome of resolving one clock selection.
#[derive(Debug, Clone, Serialize)]
pub struct ClockProbe {
    pub requested: ClockKind,
    pub resolved: Option<ClockKind>,
    pub reading_ms: Option<f64>,
    pub error: Option<String>,
}

impl ClockProbe {
    pub fn probe(requested: ClockKind) -> Self {
        match requested.resolve() {
            Ok((resolved, clock)) => Self {
                requested,
                resolved: Some(resolved),
                reading_ms: Some(clock.now_ms()),
                error: None,
            },
            Err(e) => Self {
                requested,
                resolved: None,
                reading_ms: None,
                error: Some(e.to_string()),
            },
        }
    }
}

/// Execute `tickctl clocks`.
pub fn execute(json: bool) -> Result<()> {
    let probes: Vec<ClockProbe> = [
        ClockKind::Auto,
        ClockKind::HighResolution,
        ClockKind::Platform,
        ClockKind::WallClock,
    ]
    .into_iter()
    .map(ClockProbe::probe)
    .collect();

    output::print_clocks(&probes, json);
    Ok(())
}
