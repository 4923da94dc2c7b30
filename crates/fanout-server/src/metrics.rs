//! Prometheus metrics collection and formatting.
//!
//! Metrics are emitted in Prometheus text exposition format; the scrape
//! pipeline itself is external.

use std::fmt::Write;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use crate::state::AppState;

/// Collect run counters from AppState and format as Prometheus text.
pub fn collect_metrics(state: &Arc<AppState>) -> String {
    let mut output = String::new();

    writeln!(
        output,
        "# HELP fanout_runs_total Total number of runs by outcome"
    )
    .ok();
    writeln!(output, "# TYPE fanout_runs_total counter").ok();
    writeln!(
        output,
        "fanout_runs_total{{outcome=\"completed\"}} {}",
        state.runs_completed.load(Ordering::Relaxed)
    )
    .ok();
    writeln!(
        output,
        "fanout_runs_total{{outcome=\"partial\"}} {}",
        state.runs_partial.load(Ordering::Relaxed)
    )
    .ok();
    writeln!(
        output,
        "fanout_runs_total{{outcome=\"failed\"}} {}",
        state.runs_failed.load(Ordering::Relaxed)
    )
    .ok();
    writeln!(
        output,
        "fanout_runs_total{{outcome=\"rejected\"}} {}",
        state.runs_rejected.load(Ordering::Relaxed)
    )
    .ok();

    output
}
