//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Stage outcomes and durations (probe, frames, transcript, tags)
//! - Strategy failures inside the fallback chains
//! - Overall pipeline results
//! - External process terminations

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts};

// =============================================================================
// Stage Metrics
// =============================================================================

/// Stage outcomes by stage, winning method and result.
pub static STAGE_OUTCOMES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("footage_stage_outcomes_total", "Total stage outcomes"),
        &["stage", "method", "result"], // result: "succeeded", "degraded", "failed"
    )
    .unwrap()
});

/// Stage duration in seconds.
pub static STAGE_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new("footage_stage_duration_seconds", "Duration of pipeline stages")
            .buckets(vec![0.05, 0.25, 1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 300.0, 600.0]),
        &["stage"],
    )
    .unwrap()
});

/// Failed strategy attempts by stage, method and error kind.
pub static STRATEGY_FAILURES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "footage_strategy_failures_total",
            "Total failed strategy attempts inside fallback chains",
        ),
        &["stage", "method", "kind"],
    )
    .unwrap()
});

// =============================================================================
// Pipeline Metrics
// =============================================================================

/// Pipeline results by overall status.
pub static PIPELINE_RESULTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("footage_pipeline_results_total", "Total processed media items"),
        &["status"], // "full", "partial", "failed"
    )
    .unwrap()
});

/// External processes stopped by the supervisor.
pub static SUBPROCESS_TERMINATIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "footage_subprocess_terminations_total",
            "External processes terminated by the supervisor",
        ),
        &["signal"], // "term", "kill"
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(STAGE_OUTCOMES.clone()),
        Box::new(STAGE_DURATION.clone()),
        Box::new(STRATEGY_FAILURES.clone()),
        Box::new(PIPELINE_RESULTS.clone()),
        Box::new(SUBPROCESS_TERMINATIONS.clone()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_register_once() {
        let registry = prometheus::Registry::new();
        for metric in all_metrics() {
            registry.register(metric).unwrap();
        }
        PIPELINE_RESULTS.with_label_values(&["full"]).inc();
        let families = registry.gather();
        assert!(families
            .iter()
            .any(|f| f.get_name() == "footage_pipeline_results_total"));
    }
}
