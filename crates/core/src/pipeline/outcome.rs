//! Per-stage outcome records.

use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::error::{ErrorKind, MediaError};
use crate::metrics;

/// The three stages that report an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    FrameExtraction,
    Transcription,
    Tagging,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::FrameExtraction => "frame_extraction",
            Stage::Transcription => "transcription",
            Stage::Tagging => "tagging",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One strategy tried inside a stage's chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyAttempt {
    /// Strategy name (e.g. "ffmpeg", "whisper_api", "placeholder").
    pub method: String,
    /// Whether the strategy produced real output.
    pub succeeded: bool,
    /// Failure classification, if it failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    /// Failure message, if it failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Items produced (frames, segments, tags).
    pub produced: usize,
    /// Units skipped (failed frame samples).
    #[serde(default)]
    pub skipped: usize,
    /// Calls made, including retries.
    pub calls: u32,
    pub duration_ms: u64,
}

/// Outcome of one stage for one run. Never mutated once built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageOutcome {
    pub stage_name: Stage,
    /// Strategy whose output the stage returned ("none" when cancelled).
    pub method_used: String,
    pub succeeded: bool,
    pub degraded: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    pub duration_ms: u64,
    /// Every strategy tried, in order.
    #[serde(default)]
    pub attempts: Vec<StrategyAttempt>,
}

impl StageOutcome {
    /// Outcome for a stage the coordinator cut off at the wall-clock ceiling.
    pub fn cancelled(stage: Stage, duration_ms: u64) -> Self {
        let outcome = Self {
            stage_name: stage,
            method_used: "none".to_string(),
            succeeded: false,
            degraded: true,
            error_kind: Some(ErrorKind::Timeout),
            duration_ms,
            attempts: Vec::new(),
        };
        outcome.record_metrics();
        outcome
    }

    /// Whether this stage ran at full fidelity.
    pub fn is_full(&self) -> bool {
        self.succeeded && !self.degraded
    }

    fn record_metrics(&self) {
        let result = if self.is_full() {
            "succeeded"
        } else if self.degraded {
            "degraded"
        } else {
            "failed"
        };
        metrics::STAGE_OUTCOMES
            .with_label_values(&[self.stage_name.as_str(), &self.method_used, result])
            .inc();
        metrics::STAGE_DURATION
            .with_label_values(&[self.stage_name.as_str()])
            .observe(self.duration_ms as f64 / 1000.0);
    }
}

/// Collects attempts while a stage walks its chain.
pub(crate) struct StageRecorder {
    stage: Stage,
    started: Instant,
    attempts: Vec<StrategyAttempt>,
}

impl StageRecorder {
    pub(crate) fn start(stage: Stage) -> Self {
        Self {
            stage,
            started: Instant::now(),
            attempts: Vec::new(),
        }
    }

    /// Records a strategy that produced output.
    pub(crate) fn success(
        &mut self,
        method: &str,
        produced: usize,
        skipped: usize,
        calls: u32,
        started: Instant,
    ) {
        debug!(
            "{}: {} produced {} item(s) ({} skipped)",
            self.stage, method, produced, skipped
        );
        self.attempts.push(StrategyAttempt {
            method: method.to_string(),
            succeeded: true,
            error_kind: None,
            message: None,
            produced,
            skipped,
            calls,
            duration_ms: started.elapsed().as_millis() as u64,
        });
    }

    /// Records a strategy that failed.
    pub(crate) fn failure(
        &mut self,
        method: &str,
        err: &MediaError,
        skipped: usize,
        calls: u32,
        started: Instant,
    ) {
        warn!("{}: {} failed: {}", self.stage, method, err);
        metrics::STRATEGY_FAILURES
            .with_label_values(&[self.stage.as_str(), method, err.kind().as_str()])
            .inc();
        self.attempts.push(StrategyAttempt {
            method: method.to_string(),
            succeeded: false,
            error_kind: Some(err.kind()),
            message: Some(err.to_string()),
            produced: 0,
            skipped,
            calls,
            duration_ms: started.elapsed().as_millis() as u64,
        });
    }

    /// Records the last-resort fallback (placeholder, empty, heuristic).
    pub(crate) fn fallback(&mut self, method: &str, produced: usize) {
        self.attempts.push(StrategyAttempt {
            method: method.to_string(),
            succeeded: false,
            error_kind: None,
            message: None,
            produced,
            skipped: 0,
            calls: 0,
            duration_ms: 0,
        });
    }

    /// Outcome for a stage won by a real strategy.
    pub(crate) fn finish_success(self, method: &str) -> StageOutcome {
        self.finish(method, true, false, None)
    }

    /// Outcome for a stage that fell back to its last resort.
    pub(crate) fn finish_degraded(self, method: &str) -> StageOutcome {
        self.finish(method, false, true, Some(ErrorKind::Exhausted))
    }

    /// Outcome for a stage stopped by the deadline; its output is kept.
    pub(crate) fn finish_timed_out(self, method: &str) -> StageOutcome {
        self.finish(method, false, true, Some(ErrorKind::Timeout))
    }

    fn finish(
        self,
        method: &str,
        succeeded: bool,
        degraded: bool,
        error_kind: Option<ErrorKind>,
    ) -> StageOutcome {
        let outcome = StageOutcome {
            stage_name: self.stage,
            method_used: method.to_string(),
            succeeded,
            degraded,
            error_kind,
            duration_ms: self.started.elapsed().as_millis() as u64,
            attempts: self.attempts,
        };
        if outcome.degraded {
            warn!(
                "{} degraded to {} after {} attempt(s)",
                outcome.stage_name,
                outcome.method_used,
                outcome.attempts.len()
            );
        } else {
            info!(
                "{} completed via {} in {} ms",
                outcome.stage_name, outcome.method_used, outcome.duration_ms
            );
        }
        outcome.record_metrics();
        outcome
    }
}
