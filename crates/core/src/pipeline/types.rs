//! Input and result records of a pipeline run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

use super::outcome::StageOutcome;
use crate::frames::ExtractedFrame;
use crate::probe::FormatProfile;
use crate::tagging::Tag;
use crate::transcript::TranscriptSegment;

/// A media file to process. Identity is `id`; the pipeline never mutates it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaItem {
    pub id: String,
    pub path: PathBuf,
    /// Lower-cased extension as declared by the uploader, without the dot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub declared_extension: Option<String>,
}

impl MediaItem {
    /// Creates an item, taking the declared extension from the path.
    pub fn new(id: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let declared_extension = extension_of(&path);
        Self {
            id: id.into(),
            path,
            declared_extension,
        }
    }

    /// Overrides the declared extension (e.g. from an upload's original name).
    pub fn with_declared_extension(mut self, extension: impl Into<String>) -> Self {
        let ext = extension.into();
        let ext = ext.trim_start_matches('.').to_lowercase();
        self.declared_extension = if ext.is_empty() { None } else { Some(ext) };
        self
    }
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .filter(|e| !e.is_empty())
}

/// Overall verdict for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OverallStatus {
    /// Every stage succeeded without degradation.
    Full,
    /// Something usable came out, but not everything at full fidelity.
    Partial,
    /// Neither frames nor transcript were produced.
    Failed,
}

impl OverallStatus {
    /// Derives the status from a run's outputs.
    pub fn evaluate(
        frames: &[ExtractedFrame],
        transcript: &[TranscriptSegment],
        outcomes: &[StageOutcome],
    ) -> Self {
        if frames.is_empty() && transcript.is_empty() {
            OverallStatus::Failed
        } else if outcomes.iter().all(StageOutcome::is_full) {
            OverallStatus::Full
        } else {
            OverallStatus::Partial
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OverallStatus::Full => "full",
            OverallStatus::Partial => "partial",
            OverallStatus::Failed => "failed",
        }
    }
}

/// Aggregated result of one pipeline invocation. Owned by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingResult {
    pub media_id: String,
    /// Unique id of this invocation.
    pub run_id: Uuid,
    pub profile: FormatProfile,
    pub frames: Vec<ExtractedFrame>,
    pub transcript: Vec<TranscriptSegment>,
    pub tags: Vec<Tag>,
    pub stage_outcomes: Vec<StageOutcome>,
    pub overall_status: OverallStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: u64,
}

impl ProcessingResult {
    /// Outcome of the given stage, if it was recorded.
    pub fn outcome(&self, stage: super::Stage) -> Option<&StageOutcome> {
        self.stage_outcomes.iter().find(|o| o.stage_name == stage)
    }

    /// Number of frames that came from a real decoder.
    pub fn real_frame_count(&self) -> usize {
        self.frames.iter().filter(|f| !f.is_placeholder()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::outcome::{Stage, StageOutcome};

    fn outcome(stage: Stage, succeeded: bool, degraded: bool) -> StageOutcome {
        StageOutcome {
            stage_name: stage,
            method_used: "x".to_string(),
            succeeded,
            degraded,
            error_kind: None,
            duration_ms: 0,
            attempts: vec![],
        }
    }

    fn segment() -> TranscriptSegment {
        TranscriptSegment {
            word: "hello".to_string(),
            start_ms: 0,
            end_ms: 100,
            confidence: 0.9,
        }
    }

    #[test]
    fn test_media_item_extension() {
        let item = MediaItem::new("a", "/uploads/Clip.MKV");
        assert_eq!(item.declared_extension.as_deref(), Some("mkv"));

        let item = MediaItem::new("b", "/uploads/blob").with_declared_extension(".MP4");
        assert_eq!(item.declared_extension.as_deref(), Some("mp4"));
    }

    #[test]
    fn test_status_failed_when_nothing_usable() {
        let outcomes = vec![outcome(Stage::FrameExtraction, true, false)];
        assert_eq!(
            OverallStatus::evaluate(&[], &[], &outcomes),
            OverallStatus::Failed
        );
    }

    #[test]
    fn test_status_full_and_partial() {
        let transcript = vec![segment()];
        let all_good = vec![
            outcome(Stage::FrameExtraction, true, false),
            outcome(Stage::Transcription, true, false),
            outcome(Stage::Tagging, true, false),
        ];
        assert_eq!(
            OverallStatus::evaluate(&[], &transcript, &all_good),
            OverallStatus::Full
        );

        let one_degraded = vec![
            outcome(Stage::FrameExtraction, false, true),
            outcome(Stage::Transcription, true, false),
            outcome(Stage::Tagging, true, false),
        ];
        assert_eq!(
            OverallStatus::evaluate(&[], &transcript, &one_degraded),
            OverallStatus::Partial
        );
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(
            serde_json::to_string(&OverallStatus::Partial).unwrap(),
            "\"PARTIAL\""
        );
    }
}
