//! Tag types.

use serde::{Deserialize, Serialize};

/// `source_method` of heuristic tags.
pub const HEURISTIC_METHOD: &str = "heuristic";

/// Fixed confidence of heuristic tags; deliberately below typical AI scores.
pub const HEURISTIC_CONFIDENCE: f32 = 0.2;

/// A semantic label attached to a media item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub label: String,
    pub confidence: f32,
    /// Strategy that produced the tag (inference provider or "heuristic").
    pub source_method: String,
}

impl Tag {
    pub fn new(label: impl Into<String>, confidence: f32, source_method: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            confidence,
            source_method: source_method.into(),
        }
    }

    pub fn is_heuristic(&self) -> bool {
        self.source_method == HEURISTIC_METHOD
    }
}

/// A JPEG-encoded frame sent to an inference service.
#[derive(Debug, Clone)]
pub struct EncodedFrame {
    pub timestamp_ms: u64,
    pub jpeg: Vec<u8>,
}

/// Everything an inference service gets to look at.
#[derive(Debug, Clone)]
pub struct InferenceRequest {
    pub frames: Vec<EncodedFrame>,
    /// Leading words of the transcript; empty when there was no speech.
    pub transcript_excerpt: String,
    /// Upper bound on the number of tags wanted.
    pub max_tags: usize,
}

impl InferenceRequest {
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty() && self.transcript_excerpt.trim().is_empty()
    }
}
