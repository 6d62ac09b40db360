//! Transcript types.

use serde::{Deserialize, Serialize};

/// One recognised word with its position in the media.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    pub word: String,
    pub start_ms: u64,
    pub end_ms: u64,
    /// Recognition confidence in [0, 1].
    pub confidence: f32,
}

impl TranscriptSegment {
    pub fn new(word: impl Into<String>, start_ms: u64, end_ms: u64, confidence: f32) -> Self {
        Self {
            word: word.into(),
            start_ms,
            end_ms,
            confidence,
        }
    }
}

/// Read helpers over an ordered word sequence.
pub trait TranscriptExt {
    /// Words joined by single spaces.
    fn text(&self) -> String;

    fn word_count(&self) -> usize;

    /// Leading words that fit in `max_chars` characters, never cutting a word.
    fn excerpt(&self, max_chars: usize) -> String;
}

impl TranscriptExt for [TranscriptSegment] {
    fn text(&self) -> String {
        self.iter()
            .map(|s| s.word.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn word_count(&self) -> usize {
        self.len()
    }

    fn excerpt(&self, max_chars: usize) -> String {
        let mut out = String::new();
        let mut used = 0usize;
        for segment in self {
            let len = segment.word.chars().count();
            let needed = if out.is_empty() { len } else { len + 1 };
            if used + needed > max_chars {
                break;
            }
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str(&segment.word);
            used += needed;
        }
        out
    }
}

/// Cleans engine output so downstream stages can rely on it.
///
/// Blank words are dropped, `end_ms` is clamped to at least `start_ms`,
/// confidence is clamped to [0, 1] and segments are stably sorted by
/// `start_ms`. Out-of-order words are re-sorted, never dropped.
pub fn normalize_segments(segments: Vec<TranscriptSegment>) -> Vec<TranscriptSegment> {
    let mut segments: Vec<TranscriptSegment> = segments
        .into_iter()
        .filter_map(|mut s| {
            let word = s.word.trim();
            if word.is_empty() {
                return None;
            }
            if word.len() != s.word.len() {
                s.word = word.to_string();
            }
            s.end_ms = s.end_ms.max(s.start_ms);
            s.confidence = if s.confidence.is_finite() {
                s.confidence.clamp(0.0, 1.0)
            } else {
                0.0
            };
            Some(s)
        })
        .collect();
    // sort_by_key is stable
    segments.sort_by_key(|s| s.start_ms);
    segments
}
