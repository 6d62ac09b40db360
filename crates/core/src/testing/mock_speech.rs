//! Mock speech engine and audio extractor.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use super::script::Script;
use crate::error::MediaError;
use crate::transcript::{AudioExtractor, SpeechEngine, TranscriptSegment};

/// Mock implementation of the SpeechEngine trait.
///
/// Returns its configured segments as-is (no sorting), so callers can verify
/// normalisation.
#[derive(Debug)]
pub struct MockSpeechEngine {
    name: String,
    segments: Vec<TranscriptSegment>,
    script: Script,
    paths: Arc<RwLock<Vec<PathBuf>>>,
}

impl MockSpeechEngine {
    /// An engine that returns an empty transcript until configured.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            segments: Vec::new(),
            script: Script::default(),
            paths: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn returning(mut self, segments: Vec<TranscriptSegment>) -> Self {
        self.segments = segments;
        self
    }

    /// Fails the first `n` calls with `error`.
    pub fn failing_first(mut self, n: usize, error: MediaError) -> Self {
        self.script.fail_first(n, error);
        self
    }

    pub fn always_failing(mut self, error: MediaError) -> Self {
        self.script.always_fail(error);
        self
    }

    /// Never answers.
    pub fn hanging(mut self) -> Self {
        self.script.hang();
        self
    }

    /// Takes `delay` to answer each call.
    pub fn delayed(mut self, delay: Duration) -> Self {
        self.script.delay(delay);
        self
    }

    pub async fn call_count(&self) -> usize {
        self.paths.read().await.len()
    }

    /// Audio paths received, one per call.
    pub async fn recorded_paths(&self) -> Vec<PathBuf> {
        self.paths.read().await.clone()
    }
}

#[async_trait]
impl SpeechEngine for MockSpeechEngine {
    fn name(&self) -> &str {
        &self.name
    }

    async fn transcribe(
        &self,
        audio: &Path,
        _budget: Duration,
    ) -> Result<Vec<TranscriptSegment>, MediaError> {
        let call = {
            let mut paths = self.paths.write().await;
            paths.push(audio.to_path_buf());
            paths.len() - 1
        };
        self.script.check(call).await?;
        Ok(self.segments.clone())
    }
}

/// Mock implementation of the AudioExtractor trait.
///
/// Writes a small `audio.wav` into the scratch directory it is given.
#[derive(Debug, Default)]
pub struct MockAudioExtractor {
    fail: bool,
}

impl MockAudioExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// An extractor that always reports the audio stream as unreadable.
    pub fn failing() -> Self {
        Self { fail: true }
    }
}

#[async_trait]
impl AudioExtractor for MockAudioExtractor {
    async fn extract(&self, _media: &Path, scratch_dir: &Path) -> Result<PathBuf, MediaError> {
        if self.fail {
            return Err(MediaError::invalid_input("no audio stream"));
        }
        let target = scratch_dir.join("audio.wav");
        tokio::fs::write(&target, vec![0u8; 128]).await?;
        Ok(target)
    }
}
