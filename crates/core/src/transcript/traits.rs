//! Speech capability traits.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::TranscriptSegment;
use crate::error::MediaError;

/// A speech-to-text engine returning word-level timestamps.
///
/// Implementations must be thread-safe (Send + Sync) for use across async tasks.
#[async_trait]
pub trait SpeechEngine: Send + Sync {
    /// Strategy name recorded in the stage outcome.
    fn name(&self) -> &str;

    /// Transcribes `audio`, which is either extracted 16 kHz mono WAV or the
    /// original media file. `budget` is the time the caller will wait.
    async fn transcribe(
        &self,
        audio: &Path,
        budget: Duration,
    ) -> Result<Vec<TranscriptSegment>, MediaError>;
}

/// Prepares an audio track the speech engines can consume.
#[async_trait]
pub trait AudioExtractor: Send + Sync {
    /// Writes the audio of `media` into `scratch_dir` and returns its path.
    async fn extract(&self, media: &Path, scratch_dir: &Path) -> Result<PathBuf, MediaError>;
}
