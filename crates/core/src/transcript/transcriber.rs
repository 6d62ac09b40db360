//! The transcription strategy chain.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tracing::{debug, warn};

use super::{normalize_segments, AudioExtractor, SpeechEngine, TranscriptSegment, TranscriptionConfig};
use crate::error::MediaError;
use crate::pipeline::{MediaItem, Stage, StageOutcome, StageRecorder};
use crate::probe::FormatProfile;

/// Method recorded when no engine produced words.
pub const EMPTY_TRANSCRIPT_METHOD: &str = "empty";

/// Produces a word-timestamped transcript by walking an ordered list of
/// speech engines. Never fabricates text: the last resort is an empty
/// transcript.
pub struct Transcriber {
    engines: Vec<Arc<dyn SpeechEngine>>,
    audio: Option<Arc<dyn AudioExtractor>>,
    config: TranscriptionConfig,
    scratch_dir: Option<PathBuf>,
}

impl Transcriber {
    pub fn new(config: TranscriptionConfig) -> Self {
        Self {
            engines: Vec::new(),
            audio: None,
            config,
            scratch_dir: None,
        }
    }

    /// Appends an engine to the chain.
    pub fn with_engine(mut self, engine: Arc<dyn SpeechEngine>) -> Self {
        self.engines.push(engine);
        self
    }

    /// Sets the audio extraction step run before the engines.
    pub fn with_audio_extractor(mut self, audio: Arc<dyn AudioExtractor>) -> Self {
        self.audio = Some(audio);
        self
    }

    /// Directory under which per-invocation scratch directories are created.
    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = Some(dir.into());
        self
    }

    /// Names of the configured engines, in chain order.
    pub fn engine_names(&self) -> Vec<&str> {
        self.engines.iter().map(|e| e.name()).collect()
    }

    /// Transcribes the item. Segments are sorted by `start_ms`.
    pub async fn transcribe(
        &self,
        item: &MediaItem,
        profile: &FormatProfile,
    ) -> (Vec<TranscriptSegment>, StageOutcome) {
        let mut recorder = StageRecorder::start(Stage::Transcription);
        let budget = self.config.engine_timeout(profile.duration());
        let policy = self.config.retry_policy();

        // Scratch files live exactly as long as this call.
        let scratch = self.scratch().await;
        let audio_path = self.prepare_audio(&item.path, scratch.as_ref()).await;

        for engine in &self.engines {
            let name = engine.name();
            let started = Instant::now();

            let audio = audio_path.as_path();
            let (result, calls) = policy
                .run(name, move || attempt(engine, audio, budget))
                .await;

            match result {
                Ok(segments) => {
                    recorder.success(name, segments.len(), 0, calls, started);
                    return (segments, recorder.finish_success(name));
                }
                Err(e) => recorder.failure(name, &e, 0, calls, started),
            }
        }

        recorder.fallback(EMPTY_TRANSCRIPT_METHOD, 0);
        (Vec::new(), recorder.finish_degraded(EMPTY_TRANSCRIPT_METHOD))
    }

    async fn scratch(&self) -> Option<TempDir> {
        let parent = self.scratch_dir.clone();
        let created = tokio::task::spawn_blocking(move || {
            let mut builder = tempfile::Builder::new();
            builder.prefix("footage-audio-");
            match parent {
                Some(dir) => std::fs::create_dir_all(&dir).and_then(|_| builder.tempdir_in(&dir)),
                None => builder.tempdir(),
            }
        })
        .await;
        match created {
            Ok(Ok(dir)) => Some(dir),
            Ok(Err(e)) => {
                warn!("Could not create scratch directory: {}", e);
                None
            }
            Err(e) => {
                warn!("Scratch directory task failed: {}", e);
                None
            }
        }
    }

    /// Extracted audio when possible, the original media otherwise.
    async fn prepare_audio(&self, media: &Path, scratch: Option<&TempDir>) -> PathBuf {
        let (Some(audio), Some(scratch)) = (&self.audio, scratch) else {
            return media.to_path_buf();
        };
        let limit = self.config.audio_timeout();
        match tokio::time::timeout(limit, audio.extract(media, scratch.path())).await {
            Ok(Ok(path)) => {
                debug!("Extracted audio to {}", path.display());
                path
            }
            Ok(Err(e)) => {
                warn!("Audio extraction failed, engines get the original file: {}", e);
                media.to_path_buf()
            }
            Err(_) => {
                warn!("Audio extraction exceeded {:?}, engines get the original file", limit);
                media.to_path_buf()
            }
        }
    }
}

/// One engine call under the budget; an empty transcript counts as a failure.
async fn attempt(
    engine: &Arc<dyn SpeechEngine>,
    audio: &Path,
    budget: Duration,
) -> Result<Vec<TranscriptSegment>, MediaError> {
    let segments = tokio::time::timeout(budget, engine.transcribe(audio, budget))
        .await
        .map_err(|_| MediaError::Timeout { after: budget })??;
    let segments = normalize_segments(segments);
    if segments.is_empty() {
        return Err(MediaError::invalid_input("Engine returned an empty transcript"));
    }
    Ok(segments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::testing::{MockAudioExtractor, MockSpeechEngine};

    fn config() -> TranscriptionConfig {
        TranscriptionConfig {
            retry_backoff_ms: 1,
            ..Default::default()
        }
    }

    fn item() -> MediaItem {
        MediaItem::new("m1", "/media/talk.mp4")
    }

    fn words() -> Vec<TranscriptSegment> {
        vec![
            TranscriptSegment::new("world", 500, 900, 0.9),
            TranscriptSegment::new("hello", 0, 400, 0.95),
        ]
    }

    #[tokio::test]
    async fn test_primary_success_is_sorted() {
        let primary = Arc::new(MockSpeechEngine::new("whisper_api").returning(words()));
        let transcriber = Transcriber::new(config()).with_engine(primary);

        let (segments, outcome) = transcriber.transcribe(&item(), &FormatProfile::unknown()).await;
        assert_eq!(segments[0].word, "hello");
        assert_eq!(segments[1].word, "world");
        assert!(outcome.is_full());
        assert_eq!(outcome.method_used, "whisper_api");
    }

    #[tokio::test]
    async fn test_transient_failure_retried_once() {
        let primary = Arc::new(
            MockSpeechEngine::new("whisper_api")
                .returning(words())
                .failing_first(1, MediaError::transient("connection reset")),
        );
        let transcriber = Transcriber::new(config()).with_engine(primary.clone());

        let (segments, outcome) = transcriber.transcribe(&item(), &FormatProfile::unknown()).await;
        assert_eq!(segments.len(), 2);
        assert_eq!(outcome.attempts[0].calls, 2);
        assert_eq!(primary.call_count().await, 2);
    }

    #[tokio::test]
    async fn test_invalid_input_falls_through_without_retry() {
        let primary = Arc::new(
            MockSpeechEngine::new("whisper_api")
                .always_failing(MediaError::invalid_input("corrupt audio stream")),
        );
        let secondary = Arc::new(MockSpeechEngine::new("whisper_cpp").returning(words()));
        let transcriber = Transcriber::new(config())
            .with_engine(primary.clone())
            .with_engine(secondary);

        let (segments, outcome) = transcriber.transcribe(&item(), &FormatProfile::unknown()).await;
        assert_eq!(primary.call_count().await, 1);
        assert_eq!(segments.len(), 2);
        assert_eq!(outcome.method_used, "whisper_cpp");
        assert!(outcome.succeeded && !outcome.degraded);
        assert_eq!(outcome.attempts[0].error_kind, Some(ErrorKind::InvalidInput));
    }

    #[tokio::test]
    async fn test_empty_primary_falls_through() {
        let primary = Arc::new(MockSpeechEngine::new("whisper_api").returning(vec![]));
        let secondary = Arc::new(MockSpeechEngine::new("whisper_cpp").returning(words()));
        let transcriber = Transcriber::new(config())
            .with_engine(primary)
            .with_engine(secondary);

        let (_, outcome) = transcriber.transcribe(&item(), &FormatProfile::unknown()).await;
        assert_eq!(outcome.method_used, "whisper_cpp");
    }

    #[tokio::test]
    async fn test_all_engines_fail_gives_empty_transcript() {
        let transcriber = Transcriber::new(config())
            .with_engine(Arc::new(
                MockSpeechEngine::new("whisper_api").always_failing(MediaError::unavailable("no key")),
            ))
            .with_engine(Arc::new(MockSpeechEngine::new("whisper_cpp").returning(vec![])));

        let (segments, outcome) = transcriber.transcribe(&item(), &FormatProfile::unknown()).await;
        assert!(segments.is_empty());
        assert!(!outcome.succeeded);
        assert!(outcome.degraded);
        assert_eq!(outcome.method_used, EMPTY_TRANSCRIPT_METHOD);
        assert_eq!(outcome.error_kind, Some(ErrorKind::Exhausted));
    }

    #[tokio::test]
    async fn test_hanging_engine_times_out_without_retry() {
        let config = TranscriptionConfig {
            min_timeout_secs: 1,
            duration_multiplier: 1.0,
            ..config()
        };
        let profile = FormatProfile {
            duration_ms: Some(1_000),
            ..FormatProfile::unknown()
        };
        let primary = Arc::new(MockSpeechEngine::new("whisper_api").hanging());
        let secondary = Arc::new(MockSpeechEngine::new("whisper_cpp").returning(words()));
        let transcriber = Transcriber::new(config)
            .with_engine(primary.clone())
            .with_engine(secondary);

        let start = Instant::now();
        let (segments, outcome) = transcriber.transcribe(&item(), &profile).await;
        assert!(start.elapsed() < Duration::from_secs(5));
        assert_eq!(segments.len(), 2);
        assert_eq!(primary.call_count().await, 1);
        assert_eq!(outcome.attempts[0].error_kind, Some(ErrorKind::Timeout));
    }

    #[tokio::test]
    async fn test_engines_receive_extracted_audio() {
        let scratch = tempfile::tempdir().unwrap();
        let engine = Arc::new(MockSpeechEngine::new("whisper_api").returning(words()));
        let transcriber = Transcriber::new(config())
            .with_engine(engine.clone())
            .with_audio_extractor(Arc::new(MockAudioExtractor::new()))
            .with_scratch_dir(scratch.path());

        transcriber.transcribe(&item(), &FormatProfile::unknown()).await;

        let received = engine.recorded_paths().await;
        assert_eq!(received.len(), 1);
        assert!(received[0].starts_with(scratch.path()));
        assert!(received[0].ends_with("audio.wav"));
        // Scratch directory removed after the call.
        assert_eq!(std::fs::read_dir(scratch.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_failed_extraction_passes_original_media() {
        let engine = Arc::new(MockSpeechEngine::new("whisper_api").returning(words()));
        let transcriber = Transcriber::new(config())
            .with_engine(engine.clone())
            .with_audio_extractor(Arc::new(MockAudioExtractor::failing()));

        transcriber.transcribe(&item(), &FormatProfile::unknown()).await;
        assert_eq!(
            engine.recorded_paths().await,
            vec![PathBuf::from("/media/talk.mp4")]
        );
    }
}
