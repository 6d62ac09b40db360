//! Runs the probe and the three stages for one media item.

use chrono::Utc;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout_at;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use super::{MediaItem, OverallStatus, ProcessingResult, Stage, StageOutcome};
use crate::config::Config;
use crate::frames::{FfmpegFrameDecoder, FrameDecoder, FrameExtractor};
use crate::metrics;
use crate::probe::{FfprobeProbe, FormatProbe, FormatProfile, MetadataProbe};
use crate::tagging::{
    AnthropicInference, GeminiInference, InferenceConfig, InferenceProvider, TagInference, Tagger,
};
use crate::transcript::{
    AudioExtractor, FfmpegAudioExtractor, SpeechEngine, Transcriber, WhisperApiEngine,
    WhisperCppEngine,
};

/// The media pipeline. Safe to share and to call concurrently for distinct items.
///
/// Every external capability is an explicitly injected handle; nothing is
/// looked up globally.
pub struct MediaPipeline {
    probe: FormatProbe,
    extractor: FrameExtractor,
    transcriber: Transcriber,
    tagger: Tagger,
    ceiling: Duration,
    frame_count: usize,
}

impl MediaPipeline {
    /// A pipeline with no external capabilities: every stage goes straight to
    /// its fallback until capabilities are added with the `with_*` methods.
    pub fn new(config: &Config) -> Self {
        Self {
            probe: FormatProbe::new(&config.probe),
            extractor: FrameExtractor::new(&config.frames),
            transcriber: Transcriber::new(config.transcription.clone())
                .with_scratch_dir(config.pipeline.scratch_dir.clone()),
            tagger: Tagger::new(&config.tagging),
            ceiling: config.pipeline.wall_clock_ceiling(),
            frame_count: config.frames.sample_count,
        }
    }

    /// A pipeline wired to the tools and services named in the configuration.
    pub fn from_config(config: &Config) -> Self {
        let grace = config.pipeline.kill_grace();
        let ffmpeg = config.ffmpeg.resolved();
        debug!(
            "Using ffmpeg at {} and ffprobe at {}",
            ffmpeg.ffmpeg_path.display(),
            ffmpeg.ffprobe_path.display()
        );

        let mut pipeline = Self::new(config)
            .with_metadata_probe(Arc::new(FfprobeProbe::new(
                ffmpeg.clone(),
                config.probe.timeout(),
                grace,
            )))
            .with_frame_decoder(Arc::new(FfmpegFrameDecoder::new(
                ffmpeg.clone(),
                config.frames.strategy_timeout(),
                grace,
            )));

        if config.frames.libav_enabled {
            pipeline = pipeline.with_libav_decoder();
        }

        pipeline = pipeline.with_audio_extractor(Arc::new(FfmpegAudioExtractor::new(
            ffmpeg,
            config.transcription.audio_timeout(),
            grace,
        )));

        if let Some(api) = &config.transcription.whisper_api {
            pipeline = pipeline.with_speech_engine(Arc::new(WhisperApiEngine::new(api.clone())));
        }
        if let Some(cpp) = &config.transcription.whisper_cpp {
            pipeline =
                pipeline.with_speech_engine(Arc::new(WhisperCppEngine::new(cpp.clone(), grace)));
        }

        if let Some(inference) = &config.tagging.inference {
            pipeline = pipeline
                .with_tag_inference(build_inference(inference, config.tagging.timeout()));
        }

        pipeline
    }

    #[cfg(feature = "libav")]
    fn with_libav_decoder(self) -> Self {
        self.with_frame_decoder(Arc::new(crate::frames::LibavFrameDecoder::new()))
    }

    #[cfg(not(feature = "libav"))]
    fn with_libav_decoder(self) -> Self {
        warn!(
            "frames.libav_enabled is set but this build has no `libav` feature; \
             frame extraction falls back from ffmpeg straight to placeholders"
        );
        self
    }

    pub fn with_metadata_probe(mut self, probe: Arc<dyn MetadataProbe>) -> Self {
        self.probe = self.probe.with_metadata_probe(probe);
        self
    }

    /// Appends a frame decoder; decoders are tried in the order added.
    pub fn with_frame_decoder(mut self, decoder: Arc<dyn FrameDecoder>) -> Self {
        self.extractor = self.extractor.with_decoder(decoder);
        self
    }

    /// Appends a speech engine; engines are tried in the order added.
    pub fn with_speech_engine(mut self, engine: Arc<dyn SpeechEngine>) -> Self {
        self.transcriber = self.transcriber.with_engine(engine);
        self
    }

    pub fn with_audio_extractor(mut self, audio: Arc<dyn AudioExtractor>) -> Self {
        self.transcriber = self.transcriber.with_audio_extractor(audio);
        self
    }

    /// Appends an inference service; services are tried in the order added.
    pub fn with_tag_inference(mut self, inference: Arc<dyn TagInference>) -> Self {
        self.tagger = self.tagger.with_inference(inference);
        self
    }

    pub fn with_ceiling(mut self, ceiling: Duration) -> Self {
        self.ceiling = ceiling;
        self
    }

    pub fn with_frame_count(mut self, frame_count: usize) -> Self {
        self.frame_count = frame_count;
        self
    }

    /// Strategy names per stage, in chain order.
    pub fn strategies(&self) -> Vec<(Stage, Vec<String>)> {
        let owned = |names: Vec<&str>| -> Vec<String> {
            names.into_iter().map(str::to_string).collect()
        };
        vec![
            (Stage::FrameExtraction, owned(self.extractor.decoder_names())),
            (Stage::Transcription, owned(self.transcriber.engine_names())),
            (Stage::Tagging, owned(self.tagger.inference_names())),
        ]
    }

    /// Processes one item. Never fails and never outlives the ceiling by more
    /// than the time needed to assemble the result.
    pub async fn process(&self, item: &MediaItem) -> ProcessingResult {
        let run_id = Uuid::new_v4();
        let span = info_span!("process", media_id = %item.id, run_id = %run_id);
        self.run(item, run_id).instrument(span).await
    }

    /// Processes `items` with at most `limit` in flight. Results keep input order.
    pub async fn process_many(&self, items: &[MediaItem], limit: usize) -> Vec<ProcessingResult> {
        stream::iter(items)
            .map(|item| self.process(item))
            .buffered(limit.max(1))
            .collect::<Vec<_>>()
            .await
    }

    async fn run(&self, item: &MediaItem, run_id: Uuid) -> ProcessingResult {
        let started_at = Utc::now();
        let start = Instant::now();
        let deadline = tokio::time::Instant::now() + self.ceiling;
        info!("Processing {}", item.path.display());

        let profile = timeout_at(
            deadline,
            self.probe
                .probe(&item.path, item.declared_extension.as_deref()),
        )
        .await
        .unwrap_or_else(|_| FormatProfile::unknown());

        let stages_start = Instant::now();
        // The extractor watches the deadline itself so decoded frames survive it.
        let ((frames, frames_outcome), transcript) = tokio::join!(
            self.extractor
                .extract_before(item, &profile, self.frame_count, deadline),
            timeout_at(deadline, self.transcriber.transcribe(item, &profile)),
        );
        let (transcript, transcript_outcome) = transcript.unwrap_or_else(|_| {
            cancelled(Stage::Transcription, stages_start)
        });

        let tagging_start = Instant::now();
        let (tags, tags_outcome) = timeout_at(deadline, self.tagger.tag(&frames, &transcript))
            .await
            .unwrap_or_else(|_| cancelled(Stage::Tagging, tagging_start));

        let stage_outcomes = vec![frames_outcome, transcript_outcome, tags_outcome];
        let overall_status = OverallStatus::evaluate(&frames, &transcript, &stage_outcomes);
        metrics::PIPELINE_RESULTS
            .with_label_values(&[overall_status.as_str()])
            .inc();

        let duration_ms = start.elapsed().as_millis() as u64;
        info!(
            "Finished with status {:?}: {} frame(s), {} word(s), {} tag(s) in {} ms",
            overall_status,
            frames.len(),
            transcript.len(),
            tags.len(),
            duration_ms
        );

        ProcessingResult {
            media_id: item.id.clone(),
            run_id,
            profile,
            frames,
            transcript,
            tags,
            stage_outcomes,
            overall_status,
            started_at,
            finished_at: Utc::now(),
            duration_ms,
        }
    }
}

/// Empty output and a timeout outcome for a stage cut by the ceiling.
fn cancelled<T>(stage: Stage, since: Instant) -> (Vec<T>, StageOutcome) {
    warn!("{} cancelled at the wall-clock ceiling", stage);
    (
        Vec::new(),
        StageOutcome::cancelled(stage, since.elapsed().as_millis() as u64),
    )
}

fn build_inference(config: &InferenceConfig, timeout: Duration) -> Arc<dyn TagInference> {
    match config.provider {
        InferenceProvider::Gemini => Arc::new(
            GeminiInference::new(config.api_key.clone(), config.model(), timeout)
                .with_api_base(config.api_base()),
        ),
        InferenceProvider::Anthropic => Arc::new(
            AnthropicInference::new(config.api_key.clone(), config.model(), timeout)
                .with_api_base(config.api_base()),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_has_no_strategies() {
        let pipeline = MediaPipeline::new(&Config::default());
        for (_, names) in pipeline.strategies() {
            assert!(names.is_empty());
        }
    }

    #[test]
    fn test_from_config_wires_configured_services() {
        let config = crate::config::load_config_from_str(
            r#"
            [frames]
            libav_enabled = false

            [transcription.whisper_api]
            api_key = "sk-test"

            [transcription.whisper_cpp]
            model_path = "/models/ggml-base.bin"

            [tagging.inference]
            provider = "anthropic"
            api_key = "key"
            "#,
        )
        .unwrap();
        assert_eq!(
            config.tagging.inference.as_ref().unwrap().provider,
            InferenceProvider::Anthropic
        );

        let strategies = MediaPipeline::from_config(&config).strategies();
        assert_eq!(strategies[0].1, vec!["ffmpeg"]);
        assert_eq!(strategies[1].1, vec!["whisper_api", "whisper_cpp"]);
        assert_eq!(strategies[2].1, vec!["anthropic"]);
    }

    #[test]
    fn test_secondary_decoder_follows_libav_feature() {
        let config = Config::default();
        assert!(config.frames.libav_enabled);

        let strategies = MediaPipeline::from_config(&config).strategies();
        let expected: Vec<&str> = if cfg!(feature = "libav") {
            vec!["ffmpeg", "libav"]
        } else {
            vec!["ffmpeg"]
        };
        assert_eq!(strategies[0].1, expected);
    }
}
