//! Universal media processing pipeline.
//!
//! Turns an arbitrary (possibly malformed) video file into representative
//! frames, a word-timestamped transcript and semantic tags. Each stage walks
//! an ordered chain of strategies and degrades to a lower-fidelity fallback
//! instead of failing; the [`MediaPipeline`] aggregates everything into one
//! [`ProcessingResult`].

pub mod config;
pub mod error;
pub mod frames;
pub mod metrics;
pub mod pipeline;
pub mod probe;
pub mod process;
pub mod retry;
pub mod tagging;
pub mod testing;
pub mod transcript;

pub use config::{load_config, load_config_from_str, validate_config, Config, ConfigError};
pub use error::{ErrorKind, MediaError};
pub use frames::{ExtractedFrame, FrameDecoder, FrameExtractor, FramesConfig};
pub use pipeline::{
    MediaItem, MediaPipeline, OverallStatus, PipelineConfig, ProcessingResult, Stage,
    StageOutcome, StrategyAttempt,
};
pub use probe::{FormatProbe, FormatProfile, MetadataProbe, ProbeConfig};
pub use process::FfmpegConfig;
pub use retry::RetryPolicy;
pub use tagging::{Tag, TagInference, Tagger, TaggingConfig};
pub use transcript::{
    AudioExtractor, SpeechEngine, Transcriber, TranscriptExt, TranscriptSegment,
    TranscriptionConfig,
};
