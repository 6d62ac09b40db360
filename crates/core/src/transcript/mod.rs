//! Transcription: audio extraction, ordered speech engines, empty fallback.

mod audio;
mod config;
mod traits;
mod transcriber;
mod types;
mod whisper_api;
mod whisper_cpp;

pub use audio::{FfmpegAudioExtractor, SPEECH_SAMPLE_RATE};
pub use config::{TranscriptionConfig, WhisperApiConfig, WhisperCppConfig};
pub use traits::{AudioExtractor, SpeechEngine};
pub use transcriber::{Transcriber, EMPTY_TRANSCRIPT_METHOD};
pub use types::{normalize_segments, TranscriptExt, TranscriptSegment};
pub use whisper_api::WhisperApiEngine;
pub use whisper_cpp::WhisperCppEngine;
