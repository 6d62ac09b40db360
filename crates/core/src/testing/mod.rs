//! Controllable doubles for every external capability.
//!
//! Each double can succeed, fail with a given `MediaError` (always or for the
//! first N calls), or hang forever, and records the calls it received. None of
//! them touch ffmpeg, whisper or the network.
//!
//! # Example
//!
//! ```rust,ignore
//! use footage_core::testing::{MockFrameDecoder, MockSpeechEngine};
//!
//! let primary = Arc::new(MockFrameDecoder::new("ffmpeg").always_failing(
//!     MediaError::invalid_input("moov atom not found"),
//! ));
//! let secondary = Arc::new(MockFrameDecoder::new("libav"));
//!
//! let pipeline = MediaPipeline::new(&config)
//!     .with_frame_decoder(primary.clone())
//!     .with_frame_decoder(secondary);
//!
//! let result = pipeline.process(&item).await;
//! assert_eq!(primary.call_count().await, 1);
//! ```

mod mock_decoder;
mod mock_inference;
mod mock_probe;
mod mock_speech;
mod script;

pub use mock_decoder::MockFrameDecoder;
pub use mock_inference::MockTagInference;
pub use mock_probe::MockMetadataProbe;
pub use mock_speech::{MockAudioExtractor, MockSpeechEngine};

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::probe::MediaInfo;
    use crate::tagging::Tag;
    use crate::transcript::TranscriptSegment;

    /// Metadata of a 1280x720 H.264/AAC MP4 of the given length.
    pub fn mp4_info(duration_ms: u64) -> MediaInfo {
        MediaInfo {
            format_name: "mov,mp4,m4a,3gp,3g2,mj2".to_string(),
            duration_ms: Some(duration_ms),
            size_bytes: Some(1024 * 1024),
            video_codec: Some("h264".to_string()),
            audio_codec: Some("aac".to_string()),
            width: Some(1280),
            height: Some(720),
            fps: Some(25.0),
        }
    }

    /// One segment per word, 400 ms apart.
    pub fn words(text: &str) -> Vec<TranscriptSegment> {
        text.split_whitespace()
            .enumerate()
            .map(|(i, w)| {
                let start = i as u64 * 400;
                TranscriptSegment::new(w, start, start + 350, 0.9)
            })
            .collect()
    }

    /// Tags as an inference service named `source` would return them.
    pub fn tags(source: &str, labels: &[&str]) -> Vec<Tag> {
        labels
            .iter()
            .enumerate()
            .map(|(i, label)| Tag::new(*label, 0.9 - i as f32 * 0.1, source))
            .collect()
    }
}
