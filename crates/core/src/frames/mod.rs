//! Frame extraction: ordered decoders, even sampling, placeholder fallback.

mod config;
mod encode;
mod extractor;
mod ffmpeg;
#[cfg(feature = "libav")]
mod libav;
mod placeholder;
mod sampling;
mod traits;
mod types;

pub use config::FramesConfig;
pub use encode::{encode_jpeg, encode_png};
pub use extractor::FrameExtractor;
pub use ffmpeg::FfmpegFrameDecoder;
#[cfg(feature = "libav")]
pub use libav::LibavFrameDecoder;
pub use placeholder::placeholder_frames;
pub use sampling::{output_size, sample_timestamps};
pub use traits::FrameDecoder;
pub use types::{ExtractedFrame, FrameSize, RawFrame, PLACEHOLDER_METHOD};
