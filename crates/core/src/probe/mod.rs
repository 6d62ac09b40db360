//! Format probing: header sniffing plus one metadata query.
//!
//! The resulting `FormatProfile` only orders later strategy attempts; it never
//! prevents one from running.

mod config;
mod ffprobe;
mod prober;
mod signature;
mod traits;
mod types;

pub use config::ProbeConfig;
pub use ffprobe::FfprobeProbe;
pub use prober::FormatProbe;
pub use signature::{sniff, Signature};
pub use traits::MetadataProbe;
pub use types::{
    is_supported_extension, is_video_supported, FormatProfile, MediaInfo, SUPPORTED_EXTENSIONS,
};
