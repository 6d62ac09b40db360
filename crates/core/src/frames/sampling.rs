//! Sample timestamps and output geometry.

use super::FrameSize;
use crate::probe::FormatProfile;

/// Evenly spaced timestamps strictly inside the media.
///
/// With a known duration `d`, sample `i` sits at `(i + 1) * d / (n + 1)`.
/// Without one, samples are taken once per second from the start.
pub fn sample_timestamps(duration_ms: Option<u64>, n: usize) -> Vec<u64> {
    match duration_ms.filter(|d| *d > 0) {
        Some(d) => (0..n as u64).map(|i| (i + 1) * d / (n as u64 + 1)).collect(),
        None => (0..n as u64).map(|i| i * 1000).collect(),
    }
}

/// Output size for `width`, keeping the probed aspect ratio when known.
pub fn output_size(profile: &FormatProfile, width: u32, fallback_height: u32) -> FrameSize {
    let height = match profile.aspect_ratio() {
        Some(ratio) => {
            let h = (width as f64 / ratio).round() as u32;
            // Most encoders and scalers want even dimensions.
            (h + (h & 1)).max(2)
        }
        None => fallback_height,
    };
    FrameSize::new(width, height)
}
