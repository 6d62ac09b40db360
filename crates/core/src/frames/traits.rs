//! Frame decoder trait definition.

use async_trait::async_trait;
use std::path::Path;

use super::{FrameSize, RawFrame};
use crate::error::MediaError;
use crate::probe::FormatProfile;

/// A strategy able to decode a single picture at a given time.
///
/// Implementations must be thread-safe (Send + Sync) for use across async tasks.
#[async_trait]
pub trait FrameDecoder: Send + Sync {
    /// Strategy name recorded as the frames' `source_method`.
    fn name(&self) -> &str;

    /// Whether the probe suggests this decoder is likely to work.
    ///
    /// Only used for ordering; a decoder returning false is still tried.
    fn supports(&self, _profile: &FormatProfile) -> bool {
        true
    }

    /// Decodes the frame nearest to `timestamp_ms`, scaled to `size`, as RGB24.
    async fn decode_at(
        &self,
        path: &Path,
        timestamp_ms: u64,
        size: FrameSize,
    ) -> Result<RawFrame, MediaError>;
}
