//! Metadata probe trait definition.

use async_trait::async_trait;
use std::path::Path;

use super::MediaInfo;
use crate::error::MediaError;

/// A lightweight metadata query against a media file.
///
/// Implementations must be thread-safe (Send + Sync) for use across async tasks.
#[async_trait]
pub trait MetadataProbe: Send + Sync {
    /// Returns the name of this probe implementation.
    fn name(&self) -> &str;

    /// Reads container and stream metadata without decoding.
    async fn probe(&self, path: &Path) -> Result<MediaInfo, MediaError>;
}
