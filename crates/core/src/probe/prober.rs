//! Combines header sniffing with a metadata query into a `FormatProfile`.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tracing::{debug, warn};

use super::signature::{self, Signature, MIN_SNIFF_BYTES};
use super::{is_supported_extension, FormatProfile, MediaInfo, MetadataProbe, ProbeConfig};
use crate::error::MediaError;

/// Classifies a media file before any decode is attempted.
///
/// Never fails: unreadable or unknown files produce a zero-confidence profile.
pub struct FormatProbe {
    metadata: Option<Arc<dyn MetadataProbe>>,
    header_bytes: usize,
    timeout: Duration,
}

impl FormatProbe {
    pub fn new(config: &ProbeConfig) -> Self {
        Self {
            metadata: None,
            header_bytes: config.header_bytes,
            timeout: config.timeout(),
        }
    }

    /// Sets the metadata query capability.
    pub fn with_metadata_probe(mut self, probe: Arc<dyn MetadataProbe>) -> Self {
        self.metadata = Some(probe);
        self
    }

    /// Inspects `path` and returns what could be learned about it.
    pub async fn probe(&self, path: &Path, declared_extension: Option<&str>) -> FormatProfile {
        let header = match self.read_header(path).await {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                debug!("Header read failed for {}: {}", path.display(), e);
                None
            }
        };
        let signature = header.as_deref().and_then(signature::sniff);
        let info = self.query_metadata(path).await;

        // The extension only counts for a file that could be opened.
        let extension_known = header.is_some()
            && declared_extension
                .map(is_supported_extension)
                .unwrap_or(false);

        let profile = build_profile(signature, info.as_ref(), extension_known);
        debug!(
            "Probed {}: container={:?} codec={:?} confidence={:.1} supported={}",
            path.display(),
            profile.container_guess,
            profile.codec_guess,
            profile.probe_confidence,
            profile.is_supported_hint
        );
        profile
    }

    async fn read_header(&self, path: &Path) -> std::io::Result<Vec<u8>> {
        let limit = self.header_bytes.max(MIN_SNIFF_BYTES) as u64;
        let file = tokio::fs::File::open(path).await?;
        let mut buf = Vec::with_capacity(limit as usize);
        file.take(limit).read_to_end(&mut buf).await?;
        Ok(buf)
    }

    async fn query_metadata(&self, path: &Path) -> Option<MediaInfo> {
        let probe = self.metadata.as_ref()?;
        let result = match tokio::time::timeout(self.timeout, probe.probe(path)).await {
            Ok(result) => result,
            Err(_) => Err(MediaError::Timeout {
                after: self.timeout,
            }),
        };
        match result {
            Ok(info) => Some(info),
            Err(e) => {
                warn!("{} could not read {}: {}", probe.name(), path.display(), e);
                None
            }
        }
    }
}

/// Confidence ladder: header and metadata agree (1.0), metadata only (0.8),
/// header only (0.5), readable file with a known extension (0.2), nothing (0.0).
fn build_profile(
    signature: Option<Signature>,
    info: Option<&MediaInfo>,
    extension_known: bool,
) -> FormatProfile {
    let probe_confidence = match (signature, info) {
        (Some(sig), Some(info)) if sig.agrees_with(info.format_names()) => 1.0,
        (_, Some(_)) => 0.8,
        (Some(_), None) => 0.5,
        (None, None) if extension_known => 0.2,
        (None, None) => 0.0,
    };

    let container_guess = signature
        .map(|s| s.container.to_string())
        .or_else(|| info.and_then(|i| i.format_names().next().map(str::to_string)));

    let codec_guess = info
        .and_then(|i| i.video_codec.clone().or_else(|| i.audio_codec.clone()))
        .or_else(|| signature.and_then(|s| s.codec_hint).map(str::to_string));

    let is_supported_hint = info.map(MediaInfo::has_video).unwrap_or(false) || signature.is_some();

    FormatProfile {
        container_guess,
        codec_guess,
        probe_confidence,
        is_supported_hint,
        duration_ms: info.and_then(|i| i.duration_ms),
        width: info.and_then(|i| i.width),
        height: info.and_then(|i| i.height),
        has_video: info.map(MediaInfo::has_video),
        has_audio: info.map(MediaInfo::has_audio),
    }
}
