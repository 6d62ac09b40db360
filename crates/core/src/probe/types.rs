//! Format probe types.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Container extensions the system advertises as supported.
pub const SUPPORTED_EXTENSIONS: &[&str] = &[
    "mp4", "avi", "mov", "wmv", "flv", "webm", "mkv", "m4v", "3gp", "mpg", "mpeg", "ts", "mts",
    "m2ts", "vob", "ogv", "asf",
];

/// Whether the path carries one of the supported container extensions.
pub fn is_video_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| is_supported_extension(e))
        .unwrap_or(false)
}

/// Whether `ext` (with or without leading dot, any case) is supported.
pub fn is_supported_extension(ext: &str) -> bool {
    let ext = ext.trim_start_matches('.').to_lowercase();
    SUPPORTED_EXTENSIONS.contains(&ext.as_str())
}

/// Metadata returned by a metadata probe (e.g. ffprobe).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaInfo {
    /// Demuxer names, as reported (e.g. "mov,mp4,m4a,3gp,3g2,mj2").
    pub format_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_codec: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_codec: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fps: Option<f32>,
}

impl MediaInfo {
    pub fn has_video(&self) -> bool {
        self.video_codec.is_some()
    }

    pub fn has_audio(&self) -> bool {
        self.audio_codec.is_some()
    }

    /// Individual demuxer names.
    pub fn format_names(&self) -> impl Iterator<Item = &str> {
        self.format_name
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// What the probe believes about a file. A hint, never a gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormatProfile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container_guess: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub codec_guess: Option<String>,
    /// 0.0 (nothing known) to 1.0 (header and metadata agree).
    pub probe_confidence: f32,
    pub is_supported_hint: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_video: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_audio: Option<bool>,
}

impl FormatProfile {
    /// Profile for a file nothing is known about.
    pub fn unknown() -> Self {
        Self {
            container_guess: None,
            codec_guess: None,
            probe_confidence: 0.0,
            is_supported_hint: false,
            duration_ms: None,
            width: None,
            height: None,
            has_video: None,
            has_audio: None,
        }
    }

    /// Media duration, when known and non-zero.
    pub fn duration(&self) -> Option<Duration> {
        self.duration_ms
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
    }

    /// Width / height, when both are known and non-zero.
    pub fn aspect_ratio(&self) -> Option<f64> {
        match (self.width, self.height) {
            (Some(w), Some(h)) if w > 0 && h > 0 => Some(w as f64 / h as f64),
            _ => None,
        }
    }
}

impl Default for FormatProfile {
    fn default() -> Self {
        Self::unknown()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supported_extensions() {
        assert_eq!(SUPPORTED_EXTENSIONS.len(), 17);
        assert!(is_video_supported(Path::new("/a/b/clip.MKV")));
        assert!(is_video_supported(Path::new("disc.m2ts")));
        assert!(!is_video_supported(Path::new("song.flac")));
        assert!(!is_video_supported(Path::new("noext")));
        assert!(is_supported_extension(".Mp4"));
    }

    #[test]
    fn test_profile_helpers() {
        let mut profile = FormatProfile::unknown();
        assert_eq!(profile.duration(), None);
        assert_eq!(profile.aspect_ratio(), None);

        profile.duration_ms = Some(0);
        assert_eq!(profile.duration(), None);

        profile.duration_ms = Some(1500);
        profile.width = Some(1920);
        profile.height = Some(1080);
        assert_eq!(profile.duration(), Some(Duration::from_millis(1500)));
        assert!((profile.aspect_ratio().unwrap() - 16.0 / 9.0).abs() < 1e-9);
    }

    #[test]
    fn test_format_names() {
        let info = MediaInfo {
            format_name: "matroska,webm".to_string(),
            ..Default::default()
        };
        let names: Vec<_> = info.format_names().collect();
        assert_eq!(names, vec!["matroska", "webm"]);
    }
}
