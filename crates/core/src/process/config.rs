//! Configuration for the external FFmpeg tools.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Locations and verbosity of the FFmpeg command line tools.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FfmpegConfig {
    /// Path to ffmpeg binary.
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: PathBuf,

    /// Path to ffprobe binary.
    #[serde(default = "default_ffprobe_path")]
    pub ffprobe_path: PathBuf,

    /// FFmpeg log level (quiet, panic, fatal, error, warning, info, verbose, debug, trace).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_ffmpeg_path() -> PathBuf {
    PathBuf::from("ffmpeg")
}

fn default_ffprobe_path() -> PathBuf {
    PathBuf::from("ffprobe")
}

fn default_log_level() -> String {
    "error".to_string()
}

impl Default for FfmpegConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: default_ffmpeg_path(),
            ffprobe_path: default_ffprobe_path(),
            log_level: default_log_level(),
        }
    }
}

impl FfmpegConfig {
    /// Creates a new config with custom ffmpeg/ffprobe paths.
    pub fn with_paths(ffmpeg_path: PathBuf, ffprobe_path: PathBuf) -> Self {
        Self {
            ffmpeg_path,
            ffprobe_path,
            ..Default::default()
        }
    }

    /// Returns a copy with both binaries resolved to concrete paths where possible.
    pub fn resolved(&self) -> Self {
        Self {
            ffmpeg_path: super::resolve_binary(&self.ffmpeg_path),
            ffprobe_path: super::resolve_binary(&self.ffprobe_path),
            log_level: self.log_level.clone(),
        }
    }
}
