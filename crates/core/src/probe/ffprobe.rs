//! ffprobe-backed metadata probe.

use async_trait::async_trait;
use serde::Deserialize;
use std::ffi::OsStr;
use std::path::Path;
use std::time::Duration;

use super::{MediaInfo, MetadataProbe};
use crate::error::MediaError;
use crate::process::{FfmpegConfig, SupervisedChild};

/// Runs `ffprobe -show_format -show_streams` and parses its JSON.
pub struct FfprobeProbe {
    config: FfmpegConfig,
    timeout: Duration,
    grace: Duration,
}

impl FfprobeProbe {
    pub fn new(config: FfmpegConfig, timeout: Duration, grace: Duration) -> Self {
        Self {
            config,
            timeout,
            grace,
        }
    }

    /// Parses ffprobe JSON output into MediaInfo.
    pub(crate) fn parse_probe_output(output: &str) -> Result<MediaInfo, MediaError> {
        #[derive(Deserialize)]
        struct ProbeOutput {
            format: ProbeFormat,
            #[serde(default)]
            streams: Vec<ProbeStream>,
        }

        #[derive(Deserialize)]
        struct ProbeFormat {
            format_name: String,
            duration: Option<String>,
            size: Option<String>,
        }

        #[derive(Deserialize)]
        struct ProbeStream {
            codec_type: Option<String>,
            codec_name: Option<String>,
            width: Option<u32>,
            height: Option<u32>,
            r_frame_rate: Option<String>,
        }

        let probe: ProbeOutput = serde_json::from_str(output).map_err(|e| {
            MediaError::invalid_input(format!("Failed to parse ffprobe output: {}", e))
        })?;

        let duration_ms = probe
            .format
            .duration
            .as_ref()
            .and_then(|d| d.parse::<f64>().ok())
            .filter(|d| d.is_finite() && *d > 0.0)
            .map(|d| (d * 1000.0).round() as u64);

        let of_type = |kind: &str| {
            probe
                .streams
                .iter()
                .find(|s| s.codec_type.as_deref() == Some(kind))
        };
        let video = of_type("video");
        let audio = of_type("audio");

        Ok(MediaInfo {
            format_name: probe.format.format_name.clone(),
            duration_ms,
            size_bytes: probe.format.size.as_ref().and_then(|s| s.parse().ok()),
            video_codec: video.map(|s| s.codec_name.clone().unwrap_or_else(|| "unknown".into())),
            audio_codec: audio.map(|s| s.codec_name.clone().unwrap_or_else(|| "unknown".into())),
            width: video.and_then(|s| s.width),
            height: video.and_then(|s| s.height),
            fps: video
                .and_then(|s| s.r_frame_rate.as_deref())
                .and_then(parse_frame_rate),
        })
    }
}

/// Parses a frame rate like "24000/1001" or "30".
fn parse_frame_rate(rate: &str) -> Option<f32> {
    match rate.split_once('/') {
        Some((num, den)) => {
            let num = num.parse::<f32>().ok()?;
            let den = den.parse::<f32>().ok()?;
            (den > 0.0).then(|| num / den)
        }
        None => rate.parse::<f32>().ok(),
    }
}

#[async_trait]
impl MetadataProbe for FfprobeProbe {
    fn name(&self) -> &str {
        "ffprobe"
    }

    async fn probe(&self, path: &Path) -> Result<MediaInfo, MediaError> {
        let child = SupervisedChild::spawn(
            &self.config.ffprobe_path,
            [
                OsStr::new("-v"),
                OsStr::new("quiet"),
                OsStr::new("-print_format"),
                OsStr::new("json"),
                OsStr::new("-show_format"),
                OsStr::new("-show_streams"),
                path.as_os_str(),
            ],
            self.grace,
        )?;

        let output = child.run(self.timeout).await?.into_success("ffprobe")?;
        Self::parse_probe_output(&String::from_utf8_lossy(&output.stdout))
    }
}
