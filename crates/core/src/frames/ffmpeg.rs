//! FFmpeg subprocess frame decoder.

use async_trait::async_trait;
use std::ffi::OsString;
use std::path::Path;
use std::time::Duration;

use super::{FrameDecoder, FrameSize, RawFrame};
use crate::error::MediaError;
use crate::probe::FormatProfile;
use crate::process::{FfmpegConfig, SupervisedChild};

/// Seeks with the `ffmpeg` CLI and pipes one rawvideo RGB24 frame to stdout.
pub struct FfmpegFrameDecoder {
    config: FfmpegConfig,
    call_timeout: Duration,
    grace: Duration,
}

impl FfmpegFrameDecoder {
    pub fn new(config: FfmpegConfig, call_timeout: Duration, grace: Duration) -> Self {
        Self {
            config,
            call_timeout,
            grace,
        }
    }

    fn build_args(&self, path: &Path, timestamp_ms: u64, size: FrameSize) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "-nostdin".into(),
            "-hide_banner".into(),
            "-loglevel".into(),
            self.config.log_level.clone().into(),
            // Input seeking: fast, lands on the nearest keyframe before the target.
            "-ss".into(),
            format!("{:.3}", timestamp_ms as f64 / 1000.0).into(),
            "-i".into(),
            path.as_os_str().to_os_string(),
        ];
        args.extend(
            [
                "-frames:v".to_string(),
                "1".to_string(),
                "-vf".to_string(),
                format!("scale={}:{}", size.width, size.height),
                "-pix_fmt".to_string(),
                "rgb24".to_string(),
                "-f".to_string(),
                "rawvideo".to_string(),
                "pipe:1".to_string(),
            ]
            .into_iter()
            .map(OsString::from),
        );
        args
    }
}

#[async_trait]
impl FrameDecoder for FfmpegFrameDecoder {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    fn supports(&self, profile: &FormatProfile) -> bool {
        profile.has_video != Some(false)
    }

    async fn decode_at(
        &self,
        path: &Path,
        timestamp_ms: u64,
        size: FrameSize,
    ) -> Result<RawFrame, MediaError> {
        let args = self.build_args(path, timestamp_ms, size);
        let child = SupervisedChild::spawn(&self.config.ffmpeg_path, args, self.grace)?;
        let output = child.run(self.call_timeout).await?.into_success("ffmpeg")?;

        let expected = size.rgb24_len();
        if output.stdout.len() != expected {
            return Err(MediaError::invalid_input_with_stderr(
                format!(
                    "ffmpeg returned {} bytes at {} ms, expected {}",
                    output.stdout.len(),
                    timestamp_ms,
                    expected
                ),
                output.stderr,
            ));
        }

        Ok(RawFrame {
            width: size.width,
            height: size.height,
            data: output.stdout,
        })
    }
}
