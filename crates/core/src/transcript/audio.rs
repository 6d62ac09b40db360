//! Audio track extraction for the speech engines.

use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::AudioExtractor;
use crate::error::MediaError;
use crate::process::{FfmpegConfig, SupervisedChild};

/// Sample rate expected by whisper-family engines.
pub const SPEECH_SAMPLE_RATE: u32 = 16_000;

/// Converts the first audio stream to 16 kHz mono PCM WAV with ffmpeg.
pub struct FfmpegAudioExtractor {
    config: FfmpegConfig,
    timeout: Duration,
    grace: Duration,
}

impl FfmpegAudioExtractor {
    pub fn new(config: FfmpegConfig, timeout: Duration, grace: Duration) -> Self {
        Self {
            config,
            timeout,
            grace,
        }
    }

    fn build_args(&self, media: &Path, output: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "-nostdin".into(),
            "-hide_banner".into(),
            "-loglevel".into(),
            self.config.log_level.clone().into(),
            "-i".into(),
            media.as_os_str().to_os_string(),
        ];
        args.extend(
            [
                "-vn".to_string(),
                "-ac".to_string(),
                "1".to_string(),
                "-ar".to_string(),
                SPEECH_SAMPLE_RATE.to_string(),
                "-c:a".to_string(),
                "pcm_s16le".to_string(),
                "-y".to_string(),
            ]
            .into_iter()
            .map(OsString::from),
        );
        args.push(output.as_os_str().to_os_string());
        args
    }
}

#[async_trait]
impl AudioExtractor for FfmpegAudioExtractor {
    async fn extract(&self, media: &Path, scratch_dir: &Path) -> Result<PathBuf, MediaError> {
        let output = scratch_dir.join("audio.wav");
        let args = self.build_args(media, &output);
        let child = SupervisedChild::spawn(&self.config.ffmpeg_path, args, self.grace)?;
        child.run(self.timeout).await?.into_success("ffmpeg")?;

        match tokio::fs::metadata(&output).await {
            // A bare RIFF header means there was no audio to extract.
            Ok(meta) if meta.len() > 44 => Ok(output),
            Ok(_) => Err(MediaError::invalid_input("Extracted audio track is empty")),
            Err(e) => Err(MediaError::Io(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_args() {
        let extractor = FfmpegAudioExtractor::new(
            FfmpegConfig::default(),
            Duration::from_secs(10),
            Duration::from_millis(100),
        );
        let args: Vec<String> = extractor
            .build_args(Path::new("/in/clip.mkv"), Path::new("/tmp/x/audio.wav"))
            .into_iter()
            .map(|a| a.to_string_lossy().to_string())
            .collect();

        assert!(args.contains(&"-vn".to_string()));
        let ar = args.iter().position(|a| a == "-ar").unwrap();
        assert_eq!(args[ar + 1], "16000");
        assert!(args.contains(&"pcm_s16le".to_string()));
        assert_eq!(args.last().unwrap(), "/tmp/x/audio.wav");
    }
}
