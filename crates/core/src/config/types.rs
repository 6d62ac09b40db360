use serde::{Deserialize, Serialize};

use crate::frames::FramesConfig;
use crate::pipeline::PipelineConfig;
use crate::probe::ProbeConfig;
use crate::process::FfmpegConfig;
use crate::tagging::TaggingConfig;
use crate::transcript::TranscriptionConfig;

const REDACTED: &str = "<redacted>";

/// Root configuration. Every section is optional and falls back to defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub ffmpeg: FfmpegConfig,
    #[serde(default)]
    pub probe: ProbeConfig,
    #[serde(default)]
    pub frames: FramesConfig,
    #[serde(default)]
    pub transcription: TranscriptionConfig,
    #[serde(default)]
    pub tagging: TaggingConfig,
}

impl Config {
    /// Copy with every API key redacted, safe to log.
    pub fn sanitized(&self) -> Config {
        let mut config = self.clone();
        if let Some(api) = config.transcription.whisper_api.as_mut() {
            redact(&mut api.api_key);
        }
        if let Some(inference) = config.tagging.inference.as_mut() {
            redact(&mut inference.api_key);
        }
        config
    }
}

fn redact(secret: &mut String) {
    if !secret.is_empty() {
        *secret = REDACTED.to_string();
    }
}
