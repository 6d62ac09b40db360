//! Local whisper.cpp engine.

use async_trait::async_trait;
use serde::Deserialize;
use std::ffi::OsString;
use std::path::Path;
use std::time::Duration;

use super::{SpeechEngine, TranscriptSegment, WhisperCppConfig};
use crate::error::MediaError;
use crate::process::{resolve_binary, SupervisedChild};

const NEUTRAL_CONFIDENCE: f32 = 0.5;

/// Secondary speech engine: runs `whisper-cli` with one word per segment and
/// reads its full JSON output back from a private scratch directory.
pub struct WhisperCppEngine {
    config: WhisperCppConfig,
    grace: Duration,
}

impl WhisperCppEngine {
    pub fn new(config: WhisperCppConfig, grace: Duration) -> Self {
        Self { config, grace }
    }

    fn build_args(&self, audio: &Path, output_base: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "-f".into(),
            audio.as_os_str().to_os_string(),
            "-m".into(),
            self.config.model_path.as_os_str().to_os_string(),
            "-t".into(),
            self.config.threads.max(1).to_string().into(),
            // One word per segment, split on word boundaries.
            "-ml".into(),
            "1".into(),
            "-sow".into(),
            "-ojf".into(),
            "-of".into(),
            output_base.as_os_str().to_os_string(),
            "-np".into(),
        ];
        if let Some(language) = &self.config.language {
            args.push("-l".into());
            args.push(language.into());
        }
        args
    }
}

#[derive(Debug, Deserialize)]
struct CppOutput {
    #[serde(default)]
    transcription: Vec<CppSegment>,
}

#[derive(Debug, Deserialize)]
struct CppSegment {
    offsets: CppOffsets,
    text: String,
    #[serde(default)]
    tokens: Vec<CppToken>,
}

#[derive(Debug, Deserialize)]
struct CppOffsets {
    from: u64,
    to: u64,
}

#[derive(Debug, Deserialize)]
struct CppToken {
    text: String,
    #[serde(default)]
    p: Option<f32>,
}

/// Converts whisper.cpp full JSON into word segments.
///
/// Segments holding several words share their time span evenly.
fn parse_output(body: &str) -> Result<Vec<TranscriptSegment>, MediaError> {
    let parsed: CppOutput = serde_json::from_str(body)
        .map_err(|e| MediaError::invalid_input(format!("Malformed whisper.cpp output: {}", e)))?;

    let mut segments = Vec::new();
    for segment in parsed.transcription {
        // Special tokens ([_BEG_], [_TT_123]) carry no speech.
        let probabilities: Vec<f32> = segment
            .tokens
            .iter()
            .filter(|t| !t.text.starts_with("[_"))
            .filter_map(|t| t.p)
            .collect();
        let confidence = if probabilities.is_empty() {
            NEUTRAL_CONFIDENCE
        } else {
            probabilities.iter().sum::<f32>() / probabilities.len() as f32
        };

        let words: Vec<&str> = segment.text.split_whitespace().collect();
        if words.is_empty() {
            continue;
        }
        let span = segment.offsets.to.saturating_sub(segment.offsets.from);
        let step = span / words.len() as u64;
        for (i, word) in words.iter().enumerate() {
            let start = segment.offsets.from + step * i as u64;
            let end = if i + 1 == words.len() {
                segment.offsets.to
            } else {
                start + step
            };
            segments.push(TranscriptSegment::new(*word, start, end, confidence));
        }
    }
    Ok(segments)
}

#[async_trait]
impl SpeechEngine for WhisperCppEngine {
    fn name(&self) -> &str {
        "whisper_cpp"
    }

    async fn transcribe(
        &self,
        audio: &Path,
        budget: Duration,
    ) -> Result<Vec<TranscriptSegment>, MediaError> {
        if !self.config.model_path.exists() {
            return Err(MediaError::unavailable(format!(
                "whisper.cpp model not found at {}",
                self.config.model_path.display()
            )));
        }

        // Removed on every exit path when `scratch` drops.
        let scratch = tempfile::Builder::new()
            .prefix("footage-whisper-")
            .tempdir()?;
        let output_base = scratch.path().join("transcript");

        let binary = resolve_binary(&self.config.binary);
        let child = SupervisedChild::spawn(&binary, self.build_args(audio, &output_base), self.grace)?;
        child.run(budget).await?.into_success("whisper.cpp")?;

        let body = tokio::fs::read_to_string(output_base.with_extension("json")).await?;
        parse_output(&body)
    }
}
