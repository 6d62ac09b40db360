//! OpenAI-compatible transcription API client.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

use super::{SpeechEngine, TranscriptSegment, WhisperApiConfig};
use crate::error::MediaError;

/// Used when the API does not report a usable segment log-probability.
const NEUTRAL_CONFIDENCE: f32 = 0.5;

/// Primary speech engine: `/v1/audio/transcriptions` with word timestamps.
pub struct WhisperApiEngine {
    client: reqwest::Client,
    config: WhisperApiConfig,
}

impl WhisperApiEngine {
    pub fn new(config: WhisperApiConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }
}

#[derive(Debug, Deserialize)]
struct VerboseTranscription {
    #[serde(default)]
    words: Vec<ApiWord>,
    #[serde(default)]
    segments: Vec<ApiSegment>,
}

#[derive(Debug, Deserialize)]
struct ApiWord {
    word: String,
    start: f64,
    end: f64,
}

#[derive(Debug, Deserialize)]
struct ApiSegment {
    start: f64,
    end: f64,
    #[serde(default)]
    avg_logprob: Option<f64>,
}

fn secs_to_ms(secs: f64) -> u64 {
    if secs.is_finite() {
        (secs.max(0.0) * 1000.0).round() as u64
    } else {
        0
    }
}

/// Converts a `verbose_json` body into word segments.
///
/// Word confidence is taken from the enclosing segment's average
/// log-probability.
fn parse_verbose_json(body: &str) -> Result<Vec<TranscriptSegment>, MediaError> {
    let parsed: VerboseTranscription = serde_json::from_str(body)
        .map_err(|e| MediaError::transient(format!("Malformed transcription response: {}", e)))?;

    let confidence_at = |start: f64| {
        parsed
            .segments
            .iter()
            .find(|s| start >= s.start && start <= s.end)
            .and_then(|s| s.avg_logprob)
            .map(|lp| lp.exp() as f32)
            .unwrap_or(NEUTRAL_CONFIDENCE)
    };

    Ok(parsed
        .words
        .iter()
        .map(|w| {
            TranscriptSegment::new(
                w.word.clone(),
                secs_to_ms(w.start),
                secs_to_ms(w.end),
                confidence_at(w.start),
            )
        })
        .collect())
}

fn mime_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .as_deref()
    {
        Some("wav") => "audio/wav",
        Some("mp3") => "audio/mpeg",
        Some("mp4") | Some("m4a") => "audio/mp4",
        Some("webm") => "audio/webm",
        _ => "application/octet-stream",
    }
}

#[async_trait]
impl SpeechEngine for WhisperApiEngine {
    fn name(&self) -> &str {
        "whisper_api"
    }

    async fn transcribe(
        &self,
        audio: &Path,
        budget: Duration,
    ) -> Result<Vec<TranscriptSegment>, MediaError> {
        let bytes = tokio::fs::read(audio).await?;
        let file_name = audio
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "audio.wav".to_string());
        debug!("Uploading {} ({} bytes) to {}", file_name, bytes.len(), self.config.api_base);

        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(mime_for(audio))
            .map_err(|e| MediaError::invalid_input(e.to_string()))?;

        let mut form = Form::new()
            .part("file", part)
            .text("model", self.config.model.clone())
            .text("response_format", "verbose_json")
            .text("timestamp_granularities[]", "word")
            .text("timestamp_granularities[]", "segment");
        if let Some(language) = &self.config.language {
            form = form.text("language", language.clone());
        }

        let response = self
            .client
            .post(format!(
                "{}/v1/audio/transcriptions",
                self.config.api_base.trim_end_matches('/')
            ))
            .bearer_auth(&self.config.api_key)
            .timeout(budget)
            .multipart(form)
            .send()
            .await
            .map_err(|e| MediaError::from_reqwest(e, budget))?;

        if !response.status().is_success() {
            return Err(MediaError::from_response(response).await);
        }

        let body = response
            .text()
            .await
            .map_err(|e| MediaError::from_reqwest(e, budget))?;
        parse_verbose_json(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_verbose_json() {
        let body = r#"{
            "task": "transcribe",
            "language": "english",
            "duration": 2.5,
            "text": "Hello there world",
            "segments": [
                {"id": 0, "start": 0.0, "end": 1.2, "text": "Hello there", "avg_logprob": -0.1},
                {"id": 1, "start": 1.2, "end": 2.5, "text": "world"}
            ],
            "words": [
                {"word": "Hello", "start": 0.0, "end": 0.48},
                {"word": "there", "start": 0.5, "end": 1.1},
                {"word": "world", "start": 1.3, "end": 2.0}
            ]
        }"#;

        let segments = parse_verbose_json(body).unwrap();
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0].word, "Hello");
        assert_eq!(segments[0].end_ms, 480);
        assert!((segments[0].confidence - (-0.1f64).exp() as f32).abs() < 1e-6);
        assert_eq!(segments[2].start_ms, 1300);
        assert_eq!(segments[2].confidence, NEUTRAL_CONFIDENCE);
    }

    #[test]
    fn test_parse_without_words_is_empty() {
        let segments = parse_verbose_json(r#"{"text": ""}"#).unwrap();
        assert!(segments.is_empty());
    }

    #[test]
    fn test_parse_garbage_is_transient() {
        let err = parse_verbose_json("<html>gateway</html>").unwrap_err();
        assert!(err.is_retryable());
    }

    #[test]
    fn test_mime_for() {
        assert_eq!(mime_for(Path::new("/tmp/a/audio.wav")), "audio/wav");
        assert_eq!(mime_for(Path::new("/media/clip.MKV")), "application/octet-stream");
    }
}
