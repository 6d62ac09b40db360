use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::retry::RetryPolicy;

/// Transcription configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionConfig {
    /// Engine budget when the media duration is unknown.
    #[serde(default = "default_timeout_secs")]
    pub default_timeout_secs: u64,

    /// Engine budget as a multiple of the media duration.
    #[serde(default = "default_duration_multiplier")]
    pub duration_multiplier: f64,

    #[serde(default = "default_min_timeout_secs")]
    pub min_timeout_secs: u64,

    #[serde(default = "default_max_timeout_secs")]
    pub max_timeout_secs: u64,

    /// Retries per engine on transient failures.
    #[serde(default = "default_retries")]
    pub retries: u32,

    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Longest wait between attempts, including a server's `Retry-After`.
    #[serde(default = "default_retry_max_backoff_ms")]
    pub retry_max_backoff_ms: u64,

    /// Whether an engine timeout is retried before falling through.
    #[serde(default)]
    pub retry_on_timeout: bool,

    /// Budget for extracting the audio track.
    #[serde(default = "default_audio_timeout_secs")]
    pub audio_timeout_secs: u64,

    /// Primary engine (OpenAI-compatible transcription API).
    #[serde(default)]
    pub whisper_api: Option<WhisperApiConfig>,

    /// Secondary engine (local whisper.cpp).
    #[serde(default)]
    pub whisper_cpp: Option<WhisperCppConfig>,
}

fn default_timeout_secs() -> u64 {
    300
}

fn default_duration_multiplier() -> f64 {
    2.0
}

fn default_min_timeout_secs() -> u64 {
    60
}

fn default_max_timeout_secs() -> u64 {
    600
}

fn default_retries() -> u32 {
    1
}

fn default_retry_backoff_ms() -> u64 {
    500
}

fn default_retry_max_backoff_ms() -> u64 {
    5000
}

fn default_audio_timeout_secs() -> u64 {
    120
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            default_timeout_secs: default_timeout_secs(),
            duration_multiplier: default_duration_multiplier(),
            min_timeout_secs: default_min_timeout_secs(),
            max_timeout_secs: default_max_timeout_secs(),
            retries: default_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
            retry_max_backoff_ms: default_retry_max_backoff_ms(),
            retry_on_timeout: false,
            audio_timeout_secs: default_audio_timeout_secs(),
            whisper_api: None,
            whisper_cpp: None,
        }
    }
}

impl TranscriptionConfig {
    /// Engine budget for media of the given length.
    ///
    /// `clamp(multiplier * duration, min, max)` when the duration is known,
    /// the default budget otherwise.
    pub fn engine_timeout(&self, media_duration: Option<Duration>) -> Duration {
        match media_duration.filter(|d| !d.is_zero()) {
            Some(d) => {
                let scaled = d.as_secs_f64() * self.duration_multiplier;
                let min = self.min_timeout_secs as f64;
                let max = (self.max_timeout_secs as f64).max(min);
                Duration::from_secs_f64(scaled.clamp(min, max))
            }
            None => Duration::from_secs(self.default_timeout_secs),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retries, Duration::from_millis(self.retry_backoff_ms))
            .with_retry_timeouts(self.retry_on_timeout)
            .with_max_backoff(Duration::from_millis(self.retry_max_backoff_ms))
    }

    pub fn audio_timeout(&self) -> Duration {
        Duration::from_secs(self.audio_timeout_secs)
    }
}

/// OpenAI-compatible `/v1/audio/transcriptions` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhisperApiConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,

    pub api_key: String,

    #[serde(default = "default_api_model")]
    pub model: String,

    /// ISO-639-1 language hint; auto-detected when unset.
    #[serde(default)]
    pub language: Option<String>,
}

fn default_api_base() -> String {
    "https://api.openai.com".to_string()
}

fn default_api_model() -> String {
    "whisper-1".to_string()
}

/// Local whisper.cpp command line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhisperCppConfig {
    #[serde(default = "default_cpp_binary")]
    pub binary: PathBuf,

    /// ggml model file.
    pub model_path: PathBuf,

    #[serde(default = "default_threads")]
    pub threads: u32,

    #[serde(default)]
    pub language: Option<String>,
}

fn default_cpp_binary() -> PathBuf {
    PathBuf::from("whisper-cli")
}

fn default_threads() -> u32 {
    4
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_timeout_scales_with_duration() {
        let config = TranscriptionConfig::default();
        assert_eq!(config.engine_timeout(None), Duration::from_secs(300));
        assert_eq!(
            config.engine_timeout(Some(Duration::from_secs(120))),
            Duration::from_secs(240)
        );
        // Floor and cap.
        assert_eq!(
            config.engine_timeout(Some(Duration::from_secs(5))),
            Duration::from_secs(60)
        );
        assert_eq!(
            config.engine_timeout(Some(Duration::from_secs(3600))),
            Duration::from_secs(600)
        );
    }

    #[test]
    fn test_retry_policy_respects_timeout_flag() {
        let config = TranscriptionConfig::default();
        let policy = config.retry_policy();
        assert_eq!(policy.max_retries, 1);
        assert!(!policy.retry_timeouts);
    }

    #[test]
    fn test_engine_sections_parse() {
        let config: TranscriptionConfig = toml::from_str(
            r#"
            [whisper_api]
            api_key = "sk-test"

            [whisper_cpp]
            model_path = "/models/ggml-base.en.bin"
            "#,
        )
        .unwrap();
        let api = config.whisper_api.unwrap();
        assert_eq!(api.api_base, "https://api.openai.com");
        assert_eq!(api.model, "whisper-1");
        let cpp = config.whisper_cpp.unwrap();
        assert_eq!(cpp.binary, PathBuf::from("whisper-cli"));
        assert_eq!(cpp.threads, 4);
    }
}
