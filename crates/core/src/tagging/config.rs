use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::retry::RetryPolicy;

/// Tagging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaggingConfig {
    /// Budget for one inference call.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Frames sent per request, evenly spaced over the real frames.
    #[serde(default = "default_max_frames")]
    pub max_frames: usize,

    #[serde(default = "default_max_tags")]
    pub max_tags: usize,

    #[serde(default = "default_transcript_excerpt_chars")]
    pub transcript_excerpt_chars: usize,

    #[serde(default = "default_retries")]
    pub retries: u32,

    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Longest wait between attempts, including a server's `Retry-After`.
    /// Never more than `timeout_secs`.
    #[serde(default = "default_retry_max_backoff_ms")]
    pub retry_max_backoff_ms: u64,

    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,

    /// AI provider; heuristic tags only when unset.
    #[serde(default)]
    pub inference: Option<InferenceConfig>,
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_frames() -> usize {
    8
}

fn default_max_tags() -> usize {
    12
}

fn default_transcript_excerpt_chars() -> usize {
    2000
}

fn default_retries() -> u32 {
    1
}

fn default_retry_backoff_ms() -> u64 {
    1000
}

fn default_retry_max_backoff_ms() -> u64 {
    5000
}

fn default_jpeg_quality() -> u8 {
    80
}

impl Default for TaggingConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_frames: default_max_frames(),
            max_tags: default_max_tags(),
            transcript_excerpt_chars: default_transcript_excerpt_chars(),
            retries: default_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
            retry_max_backoff_ms: default_retry_max_backoff_ms(),
            jpeg_quality: default_jpeg_quality(),
            inference: None,
        }
    }
}

impl TaggingConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        let max_backoff = Duration::from_millis(self.retry_max_backoff_ms).min(self.timeout());
        RetryPolicy::new(self.retries, Duration::from_millis(self.retry_backoff_ms))
            .with_max_backoff(max_backoff)
    }
}

/// Inference provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InferenceProvider {
    Gemini,
    Anthropic,
}

/// Connection settings of the inference provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceConfig {
    #[serde(default = "default_provider")]
    pub provider: InferenceProvider,

    /// Provider default when unset.
    #[serde(default)]
    pub model: Option<String>,

    pub api_key: String,

    /// Provider default when unset.
    #[serde(default)]
    pub api_base: Option<String>,
}

fn default_provider() -> InferenceProvider {
    InferenceProvider::Gemini
}

impl InferenceConfig {
    pub fn model(&self) -> &str {
        match (&self.model, self.provider) {
            (Some(model), _) => model,
            (None, InferenceProvider::Gemini) => "gemini-2.5-flash",
            (None, InferenceProvider::Anthropic) => "claude-3-5-haiku-20241022",
        }
    }

    pub fn api_base(&self) -> &str {
        match (&self.api_base, self.provider) {
            (Some(base), _) => base.trim_end_matches('/'),
            (None, InferenceProvider::Gemini) => "https://generativelanguage.googleapis.com",
            (None, InferenceProvider::Anthropic) => "https://api.anthropic.com",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TaggingConfig::default();
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert_eq!(config.max_frames, 8);
        assert!(config.inference.is_none());
    }

    #[test]
    fn test_retry_backoff_bounded_by_timeout() {
        let config = TaggingConfig {
            timeout_secs: 2,
            retry_max_backoff_ms: 60_000,
            ..Default::default()
        };
        assert_eq!(config.retry_policy().max_backoff, Duration::from_secs(2));
        assert_eq!(
            TaggingConfig::default().retry_policy().max_backoff,
            Duration::from_secs(5)
        );
    }

    #[test]
    fn test_provider_defaults() {
        let config: TaggingConfig = toml::from_str(
            r#"
            [inference]
            api_key = "key"
            "#,
        )
        .unwrap();
        let inference = config.inference.unwrap();
        assert_eq!(inference.provider, InferenceProvider::Gemini);
        assert_eq!(inference.model(), "gemini-2.5-flash");

        let anthropic = InferenceConfig {
            provider: InferenceProvider::Anthropic,
            model: None,
            api_key: "k".into(),
            api_base: Some("http://localhost:8080/".into()),
        };
        assert_eq!(anthropic.api_base(), "http://localhost:8080");
        assert!(anthropic.model().starts_with("claude"));
    }
}
