use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::retry::RetryPolicy;

/// Frame extraction configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FramesConfig {
    /// Number of evenly spaced frames to sample.
    #[serde(default = "default_sample_count")]
    pub sample_count: usize,

    /// Output width in pixels.
    #[serde(default = "default_width")]
    pub width: u32,

    /// Output height when the aspect ratio is unknown.
    #[serde(default = "default_fallback_height")]
    pub fallback_height: u32,

    /// Budget for one decoding strategy over all samples.
    #[serde(default = "default_strategy_timeout_secs")]
    pub strategy_timeout_secs: u64,

    /// Retries per sample on transient failures.
    #[serde(default = "default_sample_retries")]
    pub sample_retries: u32,

    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Color of placeholder frames.
    #[serde(default = "default_placeholder_rgb")]
    pub placeholder_rgb: [u8; 3],

    /// Use the in-process decoder as secondary strategy (needs the `libav` feature).
    #[serde(default = "default_libav_enabled")]
    pub libav_enabled: bool,
}

fn default_sample_count() -> usize {
    5
}

fn default_width() -> u32 {
    320
}

fn default_fallback_height() -> u32 {
    180
}

fn default_strategy_timeout_secs() -> u64 {
    60
}

fn default_sample_retries() -> u32 {
    1
}

fn default_retry_backoff_ms() -> u64 {
    250
}

fn default_placeholder_rgb() -> [u8; 3] {
    [64, 64, 64]
}

fn default_libav_enabled() -> bool {
    true
}

impl Default for FramesConfig {
    fn default() -> Self {
        Self {
            sample_count: default_sample_count(),
            width: default_width(),
            fallback_height: default_fallback_height(),
            strategy_timeout_secs: default_strategy_timeout_secs(),
            sample_retries: default_sample_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
            placeholder_rgb: default_placeholder_rgb(),
            libav_enabled: default_libav_enabled(),
        }
    }
}

impl FramesConfig {
    pub fn strategy_timeout(&self) -> Duration {
        Duration::from_secs(self.strategy_timeout_secs)
    }

    pub fn sample_retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.sample_retries,
            Duration::from_millis(self.retry_backoff_ms),
        )
        .with_max_backoff(self.strategy_timeout())
    }
}
