//! Mock frame decoder.

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use super::script::Script;
use crate::error::MediaError;
use crate::frames::{FrameDecoder, FrameSize, RawFrame};
use crate::probe::FormatProfile;

/// Mock implementation of the FrameDecoder trait.
///
/// Successful calls return a solid frame of the requested size whose colour
/// depends on the timestamp, so consecutive frames differ.
///
/// # Example
///
/// ```rust,ignore
/// let decoder = Arc::new(MockFrameDecoder::new("ffmpeg").failing_at(vec![2_000]));
/// let extractor = FrameExtractor::new(&config).with_decoder(decoder.clone());
///
/// let (frames, outcome) = extractor.extract(&item, &profile, 5).await;
/// assert_eq!(decoder.recorded_timestamps().await.len(), 5);
/// ```
#[derive(Debug)]
pub struct MockFrameDecoder {
    name: String,
    script: Script,
    failing_at: Vec<u64>,
    hanging_at: Vec<u64>,
    supports: bool,
    malformed: bool,
    /// Every timestamp requested, retries included.
    timestamps: Arc<RwLock<Vec<u64>>>,
}

impl MockFrameDecoder {
    /// A decoder that succeeds for every timestamp.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            script: Script::default(),
            failing_at: Vec::new(),
            hanging_at: Vec::new(),
            supports: true,
            malformed: false,
            timestamps: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Fails with a non-retryable error for the given timestamps.
    pub fn failing_at(mut self, timestamps: Vec<u64>) -> Self {
        self.failing_at = timestamps;
        self
    }

    /// Fails the first `n` calls with `error`.
    pub fn failing_first(mut self, n: usize, error: MediaError) -> Self {
        self.script.fail_first(n, error);
        self
    }

    pub fn always_failing(mut self, error: MediaError) -> Self {
        self.script.always_fail(error);
        self
    }

    /// Never answers.
    pub fn hanging(mut self) -> Self {
        self.script.hang();
        self
    }

    /// Takes `delay` to answer each call.
    pub fn delayed(mut self, delay: Duration) -> Self {
        self.script.delay(delay);
        self
    }

    /// Never answers for the given timestamps.
    pub fn hanging_at(mut self, timestamps: Vec<u64>) -> Self {
        self.hanging_at = timestamps;
        self
    }

    /// What `supports()` reports for every profile.
    pub fn supporting(mut self, supports: bool) -> Self {
        self.supports = supports;
        self
    }

    /// Returns frames whose buffer does not match their dimensions.
    pub fn malformed(mut self) -> Self {
        self.malformed = true;
        self
    }

    pub async fn recorded_timestamps(&self) -> Vec<u64> {
        self.timestamps.read().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.timestamps.read().await.len()
    }
}

#[async_trait]
impl FrameDecoder for MockFrameDecoder {
    fn name(&self) -> &str {
        &self.name
    }

    fn supports(&self, _profile: &FormatProfile) -> bool {
        self.supports
    }

    async fn decode_at(
        &self,
        _path: &Path,
        timestamp_ms: u64,
        size: FrameSize,
    ) -> Result<RawFrame, MediaError> {
        let call = {
            let mut timestamps = self.timestamps.write().await;
            timestamps.push(timestamp_ms);
            timestamps.len() - 1
        };
        self.script.check(call).await?;

        if self.hanging_at.contains(&timestamp_ms) {
            std::future::pending::<()>().await;
        }
        if self.failing_at.contains(&timestamp_ms) {
            return Err(MediaError::invalid_input(format!(
                "no frame at {} ms",
                timestamp_ms
            )));
        }

        let shade = (timestamp_ms / 100 % 256) as u8;
        let len = if self.malformed {
            size.rgb24_len() / 2
        } else {
            size.rgb24_len()
        };
        Ok(RawFrame {
            width: size.width,
            height: size.height,
            data: vec![shade; len],
        })
    }
}
