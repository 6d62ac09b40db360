//! The tagging strategy chain.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use super::heuristic::heuristic_tags;
use super::response::normalize_tags;
use super::{EncodedFrame, InferenceRequest, Tag, TagInference, TaggingConfig, HEURISTIC_METHOD};
use crate::error::MediaError;
use crate::frames::{encode_jpeg, ExtractedFrame};
use crate::pipeline::{Stage, StageOutcome, StageRecorder};
use crate::retry::RetryPolicy;
use crate::transcript::{TranscriptExt, TranscriptSegment};

/// Labels a media item from its frames and transcript.
///
/// AI inference first; heuristic tags guarantee a non-empty result.
pub struct Tagger {
    inference: Vec<Arc<dyn TagInference>>,
    timeout: Duration,
    policy: RetryPolicy,
    max_frames: usize,
    max_tags: usize,
    excerpt_chars: usize,
    jpeg_quality: u8,
}

impl Tagger {
    pub fn new(config: &TaggingConfig) -> Self {
        Self {
            inference: Vec::new(),
            timeout: config.timeout(),
            policy: config.retry_policy(),
            max_frames: config.max_frames,
            max_tags: config.max_tags,
            excerpt_chars: config.transcript_excerpt_chars,
            jpeg_quality: config.jpeg_quality,
        }
    }

    /// Appends an inference service to the chain.
    pub fn with_inference(mut self, inference: Arc<dyn TagInference>) -> Self {
        self.inference.push(inference);
        self
    }

    /// Names of the configured inference services, in chain order.
    pub fn inference_names(&self) -> Vec<&str> {
        self.inference.iter().map(|i| i.name()).collect()
    }

    pub async fn tag(
        &self,
        frames: &[ExtractedFrame],
        transcript: &[TranscriptSegment],
    ) -> (Vec<Tag>, StageOutcome) {
        let mut recorder = StageRecorder::start(Stage::Tagging);

        if !self.inference.is_empty() {
            let request = self.build_request(frames, transcript);

            for inference in &self.inference {
                let name = inference.name();
                let started = Instant::now();

                if request.is_empty() {
                    let err = MediaError::invalid_input("No real frames and no transcript to tag");
                    recorder.failure(name, &err, 0, 0, started);
                    continue;
                }

                debug!(
                    "Tagging with {} ({}): {} frame(s), {} transcript chars",
                    name,
                    inference.model(),
                    request.frames.len(),
                    request.transcript_excerpt.len()
                );

                let timeout = self.timeout;
                let max_tags = self.max_tags;
                let request = &request;
                let (result, calls) = self
                    .policy
                    .run(name, move || attempt(inference, request, timeout, max_tags))
                    .await;

                match result {
                    Ok(tags) => {
                        recorder.success(name, tags.len(), 0, calls, started);
                        return (tags, recorder.finish_success(name));
                    }
                    Err(e) => recorder.failure(name, &e, 0, calls, started),
                }
            }
        }

        let tags = heuristic_tags(frames, transcript);
        recorder.fallback(HEURISTIC_METHOD, tags.len());
        (tags, recorder.finish_degraded(HEURISTIC_METHOD))
    }

    /// Up to `max_frames` evenly spaced real frames plus a transcript excerpt.
    fn build_request(
        &self,
        frames: &[ExtractedFrame],
        transcript: &[TranscriptSegment],
    ) -> InferenceRequest {
        let real: Vec<&ExtractedFrame> = frames.iter().filter(|f| !f.is_placeholder()).collect();

        let picked: Vec<&ExtractedFrame> = if real.len() <= self.max_frames {
            real
        } else {
            (0..self.max_frames)
                .map(|i| real[i * real.len() / self.max_frames])
                .collect()
        };

        let encoded = picked
            .into_iter()
            .filter_map(|f| match encode_jpeg(f, self.jpeg_quality) {
                Ok(jpeg) => Some(EncodedFrame {
                    timestamp_ms: f.timestamp_ms,
                    jpeg,
                }),
                Err(e) => {
                    warn!("Skipping frame {} for tagging: {}", f.index, e);
                    None
                }
            })
            .collect();

        InferenceRequest {
            frames: encoded,
            transcript_excerpt: transcript.excerpt(self.excerpt_chars),
            max_tags: self.max_tags,
        }
    }
}

/// One inference call; an empty tag list counts as a failure.
async fn attempt(
    inference: &Arc<dyn TagInference>,
    request: &InferenceRequest,
    timeout: Duration,
    max_tags: usize,
) -> Result<Vec<Tag>, MediaError> {
    let tags = tokio::time::timeout(timeout, inference.infer(request))
        .await
        .map_err(|_| MediaError::Timeout { after: timeout })??;

    let mut tags = normalize_tags(tags, max_tags);
    for tag in &mut tags {
        if tag.source_method.is_empty() {
            tag.source_method = inference.name().to_string();
        }
    }
    if tags.is_empty() {
        return Err(MediaError::invalid_input("Inference returned no tags"));
    }
    Ok(tags)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::frames::{placeholder_frames, FrameSize, RawFrame};
    use crate::tagging::HEURISTIC_CONFIDENCE;
    use crate::testing::MockTagInference;

    fn config() -> TaggingConfig {
        TaggingConfig {
            retry_backoff_ms: 1,
            max_frames: 2,
            ..Default::default()
        }
    }

    fn real_frames(n: usize) -> Vec<ExtractedFrame> {
        (0..n)
            .map(|i| {
                ExtractedFrame::from_raw(
                    i,
                    i as u64 * 1000,
                    RawFrame {
                        width: 4,
                        height: 4,
                        data: vec![(i * 40) as u8; 48],
                    },
                    "ffmpeg",
                )
            })
            .collect()
    }

    fn transcript() -> Vec<TranscriptSegment> {
        vec![TranscriptSegment::new("surfing", 0, 500, 0.9)]
    }

    fn ai_tags() -> Vec<Tag> {
        vec![
            Tag::new("Beach", 0.9, "gemini"),
            Tag::new("surf", 0.8, "gemini"),
        ]
    }

    #[tokio::test]
    async fn test_ai_tags() {
        let inference = Arc::new(MockTagInference::new("gemini").returning(ai_tags()));
        let tagger = Tagger::new(&config()).with_inference(inference.clone());

        let (tags, outcome) = tagger.tag(&real_frames(5), &transcript()).await;
        assert_eq!(tags[0].label, "beach");
        assert_eq!(tags[0].source_method, "gemini");
        assert!(outcome.is_full());

        let requests = inference.recorded_requests().await;
        assert_eq!(requests.len(), 1);
        // Bounded, evenly spaced sample of frames.
        assert_eq!(requests[0].frames.len(), 2);
        assert_eq!(requests[0].frames[0].timestamp_ms, 0);
        assert_eq!(requests[0].frames[1].timestamp_ms, 2000);
        assert_eq!(requests[0].transcript_excerpt, "surfing");
    }

    #[tokio::test]
    async fn test_rate_limit_retried_once() {
        let inference = Arc::new(
            MockTagInference::new("gemini")
                .returning(ai_tags())
                .failing_first(
                    1,
                    MediaError::RateLimited {
                        reason: "slow down".into(),
                        retry_after: None,
                    },
                ),
        );
        let tagger = Tagger::new(&config()).with_inference(inference.clone());

        let (_, outcome) = tagger.tag(&real_frames(1), &transcript()).await;
        assert!(outcome.is_full());
        assert_eq!(inference.call_count().await, 2);
    }

    #[tokio::test]
    async fn test_long_retry_after_is_not_waited_out() {
        let inference = Arc::new(
            MockTagInference::new("gemini")
                .returning(ai_tags())
                .failing_first(
                    1,
                    MediaError::RateLimited {
                        reason: "slow down".into(),
                        retry_after: Some(Duration::from_secs(120)),
                    },
                ),
        );
        let tagger = Tagger::new(&TaggingConfig::default()).with_inference(inference.clone());

        let start = Instant::now();
        let (tags, outcome) = tagger.tag(&real_frames(1), &transcript()).await;
        assert!(start.elapsed() < Duration::from_secs(5));
        assert_eq!(inference.call_count().await, 1);
        assert!(tags.iter().all(Tag::is_heuristic));
        assert_eq!(outcome.attempts[0].error_kind, Some(ErrorKind::RateLimited));
    }

    #[tokio::test]
    async fn test_quota_exhausted_falls_through_without_retry() {
        let inference = Arc::new(MockTagInference::new("gemini").always_failing(
            MediaError::QuotaExhausted {
                reason: "quota".into(),
            },
        ));
        let tagger = Tagger::new(&config()).with_inference(inference.clone());

        let (tags, outcome) = tagger.tag(&real_frames(2), &transcript()).await;
        assert_eq!(inference.call_count().await, 1);
        assert!(tags.iter().all(Tag::is_heuristic));
        assert!(tags.iter().all(|t| t.confidence == HEURISTIC_CONFIDENCE));
        assert!(outcome.degraded);
        assert_eq!(outcome.method_used, HEURISTIC_METHOD);
        assert_eq!(outcome.attempts[0].error_kind, Some(ErrorKind::Unavailable));
    }

    #[tokio::test]
    async fn test_empty_tag_list_falls_back() {
        let inference = Arc::new(MockTagInference::new("gemini").returning(vec![]));
        let tagger = Tagger::new(&config()).with_inference(inference);

        let (tags, outcome) = tagger.tag(&real_frames(1), &[]).await;
        assert!(!tags.is_empty());
        assert_eq!(outcome.method_used, HEURISTIC_METHOD);
    }

    #[tokio::test]
    async fn test_nothing_to_tag_skips_inference() {
        let inference = Arc::new(MockTagInference::new("gemini").returning(ai_tags()));
        let tagger = Tagger::new(&config()).with_inference(inference.clone());
        let placeholders = placeholder_frames(&[0, 1000], FrameSize::new(4, 4), [0, 0, 0]);

        let (tags, outcome) = tagger.tag(&placeholders, &[]).await;
        assert_eq!(inference.call_count().await, 0);
        assert!(tags.iter().any(|t| t.label == "visuals-unavailable"));
        assert_eq!(outcome.attempts[0].error_kind, Some(ErrorKind::InvalidInput));
    }

    #[tokio::test]
    async fn test_transcript_only_still_uses_inference() {
        let inference = Arc::new(MockTagInference::new("gemini").returning(ai_tags()));
        let tagger = Tagger::new(&config()).with_inference(inference.clone());
        let placeholders = placeholder_frames(&[0], FrameSize::new(4, 4), [0, 0, 0]);

        let (_, outcome) = tagger.tag(&placeholders, &transcript()).await;
        assert!(outcome.is_full());
        assert!(inference.recorded_requests().await[0].frames.is_empty());
    }

    #[tokio::test]
    async fn test_hanging_inference_is_bounded() {
        let config = TaggingConfig {
            timeout_secs: 1,
            retries: 0,
            ..config()
        };
        let tagger =
            Tagger::new(&config).with_inference(Arc::new(MockTagInference::new("gemini").hanging()));

        let start = Instant::now();
        let (tags, outcome) = tagger.tag(&real_frames(1), &transcript()).await;
        assert!(start.elapsed() < Duration::from_secs(5));
        assert!(!tags.is_empty());
        assert_eq!(outcome.attempts[0].error_kind, Some(ErrorKind::Timeout));
    }

    #[tokio::test]
    async fn test_no_inference_configured() {
        let tagger = Tagger::new(&config());
        let (tags, outcome) = tagger.tag(&real_frames(2), &transcript()).await;
        assert!(tags.iter().all(Tag::is_heuristic));
        assert!(outcome.attempts.len() == 1);
        assert!(outcome.degraded);
    }
}
