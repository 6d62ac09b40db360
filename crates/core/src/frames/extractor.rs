//! The frame extraction strategy chain.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::Instant as TokioInstant;
use tracing::{debug, warn};

use super::sampling::{output_size, sample_timestamps};
use super::{
    placeholder_frames, ExtractedFrame, FrameDecoder, FrameSize, FramesConfig, PLACEHOLDER_METHOD,
};
use crate::error::MediaError;
use crate::pipeline::{MediaItem, Stage, StageOutcome, StageRecorder};
use crate::probe::FormatProfile;
use crate::retry::RetryPolicy;

/// Produces representative frames by walking an ordered list of decoders.
///
/// The chain ends with placeholder frames, so a non-zero request never
/// yields an empty sequence.
pub struct FrameExtractor {
    decoders: Vec<Arc<dyn FrameDecoder>>,
    strategy_timeout: Duration,
    sample_policy: RetryPolicy,
    width: u32,
    fallback_height: u32,
    placeholder_rgb: [u8; 3],
}

/// Progress of one strategy; survives the strategy's timeout.
#[derive(Default)]
struct StrategyRun {
    frames: Vec<ExtractedFrame>,
    skipped: usize,
    calls: u32,
    last_error: Option<MediaError>,
}

impl FrameExtractor {
    pub fn new(config: &FramesConfig) -> Self {
        Self {
            decoders: Vec::new(),
            strategy_timeout: config.strategy_timeout(),
            sample_policy: config.sample_retry_policy(),
            width: config.width,
            fallback_height: config.fallback_height,
            placeholder_rgb: config.placeholder_rgb,
        }
    }

    /// Appends a decoder to the chain.
    pub fn with_decoder(mut self, decoder: Arc<dyn FrameDecoder>) -> Self {
        self.decoders.push(decoder);
        self
    }

    /// Names of the configured decoders, in chain order.
    pub fn decoder_names(&self) -> Vec<&str> {
        self.decoders.iter().map(|d| d.name()).collect()
    }

    /// Extracts up to `n_frames` frames. Fewer than requested is not an error.
    pub async fn extract(
        &self,
        item: &MediaItem,
        profile: &FormatProfile,
        n_frames: usize,
    ) -> (Vec<ExtractedFrame>, StageOutcome) {
        self.extract_inner(item, profile, n_frames, None).await
    }

    /// Like `extract`, but stops at `deadline` and returns what it has.
    ///
    /// Frames decoded before the deadline are kept; with none decoded the
    /// stage ends in placeholders. Either way the outcome records a timeout.
    pub async fn extract_before(
        &self,
        item: &MediaItem,
        profile: &FormatProfile,
        n_frames: usize,
        deadline: TokioInstant,
    ) -> (Vec<ExtractedFrame>, StageOutcome) {
        self.extract_inner(item, profile, n_frames, Some(deadline))
            .await
    }

    async fn extract_inner(
        &self,
        item: &MediaItem,
        profile: &FormatProfile,
        n_frames: usize,
        deadline: Option<TokioInstant>,
    ) -> (Vec<ExtractedFrame>, StageOutcome) {
        let mut recorder = StageRecorder::start(Stage::FrameExtraction);

        if n_frames == 0 {
            return (Vec::new(), recorder.finish_success("none"));
        }

        let timestamps = sample_timestamps(profile.duration_ms, n_frames);
        let size = output_size(profile, self.width, self.fallback_height);

        let mut cut_off = false;
        for decoder in self.ordered(profile) {
            let name = decoder.name();
            let started = Instant::now();
            let mut run = StrategyRun::default();

            let strategy_deadline = TokioInstant::now() + self.strategy_timeout;
            let limit = deadline.map_or(strategy_deadline, |d| d.min(strategy_deadline));
            let finished = tokio::time::timeout_at(
                limit,
                self.run_strategy(decoder.as_ref(), &item.path, &timestamps, size, &mut run),
            )
            .await
            .is_ok();
            cut_off = !finished && deadline.is_some_and(|d| d <= strategy_deadline);

            if !run.frames.is_empty() {
                // Frames decoded before a timeout are kept.
                let unsampled = timestamps.len() - run.frames.len() - run.skipped;
                recorder.success(name, run.frames.len(), run.skipped + unsampled, run.calls, started);
                let outcome = if cut_off {
                    warn!("{} cut off at the deadline with {} frame(s)", name, run.frames.len());
                    recorder.finish_timed_out(name)
                } else {
                    recorder.finish_success(name)
                };
                return (run.frames, outcome);
            }

            let err = if finished {
                run.last_error
                    .unwrap_or_else(|| MediaError::invalid_input("Decoder produced no frames"))
            } else {
                MediaError::Timeout {
                    after: started.elapsed(),
                }
            };
            recorder.failure(name, &err, run.skipped, run.calls, started);
            if cut_off {
                break;
            }
        }

        let frames = placeholder_frames(&timestamps, size, self.placeholder_rgb);
        recorder.fallback(PLACEHOLDER_METHOD, frames.len());
        let outcome = if cut_off {
            recorder.finish_timed_out(PLACEHOLDER_METHOD)
        } else {
            recorder.finish_degraded(PLACEHOLDER_METHOD)
        };
        (frames, outcome)
    }

    /// Decoders the profile favours first; relative order otherwise kept.
    fn ordered(&self, profile: &FormatProfile) -> Vec<Arc<dyn FrameDecoder>> {
        let (mut first, rest): (Vec<_>, Vec<_>) = self
            .decoders
            .iter()
            .cloned()
            .partition(|d| d.supports(profile));
        first.extend(rest);
        first
    }

    async fn run_strategy(
        &self,
        decoder: &dyn FrameDecoder,
        path: &Path,
        timestamps: &[u64],
        size: FrameSize,
        run: &mut StrategyRun,
    ) {
        for &timestamp_ms in timestamps {
            let (result, calls) = self
                .sample_policy
                .run(decoder.name(), move || decoder.decode_at(path, timestamp_ms, size))
                .await;
            run.calls += calls;

            match result {
                Ok(raw) if raw.is_well_formed() => {
                    let index = run.frames.len();
                    run.frames.push(ExtractedFrame::from_raw(
                        index,
                        timestamp_ms,
                        raw,
                        decoder.name(),
                    ));
                }
                Ok(raw) => {
                    debug!(
                        "{} returned a malformed {}x{} frame at {} ms",
                        decoder.name(),
                        raw.width,
                        raw.height,
                        timestamp_ms
                    );
                    run.skipped += 1;
                    run.last_error = Some(MediaError::invalid_input(format!(
                        "Malformed frame at {} ms",
                        timestamp_ms
                    )));
                }
                Err(e) => {
                    debug!("{} skipped sample at {} ms: {}", decoder.name(), timestamp_ms, e);
                    run.skipped += 1;
                    let missing = matches!(
                        e,
                        MediaError::Unavailable {
                            transient: false,
                            ..
                        }
                    );
                    run.last_error = Some(e);
                    // A missing decoder will not appear for the next sample.
                    if missing {
                        return;
                    }
                }
            }
        }
    }
}
