//! Pipeline coordination and the records it produces.

mod config;
mod coordinator;
mod outcome;
mod types;

pub use config::PipelineConfig;
pub use coordinator::MediaPipeline;
pub use outcome::{Stage, StageOutcome, StrategyAttempt};
pub(crate) use outcome::StageRecorder;
pub use types::{MediaItem, OverallStatus, ProcessingResult};
