//! Tagging: AI inference with a heuristic fallback.

mod anthropic;
mod config;
mod gemini;
mod heuristic;
mod response;
mod tagger;
mod traits;
mod types;

pub use anthropic::AnthropicInference;
pub use config::{InferenceConfig, InferenceProvider, TaggingConfig};
pub use gemini::GeminiInference;
pub use heuristic::heuristic_tags;
pub use response::normalize_tags;
pub use tagger::Tagger;
pub use traits::TagInference;
pub use types::{EncodedFrame, InferenceRequest, Tag, HEURISTIC_CONFIDENCE, HEURISTIC_METHOD};
