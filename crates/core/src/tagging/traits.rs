//! Tag inference trait definition.

use async_trait::async_trait;

use super::{InferenceRequest, Tag};
use crate::error::MediaError;

/// An external service that labels frames and text.
///
/// Implementations must be thread-safe (Send + Sync) for use across async tasks.
#[async_trait]
pub trait TagInference: Send + Sync {
    /// Strategy name recorded as the tags' `source_method`.
    fn name(&self) -> &str;

    /// Model identifier, for logging.
    fn model(&self) -> &str;

    /// Returns labeled tags with confidence, or a typed failure.
    async fn infer(&self, request: &InferenceRequest) -> Result<Vec<Tag>, MediaError>;
}
