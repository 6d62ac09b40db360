//! Mock tag inference service.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::script::Script;
use crate::error::MediaError;
use crate::tagging::{InferenceRequest, Tag, TagInference};

/// Mock implementation of the TagInference trait.
///
/// # Example
///
/// ```rust,ignore
/// let inference = Arc::new(MockTagInference::new("gemini").returning(tags));
/// let tagger = Tagger::new(&config).with_inference(inference.clone());
///
/// tagger.tag(&frames, &transcript).await;
/// assert_eq!(inference.recorded_requests().await[0].frames.len(), 2);
/// ```
#[derive(Debug)]
pub struct MockTagInference {
    name: String,
    tags: Vec<Tag>,
    script: Script,
    requests: Arc<RwLock<Vec<InferenceRequest>>>,
}

impl MockTagInference {
    /// A service that returns no tags until configured.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tags: Vec::new(),
            script: Script::default(),
            requests: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn returning(mut self, tags: Vec<Tag>) -> Self {
        self.tags = tags;
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

    pub async fn call_count(&self) -> usize {
        self.requests.read().await.len()
    }

    pub async fn recorded_requests(&self) -> Vec<InferenceRequest> {
        self.requests.read().await.clone()
    }
}

#[async_trait]
impl TagInference for MockTagInference {
    fn name(&self) -> &str {
        &self.name
    }

    fn model(&self) -> &str {
        "mock-model"
    }

    async fn infer(&self, request: &InferenceRequest) -> Result<Vec<Tag>, MediaError> {
        let call = {
            let mut requests = self.requests.write().await;
            requests.push(request.clone());
            requests.len() - 1
        };
        self.script.check(call).await?;
        Ok(self.tags.clone())
    }
}
