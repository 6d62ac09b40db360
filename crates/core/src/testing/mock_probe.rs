//! Mock metadata probe.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

use super::script::Script;
use crate::error::MediaError;
use crate::probe::{MediaInfo, MetadataProbe};

/// Mock implementation of the MetadataProbe trait.
#[derive(Debug)]
pub struct MockMetadataProbe {
    info: Option<MediaInfo>,
    script: Script,
    calls: Arc<RwLock<Vec<PathBuf>>>,
}

impl MockMetadataProbe {
    /// A probe that reports `info` for every path.
    pub fn returning(info: MediaInfo) -> Self {
        Self {
            info: Some(info),
            script: Script::default(),
            calls: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// A probe that always fails with `error`.
    pub fn failing(error: MediaError) -> Self {
        let mut script = Script::default();
        script.always_fail(error);
        Self {
            info: None,
            script,
            calls: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// A probe that never answers.
    pub fn hanging() -> Self {
        let mut script = Script::default();
        script.hang();
        Self {
            info: None,
            script,
            calls: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Paths probed so far.
    pub async fn recorded_paths(&self) -> Vec<PathBuf> {
        self.calls.read().await.clone()
    }
}

#[async_trait]
impl MetadataProbe for MockMetadataProbe {
    fn name(&self) -> &str {
        "mock"
    }

    async fn probe(&self, path: &Path) -> Result<MediaInfo, MediaError> {
        let call = {
            let mut calls = self.calls.write().await;
            calls.push(path.to_path_buf());
            calls.len() - 1
        };
        self.script.check(call).await?;
        self.info
            .clone()
            .ok_or_else(|| MediaError::invalid_input("no metadata configured"))
    }
}
