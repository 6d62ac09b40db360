use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Format probe configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// Bytes of file header inspected for magic numbers.
    #[serde(default = "default_header_bytes")]
    pub header_bytes: usize,

    /// Budget for the metadata query.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_header_bytes() -> usize {
    64
}

fn default_timeout_secs() -> u64 {
    10
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            header_bytes: default_header_bytes(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ProbeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
