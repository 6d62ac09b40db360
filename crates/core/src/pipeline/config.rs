use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Pipeline-wide configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Hard ceiling on one invocation, across all stages.
    #[serde(default = "default_wall_clock_ceiling_secs")]
    pub wall_clock_ceiling_secs: u64,

    /// Items processed in parallel by `process_many` callers.
    #[serde(default = "default_max_concurrent_items")]
    pub max_concurrent_items: usize,

    /// Parent directory of per-invocation scratch directories.
    #[serde(default = "default_scratch_dir")]
    pub scratch_dir: PathBuf,

    /// Time an external process gets to exit after SIGTERM.
    #[serde(default = "default_kill_grace_ms")]
    pub kill_grace_ms: u64,
}

fn default_wall_clock_ceiling_secs() -> u64 {
    900
}

fn default_max_concurrent_items() -> usize {
    2
}

fn default_scratch_dir() -> PathBuf {
    std::env::temp_dir().join("footage-flow")
}

fn default_kill_grace_ms() -> u64 {
    2000
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            wall_clock_ceiling_secs: default_wall_clock_ceiling_secs(),
            max_concurrent_items: default_max_concurrent_items(),
            scratch_dir: default_scratch_dir(),
            kill_grace_ms: default_kill_grace_ms(),
        }
    }
}

impl PipelineConfig {
    pub fn wall_clock_ceiling(&self) -> Duration {
        Duration::from_secs(self.wall_clock_ceiling_secs)
    }

    pub fn kill_grace(&self) -> Duration {
        Duration::from_millis(self.kill_grace_ms)
    }
}
