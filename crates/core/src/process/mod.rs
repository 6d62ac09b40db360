//! External process plumbing: binary lookup and supervised execution.

mod binary;
mod config;
mod supervised;

pub use binary::{resolve_binary, WELL_KNOWN_DIRS};
pub use config::FfmpegConfig;
pub use supervised::{ProcessOutput, SupervisedChild};
