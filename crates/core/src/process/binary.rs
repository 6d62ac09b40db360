//! Locating external binaries.

use std::path::{Path, PathBuf};
use tracing::debug;

/// Install locations checked when a bare binary name is not on `PATH`.
pub const WELL_KNOWN_DIRS: &[&str] = &[
    "/usr/bin",
    "/usr/local/bin",
    "/opt/homebrew/bin",
    "/snap/bin",
    "C:\\ffmpeg\\bin",
    "C:\\Program Files\\ffmpeg\\bin",
];

/// Resolves a configured binary to a concrete path.
///
/// Explicit paths (anything with a directory component) are returned as-is.
/// Bare names are looked up on `PATH`, then in [`WELL_KNOWN_DIRS`]. When
/// nothing is found the name is returned unchanged so the spawn error names it.
pub fn resolve_binary(configured: &Path) -> PathBuf {
    if configured.components().count() > 1 {
        return configured.to_path_buf();
    }

    if let Ok(found) = which::which(configured) {
        return found;
    }

    let exe_name = if cfg!(windows) && configured.extension().is_none() {
        configured.with_extension("exe")
    } else {
        configured.to_path_buf()
    };

    for dir in WELL_KNOWN_DIRS {
        let candidate = Path::new(dir).join(&exe_name);
        if candidate.is_file() {
            debug!("Resolved {} to {}", configured.display(), candidate.display());
            return candidate;
        }
    }

    configured.to_path_buf()
}
