//! Scoped ownership of an external process.
//!
//! A `SupervisedChild` terminates and reaps its process on every exit path:
//! normal completion, timeout, error, and drop of the owning future.

use std::ffi::OsStr;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tracing::{debug, warn};

use crate::error::MediaError;
use crate::metrics;

/// Output of a finished process.
#[derive(Debug)]
pub struct ProcessOutput {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: String,
    pub elapsed: Duration,
}

impl ProcessOutput {
    /// Turns a non-zero exit into `InvalidInput` with the captured stderr.
    pub fn into_success(self, what: &str) -> Result<Self, MediaError> {
        if self.status.success() {
            Ok(self)
        } else {
            Err(MediaError::invalid_input_with_stderr(
                format!("{} exited with code {:?}", what, self.status.code()),
                self.stderr,
            ))
        }
    }
}

/// An external process that is never leaked.
pub struct SupervisedChild {
    child: Option<Child>,
    label: String,
    grace: Duration,
}

impl SupervisedChild {
    /// Spawns `program` with `args`, stdin closed and both output streams piped.
    pub fn spawn<I, S>(
        program: &Path,
        args: I,
        grace: Duration,
    ) -> Result<Self, MediaError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let label = program
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| program.display().to_string());

        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    MediaError::unavailable(format!("{} not found at {}", label, program.display()))
                } else {
                    MediaError::Io(e)
                }
            })?;

        debug!("Spawned {} (pid {:?})", label, child.id());

        Ok(Self {
            child: Some(child),
            label,
            grace,
        })
    }

    /// Process id, if still running.
    pub fn id(&self) -> Option<u32> {
        self.child.as_ref().and_then(|c| c.id())
    }

    /// Waits for the process to exit, collecting its output.
    ///
    /// On timeout the process is terminated before this returns.
    pub async fn run(mut self, limit: Duration) -> Result<ProcessOutput, MediaError> {
        let start = Instant::now();
        let Some(child) = self.child.as_mut() else {
            return Err(MediaError::Cancelled);
        };

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let collected = tokio::time::timeout(limit, async {
            let (out, err) = tokio::join!(read_all(stdout), read_all(stderr));
            let status = child.wait().await?;
            Ok::<_, std::io::Error>((status, out?, err?))
        })
        .await;

        match collected {
            Ok(Ok((status, stdout, stderr))) => {
                // Reaped: nothing left to terminate.
                self.child = None;
                Ok(ProcessOutput {
                    status,
                    stdout,
                    stderr: String::from_utf8_lossy(&stderr).to_string(),
                    elapsed: start.elapsed(),
                })
            }
            Ok(Err(e)) => {
                self.terminate().await;
                Err(MediaError::Io(e))
            }
            Err(_) => {
                warn!("{} exceeded {:?}, terminating", self.label, limit);
                self.terminate().await;
                Err(MediaError::Timeout { after: limit })
            }
        }
    }

    /// Politely stops the process, then forces it after the grace period.
    pub async fn terminate(&mut self) {
        if let Some(child) = self.child.take() {
            terminate_child(child, self.label.clone(), self.grace).await;
        }
    }
}

impl Drop for SupervisedChild {
    fn drop(&mut self) {
        let Some(mut child) = self.child.take() else {
            return;
        };
        if matches!(child.try_wait(), Ok(Some(_))) {
            return;
        }
        let label = std::mem::take(&mut self.label);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                debug!("{} dropped while running, terminating in background", label);
                handle.spawn(terminate_child(child, label, self.grace));
            }
            Err(_) => {
                let _ = child.start_kill();
                metrics::SUBPROCESS_TERMINATIONS
                    .with_label_values(&["kill"])
                    .inc();
            }
        }
    }
}

async fn read_all<R: AsyncRead + Unpin>(stream: Option<R>) -> std::io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    if let Some(mut stream) = stream {
        stream.read_to_end(&mut buf).await?;
    }
    Ok(buf)
}

async fn terminate_child(mut child: Child, label: String, grace: Duration) {
    if let Some(pid) = child.id() {
        if send_term(pid) {
            metrics::SUBPROCESS_TERMINATIONS
                .with_label_values(&["term"])
                .inc();
            if let Ok(Ok(status)) = tokio::time::timeout(grace, child.wait()).await {
                debug!("{} (pid {}) exited after SIGTERM: {}", label, pid, status);
                return;
            }
        }
    }

    if let Err(e) = child.kill().await {
        debug!("Failed to kill {}: {}", label, e);
    } else {
        metrics::SUBPROCESS_TERMINATIONS
            .with_label_values(&["kill"])
            .inc();
        warn!("{} did not stop within {:?}, killed", label, grace);
    }
}

#[cfg(unix)]
fn send_term(pid: u32) -> bool {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    let Ok(raw) = i32::try_from(pid) else {
        return false;
    };
    match kill(Pid::from_raw(raw), Signal::SIGTERM) {
        Ok(()) => true,
        Err(e) => {
            debug!("SIGTERM to pid {} failed: {}", pid, e);
            false
        }
    }
}

#[cfg(not(unix))]
fn send_term(_pid: u32) -> bool {
    false
}
