//! Shared failure scripting for the doubles.

use std::io;
use std::time::Duration;

use crate::error::MediaError;

/// How a double answers its N-th call (0-based).
#[derive(Debug, Default)]
pub(super) struct Script {
    error: Option<MediaError>,
    fail_first: usize,
    always: bool,
    hang: bool,
    delay: Option<Duration>,
}

impl Script {
    pub(super) fn fail_first(&mut self, n: usize, error: MediaError) {
        self.fail_first = n;
        self.always = false;
        self.error = Some(error);
    }

    pub(super) fn always_fail(&mut self, error: MediaError) {
        self.always = true;
        self.error = Some(error);
    }

    pub(super) fn hang(&mut self) {
        self.hang = true;
    }

    pub(super) fn delay(&mut self, delay: Duration) {
        self.delay = Some(delay);
    }

    /// Hangs, fails, or lets the call through, after the configured delay.
    pub(super) async fn check(&self, call: usize) -> Result<(), MediaError> {
        if self.hang {
            std::future::pending::<()>().await;
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.error {
            Some(err) if self.always || call < self.fail_first => Err(clone_error(err)),
            _ => Ok(()),
        }
    }
}

/// `MediaError` is not `Clone` (it wraps `io::Error`); rebuild an equivalent.
pub(super) fn clone_error(err: &MediaError) -> MediaError {
    match err {
        MediaError::Timeout { after } => MediaError::Timeout { after: *after },
        MediaError::Unavailable { reason, transient } => MediaError::Unavailable {
            reason: reason.clone(),
            transient: *transient,
        },
        MediaError::InvalidInput { reason, stderr } => MediaError::InvalidInput {
            reason: reason.clone(),
            stderr: stderr.clone(),
        },
        MediaError::RateLimited {
            reason,
            retry_after,
        } => MediaError::RateLimited {
            reason: reason.clone(),
            retry_after: *retry_after,
        },
        MediaError::QuotaExhausted { reason } => MediaError::QuotaExhausted {
            reason: reason.clone(),
        },
        MediaError::Cancelled => MediaError::Cancelled,
        MediaError::Io(e) => MediaError::Io(io::Error::new(e.kind(), e.to_string())),
        MediaError::Exhausted => MediaError::Exhausted,
    }
}
