//! Error types shared by every external capability.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Coarse failure taxonomy surfaced in `StageOutcome::error_kind`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The call did not finish in its time budget.
    Timeout,
    /// The external dependency is down, missing, or refused service.
    Unavailable,
    /// Unreadable or corrupt media, or a request the service rejected.
    InvalidInput,
    /// The service asked us to slow down.
    RateLimited,
    /// Every strategy in a chain failed.
    Exhausted,
}

impl ErrorKind {
    /// Stable label used in logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Timeout => "timeout",
            ErrorKind::Unavailable => "unavailable",
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::RateLimited => "rate_limited",
            ErrorKind::Exhausted => "exhausted",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure reported by a decoder, speech engine, or inference service.
#[derive(Debug, Error)]
pub enum MediaError {
    /// The call timed out.
    #[error("Timed out after {after:?}")]
    Timeout { after: Duration },

    /// The dependency could not be reached or refused to serve.
    #[error("Service unavailable: {reason}")]
    Unavailable { reason: String, transient: bool },

    /// The input could not be processed.
    #[error("Invalid input: {reason}")]
    InvalidInput {
        reason: String,
        stderr: Option<String>,
    },

    /// The service rate-limited the request.
    #[error("Rate limited: {reason}")]
    RateLimited {
        reason: String,
        retry_after: Option<Duration>,
    },

    /// The account quota is used up; retrying will not help.
    #[error("Quota exhausted: {reason}")]
    QuotaExhausted { reason: String },

    /// The call was cancelled before it completed.
    #[error("Cancelled")]
    Cancelled,

    /// Local I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No strategy produced a usable result.
    #[error("All strategies exhausted")]
    Exhausted,
}

impl MediaError {
    /// Creates a transient unavailable error (network blip, 5xx, reset).
    pub fn transient(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
            transient: true,
        }
    }

    /// Creates a permanent unavailable error (missing binary, bad credentials).
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
            transient: false,
        }
    }

    /// Creates an invalid input error without captured stderr.
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            reason: reason.into(),
            stderr: None,
        }
    }

    /// Creates an invalid input error carrying a subprocess' stderr.
    pub fn invalid_input_with_stderr(reason: impl Into<String>, stderr: String) -> Self {
        let stderr = stderr.trim();
        Self::InvalidInput {
            reason: reason.into(),
            stderr: if stderr.is_empty() {
                None
            } else {
                Some(stderr.to_string())
            },
        }
    }

    /// Maps this error onto the outcome taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Timeout { .. } | Self::Cancelled => ErrorKind::Timeout,
            Self::Unavailable { .. } | Self::QuotaExhausted { .. } => ErrorKind::Unavailable,
            Self::Io(e) if io_rejects_input(e) => ErrorKind::InvalidInput,
            Self::Io(_) => ErrorKind::Unavailable,
            Self::InvalidInput { .. } => ErrorKind::InvalidInput,
            Self::RateLimited { .. } => ErrorKind::RateLimited,
            Self::Exhausted => ErrorKind::Exhausted,
        }
    }

    /// Whether this error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout { .. } | Self::RateLimited { .. } => true,
            Self::Io(e) => io_is_transient(e),
            Self::Unavailable { transient, .. } => *transient,
            Self::InvalidInput { .. }
            | Self::QuotaExhausted { .. }
            | Self::Cancelled
            | Self::Exhausted => false,
        }
    }

    /// Classifies an HTTP error status returned by a remote service.
    pub fn from_http_status(status: u16, message: String) -> Self {
        match status {
            400 | 404 | 413 | 415 | 422 => Self::invalid_input(message),
            401 | 403 => Self::unavailable(message),
            408 | 504 => Self::Timeout {
                after: Duration::ZERO,
            },
            429 => {
                let lower = message.to_lowercase();
                if lower.contains("quota") && !lower.contains("rate") {
                    Self::QuotaExhausted { reason: message }
                } else {
                    Self::RateLimited {
                        reason: message,
                        retry_after: None,
                    }
                }
            }
            500..=599 => Self::transient(message),
            _ => Self::unavailable(format!("HTTP {}: {}", status, message)),
        }
    }

    /// Classifies a transport-level `reqwest` failure.
    pub fn from_reqwest(err: reqwest::Error, budget: Duration) -> Self {
        if err.is_timeout() {
            Self::Timeout { after: budget }
        } else if err.is_connect() || err.is_request() {
            Self::transient(err.to_string())
        } else if err.is_decode() || err.is_body() {
            Self::transient(format!("Malformed response: {}", err))
        } else {
            Self::unavailable(err.to_string())
        }
    }

    /// Classifies a non-success HTTP response, reading its error body.
    ///
    /// OpenAI, Anthropic and Gemini all report `{"error": {"message": ..}}`.
    pub(crate) async fn from_response(response: reqwest::Response) -> Self {
        let status = response.status().as_u16();
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs);

        let body = response.text().await.unwrap_or_default();
        let message = parse_error_message(&body).unwrap_or(body);

        match Self::from_http_status(status, message) {
            Self::RateLimited { reason, .. } => Self::RateLimited {
                reason,
                retry_after,
            },
            other => other,
        }
    }
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: String,
}

fn parse_error_message(body: &str) -> Option<String> {
    serde_json::from_str::<ApiErrorBody>(body)
        .ok()
        .map(|e| e.error.message)
}

/// Missing, unreadable or corrupt input; retrying will not help.
fn io_rejects_input(err: &std::io::Error) -> bool {
    use std::io::ErrorKind as Io;
    matches!(
        err.kind(),
        Io::NotFound | Io::PermissionDenied | Io::InvalidInput | Io::InvalidData
    )
}

fn io_is_transient(err: &std::io::Error) -> bool {
    use std::io::ErrorKind as Io;
    matches!(
        err.kind(),
        Io::Interrupted
            | Io::TimedOut
            | Io::WouldBlock
            | Io::ConnectionReset
            | Io::ConnectionAborted
            | Io::BrokenPipe
            | Io::UnexpectedEof
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        assert_eq!(
            MediaError::Timeout {
                after: Duration::from_secs(1)
            }
            .kind(),
            ErrorKind::Timeout
        );
        assert_eq!(MediaError::Cancelled.kind(), ErrorKind::Timeout);
        assert_eq!(
            MediaError::QuotaExhausted {
                reason: "monthly quota".into()
            }
            .kind(),
            ErrorKind::Unavailable
        );
        assert_eq!(MediaError::invalid_input("bad").kind(), ErrorKind::InvalidInput);
        assert_eq!(MediaError::Exhausted.kind(), ErrorKind::Exhausted);
    }

    #[test]
    fn test_retryable() {
        assert!(MediaError::transient("connection reset").is_retryable());
        assert!(!MediaError::unavailable("binary missing").is_retryable());
        assert!(!MediaError::invalid_input("corrupt stream").is_retryable());
        assert!(MediaError::RateLimited {
            reason: "slow down".into(),
            retry_after: None
        }
        .is_retryable());
        assert!(!MediaError::QuotaExhausted {
            reason: "quota".into()
        }
        .is_retryable());
    }

    #[test]
    fn test_io_errors_classified_by_kind() {
        use std::io;
        let missing = MediaError::Io(io::Error::new(io::ErrorKind::NotFound, "audio.wav"));
        assert!(!missing.is_retryable());
        assert_eq!(missing.kind(), ErrorKind::InvalidInput);

        let denied = MediaError::Io(io::Error::new(io::ErrorKind::PermissionDenied, "clip.mp4"));
        assert!(!denied.is_retryable());

        let reset = MediaError::Io(io::Error::new(io::ErrorKind::ConnectionReset, "peer"));
        assert!(reset.is_retryable());
        assert_eq!(reset.kind(), ErrorKind::Unavailable);
    }

    #[test]
    fn test_http_status_classification() {
        assert_eq!(
            MediaError::from_http_status(429, "Too many requests".into()).kind(),
            ErrorKind::RateLimited
        );
        let quota = MediaError::from_http_status(429, "You exceeded your current quota".into());
        assert!(matches!(quota, MediaError::QuotaExhausted { .. }));
        assert!(!quota.is_retryable());
        assert_eq!(
            MediaError::from_http_status(400, "bad image".into()).kind(),
            ErrorKind::InvalidInput
        );
        assert!(MediaError::from_http_status(503, "overloaded".into()).is_retryable());
        assert!(!MediaError::from_http_status(401, "bad key".into()).is_retryable());
    }

    #[test]
    fn test_invalid_input_with_empty_stderr() {
        let err = MediaError::invalid_input_with_stderr("ffmpeg failed", "  \n".to_string());
        assert!(matches!(err, MediaError::InvalidInput { stderr: None, .. }));
    }

    #[test]
    fn test_parse_error_message() {
        let body = r#"{"error": {"type": "invalid_request_error", "message": "image too large"}}"#;
        assert_eq!(parse_error_message(body).as_deref(), Some("image too large"));
        assert_eq!(parse_error_message("<html>502</html>"), None);
    }

    #[test]
    fn test_error_kind_serialization() {
        let json = serde_json::to_string(&ErrorKind::InvalidInput).unwrap();
        assert_eq!(json, "\"invalid_input\"");
    }
}
