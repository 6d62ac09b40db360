//! Retry helper shared by the stage strategy chains.

use std::future::Future;
use std::time::Duration;
use tracing::debug;

use crate::error::MediaError;

/// How often and how patiently a single capability call is retried.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Extra attempts after the first one.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub initial_backoff: Duration,
    /// Multiplier applied to the delay after each retry.
    pub backoff_multiplier: f64,
    /// Whether `Timeout` counts as transient for this call.
    pub retry_timeouts: bool,
    /// Longest wait between attempts. A server asking for more is not retried.
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 1,
            initial_backoff: Duration::from_millis(500),
            backoff_multiplier: 2.0,
            retry_timeouts: true,
            max_backoff: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }

    /// Creates a policy with the given retry count and fixed initial backoff.
    pub fn new(max_retries: u32, initial_backoff: Duration) -> Self {
        Self {
            max_retries,
            initial_backoff,
            ..Default::default()
        }
    }

    /// Sets whether timeouts are retried.
    pub fn with_retry_timeouts(mut self, retry: bool) -> Self {
        self.retry_timeouts = retry;
        self
    }

    /// Sets the longest wait between attempts.
    pub fn with_max_backoff(mut self, max_backoff: Duration) -> Self {
        self.max_backoff = max_backoff;
        self
    }

    /// Whether `err` should be retried under this policy.
    pub fn should_retry(&self, err: &MediaError) -> bool {
        match err {
            MediaError::Timeout { .. } => self.retry_timeouts,
            other => other.is_retryable(),
        }
    }

    /// Delay before retry number `retry` (1-based), or `None` when the
    /// server asked to wait longer than `max_backoff`.
    pub fn backoff_for(&self, retry: u32, err: &MediaError) -> Option<Duration> {
        if let MediaError::RateLimited {
            retry_after: Some(after),
            ..
        } = err
        {
            return (*after <= self.max_backoff).then_some(*after);
        }
        let exponent = i32::try_from(retry.saturating_sub(1)).unwrap_or(i32::MAX);
        let factor = self.backoff_multiplier.max(1.0).powi(exponent);
        let delay = Duration::try_from_secs_f64(self.initial_backoff.as_secs_f64() * factor)
            .unwrap_or(self.max_backoff);
        Some(delay.min(self.max_backoff))
    }

    /// Runs `op`, retrying transient failures.
    ///
    /// Returns the final result together with the number of attempts made.
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> (Result<T, MediaError>, u32)
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, MediaError>>,
    {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match op().await {
                Ok(value) => return (Ok(value), attempt),
                Err(err) if attempt <= self.max_retries && self.should_retry(&err) => {
                    let Some(delay) = self.backoff_for(attempt, &err) else {
                        debug!(
                            "{} failed ({}), requested wait exceeds {:?}, giving up",
                            label, err, self.max_backoff
                        );
                        return (Err(err), attempt);
                    };
                    debug!(
                        "{} failed ({}), retrying in {:?} (attempt {}/{})",
                        label,
                        err,
                        delay,
                        attempt + 1,
                        self.max_retries + 1
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return (Err(err), attempt),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_retries_transient_once() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(1, Duration::from_millis(1));
        let (result, attempts) = policy
            .run("op", || async {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                if n == 0 {
                    Err(MediaError::transient("connection reset"))
                } else {
                    Ok(n)
                }
            })
            .await;
        assert_eq!(result.unwrap(), 1);
        assert_eq!(attempts, 2);
    }

    #[tokio::test]
    async fn test_non_transient_falls_through_immediately() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(3, Duration::from_millis(1));
        let (result, attempts) = policy
            .run("op", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(MediaError::invalid_input("corrupt audio"))
            })
            .await;
        assert!(result.is_err());
        assert_eq!(attempts, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let policy = RetryPolicy::new(1, Duration::from_millis(1));
        let (result, attempts) = policy
            .run("op", || async { Err::<(), _>(MediaError::transient("down")) })
            .await;
        assert!(result.is_err());
        assert_eq!(attempts, 2);
    }

    #[tokio::test]
    async fn test_timeouts_not_retried_when_disabled() {
        let policy = RetryPolicy::new(1, Duration::from_millis(1)).with_retry_timeouts(false);
        let (_, attempts) = policy
            .run("op", || async {
                Err::<(), _>(MediaError::Timeout {
                    after: Duration::from_secs(1),
                })
            })
            .await;
        assert_eq!(attempts, 1);
    }

    #[test]
    fn test_backoff_growth() {
        let policy = RetryPolicy::new(3, Duration::from_millis(100));
        let err = MediaError::transient("x");
        assert_eq!(policy.backoff_for(1, &err), Some(Duration::from_millis(100)));
        assert_eq!(policy.backoff_for(2, &err), Some(Duration::from_millis(200)));
        let limited = MediaError::RateLimited {
            reason: "slow".into(),
            retry_after: Some(Duration::from_secs(3)),
        };
        assert_eq!(policy.backoff_for(1, &limited), Some(Duration::from_secs(3)));
    }

    #[test]
    fn test_backoff_is_capped_and_never_overflows() {
        let policy = RetryPolicy {
            backoff_multiplier: 1e300,
            ..RetryPolicy::new(u32::MAX, Duration::from_secs(1))
        }
        .with_max_backoff(Duration::from_secs(2));
        let err = MediaError::transient("x");
        assert_eq!(policy.backoff_for(u32::MAX, &err), Some(Duration::from_secs(2)));
        assert_eq!(policy.backoff_for(3, &err), Some(Duration::from_secs(2)));
    }

    #[tokio::test]
    async fn test_long_retry_after_falls_through() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(1, Duration::from_millis(1))
            .with_max_backoff(Duration::from_secs(1));
        let start = std::time::Instant::now();
        let (result, attempts) = policy
            .run("op", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(MediaError::RateLimited {
                    reason: "slow down".into(),
                    retry_after: Some(Duration::from_secs(120)),
                })
            })
            .await;
        assert!(matches!(result, Err(MediaError::RateLimited { .. })));
        assert_eq!(attempts, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(start.elapsed() < Duration::from_secs(1));
    }
}
