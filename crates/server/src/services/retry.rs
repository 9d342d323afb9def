//! Bounded retry with exponential backoff.
//!
//! The policy knows nothing about orders: it re-runs an operation from scratch
//! while a caller-supplied classifier says the failure is transient.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::{error, warn};

/// Total attempts, including the first.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Backoff base; the delay after attempt `n` is `base × 2^n`.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(100);

/// Retry schedule for whole-operation re-runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, DEFAULT_BASE_DELAY)
    }
}

impl RetryPolicy {
    /// Create a policy. A `max_attempts` of zero is treated as one.
    #[must_use]
    pub const fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: if max_attempts == 0 { 1 } else { max_attempts },
            base_delay,
        }
    }

    /// Total attempts, including the first.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay to wait after the 1-based `attempt` failed.
    #[must_use]
    pub fn delay_after(&self, attempt: u32) -> Duration {
        2u32.checked_pow(attempt)
            .and_then(|factor| self.base_delay.checked_mul(factor))
            .unwrap_or(Duration::MAX)
    }

    /// Run `operation` until it succeeds, fails permanently, or the attempts
    /// run out.
    ///
    /// `operation` receives the 1-based attempt number. Only errors for which
    /// `is_transient` returns `true` are retried; everything else is returned
    /// unchanged on first sight. After the last attempt the last error is
    /// returned.
    ///
    /// # Errors
    ///
    /// Returns the operation's error as described above.
    pub async fn run<T, E, F, Fut>(
        &self,
        mut operation: F,
        is_transient: impl Fn(&E) -> bool,
    ) -> Result<T, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let mut attempt = 1;
        loop {
            match operation(attempt).await {
                Ok(value) => return Ok(value),
                Err(err) if !is_transient(&err) => return Err(err),
                Err(err) if attempt >= self.max_attempts => {
                    error!(attempt, error = %err, "Giving up after transient failures");
                    return Err(err);
                }
                Err(err) => {
                    let delay = self.delay_after(attempt);
                    warn!(
                        attempt,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %err,
                        "Transient failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use tokio::time::Instant;

    use super::*;

    #[derive(Debug, PartialEq, Eq)]
    enum TestError {
        Transient(u32),
        Permanent,
    }

    impl Display for TestError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{self:?}")
        }
    }

    fn is_transient(err: &TestError) -> bool {
        matches!(err, TestError::Transient(_))
    }

    #[test]
    fn test_delay_doubles_from_twice_the_base() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_after(1), Duration::from_millis(200));
        assert_eq!(policy.delay_after(2), Duration::from_millis(400));
        assert_eq!(policy.delay_after(3), Duration::from_millis(800));
    }

    #[test]
    fn test_delay_saturates() {
        let policy = RetryPolicy::new(3, Duration::from_secs(u64::MAX / 2));
        assert_eq!(policy.delay_after(40), Duration::MAX);
    }

    #[test]
    fn test_zero_attempts_means_one() {
        assert_eq!(RetryPolicy::new(0, DEFAULT_BASE_DELAY).max_attempts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_after_one_retry() {
        let calls = AtomicU32::new(0);
        let started = Instant::now();

        let result = RetryPolicy::default()
            .run(
                |attempt| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async move {
                        if attempt == 1 {
                            Err(TestError::Transient(attempt))
                        } else {
                            Ok(attempt)
                        }
                    }
                },
                is_transient,
            )
            .await;

        assert_eq!(result, Ok(2));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(started.elapsed() >= Duration::from_millis(200));
    }

    #[tokio::test(start_paused = true)]
    async fn test_persistent_transient_failure_surfaces_last_error() {
        let calls = AtomicU32::new(0);
        let started = Instant::now();

        let result: Result<(), _> = RetryPolicy::default()
            .run(
                |attempt| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async move { Err(TestError::Transient(attempt)) }
                },
                is_transient,
            )
            .await;

        assert_eq!(result, Err(TestError::Transient(3)));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // 200ms after the first attempt plus 400ms after the second.
        assert!(started.elapsed() >= Duration::from_millis(600));
        assert!(started.elapsed() < Duration::from_millis(1400));
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_error_is_not_retried() {
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = RetryPolicy::default()
            .run(
                |_| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Err(TestError::Permanent) }
                },
                is_transient,
            )
            .await;

        assert_eq!(result, Err(TestError::Permanent));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_error_after_transient_stops_immediately() {
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = RetryPolicy::new(5, DEFAULT_BASE_DELAY)
            .run(
                |attempt| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async move {
                        if attempt == 1 {
                            Err(TestError::Transient(attempt))
                        } else {
                            Err(TestError::Permanent)
                        }
                    }
                },
                is_transient,
            )
            .await;

        assert_eq!(result, Err(TestError::Permanent));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
