//! Retry with exponential backoff.

use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

use crate::config::RetryConfig;

/// Outcome of an operation that could not be completed under a [`RetryPolicy`].
#[derive(Debug, Error)]
pub enum RetryError<E> {
    /// Every attempt failed with a retryable error.
    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: E },

    /// A non-retryable error; returned on the attempt it occurred.
    #[error("{0}")]
    Fatal(E),
}

/// Bounded retry with a geometrically growing delay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Delay after the first failed attempt.
    pub base_delay: Duration,
    /// Factor applied to the delay after each failed attempt.
    pub multiplier: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(1),
            multiplier: 2,
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: Duration::from_millis(config.base_delay_ms),
            multiplier: config.multiplier.max(1),
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after the given failed attempt (1-indexed).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = self
            .multiplier
            .checked_pow(attempt.saturating_sub(1))
            .unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }

    /// Run `op` until it succeeds, fails with an error `retryable` rejects,
    /// or `max_attempts` is used up.
    ///
    /// No delay follows the final attempt.
    pub async fn run<T, E, F, Fut, P>(&self, mut op: F, retryable: P) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: Fn(&E) -> bool,
        E: std::fmt::Display,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if !retryable(&e) => return Err(RetryError::Fatal(e)),
                Err(e) if attempt >= self.max_attempts => {
                    return Err(RetryError::Exhausted {
                        attempts: attempt,
                        last: e,
                    })
                }
                Err(e) => {
                    let delay = self.delay_after(attempt);
                    warn!(
                        "{} (attempt {}/{}), retrying in {:?}",
                        e, attempt, self.max_attempts, delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use tokio::time::Instant;

    #[derive(Debug, PartialEq)]
    enum TestError {
        Busy,
        Broken,
    }

    impl std::fmt::Display for TestError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{:?}", self)
        }
    }

    fn is_busy(e: &TestError) -> bool {
        *e == TestError::Busy
    }

    #[test]
    fn test_delays_double() {
        let policy = RetryPolicy::default();
        let delays: Vec<u64> = (1..=5).map(|a| policy.delay_after(a).as_secs()).collect();
        assert_eq!(delays, vec![1, 2, 4, 8, 16]);
    }

    #[test]
    fn test_from_config_clamps_zero_attempts() {
        let config = RetryConfig {
            max_attempts: 0,
            base_delay_ms: 250,
            multiplier: 3,
        };
        let policy = RetryPolicy::from(&config);
        assert_eq!(policy.max_attempts, 1);
        assert_eq!(policy.delay_after(2), Duration::from_millis(750));
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_after_two_retries() {
        let policy = RetryPolicy::default();
        let calls = Cell::new(0);
        let start = Instant::now();

        let result = policy
            .run(
                || {
                    calls.set(calls.get() + 1);
                    let n = calls.get();
                    async move {
                        if n <= 2 {
                            Err(TestError::Busy)
                        } else {
                            Ok(n)
                        }
                    }
                },
                is_busy,
            )
            .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(start.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausts_after_max_attempts() {
        let policy = RetryPolicy::default();
        let calls = Cell::new(0u32);

        let result: Result<(), _> = policy
            .run(
                || {
                    calls.set(calls.get() + 1);
                    async { Err(TestError::Busy) }
                },
                is_busy,
            )
            .await;

        assert_eq!(calls.get(), 5);
        match result {
            Err(RetryError::Exhausted { attempts, last }) => {
                assert_eq!(attempts, 5);
                assert_eq!(last, TestError::Busy);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_fatal_error_is_not_retried() {
        let policy = RetryPolicy::default();
        let calls = Cell::new(0u32);
        let start = Instant::now();

        let result: Result<(), _> = policy
            .run(
                || {
                    calls.set(calls.get() + 1);
                    async { Err(TestError::Broken) }
                },
                is_busy,
            )
            .await;

        assert_eq!(calls.get(), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert!(matches!(result, Err(RetryError::Fatal(TestError::Broken))));
    }
}
