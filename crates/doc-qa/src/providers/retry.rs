//! Retry with exponential backoff and jitter for gateway calls.
//!
//! Only transient failures (rate limits, timeouts, transport and 5xx errors)
//! are retried; rejected requests fail immediately.

use rand::Rng;
use std::future::Future;
use std::time::Duration;

use crate::config::RetryConfig;
use crate::error::GatewayError;

/// Retry policy shared by every outbound model call
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,
    /// Base delay for exponential backoff
    pub base_delay: Duration,
    /// Upper bound on a single backoff (before jitter)
    pub max_delay: Duration,
    /// Jitter factor to add randomness (0.0 - 1.0)
    pub jitter_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
            jitter_factor: config.jitter_factor.clamp(0.0, 1.0),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            jitter_factor: 0.0,
        }
    }

    /// Delay before retry number `attempt` (0-indexed): `min(base * 2^attempt, max) + jitter`
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        let base_ms = self.base_delay.as_millis() as u64;
        let max_ms = self.max_delay.as_millis() as u64;
        let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
        let capped = base_ms.saturating_mul(factor).min(max_ms);

        let jitter_range = capped as f64 * self.jitter_factor;
        let jitter_ms = if jitter_range >= 1.0 {
            rand::thread_rng().gen_range(0.0..jitter_range).floor() as u64
        } else {
            0
        };

        Duration::from_millis(capped.saturating_add(jitter_ms))
    }

    /// Whether `error` is worth another attempt
    pub fn should_retry(&self, error: &GatewayError) -> bool {
        error.is_transient()
    }

    /// Run `operation` until it succeeds, fails permanently, or attempts run out
    pub async fn run<F, Fut, T>(&self, label: &str, mut operation: F) -> Result<T, GatewayError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, GatewayError>>,
    {
        let mut attempt = 0u32;
        loop {
            match operation(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) if self.should_retry(&e) && attempt + 1 < self.max_attempts => {
                    let delay = self.calculate_delay(attempt);
                    tracing::warn!(
                        "{} failed (attempt {}/{}): {}, retrying in {:?}",
                        label,
                        attempt + 1,
                        self.max_attempts,
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
            jitter_factor: 0.0,
        }
    }

    #[test]
    fn test_exponential_delay_is_capped() {
        let policy = RetryPolicy {
            max_attempts: 10,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(1000),
            jitter_factor: 0.0,
        };
        assert_eq!(policy.calculate_delay(0), Duration::from_millis(100));
        assert_eq!(policy.calculate_delay(2), Duration::from_millis(400));
        assert_eq!(policy.calculate_delay(5), Duration::from_millis(1000));
        assert_eq!(policy.calculate_delay(200), Duration::from_millis(1000));
    }

    #[test]
    fn test_jitter_stays_within_factor() {
        let policy = RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(1000),
            jitter_factor: 0.5,
        };
        for _ in 0..50 {
            let delay = policy.calculate_delay(0);
            assert!(delay >= Duration::from_millis(1000));
            assert!(delay < Duration::from_millis(1500));
        }
    }

    #[tokio::test]
    async fn test_transient_errors_are_retried() {
        let calls = AtomicU32::new(0);
        let result = fast_policy(3)
            .run("test", |_| {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(GatewayError::RateLimited("429".into()))
                    } else {
                        Ok(n)
                    }
                }
            })
            .await;

        assert_eq!(result, Ok(2));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_rejected_requests_fail_fast() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = fast_policy(5)
            .run("test", |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(GatewayError::from_status(401, "bad key")) }
            })
            .await;

        assert!(matches!(result, Err(GatewayError::Rejected { status: 401, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_attempts_are_bounded() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = fast_policy(4)
            .run("test", |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(GatewayError::Timeout("slow".into())) }
            })
            .await;

        assert!(matches!(result, Err(GatewayError::Timeout(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }
}
