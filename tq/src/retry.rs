//! Bounded retry with a flat delay
//!
//! A queue-independent retry primitive for callers that only need to retry a
//! single operation, not schedule many.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Settings for [`bounded_retry`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts, including the first
    #[serde(rename = "max-attempts")]
    pub max_attempts: u32,

    /// Fixed delay between attempts in milliseconds
    #[serde(rename = "delay-ms")]
    pub delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay_ms: 5000,
        }
    }
}

impl RetryConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    /// Run `operation` with these settings
    pub async fn run<T, E, F, Fut>(&self, operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        bounded_retry(operation, self.max_attempts, self.delay()).await
    }
}

/// Attempt `operation` up to `max_attempts` times, sleeping `delay` between
/// failed attempts. Returns the first success or the last error.
///
/// `max_attempts == 0` is treated as a single attempt.
pub async fn bounded_retry<T, E, F, Fut>(mut operation: F, max_attempts: u32, delay: Duration) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let max_attempts = max_attempts.max(1);
    debug!(max_attempts, ?delay, "bounded_retry: called");

    let mut attempt = 1;
    loop {
        match operation().await {
            Ok(value) => {
                debug!(attempt, "bounded_retry: succeeded");
                return Ok(value);
            }
            Err(error) if attempt < max_attempts => {
                warn!(attempt, max_attempts, ?delay, %error, "Operation failed, retrying");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(error) => {
                debug!(attempt, %error, "bounded_retry: attempts exhausted");
                return Err(error);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Instant;

    #[tokio::test]
    async fn test_succeeds_after_two_failures() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);

        let start = Instant::now();
        let result = bounded_retry(
            || {
                let attempt = counter.fetch_add(1, Ordering::SeqCst) + 1;
                async move { if attempt < 3 { Err(format!("attempt {}", attempt)) } else { Ok("done") } }
            },
            3,
            Duration::from_millis(100),
        )
        .await;

        assert_eq!(result, Ok("done"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(start.elapsed() >= Duration::from_millis(200));
    }

    #[tokio::test]
    async fn test_returns_last_error() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);

        let result: Result<(), String> = bounded_retry(
            || {
                let attempt = counter.fetch_add(1, Ordering::SeqCst) + 1;
                async move { Err(format!("attempt {}", attempt)) }
            },
            4,
            Duration::from_millis(1),
        )
        .await;

        assert_eq!(result, Err("attempt 4".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_no_delay_after_final_attempt() {
        let start = Instant::now();
        let result: Result<(), &str> = bounded_retry(|| async { Err("nope") }, 1, Duration::from_secs(10)).await;

        assert_eq!(result, Err("nope"));
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_zero_attempts_runs_once() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);

        let result = bounded_retry(
            || {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Ok::<_, String>(5) }
            },
            0,
            Duration::ZERO,
        )
        .await;

        assert_eq!(result, Ok(5));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retry_config_run() {
        let config = RetryConfig {
            max_attempts: 2,
            delay_ms: 1,
        };
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);

        let result = config
            .run(|| {
                let attempt = counter.fetch_add(1, Ordering::SeqCst) + 1;
                async move { if attempt == 1 { Err("first") } else { Ok(attempt) } }
            })
            .await;

        assert_eq!(result, Ok(2));
        assert_eq!(config.delay(), Duration::from_millis(1));
    }

    #[test]
    fn test_default_retry_config() {
        let config = RetryConfig::default();
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.delay(), Duration::from_secs(5));
    }
}
