//! Fixed-delay retry for transient fetch failures

use crate::config::RetryConfig;
use crate::harvest::FetchError;
use std::future::Future;
use std::time::Duration;

/// How many times, and how far apart, a transient failure is retried
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Pause between consecutive attempts
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            delay: Duration::from_millis(config.delay_ms),
        }
    }

    /// Whether a failure on attempt number `attempt` (1-based) earns another try
    pub fn should_retry(&self, error: &FetchError, attempt: u32) -> bool {
        error.is_transient() && attempt < self.max_attempts
    }

    /// Drives `operation` until it succeeds, fails permanently, or runs out of attempts
    ///
    /// `target` names the operation in log lines.
    pub async fn run<T, F, Fut>(&self, target: &str, mut operation: F) -> Result<T, FetchError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        let mut attempt = 1;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if self.should_retry(&e, attempt) => {
                    tracing::warn!(
                        "Attempt {}/{} for {} failed: {}; retrying in {:?}",
                        attempt,
                        self.max_attempts,
                        target,
                        e,
                        self.delay
                    );
                    tokio::time::sleep(self.delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
