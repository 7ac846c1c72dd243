//! Retry logic with a fixed delay
//!
//! Concurrent builds of the same output race on file locks and eventually
//! succeed, so the default policy never gives up. Unattended runs can cap it
//! by attempts or by elapsed time.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::time::sleep;

/// Options for retry behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Delay between attempts
    pub delay: Duration,
    /// Maximum number of attempts (None = unbounded)
    pub max_attempts: Option<u32>,
    /// Maximum time spent retrying (None = unbounded)
    pub max_duration: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            delay: Duration::from_secs(1),
            max_attempts: None,
            max_duration: None,
        }
    }
}

impl RetryPolicy {
    pub fn bounded(max_attempts: u32, delay: Duration) -> Self {
        Self {
            delay,
            max_attempts: Some(max_attempts),
            max_duration: None,
        }
    }

    fn allows_another(&self, attempts: u32, started: Instant) -> bool {
        if self.max_attempts.is_some_and(|max| attempts >= max) {
            return false;
        }
        match self.max_duration {
            Some(max) => started.elapsed() + self.delay <= max,
            None => true,
        }
    }
}

/// Serialized form of [`RetryPolicy`] used in configuration files
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_duration_ms: Option<u64>,
}

fn default_delay_ms() -> u64 {
    1000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            delay_ms: default_delay_ms(),
            max_attempts: None,
            max_duration_ms: None,
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            delay: Duration::from_millis(config.delay_ms),
            max_attempts: config.max_attempts,
            max_duration: config.max_duration_ms.map(Duration::from_millis),
        }
    }
}

/// Outcome of an exhausted retry loop
#[derive(Debug)]
pub enum RetryError<E> {
    /// The operation failed with an error the predicate rejected
    Fatal(E),
    /// Every allowed attempt failed with a retryable error
    Exhausted { attempts: u32, last: E },
}

/// Retry manager for executing operations with a fixed delay
///
/// # Examples
///
/// ```no_run
/// use nuget_publisher::core::{RetryManager, RetryPolicy};
///
/// # async fn example() {
/// let manager = RetryManager::new(RetryPolicy::default());
///
/// let result = manager
///     .retry_when(|| async { Ok::<_, String>("done") }, |e: &String| e.contains("busy"))
///     .await;
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct RetryManager {
    policy: RetryPolicy,
}

impl RetryManager {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Execute the given async operation, retrying errors accepted by `is_retryable`
    pub async fn retry_when<F, Fut, T, E, P>(
        &self,
        mut operation: F,
        is_retryable: P,
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: Fn(&E) -> bool,
    {
        let started = Instant::now();
        let mut attempts = 0u32;

        loop {
            attempts += 1;
            match operation().await {
                Ok(result) => return Ok(result),
                Err(error) => {
                    if !is_retryable(&error) {
                        return Err(RetryError::Fatal(error));
                    }
                    if !self.policy.allows_another(attempts, started) {
                        return Err(RetryError::Exhausted {
                            attempts,
                            last: error,
                        });
                    }
                    tracing::warn!(
                        attempt = attempts,
                        delay_ms = self.policy.delay.as_millis() as u64,
                        "retryable failure, waiting before the next attempt"
                    );
                    sleep(self.policy.delay).await;
                }
            }
        }
    }
}
