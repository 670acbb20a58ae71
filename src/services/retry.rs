// src/services/retry.rs
use crate::errors::StyleLensError;
use async_trait::async_trait;
use log::{debug, warn};
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Suspends the current task between attempts. Swapped out in tests to observe delays.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

pub struct RetryPolicy<E> {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
    pub is_retryable: fn(&E) -> bool,
}

impl<E> Clone for RetryPolicy<E> {
    fn clone(&self) -> Self {
        Self {
            max_attempts: self.max_attempts,
            initial_delay: self.initial_delay,
            max_delay: self.max_delay,
            multiplier: self.multiplier,
            is_retryable: self.is_retryable,
        }
    }
}

impl<E> RetryPolicy<E> {
    /// Pause after the given failed attempt (1-based):
    /// `min(initial_delay * multiplier^(attempt-1), max_delay)`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let scaled = self.initial_delay.as_secs_f64() * self.multiplier.powi(exponent);
        let capped = scaled.min(self.max_delay.as_secs_f64()).max(0.0);
        Duration::from_secs_f64(capped)
    }
}

impl Default for RetryPolicy<StyleLensError> {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
            multiplier: 2.0,
            is_retryable: StyleLensError::is_retryable,
        }
    }
}

pub struct RetryExecutor {
    sleeper: Arc<dyn Sleeper>,
}

impl Default for RetryExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl RetryExecutor {
    pub fn new() -> Self {
        Self::with_sleeper(Arc::new(TokioSleeper))
    }

    pub fn with_sleeper(sleeper: Arc<dyn Sleeper>) -> Self {
        Self { sleeper }
    }

    /// Runs `operation` until it succeeds, fails with a terminal error, or the policy's
    /// attempts run out. The last error is returned as is.
    pub async fn execute<T, E, F, Fut>(&self, policy: &RetryPolicy<E>, mut operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let max_attempts = policy.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            let err = match operation().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            if !(policy.is_retryable)(&err) {
                debug!("Attempt {} failed with terminal error: {}", attempt, err);
                return Err(err);
            }

            if attempt >= max_attempts {
                warn!("Giving up after {} attempts: {}", attempt, err);
                return Err(err);
            }

            let delay = policy.delay_for(attempt);
            warn!(
                "Attempt {}/{} failed: {}; retrying in {:?}",
                attempt, max_attempts, err, delay
            );
            self.sleeper.sleep(delay).await;
            attempt += 1;
        }
    }
}
