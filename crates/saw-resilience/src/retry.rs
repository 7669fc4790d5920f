//! Bounded retry with exponential backoff.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

/// Errors that know whether another attempt could succeed.
pub trait Retryable {
    /// Transient failures (network, timeout, connection, 5xx) return true.
    fn is_retryable(&self) -> bool;
}

/// Attempt budget and backoff curve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// No retries at all.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Wait before the attempt following `attempt` (1-based):
    /// `min(initial * multiplier^(attempt - 1), max)`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        let secs = self.initial_delay.as_secs_f64() * self.backoff_multiplier.powi(exponent);
        let capped = secs.min(self.max_delay.as_secs_f64()).max(0.0);
        Duration::from_secs_f64(capped)
    }
}

/// Run `op` until it succeeds, the attempt budget is spent, or
/// `should_retry` declines.
///
/// `on_retry` fires with the error and the failed attempt number before
/// each backoff sleep. The last error is returned unchanged.
pub async fn retry<T, E, Op, Fut, P, R>(
    mut op: Op,
    policy: &RetryPolicy,
    mut should_retry: P,
    mut on_retry: R,
) -> Result<T, E>
where
    Op: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: FnMut(&E, u32) -> bool,
    R: FnMut(&E, u32),
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if attempt >= max_attempts || !should_retry(&err, attempt) {
                    return Err(err);
                }
                on_retry(&err, attempt);
                let delay = policy.delay_for(attempt);
                debug!(attempt, delay_ms = delay.as_millis() as u64, "backing off before retry");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

/// [`retry`] with the [`Retryable`] predicate and a warning per retry.
pub async fn retry_transient<T, E, Op, Fut>(op: Op, policy: &RetryPolicy) -> Result<T, E>
where
    E: Retryable + Display,
    Op: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    retry(
        op,
        policy,
        |err: &E, _| err.is_retryable(),
        |err: &E, attempt| warn!(attempt, error = %err, "transient failure, retrying"),
    )
    .await
}
