//! Retry-with-backoff executor for fallible async operations.
//!
//! Iterative loop with an explicit attempt counter: exponential backoff,
//! a hard delay ceiling, and an escape hatch for errors the caller knows
//! are unrecoverable. Cancellation is always terminal.

use std::future::Future;
use std::time::Duration;

use super::error::PipelineError;

/// Backoff parameters. Attempt `n` waits `min(base_delay * 2^(n-1), max_delay)`
/// before the next try.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: crate::config::MAX_RETRIES,
            base_delay: Duration::from_millis(crate::config::BASE_DELAY_MS),
            max_delay: Duration::from_millis(crate::config::MAX_DELAY_MS),
        }
    }
}

impl RetryPolicy {
    fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// Run `op` up to `policy.max_retries` times.
///
/// `should_retry` classifies errors: returning false stops immediately.
/// A cancellation error is returned as-is, never wrapped and never retried,
/// regardless of the predicate. Any other terminal error is wrapped in
/// [`PipelineError::RetryExhausted`] carrying the attempt count.
/// `on_retry(error, attempt)` fires before each backoff wait.
pub async fn run_with_retry<T, F, Fut, P, H>(
    policy: &RetryPolicy,
    mut op: F,
    should_retry: P,
    mut on_retry: H,
) -> Result<T, PipelineError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, PipelineError>>,
    P: Fn(&PipelineError) -> bool,
    H: FnMut(&PipelineError, u32),
{
    let max = policy.max_retries.max(1);

    for attempt in 1..=max {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_cancelled() => return Err(err),
            Err(err) => {
                if attempt == max || !should_retry(&err) {
                    return Err(PipelineError::RetryExhausted {
                        attempts: attempt,
                        source: Box::new(err),
                    });
                }
                on_retry(&err, attempt);
                tokio::time::sleep(policy.backoff(attempt)).await;
            }
        }
    }

    unreachable!("retry loop returns on the final attempt")
}
