//! A single bounded-exponential-backoff retry helper.
//!
//! Per spec.md's Design Notes: "Implement a single `retry(op, classify)`
//! helper parameterized by a classifier... This replaces ad-hoc loops
//! scattered through the source." Every network call, storage transaction,
//! and proving attempt in this workspace goes through this function rather
//! than hand-rolling its own loop.

use crate::error::Classification;
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Backoff parameters for [`retry`].
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Delay never grows past this.
    pub ceiling: Duration,
}

impl RetryPolicy {
    /// Build a policy from the shared [`crate::SequencerConfig`] fields.
    pub fn from_config(config: &crate::SequencerConfig) -> Self {
        Self {
            max_attempts: config.max_retry_attempts,
            initial_delay: config.retry_backoff_initial,
            ceiling: config.retry_backoff_ceiling,
        }
    }

    fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        let scaled = self.initial_delay.as_millis().saturating_mul(1u128 << exponent);
        let capped = scaled.min(self.ceiling.as_millis());
        let jittered = rand::thread_rng().gen_range(capped / 2..=capped.max(1));
        Duration::from_millis(jittered as u64)
    }
}

/// Retry outcome once attempts are exhausted or the error is permanent.
#[derive(Debug, thiserror::Error)]
pub enum RetryError<E> {
    /// The cancellation token fired before the operation completed.
    #[error("canceled")]
    Canceled,
    /// The operation failed with a non-retryable error, or ran out of
    /// attempts while still failing transiently.
    #[error(transparent)]
    Failed(E),
}

/// Run `op`, retrying with bounded exponential backoff while `classify`
/// reports [`Classification::Transient`], up to `policy.max_attempts`.
///
/// Cancellation is checked before each attempt and during each backoff
/// sleep; on cancellation the in-flight attempt's result (if any) is
/// discarded and [`RetryError::Canceled`] is returned, matching spec.md
/// §5's "leave no partial persistent state" requirement for cancellation.
pub async fn retry<T, E, F, Fut>(
    policy: RetryPolicy,
    cancellation: &CancellationToken,
    classify: impl Fn(&E) -> Classification,
    mut op: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        if cancellation.is_cancelled() {
            return Err(RetryError::Canceled);
        }

        let outcome = tokio::select! {
            biased;
            _ = cancellation.cancelled() => return Err(RetryError::Canceled),
            result = op() => result,
        };

        match outcome {
            Ok(value) => return Ok(value),
            Err(err) => {
                let transient = matches!(classify(&err), Classification::Transient);
                if !transient || attempt >= policy.max_attempts {
                    return Err(RetryError::Failed(err));
                }
                let delay = policy.delay_for_attempt(attempt);
                tokio::select! {
                    biased;
                    _ = cancellation.cancelled() => return Err(RetryError::Canceled),
                    _ = tokio::time::sleep(delay) => {}
                }
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
            initial_delay: Duration::from_millis(1),
            ceiling: Duration::from_millis(4),
        }
    }

    #[tokio::test]
    async fn succeeds_without_retry_when_op_succeeds_first_try() {
        let calls = AtomicU32::new(0);
        let token = CancellationToken::new();
        let result: Result<u32, RetryError<&str>> = retry(
            fast_policy(3),
            &token,
            |_: &&str| Classification::Transient,
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok(7) }
            },
        )
        .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_transient_errors_up_to_the_ceiling() {
        let calls = AtomicU32::new(0);
        let token = CancellationToken::new();
        let result: Result<u32, RetryError<&str>> = retry(
            fast_policy(3),
            &token,
            |_: &&str| Classification::Transient,
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err("transient") }
            },
        )
        .await;
        assert!(matches!(result, Err(RetryError::Failed("transient"))));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn permanent_errors_never_retry() {
        let calls = AtomicU32::new(0);
        let token = CancellationToken::new();
        let result: Result<u32, RetryError<&str>> = retry(
            fast_policy(5),
            &token,
            |_: &&str| Classification::Permanent,
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err("permanent") }
            },
        )
        .await;
        assert!(matches!(result, Err(RetryError::Failed("permanent"))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cancellation_short_circuits_retries() {
        let token = CancellationToken::new();
        token.cancel();
        let result: Result<u32, RetryError<&str>> = retry(
            fast_policy(5),
            &token,
            |_: &&str| Classification::Transient,
            || async { Err("transient") },
        )
        .await;
        assert!(matches!(result, Err(RetryError::Canceled)));
    }
}
