// src/error_recovery.rs
//! Retry with backoff for single remote calls.
//!
//! Two schedules share one base delay: an exponential one for explicit
//! rate-limit answers and a linear one for every other transient failure.

use crate::constants::{DEFAULT_MAX_ATTEMPTS, RETRY_BASE_DELAY, RETRY_MAX_DELAY};
use crate::error::AttemptError;
use std::time::Duration;

/// How often and how patiently a single remote call is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one. Always at least 1.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: RETRY_BASE_DELAY,
            max_delay: RETRY_MAX_DELAY,
        }
    }
}

impl RetryPolicy {
    /// A policy with the default delays and the given attempt budget.
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Self::default()
        }
    }

    /// A policy that retries without sleeping. Used by tests and dry runs.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Wait after the `attempt`-th call (1-based) was rate limited:
    /// `min(base * 2^attempt, max)`.
    pub fn rate_limit_delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Wait after the `attempt`-th call (1-based) failed for any other reason:
    /// `base * attempt`.
    pub fn transient_delay(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt)
    }

    /// Picks the schedule that matches the failure.
    pub fn delay_after(&self, attempt: u32, error: &AttemptError) -> Duration {
        if error.is_rate_limited() {
            self.rate_limit_delay(attempt)
        } else {
            self.transient_delay(attempt)
        }
    }
}

/// The last error seen once the attempt budget ran out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetriesExhausted {
    pub attempts: u32,
    pub last_error: AttemptError,
}

/// Retries an async operation until it succeeds or the policy's attempt
/// budget is spent. There is no sleep after the final attempt.
pub async fn retry_with_backoff<F, T, Fut>(
    policy: &RetryPolicy,
    mut operation: F,
) -> Result<T, RetriesExhausted>
where
    F: FnMut(u32) -> Fut,
    Fut: std::future::Future<Output = Result<T, AttemptError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match operation(attempt).await {
            Ok(result) => {
                if attempt > 1 {
                    log::debug!("Attempt {} succeeded after retry", attempt);
                }
                return Ok(result);
            }
            Err(e) if attempt < max_attempts => {
                let delay = policy.delay_after(attempt, &e);
                if e.is_rate_limited() {
                    log::info!(
                        "⏳ Rate limited. Waiting {}ms before retry ({}/{})",
                        delay.as_millis(),
                        attempt,
                        max_attempts
                    );
                } else {
                    log::warn!(
                        "Attempt {} failed ({}), retrying after {:?}",
                        attempt,
                        e,
                        delay
                    );
                }
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                return Err(RetriesExhausted {
                    attempts: attempt,
                    last_error: e,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn rate_limit_delay_doubles_then_caps() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.rate_limit_delay(1), Duration::from_millis(2000));
        assert_eq!(policy.rate_limit_delay(2), Duration::from_millis(4000));
        assert_eq!(policy.rate_limit_delay(3), Duration::from_millis(8000));
        assert_eq!(policy.rate_limit_delay(4), Duration::from_millis(10_000));
        assert_eq!(policy.rate_limit_delay(40), Duration::from_millis(10_000));
    }

    #[test]
    fn transient_delay_is_linear() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.transient_delay(1), Duration::from_millis(1000));
        assert_eq!(policy.transient_delay(2), Duration::from_millis(2000));
    }

    #[test]
    fn zero_attempts_is_clamped() {
        assert_eq!(RetryPolicy::with_max_attempts(0).max_attempts, 1);
    }

    #[tokio::test]
    async fn stops_after_budget() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::immediate(3);
        let result: Result<(), _> = retry_with_backoff(&policy, |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(AttemptError::Status(500)) }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(
            result,
            Err(RetriesExhausted {
                attempts: 3,
                last_error: AttemptError::Status(500)
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn waits_on_the_rate_limit_schedule() {
        let policy = RetryPolicy::default();
        let start = tokio::time::Instant::now();
        let result = retry_with_backoff(&policy, |attempt| async move {
            if attempt < 3 {
                Err(AttemptError::RateLimited)
            } else {
                Ok(attempt)
            }
        })
        .await;

        assert_eq!(result, Ok(3));
        // 2s after the first 429, 4s after the second.
        assert_eq!(start.elapsed(), Duration::from_millis(6000));
    }
}
