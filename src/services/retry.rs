//! Bounded retry for postings that lose a write race.
//!
//! An attempt is always a whole transaction. Only errors for which
//! [`ServiceError::is_retryable`] holds are retried; everything else is
//! returned from the first attempt.

use metrics::counter;
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::config::AppConfig;
use crate::errors::ServiceError;

/// Configuration for retry behavior
#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    /// Attempts in total, the first one included
    pub max_attempts: u32,
    /// Delay before the second attempt
    pub initial_delay: Duration,
    /// Upper bound for any single delay
    pub max_delay: Duration,
    /// Factor to multiply delay by after each attempt
    pub backoff_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_millis(5),
            max_delay: Duration::from_millis(250),
            backoff_factor: 2.0,
        }
    }
}

impl RetryConfig {
    pub fn with_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Default::default()
        }
    }

    pub fn from_app_config(cfg: &AppConfig) -> Self {
        Self {
            max_attempts: cfg.posting_max_attempts.max(1),
            initial_delay: Duration::from_millis(cfg.posting_retry_delay_ms),
            ..Default::default()
        }
    }

    /// Delay before attempt `attempt + 1`, with up to 50% random jitter so
    /// competing writers do not collide again in lockstep.
    fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16) as i32;
        let base = (self.initial_delay.as_secs_f64() * self.backoff_factor.powi(exponent))
            .min(self.max_delay.as_secs_f64());
        let jitter = rand::thread_rng().gen_range(0.0..=0.5);
        Duration::from_secs_f64(base * (1.0 + jitter))
    }
}

/// Runs `attempt` until it succeeds, fails with a non-retryable error, or
/// `config.max_attempts` is used up. The last error is returned as is.
pub async fn with_retry<T, F, Fut>(
    config: &RetryConfig,
    operation: &'static str,
    mut attempt: F,
) -> Result<T, ServiceError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ServiceError>>,
{
    let mut attempts = 0;
    loop {
        attempts += 1;
        match attempt().await {
            Ok(value) => {
                if attempts > 1 {
                    debug!(operation, attempts, "Succeeded after retrying");
                }
                return Ok(value);
            }
            Err(err) if err.is_retryable() && attempts < config.max_attempts => {
                counter!("campus_ledger.posting.conflicts", 1);
                let delay = config.delay_after(attempts);
                warn!(operation, attempt = attempts, error = %err, ?delay, "Write conflict, retrying");
                sleep(delay).await;
            }
            Err(err) => {
                if err.is_retryable() {
                    counter!("campus_ledger.posting.exhausted", 1);
                    warn!(operation, attempts, error = %err, "Giving up after repeated conflicts");
                }
                return Err(err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn quick(max_attempts: u32) -> RetryConfig {
        RetryConfig {
            max_attempts,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
            backoff_factor: 2.0,
        }
    }

    fn conflict() -> ServiceError {
        ServiceError::ConcurrentModification {
            entity: "enrollment",
            id: 7,
        }
    }

    #[tokio::test]
    async fn conflicts_are_retried_until_success() {
        let calls = Arc::new(AtomicU32::new(0));
        let counted = calls.clone();

        let result = with_retry(&quick(5), "test", || {
            let counted = counted.clone();
            async move {
                if counted.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(conflict())
                } else {
                    Ok("posted")
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "posted");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn last_conflict_is_returned_once_attempts_run_out() {
        let calls = Arc::new(AtomicU32::new(0));
        let counted = calls.clone();

        let result: Result<(), _> = with_retry(&quick(4), "test", || {
            let counted = counted.clone();
            async move {
                counted.fetch_add(1, Ordering::SeqCst);
                Err(conflict())
            }
        })
        .await;

        assert_matches!(result, Err(ServiceError::ConcurrentModification { id: 7, .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn domain_errors_are_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let counted = calls.clone();

        let result: Result<(), _> = with_retry(&quick(5), "test", || {
            let counted = counted.clone();
            async move {
                counted.fetch_add(1, Ordering::SeqCst);
                Err(ServiceError::CapacityError("full".into()))
            }
        })
        .await;

        assert_matches!(result, Err(ServiceError::CapacityError(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn delays_grow_and_stay_bounded() {
        let config = RetryConfig {
            max_attempts: 10,
            initial_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(40),
            backoff_factor: 2.0,
        };
        let first = config.delay_after(1);
        assert!(first >= Duration::from_millis(10) && first <= Duration::from_millis(15));
        assert!(config.delay_after(9) <= Duration::from_millis(60));
        assert_eq!(RetryConfig::with_attempts(0).max_attempts, 1);
    }
}
