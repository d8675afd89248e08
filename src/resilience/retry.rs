//! Exponential backoff with jitter (spec §4.4.2), capped at `maxAttempts`.
//!
//! Grounded on the teacher's `EodhdProvider::throttled_get` backoff loop
//! (`2u64.pow(attempt)` wait between retries on transport errors and 5xx/429
//! responses), generalized into a policy usable by every provider instead
//! of one hand-written loop per call site. Retries happen *inside* one
//! breaker call: exhausting retries counts as a single breaker failure,
//! not N (spec §4.4.2).

use std::time::Duration;

use rand::Rng;

use crate::error::CoreError;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    fn backoff_for(&self, attempt: u32) -> Duration {
        let exp = self.base_delay.saturating_mul(2u32.saturating_pow(attempt));
        let capped = exp.min(self.max_delay);
        let jitter_ms = rand::rng().random_range(0..=capped.as_millis() as u64 / 4 + 1);
        capped + Duration::from_millis(jitter_ms)
    }

    /// Runs `f` up to `max_attempts` times. Only `CoreError::is_retryable`
    /// errors are retried; anything else returns immediately. The whole
    /// exhausted sequence is reported as one `Transient`/`QuotaExceeded`
    /// outcome for the caller's breaker accounting.
    pub async fn run<F, Fut, T>(&self, mut f: F) -> Result<T, CoreError>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, CoreError>>,
    {
        let mut attempt = 0;
        loop {
            match f().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && attempt + 1 < self.max_attempts => {
                    let wait = self.backoff_for(attempt);
                    tracing::warn!(attempt, ?wait, error = %err, "retrying after transient failure");
                    tokio::time::sleep(wait).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn retries_transient_until_success() {
        let policy = RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
        };
        let calls = AtomicU32::new(0);
        let result = policy
            .run(|| async {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err(crate::error::transient("test", "boom"))
                } else {
                    Ok(42)
                }
            })
            .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn does_not_retry_non_retryable_errors() {
        let policy = RetryPolicy::default();
        let calls = AtomicU32::new(0);
        let result: Result<(), CoreError> = policy
            .run(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(CoreError::InvalidInput("bad input".into()))
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn stops_at_max_attempts() {
        let policy = RetryPolicy {
            max_attempts: 2,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
        };
        let calls = AtomicU32::new(0);
        let result: Result<(), CoreError> = policy
            .run(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(crate::error::transient("test", "boom"))
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
