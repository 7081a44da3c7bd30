//! Bounded retry with exponential backoff for transient conflicts
//!
//! Serialization failures, deadlocks and NOWAIT lock misses leave no state
//! behind, so re-running the whole movement is safe; the idempotency layer
//! covers everything else. Non-retriable errors pass through untouched.

use std::future::Future;
use std::time::Duration;

use rand::Rng;

use crate::error::EngineError;

/// Backoff and attempt limits for transient-conflict retries
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_backoff_ms: u64,
    pub jitter_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_backoff_ms: 100,
            jitter_ms: 100,
        }
    }
}

impl RetryPolicy {
    /// Deterministic component of the delay before attempt `attempt + 1`:
    /// `base * 2^(attempt-1)`
    fn backoff_base(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.base_backoff_ms.saturating_mul(1 << (attempt - 1)))
    }

    fn backoff(&self, attempt: u32) -> Duration {
        let jitter = if self.jitter_ms > 0 {
            rand::thread_rng().gen_range(0..=self.jitter_ms)
        } else {
            0
        };
        self.backoff_base(attempt) + Duration::from_millis(jitter)
    }
}

/// Run `op` up to `max_attempts` times, backing off between attempts
///
/// `op` is invoked fresh per attempt and must not hold a connection across
/// the await on the backoff sleep (each attempt opens its own transaction).
pub async fn execute_with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    mut op: F,
) -> Result<T, EngineError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, EngineError>>,
{
    let mut attempt = 1u32;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retriable() && attempt < policy.max_attempts => {
                let delay = policy.backoff(attempt);
                tracing::warn!(
                    attempt,
                    max_attempts = policy.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "Transient conflict, backing off before retry"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::borrow::Cow;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug)]
    struct FakeDbError(&'static str);

    impl std::fmt::Display for FakeDbError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "sqlstate {}", self.0)
        }
    }

    impl std::error::Error for FakeDbError {}

    impl sqlx::error::DatabaseError for FakeDbError {
        fn message(&self) -> &str {
            "fake database error"
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            Some(Cow::Borrowed(self.0))
        }

        fn kind(&self) -> sqlx::error::ErrorKind {
            sqlx::error::ErrorKind::Other
        }

        fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
            self
        }
    }

    fn transient(sqlstate: &'static str) -> EngineError {
        EngineError::Storage(sqlx::Error::Database(Box::new(FakeDbError(sqlstate))))
    }

    #[test]
    fn test_backoff_doubles() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff_base(1), Duration::from_millis(100));
        assert_eq!(policy.backoff_base(2), Duration::from_millis(200));
        assert_eq!(policy.backoff_base(3), Duration::from_millis(400));
    }

    #[test]
    fn test_backoff_jitter_bounds() {
        let policy = RetryPolicy {
            max_attempts: 3,
            base_backoff_ms: 100,
            jitter_ms: 50,
        };
        for _ in 0..64 {
            let delay = policy.backoff(2);
            assert!(delay >= Duration::from_millis(200));
            assert!(delay <= Duration::from_millis(250));
        }
    }

    #[tokio::test]
    async fn test_retries_transient_then_succeeds() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy {
            max_attempts: 3,
            base_backoff_ms: 1,
            jitter_ms: 0,
        };
        let result = execute_with_retry(&policy, || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(transient("40001"))
                } else {
                    Ok("committed")
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), "committed");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhaustion_surfaces_last_error() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy {
            max_attempts: 3,
            base_backoff_ms: 1,
            jitter_ms: 0,
        };
        let result: Result<(), _> = execute_with_retry(&policy, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(transient("55P03")) }
        })
        .await;
        assert!(result.unwrap_err().is_retriable());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_non_retriable_fails_fast() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::default();

        let result: Result<(), _> = execute_with_retry(&policy, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(EngineError::Validation("bad input".into())) }
        })
        .await;
        assert!(matches!(result, Err(EngineError::Validation(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // Unique violations are races resolved by re-lookup, never retried here
        let result: Result<(), _> =
            execute_with_retry(&policy, || async { Err(transient("23505")) }).await;
        assert!(result.unwrap_err().is_unique_violation());
    }
}
