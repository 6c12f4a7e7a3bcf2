use std::{future::Future, time::Duration};

use common::{env_config::DbConfig, error::Res};

const BACKOFF_EXPONENT: f64 = 1.5;

/// Retry settings for transient database failures.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &DbConfig) -> Self {
        RetryPolicy {
            max_retries: config.retry_max,
            backoff: config.retry_backoff,
        }
    }

    /// Delay before retry number `attempt` (zero based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.backoff
            .mul_f64(BACKOFF_EXPONENT.powi(attempt as i32))
    }
}

/// Runs `op` until it succeeds, fails with a non-transient error, or the
/// retry budget is spent.
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, mut op: F) -> Res<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Res<T>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Err(err) if err.is_transient() && attempt < policy.max_retries => {
                let delay = policy.delay_for(attempt);
                attempt += 1;
                log::warn!(
                    "Transient database error, retry {}/{} in {:?}: {}",
                    attempt,
                    policy.max_retries,
                    delay,
                    err
                );
                tokio::time::sleep(delay).await;
            }
            result => return result,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use common::error::AppError;

    use super::*;

    fn instant() -> RetryPolicy {
        RetryPolicy {
            max_retries: 3,
            backoff: Duration::ZERO,
        }
    }

    #[tokio::test]
    async fn transient_errors_are_retried_until_success() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result = with_retry(&instant(), move || async move {
            if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(AppError::Database(sqlx::Error::PoolTimedOut))
            } else {
                Ok(7)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn retries_stop_after_budget() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: Res<()> = with_retry(&instant(), move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(AppError::Database(sqlx::Error::PoolTimedOut))
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn permanent_errors_fail_fast() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: Res<()> = with_retry(&instant(), move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(AppError::NotFound("missing".into()))
        })
        .await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn backoff_grows_by_half() {
        let policy = RetryPolicy {
            max_retries: 3,
            backoff: Duration::from_millis(1000),
        };
        assert_eq!(policy.delay_for(0), Duration::from_millis(1000));
        assert_eq!(policy.delay_for(1), Duration::from_millis(1500));
        assert_eq!(policy.delay_for(2), Duration::from_millis(2250));
    }
}
