use crate::domain::errors::UpstreamError;
use std::future::Future;
use std::time::Duration;

/// Deadline and retry budget for one collaborator call.
#[derive(Debug, Clone, Copy)]
pub struct CallBudget {
    pub collaborator: &'static str,
    pub deadline: Duration,
    /// Retry deadline as a fraction of `deadline`.
    pub retry_factor: f64,
}

impl CallBudget {
    pub fn new(collaborator: &'static str, deadline: Duration, retry_factor: f64) -> Self {
        Self {
            collaborator,
            deadline,
            retry_factor,
        }
    }

    fn retry_deadline(&self) -> Duration {
        self.deadline.mul_f64(self.retry_factor.clamp(0.0, 1.0))
    }
}

/// Run `call` under the budget's deadline. A timeout is retried once with the
/// shortened retry deadline; other failures are returned as-is.
pub async fn call_with_retry<T, F, Fut>(budget: CallBudget, mut call: F) -> Result<T, UpstreamError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, UpstreamError>>,
{
    match tokio::time::timeout(budget.deadline, call()).await {
        Ok(result) => result,
        Err(_) => {
            let retry_deadline = budget.retry_deadline();
            tracing::warn!(
                "{} timed out after {}ms, retrying once with {}ms",
                budget.collaborator,
                budget.deadline.as_millis(),
                retry_deadline.as_millis()
            );

            match tokio::time::timeout(retry_deadline, call()).await {
                Ok(result) => result,
                Err(_) => Err(UpstreamError::Timeout {
                    collaborator: budget.collaborator,
                    timeout_ms: (budget.deadline + retry_deadline).as_millis() as u64,
                }),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn budget() -> CallBudget {
        CallBudget::new("test", Duration::from_millis(20), 0.5)
    }

    #[tokio::test]
    async fn test_fast_call_is_not_retried() {
        let calls = AtomicUsize::new(0);
        let counter = &calls;
        let result = call_with_retry(budget(), move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok::<_, UpstreamError>(7)
        })
        .await;

        assert_eq!(result, Ok(7));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_slow_first_attempt_succeeds_on_retry() {
        let calls = AtomicUsize::new(0);
        let result = call_with_retry(budget(), || {
            let attempt = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt == 0 {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                }
                Ok::<_, UpstreamError>("ok")
            }
        })
        .await;

        assert_eq!(result, Ok("ok"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_two_timeouts_yield_timeout_error() {
        let result = call_with_retry(budget(), || async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, UpstreamError>(())
        })
        .await;

        assert!(matches!(
            result,
            Err(UpstreamError::Timeout {
                collaborator: "test",
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_non_timeout_failure_is_not_retried() {
        let calls = AtomicUsize::new(0);
        let counter = &calls;
        let result: Result<(), _> = call_with_retry(budget(), move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(UpstreamError::Unavailable {
                collaborator: "test",
                reason: "503".to_string(),
            })
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
