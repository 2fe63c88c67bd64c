//! Timeout and fallback policy for provider calls
//!
//! Every search-enabled model call runs under a budget; on failure or
//! timeout it is retried once without search tools under a shorter budget.
//! There is exactly one fallback level and no backoff.

use crate::error::ResearchError;
use crate::Result;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Race a future against a budget.
///
/// Returns the future's own result when it settles in time; otherwise
/// returns [`ResearchError::Timeout`] and invokes `on_timeout` exactly
/// once. Losing the race drops the inner future, which also aborts any
/// in-flight request it owns.
pub async fn with_timeout<T, F>(
    budget: Duration,
    fut: F,
    on_timeout: impl FnOnce(),
) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(budget, fut).await {
        Ok(result) => result,
        Err(_) => {
            on_timeout();
            Err(ResearchError::Timeout(budget.as_millis() as u64))
        }
    }
}

/// Budgets for a primary attempt and its single fallback.
#[derive(Debug, Clone, Copy)]
pub struct FallbackBudgets {
    pub primary: Duration,
    pub fallback: Duration,
}

/// Run `primary` under its budget; on any error retry `fallback` once
/// under the (shorter) fallback budget. The fallback's error propagates
/// unchanged on a second failure.
pub async fn with_fallback<T, P, F, PFut, FFut>(
    label: &str,
    budgets: FallbackBudgets,
    primary: P,
    fallback: F,
) -> Result<T>
where
    P: FnOnce() -> PFut,
    PFut: Future<Output = Result<T>>,
    F: FnOnce() -> FFut,
    FFut: Future<Output = Result<T>>,
{
    let first = with_timeout(budgets.primary, primary(), || {
        warn!(call = label, "Primary attempt hit its timeout budget");
    })
    .await;

    match first {
        Ok(value) => Ok(value),
        Err(error) => {
            warn!(
                call = label,
                %error,
                "Primary attempt failed, retrying without search tools"
            );
            with_timeout(budgets.fallback, fallback(), || {
                warn!(call = label, "Fallback attempt hit its timeout budget");
            })
            .await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::time::{sleep, Instant};
    use tokio_test::{assert_err, assert_ok};

    async fn slow_ok(delay: Duration) -> Result<&'static str> {
        sleep(delay).await;
        Ok("done")
    }

    #[tokio::test(start_paused = true)]
    async fn test_completes_within_budget() {
        let result = with_timeout(
            Duration::from_millis(500),
            slow_ok(Duration::from_millis(100)),
            || panic!("timeout callback must not fire"),
        )
        .await;
        assert_eq!(assert_ok!(result), "done");
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejects_at_budget_with_one_callback() {
        let fired = Arc::new(AtomicUsize::new(0));
        let fired_clone = fired.clone();

        let started = Instant::now();
        let result = with_timeout(
            Duration::from_millis(200),
            slow_ok(Duration::from_millis(300)),
            move || {
                fired_clone.fetch_add(1, Ordering::SeqCst);
            },
        )
        .await;

        assert!(matches!(result, Err(ResearchError::Timeout(200))));
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        // Paused clock: the wrapper gives up at the budget, not at the
        // future's own completion time.
        assert_eq!(started.elapsed(), Duration::from_millis(200));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fallback_runs_after_primary_failure() {
        let budgets = FallbackBudgets {
            primary: Duration::from_millis(100),
            fallback: Duration::from_millis(50),
        };

        let result = with_fallback(
            "test",
            budgets,
            || async { Err::<&str, _>(ResearchError::Provider("upstream 500".into())) },
            || async { Ok("fallback answer") },
        )
        .await;

        assert_eq!(result.unwrap(), "fallback answer");
    }

    #[tokio::test(start_paused = true)]
    async fn test_fallback_skipped_on_primary_success() {
        let budgets = FallbackBudgets {
            primary: Duration::from_millis(100),
            fallback: Duration::from_millis(50),
        };

        let result = with_fallback(
            "test",
            budgets,
            || async { Ok("primary answer") },
            || async { panic!("fallback must not run") },
        )
        .await;

        assert_eq!(result.unwrap(), "primary answer");
    }

    #[tokio::test(start_paused = true)]
    async fn test_fallback_error_propagates() {
        let budgets = FallbackBudgets {
            primary: Duration::from_millis(100),
            fallback: Duration::from_millis(50),
        };

        let result: Result<&str> = with_fallback(
            "test",
            budgets,
            || slow_ok(Duration::from_millis(500)),
            || async { Err(ResearchError::Provider("still down".into())) },
        )
        .await;

        let error = assert_err!(result);
        assert!(error.to_string().contains("still down"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fallback_honors_shorter_budget() {
        let budgets = FallbackBudgets {
            primary: Duration::from_millis(100),
            fallback: Duration::from_millis(50),
        };

        let started = Instant::now();
        let result: Result<&str> = with_fallback(
            "test",
            budgets,
            || slow_ok(Duration::from_millis(500)),
            || slow_ok(Duration::from_millis(500)),
        )
        .await;

        assert!(matches!(result, Err(ResearchError::Timeout(50))));
        assert_eq!(started.elapsed(), Duration::from_millis(150));
    }
}
