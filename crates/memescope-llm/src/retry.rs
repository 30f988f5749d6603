//! Linear back-off retry for completion requests.
//!
//! [`retry_linear`] runs an attempt closure up to a fixed budget. Every
//! transport-level failure (network, timeout, non-2xx, malformed envelope) is
//! retried; [`LlmError::Disabled`] and [`LlmError::Encode`] are returned
//! immediately because another attempt cannot change their outcome.

use std::future::Future;
use std::time::Duration;

use crate::error::LlmError;

/// Returns `true` for errors that are worth another attempt.
pub(crate) fn is_retriable(err: &LlmError) -> bool {
    match err {
        LlmError::Http(_)
        | LlmError::Status { .. }
        | LlmError::Deserialize { .. }
        | LlmError::EmptyChoices => true,
        LlmError::Disabled | LlmError::Encode(_) | LlmError::InvalidBaseUrl { .. } => false,
    }
}

/// Runs `operation` at most `max_attempts` times (minimum one).
///
/// `operation` receives the 1-based attempt number. After failed attempt `n`
/// the loop sleeps `backoff_step × n` before trying again:
///
/// | Attempt | Sleep before next attempt |
/// |---------|---------------------------|
/// | 1       | 1 × step                  |
/// | 2       | 2 × step                  |
/// | 3       | none, error is returned   |
pub(crate) async fn retry_linear<T, F, Fut>(
    max_attempts: u32,
    backoff_step: Duration,
    mut operation: F,
) -> Result<T, LlmError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, LlmError>>,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 1u32;
    loop {
        match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !is_retriable(&err) || attempt >= max_attempts {
                    return Err(err);
                }
                let delay = backoff_step.saturating_mul(attempt);
                let delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
                tracing::warn!(
                    attempt,
                    max_attempts,
                    delay_ms,
                    error = %err,
                    "completion attempt failed, retrying after back-off"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn status_err() -> LlmError {
        LlmError::Status {
            status: 503,
            body: "overloaded".to_owned(),
        }
    }

    #[test]
    fn disabled_is_not_retriable() {
        assert!(!is_retriable(&LlmError::Disabled));
    }

    #[test]
    fn status_and_empty_choices_are_retriable() {
        assert!(is_retriable(&status_err()));
        assert!(is_retriable(&LlmError::EmptyChoices));
    }

    #[tokio::test]
    async fn succeeds_immediately_on_first_try() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_linear(3, Duration::ZERO, |_| {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Ok::<u32, LlmError>(42)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_then_succeeds() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_linear(3, Duration::ZERO, |attempt| {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                if attempt < 3 {
                    Err(status_err())
                } else {
                    Ok::<u32, LlmError>(99)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 99);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn never_exceeds_attempt_budget() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_linear(3, Duration::ZERO, |_| {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err::<u32, _>(LlmError::EmptyChoices)
            }
        })
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 3, "budget is 3 attempts total");
        assert!(matches!(result, Err(LlmError::EmptyChoices)));
    }

    #[tokio::test]
    async fn zero_budget_still_makes_one_attempt() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let _ = retry_linear(0, Duration::ZERO, |_| {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err::<u32, _>(LlmError::EmptyChoices)
            }
        })
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn does_not_retry_disabled() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_linear(3, Duration::ZERO, |_| {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err::<u32, _>(LlmError::Disabled)
            }
        })
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(result, Err(LlmError::Disabled)));
    }

    #[tokio::test(start_paused = true)]
    async fn backoff_grows_linearly() {
        let started = tokio::time::Instant::now();
        let _ = retry_linear(3, Duration::from_secs(2), |_| async {
            Err::<u32, _>(LlmError::EmptyChoices)
        })
        .await;
        // 2s after attempt 1 plus 4s after attempt 2, nothing after the last.
        assert_eq!(started.elapsed(), Duration::from_secs(6));
    }
}
