//! Bounded retry with exponential backoff.
//!
//! Used on read paths where a transient collaborator failure should not
//! immediately surface: storage lookups during boundary checks and text
//! service calls during explanation generation.

use std::future::Future;
use std::time::Duration;

use tracing::debug;
use verdict_types::{EngineError, EngineResult};

/// Run an operation with bounded exponential backoff.
///
/// Only retryable errors (database, AI service) are retried; everything
/// else returns immediately. The final error is returned after the last
/// attempt.
pub async fn retry_with_backoff<T, F, Fut>(
    attempts: u32,
    base_delay: Duration,
    mut op: F,
) -> EngineResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = EngineResult<T>>,
{
    let attempts = attempts.max(1);
    let mut delay = base_delay;

    for attempt in 1..=attempts {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && attempt < attempts => {
                debug!(attempt, error = %err, "transient failure, backing off");
                tokio::time::sleep(delay).await;
                delay *= 2;
            }
            Err(err) => return Err(err),
        }
    }

    Err(EngineError::Unknown("retry loop exhausted".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn recovers_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let result = retry_with_backoff(3, Duration::from_millis(1), || {
            let call = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if call < 2 {
                    Err(EngineError::Database("transient".to_string()))
                } else {
                    Ok(call)
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(result, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn bounded_attempts_then_final_error() {
        let calls = AtomicU32::new(0);
        let result: EngineResult<()> = retry_with_backoff(3, Duration::from_millis(1), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(EngineError::Database("still down".to_string())) }
        })
        .await;

        assert!(matches!(result, Err(EngineError::Database(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn non_retryable_errors_fail_fast() {
        let calls = AtomicU32::new(0);
        let result: EngineResult<()> = retry_with_backoff(3, Duration::from_millis(1), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(EngineError::Validation("bad input".to_string())) }
        })
        .await;

        assert!(matches!(result, Err(EngineError::Validation(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
