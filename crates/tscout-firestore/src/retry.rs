//! Retry policy with exponential backoff and jitter.

use std::time::Duration;

use tracing::warn;

use crate::error::{FirestoreError, FirestoreResult};

/// Retry policy configuration.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts.
    pub max_retries: u32,
    /// Base delay for exponential backoff (in milliseconds).
    pub base_delay_ms: u64,
    /// Maximum delay cap (in milliseconds).
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 100,
            max_delay_ms: 5000,
        }
    }
}

/// Execute an async operation with retry.
///
/// Retries network errors and rate limits (honoring Retry-After); every
/// other error is surfaced immediately.
pub async fn with_retry<T, F, Fut>(
    config: &RetryConfig,
    operation: &str,
    op: F,
) -> FirestoreResult<T>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = FirestoreResult<T>> + Send,
{
    let mut last_error = None;

    for attempt in 0..=config.max_retries {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < config.max_retries => {
                let delay = calculate_delay(config, attempt, e.retry_after_ms());
                warn!(
                    operation = %operation,
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    "store operation failed, retrying: {}",
                    e
                );
                metrics::counter!("tscout_firestore_retries_total", "operation" => operation.to_string())
                    .increment(1);
                tokio::time::sleep(delay).await;
                last_error = Some(e);
            }
            Err(e) => return Err(e),
        }
    }

    Err(last_error.unwrap_or_else(|| FirestoreError::request_failed("unknown error")))
}

/// Exponential backoff with full jitter.
fn calculate_delay(config: &RetryConfig, attempt: u32, retry_after_ms: Option<u64>) -> Duration {
    if let Some(after) = retry_after_ms {
        return Duration::from_millis(after);
    }

    let exp_delay = config.base_delay_ms.saturating_mul(2u64.pow(attempt));
    let capped_delay = exp_delay.min(config.max_delay_ms);

    // Time-based pseudo-randomization keeps the dependency set small.
    let jittered = if capped_delay > 0 {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::SystemTime::UNIX_EPOCH)
            .map(|d| d.subsec_nanos())
            .unwrap_or(0);
        ((capped_delay as f64) * (nanos % 1000) as f64 / 1000.0) as u64
    } else {
        0
    };

    Duration::from_millis(jittered.max(config.base_delay_ms))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_honors_retry_after() {
        let config = RetryConfig::default();
        assert_eq!(calculate_delay(&config, 0, Some(2000)), Duration::from_millis(2000));
    }

    #[test]
    fn delay_respects_cap_and_floor() {
        let config = RetryConfig {
            max_retries: 3,
            base_delay_ms: 1000,
            max_delay_ms: 2000,
        };
        let delay = calculate_delay(&config, 10, None);
        assert!(delay.as_millis() >= 1000);
        assert!(delay.as_millis() <= 2000);
    }

    #[tokio::test]
    async fn retries_then_succeeds() {
        let config = RetryConfig {
            max_retries: 3,
            base_delay_ms: 1,
            max_delay_ms: 2,
        };
        let calls = std::sync::atomic::AtomicU32::new(0);

        let result = with_retry(&config, "test", || {
            let n = calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(FirestoreError::RateLimited(1))
                } else {
                    Ok(7u32)
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(result, 7);
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn non_retryable_errors_surface_immediately() {
        let config = RetryConfig::default();
        let calls = std::sync::atomic::AtomicU32::new(0);

        let result: FirestoreResult<()> = with_retry(&config, "test", || {
            calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            async { Err(FirestoreError::not_found("doc")) }
        })
        .await;

        assert!(matches!(result, Err(FirestoreError::NotFound(_))));
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    }
}
