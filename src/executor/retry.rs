//! Retry helper for assembly-resolution HTTP GETs.
//!
//! This is narrower than a general-purpose retry policy: only the
//! documented transient status codes and transport errors are retried,
//! with a fixed linear backoff, matching what the assembly resolver is
//! specified to do. The main remote task dispatch (trigger/poll) does not
//! retry on transport failure; see [`crate::executor::remote_task`].

use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Whether an observed HTTP status should be retried by the assembly GET
/// helper.
pub fn is_transient_status(status: u16) -> bool {
    matches!(status, 408 | 425 | 429 | 500 | 502 | 503 | 504)
}

/// Outcome of a single attempt, as seen by [`retry_get`].
pub enum AttemptOutcome<T> {
    Success(T),
    TransientStatus(u16),
    TransportError(reqwest::Error),
    PermanentStatus(u16),
}

/// Retries `attempt` up to 3 times total, waiting `300ms * attempt_index`
/// between attempts, for transient HTTP statuses or transport errors.
/// A permanent (non-transient) status or the final exhausted attempt is
/// returned immediately.
/// Linear backoff (300ms per attempt) with up to 25% random jitter, so
/// concurrent assembly-resolve retries don't all wake on the same tick.
fn backoff_delay(attempt_index: u32) -> Duration {
    let base_ms = 300 * (attempt_index as u64 + 1);
    let jitter_ms = (base_ms as f64 * 0.25 * rand::random::<f64>()) as u64;
    Duration::from_millis(base_ms + jitter_ms)
}

pub async fn retry_get<F, Fut, T>(operation: &str, mut attempt: F) -> Result<T, String>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = AttemptOutcome<T>>,
{
    const MAX_ATTEMPTS: u32 = 3;

    for attempt_index in 0..MAX_ATTEMPTS {
        match attempt().await {
            AttemptOutcome::Success(value) => return Ok(value),
            AttemptOutcome::PermanentStatus(status) => {
                return Err(format!("{operation} failed with non-retryable status {status}"));
            }
            AttemptOutcome::TransientStatus(status) => {
                if attempt_index + 1 == MAX_ATTEMPTS {
                    return Err(format!(
                        "{operation} exhausted retries, last status {status}"
                    ));
                }
                let delay = backoff_delay(attempt_index);
                warn!(operation, status, attempt = attempt_index, delay_ms = delay.as_millis(), "transient status, retrying");
                tokio::time::sleep(delay).await;
            }
            AttemptOutcome::TransportError(err) => {
                if attempt_index + 1 == MAX_ATTEMPTS {
                    return Err(format!("{operation} exhausted retries: {err}"));
                }
                let delay = backoff_delay(attempt_index);
                debug!(operation, error = %err, attempt = attempt_index, "transport error, retrying");
                tokio::time::sleep(delay).await;
            }
        }
    }

    Err(format!("{operation} exhausted retries"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn succeeds_without_retry() {
        let calls = AtomicU32::new(0);
        let result: Result<i32, String> = retry_get("test", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            AttemptOutcome::Success(7)
        })
        .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_transient_then_succeeds() {
        let calls = AtomicU32::new(0);
        let result: Result<i32, String> = retry_get("test", || async {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            if n < 2 {
                AttemptOutcome::TransientStatus(503)
            } else {
                AttemptOutcome::Success(1)
            }
        })
        .await;
        assert!(result.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn does_not_retry_permanent_status() {
        let calls = AtomicU32::new(0);
        let result: Result<i32, String> = retry_get("test", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            AttemptOutcome::PermanentStatus(404)
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn classifies_transient_status_set() {
        for code in [408, 425, 429, 500, 502, 503, 504] {
            assert!(is_transient_status(code));
        }
        assert!(!is_transient_status(404));
        assert!(!is_transient_status(200));
    }
}
