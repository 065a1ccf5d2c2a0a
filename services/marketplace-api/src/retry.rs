//! Retry helper for bulk store reads
//!
//! Each attempt waits one backoff step longer than the previous one,
//! and the whole operation runs under a hard deadline so a wedged
//! store cannot stall callers indefinitely.

use std::future::Future;
use std::time::Duration;

/// Runs `op` up to `attempts` times with linearly growing pauses
/// between tries, all bounded by `deadline`.
pub async fn with_backoff<T, E, F, Fut>(
    attempts: u32,
    step: Duration,
    deadline: Duration,
    mut op: F,
) -> anyhow::Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let run = async {
        let mut last_err = String::new();
        for attempt in 1..=attempts {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    tracing::warn!(attempt, error = %err, "retryable operation failed");
                    last_err = err.to_string();
                }
            }
            if attempt < attempts {
                tokio::time::sleep(step * attempt).await;
            }
        }
        Err(anyhow::anyhow!("all {attempts} attempts failed: {last_err}"))
    };

    match tokio::time::timeout(deadline, run).await {
        Ok(result) => result,
        Err(_) => Err(anyhow::anyhow!("operation timed out after {deadline:?}")),
    }
}
