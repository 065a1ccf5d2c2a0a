//! Multi-partition fan-out
//!
//! Read endpoints that span several chains run one task per chain and
//! merge the results. Every task gets its own result slot, so no
//! shared map or lock is needed; results come back in input order.
//! All tasks are always joined before the merged result (or the first
//! error) is returned, so a failed partition never leaves work
//! running in the background.

use std::future::Future;

use futures::future::join_all;

/// Runs `fetch` concurrently for every partition key and returns the
/// per-partition results in input order. Any partition failure fails
/// the whole call; partial results are never surfaced.
pub async fn fetch_across_partitions<K, T, F, Fut>(
    keys: Vec<K>,
    fetch: F,
) -> anyhow::Result<Vec<(K, T)>>
where
    K: Clone + Send + 'static,
    T: Send + 'static,
    F: Fn(K) -> Fut,
    Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
{
    let tasks: Vec<_> = keys
        .iter()
        .cloned()
        .map(|key| tokio::spawn(fetch(key)))
        .collect();

    // join_all waits for every task even when an early one failed.
    let outcomes = join_all(tasks).await;

    let mut merged = Vec::with_capacity(keys.len());
    let mut first_error = None;
    for (key, outcome) in keys.into_iter().zip(outcomes) {
        match outcome {
            Ok(Ok(value)) => merged.push((key, value)),
            Ok(Err(err)) => {
                if first_error.is_none() {
                    first_error = Some(err);
                }
            }
            Err(join_err) => {
                if first_error.is_none() {
                    first_error = Some(anyhow::anyhow!("partition task failed: {join_err}"));
                }
            }
        }
    }

    match first_error {
        Some(err) => Err(err),
        None => Ok(merged),
    }
}
