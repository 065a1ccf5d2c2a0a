//! Key-value cache store adapter
//!
//! All caching goes through the [`KvStore`] trait so the backing
//! store (Redis in production) stays an external collaborator. The
//! bundled [`MemoryKv`] implements the same contract in-process and
//! backs tests and local runs.
//!
//! Persisted key formats live here so every subsystem builds them the
//! same way.

use std::time::Duration;

use tokio::time::Instant;

use async_trait::async_trait;
use dashmap::DashMap;
use serde::Serialize;

/// Minimal cache-store primitives consumed by this service.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>>;

    async fn set_ex(&self, key: &str, value: Vec<u8>, ttl_seconds: u64) -> anyhow::Result<()>;

    /// Set-if-absent with expiry; returns whether this call wrote.
    /// Losing the race to a concurrent identical writer is a no-op.
    async fn set_nx_ex(&self, key: &str, value: Vec<u8>, ttl_seconds: u64) -> anyhow::Result<bool>;

    async fn get_int(&self, key: &str) -> anyhow::Result<Option<i64>>;

    async fn set_int(&self, key: &str, value: i64) -> anyhow::Result<()>;
}

#[derive(Clone)]
struct Entry {
    value: Vec<u8>,
    expires_at: Option<Instant>,
}

impl Entry {
    fn live(&self) -> bool {
        self.expires_at.map_or(true, |at| Instant::now() < at)
    }
}

/// In-process KV store with TTL expiry.
#[derive(Default)]
pub struct MemoryKv {
    entries: DashMap<String, Entry>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    fn ttl_deadline(ttl_seconds: u64) -> Option<Instant> {
        if ttl_seconds == 0 {
            None
        } else {
            Some(Instant::now() + Duration::from_secs(ttl_seconds))
        }
    }
}

#[async_trait]
impl KvStore for MemoryKv {
    async fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>> {
        // The read guard must be released before removing the key.
        let expired = match self.entries.get(key) {
            Some(entry) if entry.live() => return Ok(Some(entry.value.clone())),
            Some(_) => true,
            None => false,
        };
        if expired {
            self.entries.remove(key);
        }
        Ok(None)
    }

    async fn set_ex(&self, key: &str, value: Vec<u8>, ttl_seconds: u64) -> anyhow::Result<()> {
        self.entries.insert(
            key.to_string(),
            Entry { value, expires_at: Self::ttl_deadline(ttl_seconds) },
        );
        Ok(())
    }

    async fn set_nx_ex(&self, key: &str, value: Vec<u8>, ttl_seconds: u64) -> anyhow::Result<bool> {
        // Entry-level locking makes the check-and-set atomic.
        let mut wrote = false;
        let mut entry = self.entries.entry(key.to_string()).or_insert_with(|| {
            wrote = true;
            Entry { value: value.clone(), expires_at: Self::ttl_deadline(ttl_seconds) }
        });
        if !wrote && !entry.live() {
            *entry = Entry { value, expires_at: Self::ttl_deadline(ttl_seconds) };
            wrote = true;
        }
        Ok(wrote)
    }

    async fn get_int(&self, key: &str) -> anyhow::Result<Option<i64>> {
        match self.get(key).await? {
            Some(raw) => {
                let text = String::from_utf8(raw)?;
                Ok(Some(text.trim().parse()?))
            }
            None => Ok(None),
        }
    }

    async fn set_int(&self, key: &str, value: i64) -> anyhow::Result<()> {
        self.set_ex(key, value.to_string().into_bytes(), 0).await
    }
}

/// Namespace prefix for memoized API responses.
pub const API_CACHE_PREFIX: &str = "apicache:";

/// Prefix for cached activity counts; the full key embeds the
/// JSON-serialized filter.
pub const ACTIVITY_COUNT_PREFIX: &str = "cache:activity:count:";

/// Ranking cache key: project + chain + period interval count.
pub fn ranking_key(project: &str, chain: &str, epochs: i64) -> String {
    format!(
        "cache:{}:{}:ranking:volume:{}",
        project.to_lowercase(),
        chain.to_lowercase(),
        epochs
    )
}

/// Listed-count cache key: chain + collection address.
pub fn collection_listed_key(chain: &str, collection_address: &str) -> String {
    format!(
        "cache:{}:collection:{}:listed",
        chain.to_lowercase(),
        collection_address.to_lowercase()
    )
}

/// Activity-count cache key; the filter struct is serialized as JSON
/// so equal filters always hit the same key.
pub fn activity_count_key<F: Serialize>(filter: &F) -> anyhow::Result<String> {
    let encoded = serde_json::to_string(filter)?;
    Ok(format!("{ACTIVITY_COUNT_PREFIX}{encoded}"))
}
