//! Collection volume ranking
//!
//! Ranking a chain means walking every collection and summing its
//! sale volume over the window, which is far too expensive per
//! request. Computed rankings are cached for one statistics interval
//! under a key embedding project, chain and window; the rebuild walks
//! collections in bounded batches with retries under a deadline.

use std::time::Duration;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use types::prelude::*;

use crate::error::AppError;
use crate::kv::ranking_key;
use crate::retry::with_backoff;
use crate::state::AppState;
use crate::store::unix_now;

/// Collections fetched per reload batch.
const RELOAD_BATCH_SIZE: usize = 500;
const RELOAD_ATTEMPTS: u32 = 3;
const RELOAD_BACKOFF: Duration = Duration::from_secs(1);
const RELOAD_DEADLINE: Duration = Duration::from_secs(30);

/// Rankings are refreshed at the statistics interval granularity.
const RANKING_TTL_SECONDS: u64 = INTERVAL_SECONDS as u64;

/// Ranking rows kept per chain and window.
const RANKING_DEPTH: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionRanking {
    pub address: String,
    pub name: String,
    pub image_uri: String,
    pub floor_price: Decimal,
    pub volume: Decimal,
    /// Volume delta against the preceding window of the same length.
    pub volume_change: Decimal,
    pub item_amount: i64,
    pub owner_amount: i64,
}

pub async fn top_collections(
    state: &AppState,
    chain_id: i32,
    period: Period,
) -> Result<Vec<CollectionRanking>, AppError> {
    let chain_name = state
        .config
        .chain_name(chain_id)
        .ok_or_else(|| AppError::BadRequest(format!("unknown chain id {chain_id}")))?
        .to_string();
    let key = ranking_key(&state.config.project_name, &chain_name, period.epochs());

    match state.kv.get(&key).await {
        Ok(Some(raw)) => {
            if let Ok(rankings) = serde_json::from_slice::<Vec<CollectionRanking>>(&raw) {
                return Ok(rankings);
            }
            tracing::warn!(%key, "discarding undecodable ranking cache entry");
        }
        Ok(None) => {}
        Err(err) => tracing::warn!(%key, error = %err, "ranking cache read failed"),
    }

    let rankings = rebuild(state, chain_id, period).await?;

    match serde_json::to_vec(&rankings) {
        Ok(encoded) => {
            if let Err(err) = state.kv.set_ex(&key, encoded, RANKING_TTL_SECONDS).await {
                tracing::warn!(%key, error = %err, "ranking cache write failed");
            }
        }
        Err(err) => tracing::warn!(%key, error = %err, "ranking encode failed"),
    }

    Ok(rankings)
}

/// Recomputes the ranking from scratch: batched full collection scan,
/// then a volume query per collection over the window.
async fn rebuild(
    state: &AppState,
    chain_id: i32,
    period: Period,
) -> Result<Vec<CollectionRanking>, AppError> {
    let collections = load_all_collections(state, chain_id).await?;
    let now = unix_now();
    let since = now - period.seconds();
    let previous_since = now - 2 * period.seconds();

    let mut rankings = Vec::with_capacity(collections.len());
    for collection in collections {
        let (volume, both_windows, floor) = tokio::try_join!(
            state.store.collection_volume(chain_id, &collection.address, since),
            state
                .store
                .collection_volume(chain_id, &collection.address, previous_since),
            state.store.floor_price(chain_id, &collection.address),
        )
        .map_err(AppError::Internal)?;
        let previous_volume = both_windows - volume;
        rankings.push(CollectionRanking {
            address: collection.address,
            name: collection.name,
            image_uri: collection.image_uri,
            floor_price: floor.unwrap_or(collection.floor_price),
            volume,
            volume_change: volume - previous_volume,
            item_amount: collection.item_amount,
            owner_amount: collection.owner_amount,
        });
    }

    rankings.sort_by(|a, b| b.volume.cmp(&a.volume));
    rankings.truncate(RANKING_DEPTH);
    Ok(rankings)
}

async fn load_all_collections(
    state: &AppState,
    chain_id: i32,
) -> Result<Vec<Collection>, AppError> {
    let mut all = Vec::new();
    let mut offset = 0usize;
    loop {
        let store = state.store.clone();
        let batch = with_backoff(RELOAD_ATTEMPTS, RELOAD_BACKOFF, RELOAD_DEADLINE, || {
            let store = store.clone();
            async move { store.collections_page(chain_id, offset, RELOAD_BATCH_SIZE).await }
        })
        .await
        .map_err(AppError::Internal)?;

        let done = batch.len() < RELOAD_BATCH_SIZE;
        all.extend(batch);
        if done {
            return Ok(all);
        }
        offset += RELOAD_BATCH_SIZE;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::store::MemoryStore;
    use std::sync::Arc;

    fn collection(id: i64, address: &str) -> Collection {
        Collection {
            id,
            chain_id: 1,
            address: address.to_string(),
            name: format!("Col {id}"),
            symbol: "C".to_string(),
            image_uri: String::new(),
            floor_price: Decimal::ONE,
            sale_price: Decimal::ZERO,
            item_amount: 10,
            owner_amount: 5,
        }
    }

    fn sale(id: i64, collection: &str, price: i64) -> Activity {
        Activity {
            id,
            collection_address: collection.to_string(),
            token_id: "1".to_string(),
            kind: ActivityKind::Sale,
            from_address: "0xa".to_string(),
            to_address: "0xb".to_string(),
            price: Decimal::from(price),
            marketplace_id: 1,
            tx_hash: "0xhash".to_string(),
            event_time: unix_now(),
        }
    }

    fn state_with(store: MemoryStore) -> AppState {
        AppState {
            store: Arc::new(store),
            ..AppState::in_memory(Config::default())
        }
    }

    #[tokio::test]
    async fn test_ranking_orders_by_volume() {
        let store = MemoryStore::new();
        store.insert_collection(1, collection(1, "0xsmall"));
        store.insert_collection(1, collection(2, "0xbig"));
        store.insert_activity(1, sale(1, "0xsmall", 5));
        store.insert_activity(1, sale(2, "0xbig", 50));
        let state = state_with(store);

        let rankings = top_collections(&state, 1, Period::OneDay).await.unwrap();
        assert_eq!(rankings.len(), 2);
        assert_eq!(rankings[0].address, "0xbig");
        assert_eq!(rankings[0].volume, Decimal::from(50));
    }

    #[tokio::test]
    async fn test_ranking_served_from_cache_after_first_build() {
        let store = MemoryStore::new();
        store.insert_collection(1, collection(1, "0xa"));
        let state = state_with(store);

        let first = top_collections(&state, 1, Period::SevenDays).await.unwrap();

        let key = ranking_key("openmarket", "eth", Period::SevenDays.epochs());
        assert!(state.kv.get(&key).await.unwrap().is_some());
        let second = top_collections(&state, 1, Period::SevenDays).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_unknown_chain_rejected() {
        let state = state_with(MemoryStore::new());
        let err = top_collections(&state, 999, Period::OneDay).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }
}
