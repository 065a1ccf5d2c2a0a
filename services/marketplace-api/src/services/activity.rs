//! Activity feed queries
//!
//! The feed can span several chains: each chain is queried in its own
//! task and the merged rows are re-sorted by event time before the
//! page window is cut. Counting matched activities is much more
//! expensive than fetching a page, so per-chain counts are memoized
//! for a short window keyed by the serialized filter. Listing events
//! never carry a transaction (they are off-chain order placements),
//! so their `tx_hash` is blanked in responses.

use serde::Serialize;
use types::prelude::*;

use crate::aggregator::fetch_across_partitions;
use crate::error::AppError;
use crate::kv::activity_count_key;
use crate::state::AppState;
use crate::store::ActivityFilter;

const COUNT_CACHE_TTL_SECONDS: u64 = 30;

/// Filter fields shared by every chain partition of one query.
#[derive(Debug, Clone, Default)]
pub struct ActivityQuery {
    pub collection_address: Option<String>,
    pub token_id: Option<String>,
    pub user_address: Option<String>,
    pub event_kinds: Vec<ActivityKind>,
}

impl ActivityQuery {
    fn for_chain(&self, chain_id: i32) -> ActivityFilter {
        ActivityFilter {
            chain_id,
            collection_address: self.collection_address.clone(),
            token_id: self.token_id.clone(),
            user_address: self.user_address.clone(),
            event_kinds: self.event_kinds.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ActivityView {
    pub chain_id: i32,
    pub id: i64,
    pub collection_address: String,
    pub token_id: String,
    pub event_kind: &'static str,
    pub from_address: String,
    pub to_address: String,
    pub price: rust_decimal::Decimal,
    pub marketplace_id: i32,
    pub tx_hash: String,
    pub event_time: i64,
}

impl ActivityView {
    fn from_activity(chain_id: i32, activity: Activity) -> Self {
        let tx_hash = match activity.kind {
            ActivityKind::List => String::new(),
            _ => activity.tx_hash,
        };
        Self {
            chain_id,
            id: activity.id,
            collection_address: activity.collection_address,
            token_id: activity.token_id,
            event_kind: activity.kind.as_str(),
            from_address: activity.from_address,
            to_address: activity.to_address,
            price: activity.price,
            marketplace_id: activity.marketplace_id,
            tx_hash,
            event_time: activity.event_time,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ActivityPage {
    pub activities: Vec<ActivityView>,
    pub total: i64,
}

/// Total matches for one chain's filter, memoized briefly. Cache
/// failures fall back to counting directly.
async fn cached_count(state: &AppState, filter: &ActivityFilter) -> anyhow::Result<i64> {
    let key = activity_count_key(filter)?;

    match state.kv.get_int(&key).await {
        Ok(Some(count)) => return Ok(count),
        Ok(None) => {}
        Err(err) => tracing::warn!(%key, error = %err, "activity count cache read failed"),
    }

    let count = state.store.activities_count(filter).await?;
    if let Err(err) = state
        .kv
        .set_ex(&key, count.to_string().into_bytes(), COUNT_CACHE_TTL_SECONDS)
        .await
    {
        tracing::warn!(%key, error = %err, "activity count cache write failed");
    }
    Ok(count)
}

pub async fn activities(
    state: &AppState,
    chain_ids: Vec<i32>,
    query: ActivityQuery,
    offset: usize,
    limit: usize,
) -> Result<ActivityPage, AppError> {
    if chain_ids.is_empty() {
        return Err(AppError::BadRequest("no chains requested".to_string()));
    }

    // Each chain contributes up to a full window; the page is cut
    // after the cross-chain merge sort.
    let window = offset + limit;
    let app = state.clone();
    let query_for_task = query.clone();
    let merged = fetch_across_partitions(chain_ids, move |chain_id| {
        let app = app.clone();
        let filter = query_for_task.for_chain(chain_id);
        async move {
            let (rows, count) = tokio::try_join!(
                app.store.activities(&filter, 0, window),
                cached_count(&app, &filter),
            )?;
            Ok((rows, count))
        }
    })
    .await
    .map_err(AppError::Internal)?;

    let mut total = 0i64;
    let mut views = Vec::new();
    for (chain_id, (rows, count)) in merged {
        total += count;
        views.extend(
            rows.into_iter()
                .map(|activity| ActivityView::from_activity(chain_id, activity)),
        );
    }
    views.sort_by(|a, b| b.event_time.cmp(&a.event_time).then(b.id.cmp(&a.id)));

    let activities = views.into_iter().skip(offset).take(limit).collect();
    Ok(ActivityPage { activities, total })
}
