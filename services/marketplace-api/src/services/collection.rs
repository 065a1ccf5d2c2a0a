//! Collection detail, item browsing and history stats

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::Serialize;
use types::prelude::*;

use crate::error::AppError;
use crate::kv::collection_listed_key;
use crate::resolve::{self, BestBidView};
use crate::services::orders::ListingView;
use crate::state::AppState;
use crate::store::{unix_now, PricePoint};

/// TTL of the denormalized listed-count counter.
const LISTED_COUNT_TTL_SECONDS: u64 = 60;

/// How many collection bids to pull when resolving a single token.
const SINGLE_TOKEN_BID_DEPTH: usize = 1;

#[derive(Debug, Clone, Serialize)]
pub struct CollectionDetail {
    #[serde(flatten)]
    pub collection: Collection,
    pub listed_amount: i64,
    pub volume_24h: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct CollectionItem {
    #[serde(flatten)]
    pub item: Item,
    pub best_bid: Option<BestBidView>,
    pub listing: Option<ListingView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CollectionItemsPage {
    pub items: Vec<CollectionItem>,
    pub total: i64,
}

/// Listed-token count, served from the counter cache when warm.
/// Refreshing the counter is best effort; a cache-store failure falls
/// back to the direct query.
async fn listed_count(state: &AppState, chain_id: i32, address: &str) -> anyhow::Result<i64> {
    let chain = state.config.chain_name(chain_id).unwrap_or_default().to_string();
    let key = collection_listed_key(&chain, address);

    match state.kv.get_int(&key).await {
        Ok(Some(count)) => return Ok(count),
        Ok(None) => {}
        Err(err) => tracing::warn!(%key, error = %err, "listed-count cache read failed"),
    }

    let count = state.store.listed_count(chain_id, address).await?;
    if let Err(err) = state
        .kv
        .set_ex(&key, count.to_string().into_bytes(), LISTED_COUNT_TTL_SECONDS)
        .await
    {
        tracing::warn!(%key, error = %err, "listed-count cache refresh failed");
    }
    Ok(count)
}

pub async fn collection_detail(
    state: &AppState,
    chain_id: i32,
    address: &str,
) -> Result<CollectionDetail, AppError> {
    let collection = state
        .store
        .collection(chain_id, address)
        .await
        .map_err(AppError::Internal)?
        .ok_or_else(|| AppError::NotFound(format!("collection {address}")))?;

    let since = unix_now() - Period::TwentyFourHours.seconds();
    let (listed_amount, volume_24h) = tokio::try_join!(
        listed_count(state, chain_id, address),
        state.store.collection_volume(chain_id, address, since),
    )
    .map_err(AppError::Internal)?;

    Ok(CollectionDetail { collection, listed_amount, volume_24h })
}

/// One page of a collection's items with each token's best bid and
/// valid listing attached.
pub async fn collection_items(
    state: &AppState,
    chain_id: i32,
    address: &str,
    offset: usize,
    limit: usize,
) -> Result<CollectionItemsPage, AppError> {
    let (items, total) = state
        .store
        .items_page(chain_id, address, offset, limit)
        .await
        .map_err(AppError::Internal)?;

    let token_ids: Vec<String> = items.iter().map(|i| i.token_id.clone()).collect();
    let (item_bids, collection_bids, listings) = tokio::try_join!(
        state.store.item_bids(chain_id, address, &token_ids),
        state.store.collection_bids(chain_id, address, token_ids.len()),
        state.store.listings(chain_id, address, &token_ids),
    )
    .map_err(AppError::Internal)?;

    let item_best = super::orders::best_item_bids(&item_bids);
    let mut winners = resolve::assign_bids(&token_ids, &item_best, &collection_bids, unix_now());

    let owners: HashMap<String, String> = items
        .iter()
        .map(|i| (i.token_id.clone(), i.owner.clone()))
        .collect();
    let mut listing_views = super::orders::cheapest_owned_listings(&listings, &owners);

    let items = items
        .into_iter()
        .map(|item| CollectionItem {
            best_bid: winners.remove(&item.token_id),
            listing: listing_views.remove(&item.token_id),
            item,
        })
        .collect();

    Ok(CollectionItemsPage { items, total })
}

#[derive(Debug, Clone, Serialize)]
pub struct ItemDetail {
    #[serde(flatten)]
    pub item: Item,
    pub best_bid: Option<BestBidView>,
    pub listing: Option<ListingView>,
}

/// Item detail with an on-chain owner cross-check. When the chain
/// reports a different owner than the replicated row, the row is
/// corrected before listings are validated; chain lookup failures are
/// logged and the replicated owner stands.
pub async fn item_detail(
    state: &AppState,
    chain_id: i32,
    address: &str,
    token_id: &str,
) -> Result<ItemDetail, AppError> {
    let mut item = state
        .store
        .item(chain_id, address, token_id)
        .await
        .map_err(AppError::Internal)?
        .ok_or_else(|| AppError::NotFound(format!("item {address}/{token_id}")))?;

    if let Some(client) = state.chain_clients.get(&chain_id) {
        match client.nft_owner(address, token_id).await {
            Ok(chain_owner) if !chain_owner.eq_ignore_ascii_case(&item.owner) => {
                if let Err(err) = state
                    .store
                    .update_item_owner(chain_id, address, token_id, &chain_owner)
                    .await
                {
                    tracing::warn!(token_id, error = %err, "owner correction failed");
                }
                item.owner = chain_owner;
            }
            Ok(_) => {}
            Err(err) => tracing::warn!(token_id, error = %err, "chain owner lookup failed"),
        }
    }

    let token_ids = vec![token_id.to_string()];
    let (item_bids, collection_bids, listings) = tokio::try_join!(
        state.store.item_bids(chain_id, address, &token_ids),
        state
            .store
            .collection_bids(chain_id, address, SINGLE_TOKEN_BID_DEPTH),
        state.store.listings(chain_id, address, &token_ids),
    )
    .map_err(AppError::Internal)?;

    let best_bid = resolve::resolve_token_bid(token_id, &item_bids, &collection_bids, unix_now());
    let owners: HashMap<String, String> =
        [(token_id.to_string(), item.owner.clone())].into_iter().collect();
    let listing = super::orders::cheapest_owned_listings(&listings, &owners)
        .remove(token_id);

    Ok(ItemDetail { item, best_bid, listing })
}

/// One page of raw collection-wide bids, highest price first, without
/// slot expansion.
pub async fn bids_page(
    state: &AppState,
    chain_id: i32,
    address: &str,
    offset: usize,
    limit: usize,
) -> Result<Vec<BestBidView>, AppError> {
    let bids = state
        .store
        .collection_bids(chain_id, address, offset + limit)
        .await
        .map_err(AppError::Internal)?;
    Ok(bids
        .iter()
        .skip(offset)
        .map(|bid| BestBidView::from_order(bid, COLLECTION_WIDE_TOKEN_ID))
        .collect())
}

/// Top collection-wide bids expanded into single-unit slots.
pub async fn top_bids(
    state: &AppState,
    chain_id: i32,
    address: &str,
    limit: usize,
) -> Result<Vec<BestBidView>, AppError> {
    let bids = state
        .store
        .collection_bids(chain_id, address, limit)
        .await
        .map_err(AppError::Internal)?;
    let slots = resolve::expand_collection_bids(&bids, limit, unix_now());
    Ok(slots
        .into_iter()
        .map(|bid| BestBidView::from_order(bid, COLLECTION_WIDE_TOKEN_ID))
        .collect())
}

/// Sale price history. Only the day-scale windows are supported;
/// short intraday windows have too few sales to chart.
pub async fn history_sales(
    state: &AppState,
    chain_id: i32,
    address: &str,
    period: Period,
) -> Result<Vec<PricePoint>, AppError> {
    if !matches!(
        period,
        Period::OneDay | Period::TwentyFourHours | Period::SevenDays | Period::ThirtyDays
    ) {
        return Err(AppError::BadRequest(format!(
            "unsupported history period: {}",
            period.as_str()
        )));
    }
    let since = unix_now() - period.seconds();
    state
        .store
        .history_sales(chain_id, address, since)
        .await
        .map_err(AppError::Internal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::store::MemoryStore;
    use std::sync::Arc;

    fn collection_row() -> Collection {
        Collection {
            id: 1,
            chain_id: 1,
            address: "0xcol".to_string(),
            name: "Col".to_string(),
            symbol: "COL".to_string(),
            image_uri: String::new(),
            floor_price: Decimal::ZERO,
            sale_price: Decimal::ZERO,
            item_amount: 2,
            owner_amount: 2,
        }
    }

    fn listing(order_id: &str, token_id: &str, price: i64, maker: &str) -> Order {
        Order {
            order_id: order_id.to_string(),
            collection_address: "0xcol".to_string(),
            token_id: token_id.to_string(),
            kind: OrderKind::Listing,
            price: Decimal::from(price),
            quantity_remaining: 1,
            size: 1,
            maker: maker.to_string(),
            expire_time: unix_now() + 3600,
            event_time: unix_now(),
            salt: 1,
            marketplace_id: 1,
            status: OrderStatus::Active,
        }
    }

    fn state_with(store: MemoryStore) -> AppState {
        AppState {
            store: Arc::new(store),
            ..AppState::in_memory(Config::default())
        }
    }

    #[tokio::test]
    async fn test_detail_counts_listed_tokens_once() {
        let store = MemoryStore::new();
        store.insert_collection(1, collection_row());
        store.insert_order(1, listing("a", "1", 5, "0xo"));
        store.insert_order(1, listing("b", "1", 6, "0xo"));
        store.insert_order(1, listing("c", "2", 7, "0xo"));
        let state = state_with(store);

        let detail = collection_detail(&state, 1, "0xcol").await.unwrap();
        assert_eq!(detail.listed_amount, 2);

        // Second read is served by the counter cache.
        let key = collection_listed_key("eth", "0xcol");
        assert_eq!(state.kv.get_int(&key).await.unwrap(), Some(2));
    }

    #[tokio::test]
    async fn test_unknown_collection_is_not_found() {
        let state = state_with(MemoryStore::new());
        let err = collection_detail(&state, 1, "0xnope").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_history_rejects_intraday_periods() {
        let state = state_with(MemoryStore::new());
        let err = history_sales(&state, 1, "0xcol", Period::OneHour).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
        assert!(history_sales(&state, 1, "0xcol", Period::SevenDays).await.is_ok());
    }

    #[tokio::test]
    async fn test_item_detail_corrects_owner_from_chain() {
        use crate::chain::{ChainClient, ChainClients, StaticChainClient};

        let store = MemoryStore::new();
        store.insert_item(
            1,
            Item {
                chain_id: 1,
                collection_address: "0xcol".to_string(),
                token_id: "1".to_string(),
                owner: "0xstale".to_string(),
                name: "One".to_string(),
            },
        );
        // Listing by the true owner only becomes valid once the
        // cross-check corrects the row.
        store.insert_order(1, listing("l", "1", 5, "0xtrue"));

        let chain = StaticChainClient::new();
        chain.set_owner("0xcol", "1", "0xtrue");
        let mut clients = ChainClients::new();
        clients.insert(1, Arc::new(chain) as Arc<dyn ChainClient>);

        let base = AppState::in_memory(Config::default());
        let state = AppState {
            store: Arc::new(store),
            chain_clients: Arc::new(clients),
            ..base
        };

        let detail = item_detail(&state, 1, "0xcol", "1").await.unwrap();
        assert_eq!(detail.item.owner, "0xtrue");
        assert_eq!(detail.listing.as_ref().unwrap().order_id, "l");

        let stored = state.store.item(1, "0xcol", "1").await.unwrap().unwrap();
        assert_eq!(stored.owner, "0xtrue");
    }
}
