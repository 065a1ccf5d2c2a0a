//! User portfolio: owned items, listings and open bids across chains
//!
//! Every operation fans out one task per configured chain and merges
//! the tagged results; a single failed chain fails the whole call
//! rather than returning a silently incomplete portfolio.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::Serialize;
use types::prelude::*;

use crate::aggregator::fetch_across_partitions;
use crate::error::AppError;
use crate::services::orders::ListingView;
use crate::state::AppState;

#[derive(Debug, Clone, Serialize)]
pub struct ChainItem {
    pub chain_id: i32,
    pub chain_name: String,
    #[serde(flatten)]
    pub item: Item,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChainListing {
    pub chain_id: i32,
    pub chain_name: String,
    pub collection_address: String,
    pub token_id: String,
    #[serde(flatten)]
    pub listing: ListingView,
}

/// Open bids of one user, merged across marketplaces and chains.
/// Identical bids (same collection, token, price, marketplace,
/// expiry and kind) collapse into one row with summed quantity.
#[derive(Debug, Clone, Serialize)]
pub struct GroupedBid {
    pub chain_id: i32,
    pub chain_name: String,
    pub collection_address: String,
    pub token_id: String,
    pub price: Decimal,
    pub marketplace_id: i32,
    pub expire_time: i64,
    pub bid_type: i64,
    pub quantity: i64,
    pub order_ids: Vec<String>,
}

#[derive(Debug, PartialEq, Eq, Hash)]
struct BidGroupKey {
    chain_id: i32,
    collection_address: String,
    token_id: String,
    price: String,
    marketplace_id: i32,
    expire_time: i64,
    kind: OrderKind,
}

pub async fn user_items(state: &AppState, user: &str) -> Result<Vec<ChainItem>, AppError> {
    let user = user.to_string();
    let store = state.store.clone();
    let merged = fetch_across_partitions(state.chain_ids(), move |chain_id| {
        let store = store.clone();
        let user = user.clone();
        async move { store.user_items(chain_id, &user).await }
    })
    .await
    .map_err(AppError::Internal)?;

    let names = state.config.chain_names_by_id();
    Ok(merged
        .into_iter()
        .flat_map(|(chain_id, items)| {
            let chain_name = names.get(&chain_id).cloned().unwrap_or_default();
            items.into_iter().map(move |item| ChainItem {
                chain_id,
                chain_name: chain_name.clone(),
                item,
            })
        })
        .collect())
}

/// Collections in which the user holds at least one item, with the
/// held count per collection.
#[derive(Debug, Clone, Serialize)]
pub struct UserCollection {
    pub chain_id: i32,
    pub chain_name: String,
    #[serde(flatten)]
    pub collection: Collection,
    pub held_amount: i64,
}

pub async fn user_collections(
    state: &AppState,
    user: &str,
) -> Result<Vec<UserCollection>, AppError> {
    let user = user.to_string();
    let store = state.store.clone();
    let merged = fetch_across_partitions(state.chain_ids(), move |chain_id| {
        let store = store.clone();
        let user = user.clone();
        async move {
            let items = store.user_items(chain_id, &user).await?;

            let mut held: HashMap<String, i64> = HashMap::new();
            for item in &items {
                *held.entry(item.collection_address.to_lowercase()).or_default() += 1;
            }

            let mut collections = Vec::with_capacity(held.len());
            for (address, held_amount) in held {
                if let Some(collection) = store.collection(chain_id, &address).await? {
                    collections.push((collection, held_amount));
                }
            }
            Ok(collections)
        }
    })
    .await
    .map_err(AppError::Internal)?;

    let names = state.config.chain_names_by_id();
    let mut rows: Vec<UserCollection> = merged
        .into_iter()
        .flat_map(|(chain_id, collections)| {
            let chain_name = names.get(&chain_id).cloned().unwrap_or_default();
            collections
                .into_iter()
                .map(move |(collection, held_amount)| UserCollection {
                    chain_id,
                    chain_name: chain_name.clone(),
                    collection,
                    held_amount,
                })
        })
        .collect();
    rows.sort_by(|a, b| b.held_amount.cmp(&a.held_amount));
    Ok(rows)
}

pub async fn user_listings(state: &AppState, user: &str) -> Result<Vec<ChainListing>, AppError> {
    let user = user.to_string();
    let store = state.store.clone();
    let merged = fetch_across_partitions(state.chain_ids(), move |chain_id| {
        let store = store.clone();
        let user = user.clone();
        async move { store.user_listings(chain_id, &user).await }
    })
    .await
    .map_err(AppError::Internal)?;

    let names = state.config.chain_names_by_id();
    let mut listings: Vec<ChainListing> = merged
        .into_iter()
        .flat_map(|(chain_id, orders)| {
            let chain_name = names.get(&chain_id).cloned().unwrap_or_default();
            orders.into_iter().map(move |order| ChainListing {
                chain_id,
                chain_name: chain_name.clone(),
                collection_address: order.collection_address.clone(),
                token_id: order.token_id.clone(),
                listing: ListingView {
                    order_id: order.order_id,
                    price: order.price,
                    marketplace_id: order.marketplace_id,
                    expire_time: order.expire_time,
                    maker: order.maker,
                    salt: order.salt,
                },
            })
        })
        .collect();
    listings.sort_by(|a, b| b.listing.expire_time.cmp(&a.listing.expire_time));
    Ok(listings)
}

pub async fn user_bids(state: &AppState, user: &str) -> Result<Vec<GroupedBid>, AppError> {
    let user = user.to_string();
    let store = state.store.clone();
    let merged = fetch_across_partitions(state.chain_ids(), move |chain_id| {
        let store = store.clone();
        let user = user.clone();
        async move { store.user_bids(chain_id, &user).await }
    })
    .await
    .map_err(AppError::Internal)?;

    let names = state.config.chain_names_by_id();
    let mut groups: HashMap<BidGroupKey, GroupedBid> = HashMap::new();
    for (chain_id, bids) in merged {
        let chain_name = names.get(&chain_id).cloned().unwrap_or_default();
        for bid in bids {
            let key = BidGroupKey {
                chain_id,
                collection_address: bid.collection_address.to_lowercase(),
                token_id: bid.token_id.clone(),
                price: bid.price.to_string(),
                marketplace_id: bid.marketplace_id,
                expire_time: bid.expire_time,
                kind: bid.kind,
            };
            let entry = groups.entry(key).or_insert_with(|| GroupedBid {
                chain_id,
                chain_name: chain_name.clone(),
                collection_address: bid.collection_address.clone(),
                token_id: bid.token_id.clone(),
                price: bid.price,
                marketplace_id: bid.marketplace_id,
                expire_time: bid.expire_time,
                bid_type: bid.kind.presented_bid_code(),
                quantity: 0,
                order_ids: Vec::new(),
            });
            entry.quantity += bid.quantity_remaining;
            entry.order_ids.push(bid.order_id);
        }
    }

    let mut rows: Vec<GroupedBid> = groups.into_values().collect();
    rows.sort_by(|a, b| b.expire_time.cmp(&a.expire_time));
    Ok(rows)
}
