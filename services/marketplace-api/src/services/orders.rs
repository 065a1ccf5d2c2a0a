//! Batch order info: best bid and listing per token
//!
//! The heart of the read path. For a batch of tokens in one
//! collection, bids and listings are pulled in parallel and every
//! token's effective best bid is resolved against both the item-level
//! and the collection-wide bid books.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::Serialize;
use types::prelude::*;

use crate::error::AppError;
use crate::resolve::{self, BestBidView};
use crate::state::AppState;
use crate::store::unix_now;

/// A valid listing on one token, flattened for the response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListingView {
    pub order_id: String,
    pub price: Decimal,
    pub marketplace_id: i32,
    pub expire_time: i64,
    pub maker: String,
    pub salt: i64,
}

impl ListingView {
    fn from_order(order: &Order) -> Self {
        Self {
            order_id: order.order_id.clone(),
            price: order.price,
            marketplace_id: order.marketplace_id,
            expire_time: order.expire_time,
            maker: order.maker.clone(),
            salt: order.salt,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderInfo {
    pub collection_address: String,
    pub token_id: String,
    pub best_bid: Option<BestBidView>,
    pub listing: Option<ListingView>,
}

/// Best item-level bid per token, first-seen winning price ties.
pub(crate) fn best_item_bids(bids: &[Order]) -> HashMap<String, Order> {
    let mut best: HashMap<String, Order> = HashMap::new();
    for bid in bids {
        match best.get(&bid.token_id) {
            Some(current) if bid.price <= current.price => {}
            _ => {
                best.insert(bid.token_id.clone(), bid.clone());
            }
        }
    }
    best
}

/// Cheapest listing per token. A listing only counts while the
/// token's current owner is still its maker.
pub(crate) fn cheapest_owned_listings(
    listings: &[Order],
    owners: &HashMap<String, String>,
) -> HashMap<String, ListingView> {
    let mut best: HashMap<String, Order> = HashMap::new();
    for listing in listings {
        let owned = owners
            .get(&listing.token_id)
            .map_or(false, |owner| owner.eq_ignore_ascii_case(&listing.maker));
        if !owned {
            continue;
        }
        match best.get(&listing.token_id) {
            Some(current) if listing.price >= current.price => {}
            _ => {
                best.insert(listing.token_id.clone(), listing.clone());
            }
        }
    }
    best.into_iter()
        .map(|(token_id, order)| (token_id, ListingView::from_order(&order)))
        .collect()
}

pub async fn order_infos(
    state: &AppState,
    chain_id: i32,
    collection_address: &str,
    token_ids: Vec<String>,
) -> Result<Vec<OrderInfo>, AppError> {
    if token_ids.is_empty() {
        return Err(AppError::BadRequest("token_ids must not be empty".to_string()));
    }

    let (item_bids, collection_bids, listings) = tokio::try_join!(
        state.store.item_bids(chain_id, collection_address, &token_ids),
        state
            .store
            .collection_bids(chain_id, collection_address, token_ids.len()),
        state.store.listings(chain_id, collection_address, &token_ids),
    )
    .map_err(AppError::Internal)?;

    let mut owners = HashMap::new();
    for token_id in &token_ids {
        if let Some(item) = state
            .store
            .item(chain_id, collection_address, token_id)
            .await
            .map_err(AppError::Internal)?
        {
            owners.insert(token_id.clone(), item.owner);
        }
    }

    let item_best = best_item_bids(&item_bids);
    let mut bid_winners = resolve::assign_bids(&token_ids, &item_best, &collection_bids, unix_now());
    let mut listing_views = cheapest_owned_listings(&listings, &owners);

    Ok(token_ids
        .into_iter()
        .map(|token_id| OrderInfo {
            collection_address: collection_address.to_string(),
            best_bid: bid_winners.remove(&token_id),
            listing: listing_views.remove(&token_id),
            token_id,
        })
        .collect())
}
