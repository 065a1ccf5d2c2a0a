//! Item and collection metadata rows
//!
//! Replicated per chain by the ingestion pipeline. An item's `owner`
//! is authoritative for listing validity: a listing order only counts
//! while the current owner is still its maker.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One NFT item row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub chain_id: i32,
    pub collection_address: String,
    pub token_id: String,
    pub owner: String,
    pub name: String,
}

/// One collection metadata row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    pub id: i64,
    pub chain_id: i32,
    pub address: String,
    pub name: String,
    pub symbol: String,
    pub image_uri: String,
    pub floor_price: Decimal,
    pub sale_price: Decimal,
    pub item_amount: i64,
    pub owner_amount: i64,
}

/// Canonical lookup key for an item: lowercased collection address
/// plus token id. Addresses arrive in mixed case from different
/// indexers, so every map keyed by item goes through this.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ItemKey {
    pub collection_address: String,
    pub token_id: String,
}

impl ItemKey {
    pub fn new(collection_address: &str, token_id: &str) -> Self {
        Self {
            collection_address: collection_address.to_lowercase(),
            token_id: token_id.to_string(),
        }
    }
}
