//! Order-book record types
//!
//! Orders are replicated into per-chain tables by the indexing
//! pipeline; this service only reads them. A collection-wide bid
//! carries an empty `token_id` and may fill against any item in the
//! collection up to its remaining quantity.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Code distance between an item-level bid kind and its
/// collection-level counterpart. Presentation strips this offset so
/// clients see a single bid-type code space.
pub const COLLECTION_BID_OFFSET: i64 = 3;

/// Sentinel token id carried by collection-wide orders.
pub const COLLECTION_WIDE_TOKEN_ID: &str = "";

/// Raised when a numeric order kind or status code from storage does
/// not map to a known variant.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OrderCodeError {
    #[error("unknown order kind code: {0}")]
    UnknownKind(i64),

    #[error("unknown order status code: {0}")]
    UnknownStatus(i64),
}

/// Order kind, replacing the parallel name/code lookup tables of the
/// original schema with one exhaustive enum.
///
/// Bid-family collection codes sit exactly `COLLECTION_BID_OFFSET`
/// above their item-level counterparts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderKind {
    Listing,
    ItemBid,
    CancelItemBid,
    CancelListing,
    CollectionBid,
    CancelCollectionBid,
}

impl OrderKind {
    /// Stable numeric code used in the replicated tables.
    pub fn code(self) -> i64 {
        match self {
            OrderKind::Listing => 1,
            OrderKind::ItemBid => 2,
            OrderKind::CancelItemBid => 3,
            OrderKind::CancelListing => 4,
            OrderKind::CollectionBid => 5,
            OrderKind::CancelCollectionBid => 6,
        }
    }

    pub fn from_code(code: i64) -> Result<Self, OrderCodeError> {
        match code {
            1 => Ok(OrderKind::Listing),
            2 => Ok(OrderKind::ItemBid),
            3 => Ok(OrderKind::CancelItemBid),
            4 => Ok(OrderKind::CancelListing),
            5 => Ok(OrderKind::CollectionBid),
            6 => Ok(OrderKind::CancelCollectionBid),
            other => Err(OrderCodeError::UnknownKind(other)),
        }
    }

    /// Bid-type code shown to clients: collection-level codes are
    /// folded onto the item-level code space by stripping the offset.
    pub fn presented_bid_code(self) -> i64 {
        let code = self.code();
        if code >= COLLECTION_BID_OFFSET {
            code - COLLECTION_BID_OFFSET
        } else {
            code
        }
    }

    /// Whether this kind is a bid (item- or collection-level).
    pub fn is_bid(self) -> bool {
        matches!(self, OrderKind::ItemBid | OrderKind::CollectionBid)
    }
}

/// Order lifecycle status in the replicated tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Active,
    Expired,
    Filled,
    Cancelled,
}

impl OrderStatus {
    pub fn code(self) -> i64 {
        match self {
            OrderStatus::Active => 1,
            OrderStatus::Expired => 2,
            OrderStatus::Filled => 3,
            OrderStatus::Cancelled => 4,
        }
    }

    pub fn from_code(code: i64) -> Result<Self, OrderCodeError> {
        match code {
            1 => Ok(OrderStatus::Active),
            2 => Ok(OrderStatus::Expired),
            3 => Ok(OrderStatus::Filled),
            4 => Ok(OrderStatus::Cancelled),
            other => Err(OrderCodeError::UnknownStatus(other)),
        }
    }
}

/// One order-book row as replicated from a chain indexer.
///
/// Immutable from this service's point of view; the ingestion
/// pipeline owns creation and state transitions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: String,
    pub collection_address: String,
    /// Empty for collection-wide orders.
    pub token_id: String,
    pub kind: OrderKind,
    pub price: Decimal,
    pub quantity_remaining: i64,
    pub size: i64,
    pub maker: String,
    /// Unix seconds.
    pub expire_time: i64,
    /// Unix seconds.
    pub event_time: i64,
    pub salt: i64,
    pub marketplace_id: i32,
    pub status: OrderStatus,
}

impl Order {
    /// Whether this order targets the whole collection rather than a
    /// single token.
    pub fn is_collection_wide(&self) -> bool {
        self.token_id == COLLECTION_WIDE_TOKEN_ID
    }

    /// Whether the order can still be a best-bid candidate at `now`.
    ///
    /// The query layer filters on the same predicate; resolution
    /// re-checks it defensively before comparing.
    pub fn is_live_bid(&self, now: i64) -> bool {
        self.kind.is_bid()
            && self.status == OrderStatus::Active
            && self.quantity_remaining > 0
            && self.expire_time > now
    }
}
