//! Activity event taxonomy
//!
//! One bidirectional enum replaces the two parallel name/code maps of
//! the original schema, so the mappings cannot drift apart.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Activity event kind as recorded by the indexing pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Sale,
    Transfer,
    Offer,
    CancelOffer,
    CancelList,
    List,
    Mint,
    Buy,
    CollectionBid,
    ItemBid,
    CancelCollectionBid,
    CancelItemBid,
}

impl ActivityKind {
    /// Stable numeric code used in the replicated activity tables.
    pub fn code(self) -> i64 {
        match self {
            ActivityKind::Sale => 1,
            ActivityKind::Transfer => 2,
            ActivityKind::Offer => 3,
            ActivityKind::CancelOffer => 4,
            ActivityKind::CancelList => 5,
            ActivityKind::List => 6,
            ActivityKind::Mint => 7,
            ActivityKind::Buy => 8,
            ActivityKind::CollectionBid => 9,
            ActivityKind::ItemBid => 10,
            ActivityKind::CancelCollectionBid => 11,
            ActivityKind::CancelItemBid => 12,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(ActivityKind::Sale),
            2 => Some(ActivityKind::Transfer),
            3 => Some(ActivityKind::Offer),
            4 => Some(ActivityKind::CancelOffer),
            5 => Some(ActivityKind::CancelList),
            6 => Some(ActivityKind::List),
            7 => Some(ActivityKind::Mint),
            8 => Some(ActivityKind::Buy),
            9 => Some(ActivityKind::CollectionBid),
            10 => Some(ActivityKind::ItemBid),
            11 => Some(ActivityKind::CancelCollectionBid),
            12 => Some(ActivityKind::CancelItemBid),

            _ => None,
        }
    }

    /// Query-parameter name for this event kind.
    pub fn as_str(self) -> &'static str {
        match self {
            ActivityKind::Sale => "sale",
            ActivityKind::Transfer => "transfer",
            ActivityKind::Offer => "offer",
            ActivityKind::CancelOffer => "cancel_offer",
            ActivityKind::CancelList => "cancel_list",
            ActivityKind::List => "list",
            ActivityKind::Mint => "mint",
            ActivityKind::Buy => "buy",
            ActivityKind::CollectionBid => "collection_bid",
            ActivityKind::ItemBid => "item_bid",
            ActivityKind::CancelCollectionBid => "cancel_collection_bid",
            ActivityKind::CancelItemBid => "cancel_item_bid",
        }
    }

    /// Parse a query-parameter name; unknown names yield `None` and
    /// are skipped by filters rather than erroring.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "sale" => Some(ActivityKind::Sale),
            "transfer" => Some(ActivityKind::Transfer),
            "offer" => Some(ActivityKind::Offer),
            "cancel_offer" => Some(ActivityKind::CancelOffer),
            "cancel_list" => Some(ActivityKind::CancelList),
            "list" => Some(ActivityKind::List),
            "mint" => Some(ActivityKind::Mint),
            "buy" => Some(ActivityKind::Buy),
            "collection_bid" => Some(ActivityKind::CollectionBid),
            "item_bid" => Some(ActivityKind::ItemBid),
            "cancel_collection_bid" => Some(ActivityKind::CancelCollectionBid),
            "cancel_item_bid" => Some(ActivityKind::CancelItemBid),
            _ => None,
        }
    }

    pub const ALL: [ActivityKind; 12] = [
        ActivityKind::Sale,
        ActivityKind::Transfer,
        ActivityKind::Offer,
        ActivityKind::CancelOffer,
        ActivityKind::CancelList,
        ActivityKind::List,
        ActivityKind::Mint,
        ActivityKind::Buy,
        ActivityKind::CollectionBid,
        ActivityKind::ItemBid,
        ActivityKind::CancelCollectionBid,
        ActivityKind::CancelItemBid,
    ];
}

/// One activity row as replicated from a chain indexer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub id: i64,
    pub collection_address: String,
    pub token_id: String,
    pub kind: ActivityKind,
    pub from_address: String,
    pub to_address: String,
    pub price: Decimal,
    pub marketplace_id: i32,
    pub tx_hash: String,
    /// Unix seconds.
    pub event_time: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_and_code_round_trip_for_all_kinds() {
        for kind in ActivityKind::ALL {
            assert_eq!(ActivityKind::parse(kind.as_str()), Some(kind));
            assert_eq!(ActivityKind::from_code(kind.code()), Some(kind));
        }
    }

    #[test]
    fn test_unknown_names_are_skipped() {
        assert_eq!(ActivityKind::parse("airdrop"), None);
        assert_eq!(ActivityKind::from_code(99), None);
    }
}
