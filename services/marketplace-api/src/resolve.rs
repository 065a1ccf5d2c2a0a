//! Best-bid resolution
//!
//! A token's best bid is chosen between its own item bids and the
//! collection-wide bids that could fill it. Collection bids carry a
//! quantity and can cover several tokens at once, so resolution over
//! a token set expands them into single-unit slots first and then
//! hands the slots out token by token.
//!
//! Tie-breaks are deliberate and load-bearing for clients:
//! - among item bids of equal price, the first one seen wins;
//! - a collection bid displaces an item bid only when its price is
//!   strictly greater, never on a tie.
//!
//! Callers pass pre-filtered live bids, but every entry point
//! re-checks `Order::is_live_bid` before comparing; a dead order
//! never wins a token.

use std::collections::HashMap;

use rust_decimal::Decimal;
use types::prelude::*;

/// Flattened presentation of a winning bid on one token.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct BestBidView {
    pub marketplace_id: i32,
    pub collection_address: String,
    pub token_id: String,
    pub order_id: String,
    pub event_time: i64,
    pub expire_time: i64,
    pub price: Decimal,
    pub salt: i64,
    pub bid_size: i64,
    pub bid_unfilled: i64,
    pub bidder: String,
    pub bid_type: i64,
}

impl BestBidView {
    /// Builds the view for `order` winning on `token_id`. Collection
    /// bids carry no token of their own, so the token always comes
    /// from the caller.
    pub fn from_order(order: &Order, token_id: &str) -> Self {
        Self {
            marketplace_id: order.marketplace_id,
            collection_address: order.collection_address.clone(),
            token_id: token_id.to_string(),
            order_id: order.order_id.clone(),
            event_time: order.event_time,
            expire_time: order.expire_time,
            price: order.price,
            salt: order.salt,
            bid_size: order.size,
            bid_unfilled: order.quantity_remaining,
            bidder: order.maker.clone(),
            bid_type: order.kind.presented_bid_code(),
        }
    }
}

/// Picks the best live bid from `bids`, keeping the earlier bid on
/// price ties.
pub fn best_bid<'a, I>(bids: I, now: i64) -> Option<&'a Order>
where
    I: IntoIterator<Item = &'a Order>,
{
    let mut best: Option<&Order> = None;
    for bid in bids {
        if !bid.is_live_bid(now) {
            continue;
        }
        match best {
            Some(current) if bid.price <= current.price => {}
            _ => best = Some(bid),
        }
    }
    best
}

/// Expands live collection bids into single-unit slots, highest price
/// first, capped at `max_slots`. The sort is stable so equally priced
/// bids keep their input order and the earlier bid's slots are
/// consumed first.
pub fn expand_collection_bids<'a>(
    bids: &'a [Order],
    max_slots: usize,
    now: i64,
) -> Vec<&'a Order> {
    let mut sorted: Vec<&Order> = bids.iter().filter(|b| b.is_live_bid(now)).collect();
    sorted.sort_by(|a, b| b.price.cmp(&a.price));

    let mut slots = Vec::with_capacity(max_slots.min(sorted.len()));
    for bid in sorted {
        for _ in 0..bid.quantity_remaining {
            if slots.len() == max_slots {
                return slots;
            }
            slots.push(bid);
        }
    }
    slots
}

/// Resolves the best bid for every token in `tokens`.
///
/// `item_bids` holds the already-chosen best item bid per token; a
/// dead entry is treated as no bid at all. Tokens with an item bid
/// are settled first: the top remaining collection slot takes the
/// token only when strictly higher priced, otherwise the item bid
/// stands and the slot stays available. The remaining slots then
/// cover the bidless tokens in caller order.
pub fn assign_bids(
    tokens: &[String],
    item_bids: &HashMap<String, Order>,
    collection_bids: &[Order],
    now: i64,
) -> HashMap<String, BestBidView> {
    let slots = expand_collection_bids(collection_bids, tokens.len(), now);
    let mut next_slot = 0usize;
    let mut winners = HashMap::with_capacity(tokens.len());

    for token_id in tokens {
        let Some(item_bid) = item_bids.get(token_id).filter(|b| b.is_live_bid(now)) else {
            continue;
        };
        let slot_beats_item = slots
            .get(next_slot)
            .map_or(false, |slot| slot.price > item_bid.price);
        if slot_beats_item {
            winners.insert(token_id.clone(), BestBidView::from_order(slots[next_slot], token_id));
            next_slot += 1;
        } else {
            winners.insert(token_id.clone(), BestBidView::from_order(item_bid, token_id));
        }
    }

    for token_id in tokens {
        if winners.contains_key(token_id) {
            continue;
        }
        let Some(slot) = slots.get(next_slot) else {
            break;
        };
        winners.insert(token_id.clone(), BestBidView::from_order(slot, token_id));
        next_slot += 1;
    }

    winners
}

/// Resolves the best bid for a single token from its item bids and
/// the collection-wide bids.
pub fn resolve_token_bid(
    token_id: &str,
    item_bids: &[Order],
    collection_bids: &[Order],
    now: i64,
) -> Option<BestBidView> {
    let item = best_bid(item_bids.iter(), now);
    let collection = best_bid(collection_bids.iter(), now);

    match (item, collection) {
        (Some(i), Some(c)) if c.price > i.price => Some(BestBidView::from_order(c, token_id)),
        (Some(i), _) => Some(BestBidView::from_order(i, token_id)),
        (None, Some(c)) => Some(BestBidView::from_order(c, token_id)),
        (None, None) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000;

    fn bid(order_id: &str, kind: OrderKind, price: i64, quantity: i64) -> Order {
        Order {
            order_id: order_id.to_string(),
            collection_address: "0xcol".to_string(),
            token_id: if kind == OrderKind::CollectionBid {
                COLLECTION_WIDE_TOKEN_ID.to_string()
            } else {
                "1".to_string()
            },
            kind,
            price: Decimal::from(price),
            quantity_remaining: quantity,
            size: quantity,
            maker: "0xbidder".to_string(),
            expire_time: i64::MAX,
            event_time: 0,
            salt: 7,
            marketplace_id: 1,
            status: OrderStatus::Active,
        }
    }

    fn tokens(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_best_bid_equal_price_first_seen_wins() {
        let bids = vec![
            bid("first", OrderKind::ItemBid, 10, 1),
            bid("second", OrderKind::ItemBid, 10, 1),
            bid("third", OrderKind::ItemBid, 9, 1),
        ];
        assert_eq!(best_bid(bids.iter(), NOW).unwrap().order_id, "first");
        assert!(best_bid(std::iter::empty(), NOW).is_none());
    }

    #[test]
    fn test_best_bid_skips_dead_orders() {
        let mut expired = bid("expired", OrderKind::ItemBid, 12, 1);
        expired.expire_time = NOW - 1;
        let mut cancelled = bid("cancelled", OrderKind::ItemBid, 11, 1);
        cancelled.status = OrderStatus::Cancelled;
        let bids = vec![expired, cancelled, bid("live", OrderKind::ItemBid, 9, 1)];

        assert_eq!(best_bid(bids.iter(), NOW).unwrap().order_id, "live");
        assert!(best_bid(bids[..2].iter(), NOW).is_none());
    }

    #[test]
    fn test_collection_bid_never_wins_ties() {
        let item = vec![bid("item", OrderKind::ItemBid, 10, 1)];
        let coll = vec![bid("coll", OrderKind::CollectionBid, 10, 5)];
        let winner = resolve_token_bid("1", &item, &coll, NOW).unwrap();
        assert_eq!(winner.order_id, "item");
        assert_eq!(winner.bid_type, OrderKind::ItemBid.code());

        let richer = vec![bid("coll", OrderKind::CollectionBid, 11, 5)];
        let winner = resolve_token_bid("1", &item, &richer, NOW).unwrap();
        assert_eq!(winner.order_id, "coll");
        // Collection kinds present with the offset stripped.
        assert_eq!(winner.bid_type, OrderKind::ItemBid.code());
        assert_eq!(winner.token_id, "1");
    }

    #[test]
    fn test_expand_orders_slots_by_price_desc() {
        let bids = vec![
            bid("low", OrderKind::CollectionBid, 8, 2),
            bid("high", OrderKind::CollectionBid, 10, 3),
        ];
        let slots = expand_collection_bids(&bids, 4, NOW);
        let ids: Vec<_> = slots.iter().map(|s| s.order_id.as_str()).collect();
        assert_eq!(ids, ["high", "high", "high", "low"]);
    }

    #[test]
    fn test_expand_ignores_depleted_and_dead_bids() {
        let mut expired = bid("expired", OrderKind::CollectionBid, 12, 2);
        expired.expire_time = NOW - 1;
        let bids = vec![bid("empty", OrderKind::CollectionBid, 10, 0), expired];
        assert!(expand_collection_bids(&bids, 4, NOW).is_empty());
    }

    #[test]
    fn test_assign_spreads_collection_slots_across_tokens() {
        let toks = tokens(&["a", "b", "c", "d"]);
        let coll = vec![
            bid("big", OrderKind::CollectionBid, 10, 3),
            bid("small", OrderKind::CollectionBid, 8, 2),
        ];
        let winners = assign_bids(&toks, &HashMap::new(), &coll, NOW);
        assert_eq!(winners["a"].price, Decimal::from(10));
        assert_eq!(winners["b"].price, Decimal::from(10));
        assert_eq!(winners["c"].price, Decimal::from(10));
        assert_eq!(winners["d"].price, Decimal::from(8));
        assert_eq!(winners["d"].order_id, "small");
        assert_eq!(winners["d"].token_id, "d");
    }

    #[test]
    fn test_assign_item_bids_settle_before_bidless_tokens() {
        let toks = tokens(&["a", "b"]);
        let mut item_bids = HashMap::new();
        item_bids.insert("b".to_string(), bid("item", OrderKind::ItemBid, 10, 1));
        // One slot at 10: ties with the item bid on "b", so the item
        // bid stands and the slot falls through to "a".
        let coll = vec![bid("coll", OrderKind::CollectionBid, 10, 1)];

        let winners = assign_bids(&toks, &item_bids, &coll, NOW);
        assert_eq!(winners["b"].order_id, "item");
        assert_eq!(winners["a"].order_id, "coll");
    }

    #[test]
    fn test_assign_treats_dead_item_bid_as_no_bid() {
        let toks = tokens(&["a"]);
        let mut item_bids = HashMap::new();
        let mut dead = bid("dead", OrderKind::ItemBid, 99, 1);
        dead.expire_time = NOW - 1;
        item_bids.insert("a".to_string(), dead);
        let coll = vec![bid("coll", OrderKind::CollectionBid, 10, 1)];

        // A slipped-through expired item bid must not win; the token
        // falls back to the collection slot.
        let winners = assign_bids(&toks, &item_bids, &coll, NOW);
        assert_eq!(winners["a"].order_id, "coll");

        assert!(assign_bids(&toks, &item_bids, &[], NOW).is_empty());
    }

    #[test]
    fn test_assign_collection_slot_displaces_cheaper_item_bid() {
        let toks = tokens(&["a", "b"]);
        let mut item_bids = HashMap::new();
        item_bids.insert("a".to_string(), bid("item", OrderKind::ItemBid, 9, 1));
        let coll = vec![bid("coll", OrderKind::CollectionBid, 10, 1)];

        let winners = assign_bids(&toks, &item_bids, &coll, NOW);
        assert_eq!(winners["a"].order_id, "coll");
        // The only slot was consumed; the bidless token gets nothing.
        assert!(!winners.contains_key("b"));
    }

    #[test]
    fn test_assign_no_bids_at_all() {
        let winners = assign_bids(&tokens(&["a"]), &HashMap::new(), &[], NOW);
        assert!(winners.is_empty());
    }
}
