//! Read-side datastore
//!
//! Every query the service runs against the replicated per-chain
//! tables goes through [`Datastore`]. Production deployments back it
//! with the indexer database; [`MemoryStore`] implements the same
//! contract over in-process tables for tests and local runs.
//!
//! The only write on this path is [`Datastore::update_item_owner`],
//! which narrows the replicated owner to what the chain reports when
//! the two disagree.

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use dashmap::DashMap;
use rust_decimal::Decimal;
use serde::Serialize;
use types::prelude::*;

pub fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// Activity query filter. Serialized form doubles as the count-cache
/// key, so field order and names are part of the persisted format.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ActivityFilter {
    pub chain_id: i32,
    pub collection_address: Option<String>,
    pub token_id: Option<String>,
    pub user_address: Option<String>,
    pub event_kinds: Vec<ActivityKind>,
}

impl ActivityFilter {
    fn matches(&self, activity: &Activity) -> bool {
        if let Some(collection) = &self.collection_address {
            if !activity.collection_address.eq_ignore_ascii_case(collection) {
                return false;
            }
        }
        if let Some(token_id) = &self.token_id {
            if &activity.token_id != token_id {
                return false;
            }
        }
        if let Some(user) = &self.user_address {
            if !activity.from_address.eq_ignore_ascii_case(user)
                && !activity.to_address.eq_ignore_ascii_case(user)
            {
                return false;
            }
        }
        if !self.event_kinds.is_empty() && !self.event_kinds.contains(&activity.kind) {
            return false;
        }
        true
    }
}

/// One timestamped sale price, for history charts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PricePoint {
    pub event_time: i64,
    pub price: Decimal,
}

/// Read access to one deployment's replicated chain tables.
///
/// Methods are per chain; cross-chain endpoints fan out over them one
/// task per chain. Bid and listing queries return only live orders
/// (active status, remaining quantity, unexpired), matching the
/// predicate in `Order::is_live_bid`.
#[async_trait]
pub trait Datastore: Send + Sync {
    /// Live item-level bids on the given tokens, unordered.
    async fn item_bids(
        &self,
        chain_id: i32,
        collection_address: &str,
        token_ids: &[String],
    ) -> anyhow::Result<Vec<Order>>;

    /// Live collection-wide bids, highest price first, at most `limit`.
    async fn collection_bids(
        &self,
        chain_id: i32,
        collection_address: &str,
        limit: usize,
    ) -> anyhow::Result<Vec<Order>>;

    /// Live listings on the given tokens, unordered. Callers must
    /// still check the listing maker against the current item owner.
    async fn listings(
        &self,
        chain_id: i32,
        collection_address: &str,
        token_ids: &[String],
    ) -> anyhow::Result<Vec<Order>>;

    /// Live bids placed by `user` across all collections on the chain.
    async fn user_bids(&self, chain_id: i32, user: &str) -> anyhow::Result<Vec<Order>>;

    /// Live listings placed by `user` across all collections.
    async fn user_listings(&self, chain_id: i32, user: &str) -> anyhow::Result<Vec<Order>>;

    async fn item(
        &self,
        chain_id: i32,
        collection_address: &str,
        token_id: &str,
    ) -> anyhow::Result<Option<Item>>;

    /// Items of a collection, token-id order, with the total count.
    async fn items_page(
        &self,
        chain_id: i32,
        collection_address: &str,
        offset: usize,
        limit: usize,
    ) -> anyhow::Result<(Vec<Item>, i64)>;

    async fn user_items(&self, chain_id: i32, user: &str) -> anyhow::Result<Vec<Item>>;

    /// Overwrites the replicated owner with what the chain reported.
    async fn update_item_owner(
        &self,
        chain_id: i32,
        collection_address: &str,
        token_id: &str,
        owner: &str,
    ) -> anyhow::Result<()>;

    async fn collection(
        &self,
        chain_id: i32,
        address: &str,
    ) -> anyhow::Result<Option<Collection>>;

    /// Collections in id order, for bulk reloads.
    async fn collections_page(
        &self,
        chain_id: i32,
        offset: usize,
        limit: usize,
    ) -> anyhow::Result<Vec<Collection>>;

    /// Count of distinct listed tokens in a collection.
    async fn listed_count(&self, chain_id: i32, collection_address: &str)
        -> anyhow::Result<i64>;

    /// Activities newest first.
    async fn activities(
        &self,
        filter: &ActivityFilter,
        offset: usize,
        limit: usize,
    ) -> anyhow::Result<Vec<Activity>>;

    async fn activities_count(&self, filter: &ActivityFilter) -> anyhow::Result<i64>;

    /// Total sale volume of a collection since `since`.
    async fn collection_volume(
        &self,
        chain_id: i32,
        collection_address: &str,
        since: i64,
    ) -> anyhow::Result<Decimal>;

    /// Sale prices since `since`, oldest first.
    async fn history_sales(
        &self,
        chain_id: i32,
        collection_address: &str,
        since: i64,
    ) -> anyhow::Result<Vec<PricePoint>>;

    /// Cheapest live listing price in a collection.
    async fn floor_price(
        &self,
        chain_id: i32,
        collection_address: &str,
    ) -> anyhow::Result<Option<Decimal>>;
}

#[derive(Default)]
struct ChainTables {
    orders: Vec<Order>,
    items: HashMap<ItemKey, Item>,
    collections: HashMap<String, Collection>,
    activities: Vec<Activity>,
}

/// In-process datastore over per-chain tables.
#[derive(Default)]
pub struct MemoryStore {
    chains: DashMap<i32, ChainTables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_order(&self, chain_id: i32, order: Order) {
        self.chains.entry(chain_id).or_default().orders.push(order);
    }

    pub fn insert_item(&self, chain_id: i32, item: Item) {
        let key = ItemKey::new(&item.collection_address, &item.token_id);
        self.chains.entry(chain_id).or_default().items.insert(key, item);
    }

    pub fn insert_collection(&self, chain_id: i32, collection: Collection) {
        self.chains
            .entry(chain_id)
            .or_default()
            .collections
            .insert(collection.address.to_lowercase(), collection);
    }

    pub fn insert_activity(&self, chain_id: i32, activity: Activity) {
        self.chains.entry(chain_id).or_default().activities.push(activity);
    }

    fn with_chain<T>(&self, chain_id: i32, f: impl FnOnce(&ChainTables) -> T) -> T {
        match self.chains.get(&chain_id) {
            Some(tables) => f(&tables),
            None => f(&ChainTables::default()),
        }
    }

    fn live_orders<'a>(
        tables: &'a ChainTables,
        now: i64,
    ) -> impl Iterator<Item = &'a Order> + 'a {
        tables.orders.iter().filter(move |o| {
            o.status == OrderStatus::Active && o.quantity_remaining > 0 && o.expire_time > now
        })
    }
}

#[async_trait]
impl Datastore for MemoryStore {
    async fn item_bids(
        &self,
        chain_id: i32,
        collection_address: &str,
        token_ids: &[String],
    ) -> anyhow::Result<Vec<Order>> {
        let now = unix_now();
        Ok(self.with_chain(chain_id, |t| {
            Self::live_orders(t, now)
                .filter(|o| o.kind == OrderKind::ItemBid)
                .filter(|o| o.collection_address.eq_ignore_ascii_case(collection_address))
                .filter(|o| token_ids.contains(&o.token_id))
                .cloned()
                .collect()
        }))
    }

    async fn collection_bids(
        &self,
        chain_id: i32,
        collection_address: &str,
        limit: usize,
    ) -> anyhow::Result<Vec<Order>> {
        let now = unix_now();
        Ok(self.with_chain(chain_id, |t| {
            let mut bids: Vec<Order> = Self::live_orders(t, now)
                .filter(|o| o.kind == OrderKind::CollectionBid)
                .filter(|o| o.collection_address.eq_ignore_ascii_case(collection_address))
                .cloned()
                .collect();
            bids.sort_by(|a, b| b.price.cmp(&a.price));
            bids.truncate(limit);
            bids
        }))
    }

    async fn listings(
        &self,
        chain_id: i32,
        collection_address: &str,
        token_ids: &[String],
    ) -> anyhow::Result<Vec<Order>> {
        let now = unix_now();
        Ok(self.with_chain(chain_id, |t| {
            Self::live_orders(t, now)
                .filter(|o| o.kind == OrderKind::Listing)
                .filter(|o| o.collection_address.eq_ignore_ascii_case(collection_address))
                .filter(|o| token_ids.contains(&o.token_id))
                .cloned()
                .collect()
        }))
    }

    async fn user_bids(&self, chain_id: i32, user: &str) -> anyhow::Result<Vec<Order>> {
        let now = unix_now();
        Ok(self.with_chain(chain_id, |t| {
            Self::live_orders(t, now)
                .filter(|o| o.kind.is_bid())
                .filter(|o| o.maker.eq_ignore_ascii_case(user))
                .cloned()
                .collect()
        }))
    }

    async fn user_listings(&self, chain_id: i32, user: &str) -> anyhow::Result<Vec<Order>> {
        let now = unix_now();
        Ok(self.with_chain(chain_id, |t| {
            Self::live_orders(t, now)
                .filter(|o| o.kind == OrderKind::Listing)
                .filter(|o| o.maker.eq_ignore_ascii_case(user))
                .cloned()
                .collect()
        }))
    }

    async fn item(
        &self,
        chain_id: i32,
        collection_address: &str,
        token_id: &str,
    ) -> anyhow::Result<Option<Item>> {
        let key = ItemKey::new(collection_address, token_id);
        Ok(self.with_chain(chain_id, |t| t.items.get(&key).cloned()))
    }

    async fn items_page(
        &self,
        chain_id: i32,
        collection_address: &str,
        offset: usize,
        limit: usize,
    ) -> anyhow::Result<(Vec<Item>, i64)> {
        Ok(self.with_chain(chain_id, |t| {
            let mut items: Vec<Item> = t
                .items
                .values()
                .filter(|i| i.collection_address.eq_ignore_ascii_case(collection_address))
                .cloned()
                .collect();
            items.sort_by(|a, b| a.token_id.cmp(&b.token_id));
            let total = items.len() as i64;
            let page = items.into_iter().skip(offset).take(limit).collect();
            (page, total)
        }))
    }

    async fn user_items(&self, chain_id: i32, user: &str) -> anyhow::Result<Vec<Item>> {
        Ok(self.with_chain(chain_id, |t| {
            t.items
                .values()
                .filter(|i| i.owner.eq_ignore_ascii_case(user))
                .cloned()
                .collect()
        }))
    }

    async fn update_item_owner(
        &self,
        chain_id: i32,
        collection_address: &str,
        token_id: &str,
        owner: &str,
    ) -> anyhow::Result<()> {
        let key = ItemKey::new(collection_address, token_id);
        if let Some(mut tables) = self.chains.get_mut(&chain_id) {
            if let Some(item) = tables.items.get_mut(&key) {
                item.owner = owner.to_string();
            }
        }
        Ok(())
    }

    async fn collection(
        &self,
        chain_id: i32,
        address: &str,
    ) -> anyhow::Result<Option<Collection>> {
        Ok(self.with_chain(chain_id, |t| t.collections.get(&address.to_lowercase()).cloned()))
    }

    async fn collections_page(
        &self,
        chain_id: i32,
        offset: usize,
        limit: usize,
    ) -> anyhow::Result<Vec<Collection>> {
        Ok(self.with_chain(chain_id, |t| {
            let mut all: Vec<Collection> = t.collections.values().cloned().collect();
            all.sort_by_key(|c| c.id);
            all.into_iter().skip(offset).take(limit).collect()
        }))
    }

    async fn listed_count(
        &self,
        chain_id: i32,
        collection_address: &str,
    ) -> anyhow::Result<i64> {
        let now = unix_now();
        Ok(self.with_chain(chain_id, |t| {
            let mut listed: Vec<&str> = Self::live_orders(t, now)
                .filter(|o| o.kind == OrderKind::Listing)
                .filter(|o| o.collection_address.eq_ignore_ascii_case(collection_address))
                .map(|o| o.token_id.as_str())
                .collect();
            listed.sort_unstable();
            listed.dedup();
            listed.len() as i64
        }))
    }

    async fn activities(
        &self,
        filter: &ActivityFilter,
        offset: usize,
        limit: usize,
    ) -> anyhow::Result<Vec<Activity>> {
        Ok(self.with_chain(filter.chain_id, |t| {
            let mut matched: Vec<Activity> = t
                .activities
                .iter()
                .filter(|a| filter.matches(a))
                .cloned()
                .collect();
            matched.sort_by(|a, b| b.event_time.cmp(&a.event_time).then(b.id.cmp(&a.id)));
            matched.into_iter().skip(offset).take(limit).collect()
        }))
    }

    async fn activities_count(&self, filter: &ActivityFilter) -> anyhow::Result<i64> {
        Ok(self.with_chain(filter.chain_id, |t| {
            t.activities.iter().filter(|a| filter.matches(a)).count() as i64
        }))
    }

    async fn collection_volume(
        &self,
        chain_id: i32,
        collection_address: &str,
        since: i64,
    ) -> anyhow::Result<Decimal> {
        Ok(self.with_chain(chain_id, |t| {
            t.activities
                .iter()
                .filter(|a| a.kind == ActivityKind::Sale)
                .filter(|a| a.event_time >= since)
                .filter(|a| a.collection_address.eq_ignore_ascii_case(collection_address))
                .map(|a| a.price)
                .sum()
        }))
    }

    async fn history_sales(
        &self,
        chain_id: i32,
        collection_address: &str,
        since: i64,
    ) -> anyhow::Result<Vec<PricePoint>> {
        Ok(self.with_chain(chain_id, |t| {
            let mut points: Vec<PricePoint> = t
                .activities
                .iter()
                .filter(|a| a.kind == ActivityKind::Sale)
                .filter(|a| a.event_time >= since)
                .filter(|a| a.collection_address.eq_ignore_ascii_case(collection_address))
                .map(|a| PricePoint { event_time: a.event_time, price: a.price })
                .collect();
            points.sort_by_key(|p| p.event_time);
            points
        }))
    }

    async fn floor_price(
        &self,
        chain_id: i32,
        collection_address: &str,
    ) -> anyhow::Result<Option<Decimal>> {
        let now = unix_now();
        Ok(self.with_chain(chain_id, |t| {
            Self::live_orders(t, now)
                .filter(|o| o.kind == OrderKind::Listing)
                .filter(|o| o.collection_address.eq_ignore_ascii_case(collection_address))
                .map(|o| o.price)
                .min()
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(order_id: &str, kind: OrderKind, token_id: &str, price: i64, maker: &str) -> Order {
        Order {
            order_id: order_id.to_string(),
            collection_address: "0xCol".to_string(),
            token_id: token_id.to_string(),
            kind,
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

    fn activity(id: i64, kind: ActivityKind, price: i64, event_time: i64) -> Activity {
        Activity {
            id,
            collection_address: "0xcol".to_string(),
            token_id: "1".to_string(),
            kind,
            from_address: "0xseller".to_string(),
            to_address: "0xbuyer".to_string(),
            price: Decimal::from(price),
            marketplace_id: 1,
            tx_hash: "0xhash".to_string(),
            event_time,
        }
    }

    #[tokio::test]
    async fn test_dead_orders_invisible_to_queries() {
        let store = MemoryStore::new();
        store.insert_order(1, order("live", OrderKind::Listing, "1", 5, "0xa"));

        let mut expired = order("expired", OrderKind::Listing, "2", 3, "0xa");
        expired.expire_time = unix_now() - 1;
        store.insert_order(1, expired);

        let mut cancelled = order("cancelled", OrderKind::Listing, "3", 2, "0xa");
        cancelled.status = OrderStatus::Cancelled;
        store.insert_order(1, cancelled);

        let tokens: Vec<String> = vec!["1".into(), "2".into(), "3".into()];
        let listings = store.listings(1, "0xcol", &tokens).await.unwrap();
        assert_eq!(listings.len(), 1);
        assert_eq!(listings[0].order_id, "live");

        // Floor ignores the dead orders too.
        assert_eq!(store.floor_price(1, "0xCOL").await.unwrap(), Some(Decimal::from(5)));
    }

    #[tokio::test]
    async fn test_collection_bids_ordered_and_limited() {
        let store = MemoryStore::new();
        for (id, price) in [("a", 5), ("b", 9), ("c", 7)] {
            let mut o = order(id, OrderKind::CollectionBid, "", price, "0xbidder");
            o.token_id = COLLECTION_WIDE_TOKEN_ID.to_string();
            store.insert_order(1, o);
        }
        let bids = store.collection_bids(1, "0xcol", 2).await.unwrap();
        let ids: Vec<_> = bids.iter().map(|b| b.order_id.as_str()).collect();
        assert_eq!(ids, ["b", "c"]);
    }

    #[tokio::test]
    async fn test_chains_are_isolated() {
        let store = MemoryStore::new();
        store.insert_order(1, order("eth", OrderKind::Listing, "1", 5, "0xa"));
        store.insert_order(10, order("op", OrderKind::Listing, "1", 6, "0xa"));

        let tokens = vec!["1".to_string()];
        let eth = store.listings(1, "0xcol", &tokens).await.unwrap();
        assert_eq!(eth.len(), 1);
        assert_eq!(eth[0].order_id, "eth");
        assert!(store.listings(137, "0xcol", &tokens).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_activity_filter_and_order() {
        let store = MemoryStore::new();
        store.insert_activity(1, activity(1, ActivityKind::Sale, 10, 100));
        store.insert_activity(1, activity(2, ActivityKind::List, 11, 200));
        store.insert_activity(1, activity(3, ActivityKind::Sale, 12, 300));

        let filter = ActivityFilter {
            chain_id: 1,
            event_kinds: vec![ActivityKind::Sale],
            ..Default::default()
        };
        let rows = store.activities(&filter, 0, 10).await.unwrap();
        assert_eq!(rows.iter().map(|a| a.id).collect::<Vec<_>>(), vec![3, 1]);
        assert_eq!(store.activities_count(&filter).await.unwrap(), 2);

        let by_user = ActivityFilter {
            chain_id: 1,
            user_address: Some("0xBUYER".to_string()),
            ..Default::default()
        };
        assert_eq!(store.activities_count(&by_user).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_volume_and_history_window() {
        let store = MemoryStore::new();
        store.insert_activity(1, activity(1, ActivityKind::Sale, 10, 100));
        store.insert_activity(1, activity(2, ActivityKind::Sale, 20, 300));
        store.insert_activity(1, activity(3, ActivityKind::Transfer, 99, 300));

        assert_eq!(
            store.collection_volume(1, "0xcol", 0).await.unwrap(),
            Decimal::from(30)
        );
        assert_eq!(
            store.collection_volume(1, "0xcol", 200).await.unwrap(),
            Decimal::from(20)
        );

        let points = store.history_sales(1, "0xcol", 0).await.unwrap();
        assert_eq!(points.len(), 2);
        assert!(points[0].event_time < points[1].event_time);
    }

    #[tokio::test]
    async fn test_owner_update_is_narrow() {
        let store = MemoryStore::new();
        store.insert_item(
            1,
            Item {
                chain_id: 1,
                collection_address: "0xcol".to_string(),
                token_id: "1".to_string(),
                owner: "0xold".to_string(),
                name: "One".to_string(),
            },
        );
        store.update_item_owner(1, "0xCOL", "1", "0xnew").await.unwrap();
        let item = store.item(1, "0xcol", "1").await.unwrap().unwrap();
        assert_eq!(item.owner, "0xnew");
        assert_eq!(item.name, "One");

        // Unknown items are a no-op, not an error.
        store.update_item_owner(1, "0xcol", "404", "0xnew").await.unwrap();
    }
}
