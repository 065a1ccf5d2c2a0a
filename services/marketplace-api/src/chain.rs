//! On-chain lookups
//!
//! The item-detail path cross-checks the replicated owner against the
//! chain. Lookups are best effort; a failed node call falls back to
//! the replicated value and is logged, never surfaced.

use std::collections::HashMap;

use async_trait::async_trait;
use dashmap::DashMap;
use types::prelude::ItemKey;

/// Read-only view of one chain's NFT contract state.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Current owner of a token, as the chain reports it.
    async fn nft_owner(&self, collection_address: &str, token_id: &str)
        -> anyhow::Result<String>;
}

/// Per-chain clients keyed by chain id.
pub type ChainClients = HashMap<i32, std::sync::Arc<dyn ChainClient>>;

/// Fixed-answer client for tests and local runs.
#[derive(Default)]
pub struct StaticChainClient {
    owners: DashMap<ItemKey, String>,
}

impl StaticChainClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_owner(&self, collection_address: &str, token_id: &str, owner: &str) {
        self.owners
            .insert(ItemKey::new(collection_address, token_id), owner.to_string());
    }
}

#[async_trait]
impl ChainClient for StaticChainClient {
    async fn nft_owner(
        &self,
        collection_address: &str,
        token_id: &str,
    ) -> anyhow::Result<String> {
        self.owners
            .get(&ItemKey::new(collection_address, token_id))
            .map(|owner| owner.clone())
            .ok_or_else(|| anyhow::anyhow!("token {collection_address}/{token_id} not found"))
    }
}
