//! Shared application state

use std::sync::Arc;

use crate::chain::{ChainClients, StaticChainClient};
use crate::config::Config;
use crate::kv::{KvStore, MemoryKv};
use crate::store::{Datastore, MemoryStore};

/// Handles shared by every request handler and middleware layer.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn Datastore>,
    pub kv: Arc<dyn KvStore>,
    pub chain_clients: Arc<ChainClients>,
}

impl AppState {
    pub fn new(
        config: Config,
        store: Arc<dyn Datastore>,
        kv: Arc<dyn KvStore>,
        chain_clients: ChainClients,
    ) -> Self {
        Self {
            config: Arc::new(config),
            store,
            kv,
            chain_clients: Arc::new(chain_clients),
        }
    }

    /// Fully in-process state for local runs and tests.
    pub fn in_memory(config: Config) -> Self {
        let mut chain_clients = ChainClients::new();
        for chain in &config.chains {
            chain_clients.insert(
                chain.chain_id,
                Arc::new(StaticChainClient::new()) as Arc<dyn crate::chain::ChainClient>,
            );
        }
        Self::new(
            config,
            Arc::new(MemoryStore::new()),
            Arc::new(MemoryKv::new()),
            chain_clients,
        )
    }

    /// Chain ids of every configured partition.
    pub fn chain_ids(&self) -> Vec<i32> {
        self.config.chains.iter().map(|c| c.chain_id).collect()
    }
}
