//! Server state management.
//!
//! One [`AccountService`] over one store, shared by every handler. The
//! store is chosen at startup and passed in; nothing is global.

use std::sync::Arc;

use sealchat_core::{AccountService, Database, KdfParams, MemoryStore, Store};

/// Store path that selects the in-memory store.
pub const MEMORY_STORE: &str = ":memory:";

/// Default SQLite file.
const DEFAULT_DB_PATH: &str = "sealchat.db";

/// Server configuration.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Port to listen on
    pub port: u16,
    /// SQLite file, or `:memory:` for a store that dies with the process
    pub db_path: String,
    /// Argon2id parameters for every wrap and unwrap. Must not change
    /// once users exist.
    pub kdf: KdfParams,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            db_path: DEFAULT_DB_PATH.to_string(),
            kdf: KdfParams::default(),
        }
    }
}

/// Shared server state.
#[derive(Clone)]
pub struct AppState {
    /// Registration, login, directory and envelopes
    pub accounts: AccountService,

    /// Server configuration.
    pub config: Arc<RelayConfig>,
}

impl AppState {
    /// Open the configured store and build the state around it.
    pub fn open(config: RelayConfig) -> sealchat_core::Result<Self> {
        let store: Arc<dyn Store> = if config.db_path == MEMORY_STORE {
            tracing::warn!("Using in-memory store; accounts are lost on restart");
            Arc::new(MemoryStore::new())
        } else {
            tracing::info!(path = config.db_path.as_str(), "Opening SQLite store");
            Arc::new(Database::open(Some(config.db_path.as_str()))?)
        };

        Ok(Self::with_store(config, store))
    }

    /// Build the state around an existing store.
    pub fn with_store(config: RelayConfig, store: Arc<dyn Store>) -> Self {
        Self {
            accounts: AccountService::new(store, config.kdf),
            config: Arc::new(config),
        }
    }
}
