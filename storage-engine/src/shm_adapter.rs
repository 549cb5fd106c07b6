use crate::shm_store::ShmStore;
use async_trait::async_trait;
use kiln::domain::AdapterConfig;
use kiln::expiry::Lifetime;
use kiln::ports::CacheAdapter;
use shared::{Entries, Key};
use std::sync::Arc;

/// Adapter over the shared-memory store.
///
/// Stateless apart from its config: every key lives in the store, under the
/// configured namespace. Bulk calls go straight to the store's multi-key primitives
/// and counters to its atomic `inc`/`dec`.
pub struct ShmAdapter {
    config: AdapterConfig,
    store: Arc<ShmStore>,
}

impl ShmAdapter {
    /// Adapter bound to the process-wide store.
    pub fn new(config: AdapterConfig) -> Self {
        Self::with_store(config, ShmStore::global())
    }

    pub fn with_store(config: AdapterConfig, store: Arc<ShmStore>) -> Self {
        Self { config, store }
    }

    pub fn store(&self) -> &Arc<ShmStore> {
        &self.store
    }
}

#[async_trait]
impl CacheAdapter for ShmAdapter {
    fn available() -> bool {
        ShmStore::global().is_enabled()
    }

    fn enabled(&self) -> bool {
        self.store.is_enabled()
    }

    fn config(&self) -> &AdapterConfig {
        &self.config
    }

    async fn clear(&self) -> bool {
        self.store.clear(&self.config.namespace)
    }

    async fn store_entries(&self, entries: Entries, lifetime: Lifetime) -> bool {
        let failed = self
            .store
            .store_many(&self.config.namespace, entries, lifetime.ttl());
        if !failed.is_empty() {
            tracing::debug!(
                "Adapter '{}' failed to store {} key(s)",
                self.config.name,
                failed.len()
            );
        }
        failed.is_empty()
    }

    async fn fetch_entries(&self, keys: &[Key]) -> Entries {
        self.store.fetch_many(&self.config.namespace, keys)
    }

    async fn remove_entries(&self, keys: &[Key]) -> bool {
        self.store
            .delete_many(&self.config.namespace, keys)
            .is_empty()
    }

    async fn incr(&self, key: &str, step: i64) -> Option<i64> {
        self.store.inc(&self.config.namespace, key, step)
    }

    async fn decr(&self, key: &str, step: i64) -> Option<i64> {
        self.store.dec(&self.config.namespace, key, step)
    }
}

impl std::fmt::Debug for ShmAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShmAdapter")
            .field("name", &self.config.name)
            .field("namespace", &self.config.namespace)
            .field("store", &self.store)
            .finish()
    }
}
