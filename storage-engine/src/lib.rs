pub mod moka_cache;
pub mod shm_adapter;
pub mod shm_store;

pub use moka_cache::MemoryAdapter;
pub use shm_adapter::ShmAdapter;
pub use shm_store::ShmStore;

use kiln::domain::{AdapterConfig, AdapterKind};
use kiln::ports::{AdapterFactory, CacheAdapter};
use shared::{Error, Result};
use std::sync::Arc;

/// Builds the adapter matching `config.kind`
/// Shared-memory adapters all bind to the process-wide store
#[derive(Clone, Copy, Debug, Default)]
pub struct UnifiedAdapterFactory;

impl AdapterFactory for UnifiedAdapterFactory {
    fn create_from_config(&self, config: &AdapterConfig) -> Result<Arc<dyn CacheAdapter>> {
        match config.kind {
            AdapterKind::SharedMemory => {
                if !ShmAdapter::available() {
                    return Err(Error::Unavailable(format!(
                        "shared memory store is disabled, cannot build '{}'",
                        config.name
                    )));
                }
                if config.max_entries.is_some() {
                    tracing::warn!(
                        "Adapter '{}': max_entries is ignored, the shared store is sized process-wide",
                        config.name
                    );
                }
                Ok(Arc::new(ShmAdapter::new(config.clone())))
            }
            AdapterKind::Memory => Ok(Arc::new(MemoryAdapter::new(config.clone()))),
        }
    }
}
