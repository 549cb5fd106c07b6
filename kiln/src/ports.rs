#![deny(clippy::all)]

use crate::domain::AdapterConfig;
use crate::expiry::{Expiry, Lifetime};
use crate::planes::data::operation::Operation;
use async_trait::async_trait;
use shared::{Entries, Key, Result, Value};
use std::sync::Arc;

// Ports are the pluggable extension points for backing store implementations

/// Port for creating adapters from configuration
/// This allows different storage backends to be plugged in
pub trait AdapterFactory: Send + Sync + 'static {
    fn create_from_config(&self, config: &AdapterConfig) -> Result<Arc<dyn CacheAdapter>>;
}

/// Capability set every cache backend provides.
///
/// The `write`/`read`/`delete`/`increment`/`decrement` methods only build an
/// [`Operation`]; nothing touches the store until the operation is executed, which
/// calls back into the `store_entries`/`fetch_entries`/... primitives below. Failures
/// in the primitives are reported as values (`false`, `None`, omitted keys).
#[async_trait]
pub trait CacheAdapter: Send + Sync + 'static {
    /// Whether this backend can be used in the current process, without an instance.
    fn available() -> bool
    where
        Self: Sized;

    /// Instance-level confirmation that the backing store is usable.
    fn enabled(&self) -> bool;

    fn config(&self) -> &AdapterConfig;

    fn name(&self) -> &str {
        &self.config().name
    }

    /// `expiry = None` defers to the configured default at execution time.
    fn write(&self, entries: Entries, expiry: Option<Expiry>) -> Operation {
        Operation::Write {
            entries,
            expiry: expiry.unwrap_or(Expiry::Default),
        }
    }

    fn write_one(&self, key: &str, value: Value, expiry: Option<Expiry>) -> Operation {
        self.write(Entries::from([(key.to_string(), value)]), expiry)
    }

    fn read(&self, keys: Vec<Key>) -> Operation {
        Operation::Read { keys }
    }

    fn delete(&self, keys: Vec<Key>) -> Operation {
        Operation::Delete { keys }
    }

    fn increment(&self, key: &str, step: i64) -> Operation {
        Operation::Increment {
            key: key.to_string(),
            step,
        }
    }

    fn increment_one(&self, key: &str) -> Operation {
        self.increment(key, 1)
    }

    fn decrement(&self, key: &str, step: i64) -> Operation {
        Operation::Decrement {
            key: key.to_string(),
            step,
        }
    }

    fn decrement_one(&self, key: &str) -> Operation {
        self.decrement(key, 1)
    }

    /// Purge every entry in this adapter's namespace. Runs immediately.
    async fn clear(&self) -> bool;

    /// Returns `true` only if every entry was stored.
    async fn store_entries(&self, entries: Entries, lifetime: Lifetime) -> bool;

    /// Returns only the keys that exist.
    async fn fetch_entries(&self, keys: &[Key]) -> Entries;

    /// Returns `true` only if every key existed and was removed.
    async fn remove_entries(&self, keys: &[Key]) -> bool;

    /// Atomic add. `None` if the key is missing or its value is not an integer.
    async fn incr(&self, key: &str, step: i64) -> Option<i64>;

    /// Atomic subtract. `None` if the key is missing or its value is not an integer.
    async fn decr(&self, key: &str, step: i64) -> Option<i64>;
}
