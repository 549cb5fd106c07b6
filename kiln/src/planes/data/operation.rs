use crate::expiry::Expiry;
use crate::ports::CacheAdapter;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared::{Entries, Error, Key, Result};

/// A cache call that has been built but not yet run.
///
/// Adapters hand these out from `write`/`read`/`delete`/`increment`/`decrement`.
/// The fields are the call's parameters, so a filter can rewrite them before
/// [`Operation::execute`] binds the operation to an adapter.
#[derive(Clone, Debug, PartialEq)]
pub enum Operation {
    Write { entries: Entries, expiry: Expiry },
    Read { keys: Vec<Key> },
    Delete { keys: Vec<Key> },
    Increment { key: Key, step: i64 },
    Decrement { key: Key, step: i64 },
}

/// Result of executing an [`Operation`]. The variant mirrors the operation kind.
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    Written(bool),
    Values(Entries),
    Deleted(bool),
    Counter(Option<i64>),
}

impl Operation {
    pub fn kind(&self) -> &'static str {
        match self {
            Operation::Write { .. } => "write",
            Operation::Read { .. } => "read",
            Operation::Delete { .. } => "delete",
            Operation::Increment { .. } => "increment",
            Operation::Decrement { .. } => "decrement",
        }
    }

    pub fn keys(&self) -> Vec<&str> {
        match self {
            Operation::Write { entries, .. } => entries.keys().map(String::as_str).collect(),
            Operation::Read { keys } | Operation::Delete { keys } => {
                keys.iter().map(String::as_str).collect()
            }
            Operation::Increment { key, .. } | Operation::Decrement { key, .. } => {
                vec![key.as_str()]
            }
        }
    }

    /// Rejects empty keys before anything reaches a store.
    pub fn validate(&self) -> Result<()> {
        if self.keys().iter().any(|key| key.is_empty()) {
            return Err(Error::InvalidKey(format!(
                "{} operation contains an empty key",
                self.kind()
            )));
        }
        Ok(())
    }

    /// Rewrite every key this operation touches.
    pub fn map_keys(self, f: impl Fn(&str) -> Key) -> Self {
        match self {
            Operation::Write { entries, expiry } => Operation::Write {
                entries: entries.into_iter().map(|(k, v)| (f(&k), v)).collect(),
                expiry,
            },
            Operation::Read { keys } => Operation::Read {
                keys: keys.iter().map(|k| f(k)).collect(),
            },
            Operation::Delete { keys } => Operation::Delete {
                keys: keys.iter().map(|k| f(k)).collect(),
            },
            Operation::Increment { key, step } => Operation::Increment { key: f(&key), step },
            Operation::Decrement { key, step } => Operation::Decrement { key: f(&key), step },
        }
    }

    /// Run against `adapter`. This is the only point where the store is touched.
    pub async fn execute(self, adapter: &dyn CacheAdapter) -> Outcome {
        self.execute_at(adapter, Utc::now()).await
    }

    /// Like [`Operation::execute`], with relative and absolute expiries resolved
    /// against `now`.
    pub async fn execute_at(self, adapter: &dyn CacheAdapter, now: DateTime<Utc>) -> Outcome {
        match self {
            Operation::Write { entries, expiry } => {
                let lifetime = expiry.resolve_at(&adapter.config().expiry, now);
                Outcome::Written(adapter.store_entries(entries, lifetime).await)
            }
            Operation::Read { keys } => Outcome::Values(adapter.fetch_entries(&keys).await),
            Operation::Delete { keys } => Outcome::Deleted(adapter.remove_entries(&keys).await),
            Operation::Increment { key, step } => Outcome::Counter(adapter.incr(&key, step).await),
            Operation::Decrement { key, step } => Outcome::Counter(adapter.decr(&key, step).await),
        }
    }
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        match self {
            Outcome::Written(ok) | Outcome::Deleted(ok) => *ok,
            Outcome::Values(_) => true,
            Outcome::Counter(value) => value.is_some(),
        }
    }

    pub fn into_values(self) -> Entries {
        match self {
            Outcome::Values(values) => values,
            _ => Entries::new(),
        }
    }

    pub fn counter(&self) -> Option<i64> {
        match self {
            Outcome::Counter(value) => *value,
            _ => None,
        }
    }
}

/// Application-level cache operations trait
/// This is for orchestrating operations across named adapters
#[async_trait]
pub trait CacheOperations: Send + Sync + 'static {
    async fn run(&self, adapter_name: &str, operation: Operation) -> Result<Outcome>;

    async fn write(
        &self,
        adapter_name: &str,
        entries: Entries,
        expiry: Option<Expiry>,
    ) -> Result<bool>;

    async fn read(&self, adapter_name: &str, keys: Vec<Key>) -> Result<Entries>;

    async fn delete(&self, adapter_name: &str, keys: Vec<Key>) -> Result<bool>;

    async fn increment(&self, adapter_name: &str, key: &str, step: i64) -> Result<Option<i64>>;

    async fn decrement(&self, adapter_name: &str, key: &str, step: i64) -> Result<Option<i64>>;

    async fn clear(&self, adapter_name: &str) -> Result<bool>;
}
