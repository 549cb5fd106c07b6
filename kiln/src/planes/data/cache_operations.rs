use crate::events::{
    AdapterClearedEvent, CacheEvent, EntriesDeletedEvent, EntriesWrittenEvent, now_timestamp,
};
use crate::expiry::Expiry;
use crate::planes::control::AdapterRegistry;
use crate::planes::data::filters::FilterChain;
use crate::planes::data::operation::{CacheOperations, Operation, Outcome};
use crate::ports::CacheAdapter;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared::{Entries, Error, Key, Result};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Application service that orchestrates cache operations
/// This is the main entry point for all cache operations in the application core
#[derive(Clone)]
pub struct CacheService {
    registry: AdapterRegistry,
    filters: FilterChain,
    event_broadcaster: Option<broadcast::Sender<CacheEvent>>,
}

impl CacheService {
    pub fn new(registry: AdapterRegistry) -> Self {
        Self {
            registry,
            filters: FilterChain::new(),
            event_broadcaster: None,
        }
    }

    pub fn with_filters(mut self, filters: FilterChain) -> Self {
        self.filters = filters;
        self
    }

    pub fn with_event_broadcaster(mut self, broadcaster: broadcast::Sender<CacheEvent>) -> Self {
        self.event_broadcaster = Some(broadcaster);
        self
    }

    /// Helper method to look up an adapter by name
    async fn get_adapter(&self, adapter_name: &str) -> Result<Arc<dyn CacheAdapter>> {
        let adapter = self
            .registry
            .get_adapter(adapter_name)
            .await
            .ok_or_else(|| Error::AdapterNotFound(adapter_name.to_string()))?;

        if !adapter.enabled() {
            return Err(Error::Unavailable(adapter_name.to_string()));
        }
        Ok(adapter)
    }

    async fn run_on(&self, adapter: &dyn CacheAdapter, operation: Operation) -> Result<Outcome> {
        operation.validate()?;

        let adapter_name = adapter.name();
        // Events report the caller's keys, not the ones a filter rewrote.
        let caller_keys: Option<Vec<Key>> = self
            .event_broadcaster
            .as_ref()
            .map(|_| operation.keys().into_iter().map(str::to_string).collect());
        let operation = match self.filters.before(adapter_name, operation) {
            Ok(operation) => operation,
            Err(outcome) => {
                tracing::debug!(
                    "Operation on adapter '{}' answered by a filter",
                    adapter_name
                );
                return Ok(outcome);
            }
        };

        let now = Utc::now();
        let event = caller_keys.and_then(|keys| self.event_for(adapter, keys, &operation, now));
        let outcome = operation.execute_at(adapter, now).await;

        if outcome.is_success() {
            if let Some(event) = event {
                self.broadcast(event);
            }
        }

        Ok(self.filters.after(adapter_name, outcome))
    }

    fn event_for(
        &self,
        adapter: &dyn CacheAdapter,
        keys: Vec<Key>,
        operation: &Operation,
        now: DateTime<Utc>,
    ) -> Option<CacheEvent> {
        match operation {
            Operation::Write { expiry, .. } => {
                let ttl_secs = expiry
                    .resolve_at(&adapter.config().expiry, now)
                    .ttl()
                    .map(|ttl| ttl.as_secs());
                Some(CacheEvent::Written(EntriesWrittenEvent {
                    adapter: adapter.name().to_string(),
                    keys,
                    ttl_secs,
                    timestamp: now_timestamp(),
                }))
            }
            Operation::Delete { .. } => Some(CacheEvent::Deleted(EntriesDeletedEvent {
                adapter: adapter.name().to_string(),
                keys,
                timestamp: now_timestamp(),
            })),
            _ => None,
        }
    }

    fn broadcast(&self, event: CacheEvent) {
        let Some(ref broadcaster) = self.event_broadcaster else {
            return;
        };

        let adapter = event.adapter().to_string();
        match broadcaster.send(event) {
            Ok(subscriber_count) => {
                tracing::debug!(
                    "Broadcasted event for adapter '{}' to {} subscriber(s)",
                    adapter,
                    subscriber_count
                );
            }
            Err(_) => {
                tracing::warn!("No subscribers for event on adapter '{}'", adapter);
            }
        }
    }
}

fn mismatched(expected: &str, outcome: Outcome) -> Error {
    Error::Internal(format!("expected {} outcome, got {:?}", expected, outcome))
}

impl std::fmt::Debug for CacheService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheService")
            .field("registry", &self.registry)
            .field("filters", &self.filters)
            .finish()
    }
}

#[async_trait]
impl CacheOperations for CacheService {
    async fn run(&self, adapter_name: &str, operation: Operation) -> Result<Outcome> {
        let adapter = self.get_adapter(adapter_name).await?;
        self.run_on(adapter.as_ref(), operation).await
    }

    async fn write(
        &self,
        adapter_name: &str,
        entries: Entries,
        expiry: Option<Expiry>,
    ) -> Result<bool> {
        let adapter = self.get_adapter(adapter_name).await?;
        let operation = adapter.write(entries, expiry);
        match self.run_on(adapter.as_ref(), operation).await? {
            Outcome::Written(written) => Ok(written),
            other => Err(mismatched("write", other)),
        }
    }

    async fn read(&self, adapter_name: &str, keys: Vec<Key>) -> Result<Entries> {
        let adapter = self.get_adapter(adapter_name).await?;
        let operation = adapter.read(keys);
        match self.run_on(adapter.as_ref(), operation).await? {
            Outcome::Values(values) => Ok(values),
            other => Err(mismatched("read", other)),
        }
    }

    async fn delete(&self, adapter_name: &str, keys: Vec<Key>) -> Result<bool> {
        let adapter = self.get_adapter(adapter_name).await?;
        let operation = adapter.delete(keys);
        match self.run_on(adapter.as_ref(), operation).await? {
            Outcome::Deleted(deleted) => Ok(deleted),
            other => Err(mismatched("delete", other)),
        }
    }

    async fn increment(&self, adapter_name: &str, key: &str, step: i64) -> Result<Option<i64>> {
        let adapter = self.get_adapter(adapter_name).await?;
        let operation = adapter.increment(key, step);
        match self.run_on(adapter.as_ref(), operation).await? {
            Outcome::Counter(value) => Ok(value),
            other => Err(mismatched("increment", other)),
        }
    }

    async fn decrement(&self, adapter_name: &str, key: &str, step: i64) -> Result<Option<i64>> {
        let adapter = self.get_adapter(adapter_name).await?;
        let operation = adapter.decrement(key, step);
        match self.run_on(adapter.as_ref(), operation).await? {
            Outcome::Counter(value) => Ok(value),
            other => Err(mismatched("decrement", other)),
        }
    }

    /// Clearing is immediate and bypasses the filter chain.
    async fn clear(&self, adapter_name: &str) -> Result<bool> {
        let adapter = self.get_adapter(adapter_name).await?;
        let cleared = adapter.clear().await;

        if cleared {
            self.broadcast(CacheEvent::Cleared(AdapterClearedEvent {
                adapter: adapter_name.to_string(),
                timestamp: now_timestamp(),
            }));
        }
        Ok(cleared)
    }
}
