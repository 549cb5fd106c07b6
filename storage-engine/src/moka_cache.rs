use async_trait::async_trait;
use kiln::domain::AdapterConfig;
use kiln::expiry::Lifetime;
use kiln::ports::CacheAdapter;
use moka::Expiry;
use moka::future::Cache;
use moka::ops::compute::{CompResult, Op};
use shared::{Entries, Key, Value};
use std::time::{Duration, Instant};

#[derive(Clone, Debug)]
struct MemoryEntry {
    value: Value,
    ttl: Option<Duration>,
    // Counter updates keep the remaining lifetime instead of restarting it.
    renew: bool,
}

struct EntryExpiry;

impl Expiry<Key, MemoryEntry> for EntryExpiry {
    fn expire_after_create(
        &self,
        _key: &Key,
        entry: &MemoryEntry,
        _created_at: Instant,
    ) -> Option<Duration> {
        entry.ttl
    }

    fn expire_after_update(
        &self,
        _key: &Key,
        entry: &MemoryEntry,
        _updated_at: Instant,
        duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        if entry.renew {
            entry.ttl
        } else {
            duration_until_expiry
        }
    }
}

/// Moka-based adapter with per-entry TTL support
/// Each instance owns a private cache, so `clear` only affects this adapter
pub struct MemoryAdapter {
    config: AdapterConfig,
    cache: Cache<Key, MemoryEntry>,
}

impl MemoryAdapter {
    pub fn new(config: AdapterConfig) -> Self {
        let mut builder = Cache::builder()
            .name(&config.name)
            .expire_after(EntryExpiry);

        if let Some(capacity) = config.max_entries {
            builder = builder.max_capacity(capacity);
        }

        Self {
            config,
            cache: builder.build(),
        }
    }

    async fn adjust(&self, key: &str, apply: impl FnOnce(i64) -> Option<i64>) -> Option<i64> {
        // and_compute_with holds the entry lock for the whole closure.
        let result = self
            .cache
            .entry(key.to_string())
            .and_compute_with(|current| {
                let op = match current.map(|entry| entry.into_value()) {
                    Some(entry) => match entry.value.as_i64().and_then(apply) {
                        Some(next) => Op::Put(MemoryEntry {
                            value: Value::from(next),
                            ttl: entry.ttl,
                            renew: false,
                        }),
                        None => Op::Nop,
                    },
                    None => Op::Nop,
                };
                std::future::ready(op)
            })
            .await;

        match result {
            CompResult::ReplacedWith(entry) => entry.into_value().value.as_i64(),
            _ => None,
        }
    }
}

#[async_trait]
impl CacheAdapter for MemoryAdapter {
    fn available() -> bool {
        true
    }

    fn enabled(&self) -> bool {
        true
    }

    fn config(&self) -> &AdapterConfig {
        &self.config
    }

    async fn clear(&self) -> bool {
        self.cache.invalidate_all();
        true
    }

    async fn store_entries(&self, entries: Entries, lifetime: Lifetime) -> bool {
        let ttl = lifetime.ttl();
        for (key, value) in entries {
            self.cache
                .insert(
                    key,
                    MemoryEntry {
                        value,
                        ttl,
                        renew: true,
                    },
                )
                .await;
        }
        true
    }

    async fn fetch_entries(&self, keys: &[Key]) -> Entries {
        let mut found = Entries::new();
        for key in keys {
            if let Some(entry) = self.cache.get(key).await {
                found.insert(key.clone(), entry.value);
            }
        }
        found
    }

    async fn remove_entries(&self, keys: &[Key]) -> bool {
        let mut all_removed = true;
        for key in keys {
            // Entries past their TTL but not yet evicted count as absent, as on read.
            let result = self
                .cache
                .entry(key.clone())
                .and_compute_with(|current| {
                    let op = match current {
                        Some(_) => Op::Remove,
                        None => Op::Nop,
                    };
                    std::future::ready(op)
                })
                .await;
            all_removed &= matches!(result, CompResult::Removed(_));
        }
        all_removed
    }

    async fn incr(&self, key: &str, step: i64) -> Option<i64> {
        self.adjust(key, |current| current.checked_add(step)).await
    }

    async fn decr(&self, key: &str, step: i64) -> Option<i64> {
        self.adjust(key, |current| current.checked_sub(step)).await
    }
}

impl std::fmt::Debug for MemoryAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryAdapter")
            .field("name", &self.config.name)
            .field("entry_count", &self.cache.entry_count())
            .field("weighted_size", &self.cache.weighted_size())
            .finish()
    }
}
