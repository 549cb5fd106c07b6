use dashmap::DashMap;
use once_cell::sync::Lazy;
use shared::{Entries, Key, Value};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

static GLOBAL_STORE: Lazy<Arc<ShmStore>> = Lazy::new(|| Arc::new(ShmStore::new()));

/// Every this many writes, `store` sweeps expired slots out of the whole segment.
pub const SWEEP_EVERY: usize = 1024;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct SlotKey {
    namespace: String,
    key: String,
}

impl SlotKey {
    fn new(namespace: &str, key: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            key: key.to_string(),
        }
    }
}

#[derive(Debug)]
struct Slot {
    value: Value,
    expires_at: Option<Instant>,
}

impl Slot {
    fn new(value: Value, ttl: Option<Duration>) -> Self {
        Self {
            value,
            // An instant too far out to represent is as good as never.
            expires_at: ttl.and_then(|ttl| Instant::now().checked_add(ttl)),
        }
    }

    fn is_live(&self, now: Instant) -> bool {
        match self.expires_at {
            Some(at) => now < at,
            None => true,
        }
    }
}

/// In-process shared key/value segment, partitioned by namespace.
///
/// Every adapter in the process shares [`ShmStore::global`]. Keys are sharded across
/// `DashMap` locks, so single-key operations (including `inc`/`dec`) are atomic with
/// respect to each other. Bulk operations are applied key by key under those locks
/// and report the keys that failed, the same way the store reports them for single
/// calls. Expired slots are dropped on access, and every [`SWEEP_EVERY`] writes the
/// store runs [`ShmStore::purge_expired`] so keys that are never read again do not
/// pile up.
pub struct ShmStore {
    segment: DashMap<SlotKey, Slot>,
    enabled: AtomicBool,
    writes: AtomicUsize,
}

impl Default for ShmStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ShmStore {
    /// Create a private store, separate from [`ShmStore::global`].
    pub fn new() -> Self {
        Self {
            segment: DashMap::new(),
            enabled: AtomicBool::new(true),
            writes: AtomicUsize::new(0),
        }
    }

    /// The process-wide store.
    pub fn global() -> Arc<ShmStore> {
        GLOBAL_STORE.clone()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Switch the store off (or back on). A disabled store fails every call.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
    }

    pub fn exists(&self, namespace: &str, key: &str) -> bool {
        self.fetch(namespace, key).is_some()
    }

    pub fn fetch(&self, namespace: &str, key: &str) -> Option<Value> {
        if !self.is_enabled() {
            return None;
        }

        let slot_key = SlotKey::new(namespace, key);
        let now = Instant::now();
        let expired = match self.segment.get(&slot_key) {
            Some(slot) if slot.is_live(now) => return Some(slot.value.clone()),
            Some(_) => true,
            None => false,
        };

        if expired {
            self.segment.remove_if(&slot_key, |_, slot| !slot.is_live(now));
        }
        None
    }

    /// Absent and expired keys are left out of the result.
    pub fn fetch_many(&self, namespace: &str, keys: &[Key]) -> Entries {
        keys.iter()
            .filter_map(|key| {
                self.fetch(namespace, key)
                    .map(|value| (key.clone(), value))
            })
            .collect()
    }

    /// `ttl = None` keeps the value until it is deleted or cleared.
    pub fn store(&self, namespace: &str, key: &str, value: Value, ttl: Option<Duration>) -> bool {
        if !self.is_enabled() {
            return false;
        }

        self.segment
            .insert(SlotKey::new(namespace, key), Slot::new(value, ttl));

        // No shard lock is held here, so sweeping the whole map cannot deadlock.
        if self.writes.fetch_add(1, Ordering::Relaxed) % SWEEP_EVERY == SWEEP_EVERY - 1 {
            self.purge_expired();
        }
        true
    }

    /// Returns the keys that could not be stored.
    pub fn store_many(&self, namespace: &str, entries: Entries, ttl: Option<Duration>) -> Vec<Key> {
        entries
            .into_iter()
            .filter_map(|(key, value)| {
                if self.store(namespace, &key, value, ttl) {
                    None
                } else {
                    Some(key)
                }
            })
            .collect()
    }

    /// `false` if the key was absent or already expired.
    pub fn delete(&self, namespace: &str, key: &str) -> bool {
        if !self.is_enabled() {
            return false;
        }

        let now = Instant::now();
        match self.segment.remove(&SlotKey::new(namespace, key)) {
            Some((_, slot)) => slot.is_live(now),
            None => false,
        }
    }

    /// Returns the keys that could not be deleted. Present keys are removed either way.
    pub fn delete_many(&self, namespace: &str, keys: &[Key]) -> Vec<Key> {
        keys.iter()
            .filter(|key| !self.delete(namespace, key))
            .cloned()
            .collect()
    }

    /// Atomically add `step` to an integer value. `None` leaves the slot untouched.
    pub fn inc(&self, namespace: &str, key: &str, step: i64) -> Option<i64> {
        self.adjust(namespace, key, |current| current.checked_add(step))
    }

    /// Atomically subtract `step` from an integer value. `None` leaves the slot untouched.
    pub fn dec(&self, namespace: &str, key: &str, step: i64) -> Option<i64> {
        self.adjust(namespace, key, |current| current.checked_sub(step))
    }

    fn adjust(
        &self,
        namespace: &str,
        key: &str,
        apply: impl FnOnce(i64) -> Option<i64>,
    ) -> Option<i64> {
        if !self.is_enabled() {
            return None;
        }

        // The shard stays write-locked until `slot` drops, so the read and the
        // write below cannot interleave with another writer.
        let mut slot = self.segment.get_mut(&SlotKey::new(namespace, key))?;
        if !slot.is_live(Instant::now()) {
            return None;
        }

        let next = apply(slot.value.as_i64()?)?;
        slot.value = Value::from(next);
        Some(next)
    }

    /// Remove every slot in `namespace`.
    pub fn clear(&self, namespace: &str) -> bool {
        if !self.is_enabled() {
            return false;
        }

        self.segment.retain(|slot_key, _| slot_key.namespace != namespace);
        tracing::debug!("Cleared namespace '{}'", namespace);
        true
    }

    /// Remove every slot in every namespace.
    pub fn clear_all(&self) -> bool {
        if !self.is_enabled() {
            return false;
        }

        self.segment.clear();
        true
    }

    /// Drop expired slots. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut purged = 0;
        self.segment.retain(|_, slot| {
            let live = slot.is_live(now);
            if !live {
                purged += 1;
            }
            live
        });

        if purged > 0 {
            tracing::debug!("Purged {} expired slot(s)", purged);
        }
        purged
    }

    /// Live slots in `namespace`.
    pub fn len(&self, namespace: &str) -> usize {
        let now = Instant::now();
        self.segment
            .iter()
            .filter(|item| item.key().namespace == namespace && item.value().is_live(now))
            .count()
    }

    pub fn is_empty(&self, namespace: &str) -> bool {
        self.len(namespace) == 0
    }

    /// Slots held in memory across all namespaces, expired ones included.
    pub fn slot_count(&self) -> usize {
        self.segment.len()
    }
}

impl std::fmt::Debug for ShmStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShmStore")
            .field("slots", &self.segment.len())
            .field("enabled", &self.is_enabled())
            .field("writes", &self.writes.load(Ordering::Relaxed))
            .finish()
    }
}
