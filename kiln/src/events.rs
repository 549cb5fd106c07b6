use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CacheEvent {
    Written(EntriesWrittenEvent),
    Deleted(EntriesDeletedEvent),
    Cleared(AdapterClearedEvent),
}

impl CacheEvent {
    pub fn adapter(&self) -> &str {
        match self {
            CacheEvent::Written(e) => &e.adapter,
            CacheEvent::Deleted(e) => &e.adapter,
            CacheEvent::Cleared(e) => &e.adapter,
        }
    }

    pub fn keys(&self) -> &[String] {
        match self {
            CacheEvent::Written(e) => &e.keys,
            CacheEvent::Deleted(e) => &e.keys,
            CacheEvent::Cleared(_) => &[],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntriesWrittenEvent {
    pub adapter: String,
    pub keys: Vec<String>,
    pub ttl_secs: Option<u64>,
    pub timestamp: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntriesDeletedEvent {
    pub adapter: String,
    pub keys: Vec<String>,
    pub timestamp: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdapterClearedEvent {
    pub adapter: String,
    pub timestamp: u64,
}

/// Helper to get current timestamp in seconds since UNIX epoch
pub fn now_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or(0)
}
