// shared/src/lib.rs

use std::collections::HashMap;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("adapter not found: {0}")]
    AdapterNotFound(String),
    #[error("adapter already registered: {0}")]
    AdapterExists(String),
    #[error("adapter unavailable: {0}")]
    Unavailable(String),
    #[error("invalid expiry: {0}")]
    InvalidExpiry(String),
    #[error("invalid key: {0}")]
    InvalidKey(String),
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("internal: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;

pub type Key = String;

/// Any serializable payload. `Value::Null` is a stored value, not a missing one.
pub type Value = serde_json::Value;

/// Key/value pairs handed to bulk writes and returned from bulk reads.
pub type Entries = HashMap<Key, Value>;

pub mod config;
