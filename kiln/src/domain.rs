use crate::expiry::Expiry;
use serde::{Deserialize, Serialize};
use shared::config::{Backend, Config};
use shared::{Error, Result};

pub mod response {

    pub mod admin {
        use crate::domain::AdapterInfo;

        #[derive(Clone, Debug)]
        pub struct RegisterAdapterResponse {
            pub registered: bool,
            pub message: String,
        }

        impl RegisterAdapterResponse {
            pub fn new(registered: bool, message: impl Into<String>) -> Self {
                Self {
                    registered,
                    message: message.into(),
                }
            }
        }

        #[derive(Clone, Debug)]
        pub struct DropAdapterResponse {
            pub dropped: bool,
        }

        impl DropAdapterResponse {
            pub fn new(dropped: bool) -> Self {
                Self { dropped }
            }
        }

        #[derive(Clone, Debug)]
        pub struct ListAdaptersResponse {
            pub adapters: Vec<AdapterInfo>,
        }

        impl ListAdaptersResponse {
            pub fn new(adapters: Vec<AdapterInfo>) -> Self {
                Self { adapters }
            }
        }

        #[derive(Clone, Debug)]
        pub struct DescribeAdapterResponse {
            pub info: AdapterInfo,
        }

        impl DescribeAdapterResponse {
            pub fn new(info: AdapterInfo) -> Self {
                Self { info }
            }
        }
    }
}

#[derive(Clone, Debug)]
pub struct AdapterInfo {
    pub config: AdapterConfig,
    pub enabled: bool,
}

impl AdapterInfo {
    pub fn new(config: &AdapterConfig, enabled: bool) -> Self {
        Self {
            config: config.clone(),
            enabled,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdapterKind {
    /// Process-wide shared-memory store, partitioned by namespace.
    SharedMemory,
    /// Private moka cache owned by the adapter instance.
    Memory,
}

impl From<Backend> for AdapterKind {
    fn from(backend: Backend) -> Self {
        match backend {
            Backend::SharedMemory => AdapterKind::SharedMemory,
            Backend::Memory => AdapterKind::Memory,
        }
    }
}

/// Construction options for one adapter. Immutable once the adapter is built.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdapterConfig {
    pub name: String,                // unique registry name
    pub kind: AdapterKind,           // backend selection
    #[serde(default = "default_expiry")]
    pub expiry: Expiry,              // used by writes that pass no expiry
    #[serde(default = "default_namespace")]
    pub namespace: String,           // store partition cleared by `clear()`
    #[serde(default)]
    pub max_entries: Option<u64>,    // None = unbounded
}

fn default_expiry() -> Expiry {
    Expiry::Relative(chrono::TimeDelta::hours(1))
}

fn default_namespace() -> String {
    "user".to_string()
}

impl AdapterConfig {
    pub fn new(name: impl Into<String>, kind: AdapterKind) -> Self {
        Self {
            name: name.into(),
            kind,
            expiry: default_expiry(),
            namespace: default_namespace(),
            max_entries: None,
        }
    }

    pub fn with_expiry(mut self, expiry: Expiry) -> Self {
        self.expiry = expiry;
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn with_max_entries(mut self, max_entries: u64) -> Self {
        self.max_entries = Some(max_entries);
        self
    }

    /// Build the default adapter's options from the environment-backed config.
    pub fn from_config(config: &Config) -> Result<Self> {
        if config.adapter_name.trim().is_empty() {
            return Err(Error::InvalidConfig("adapter name must not be empty".to_string()));
        }
        if config.namespace.is_empty() {
            return Err(Error::InvalidConfig("namespace must not be empty".to_string()));
        }

        Ok(Self {
            name: config.adapter_name.clone(),
            kind: config.backend.into(),
            expiry: Expiry::parse(&config.default_expiry)?,
            namespace: config.namespace.clone(),
            max_entries: config.max_entries,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    #[test]
    fn test_from_config_parses_expiry() {
        let config = Config::from_lookup(|name| match name {
            "KILN_DEFAULT_EXPIRY" => Some("+5 seconds".to_string()),
            "KILN_ADAPTER" => Some("memory".to_string()),
            _ => None,
        });
        let adapter_config = AdapterConfig::from_config(&config).unwrap();
        assert_eq!(adapter_config.name, "default");
        assert_eq!(adapter_config.kind, AdapterKind::Memory);
        assert_eq!(adapter_config.expiry, Expiry::Relative(TimeDelta::seconds(5)));
        assert_eq!(adapter_config.namespace, "user");
    }

    #[test]
    fn test_from_config_rejects_bad_expiry() {
        let config = Config::from_lookup(|name| match name {
            "KILN_DEFAULT_EXPIRY" => Some("eventually".to_string()),
            _ => None,
        });
        let result = AdapterConfig::from_config(&config);
        assert!(matches!(result, Err(Error::InvalidExpiry(_))));
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let config: AdapterConfig =
            serde_json::from_str(r#"{"name": "apc", "kind": "shared_memory", "expiry": 300}"#)
                .unwrap();
        assert_eq!(config.kind, AdapterKind::SharedMemory);
        assert_eq!(config.expiry, Expiry::Ttl(300));
        assert_eq!(config.namespace, "user");
        assert_eq!(config.max_entries, None);

        let config: AdapterConfig =
            serde_json::from_str(r#"{"name": "local", "kind": "memory"}"#).unwrap();
        assert_eq!(config.expiry, Expiry::Relative(TimeDelta::hours(1)));
    }
}
