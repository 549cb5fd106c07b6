use tracing::warn;

/// Backend selected for the default adapter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Backend {
    SharedMemory,
    Memory,
}

impl Backend {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "shm" | "shared" | "shared-memory" => Some(Backend::SharedMemory),
            "memory" | "moka" => Some(Backend::Memory),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Backend::SharedMemory => "shm",
            Backend::Memory => "memory",
        }
    }
}

pub struct Config {
    pub backend: Backend,
    pub adapter_name: String,
    pub namespace: String,
    /// Raw expiry expression, parsed by the adapter layer.
    pub default_expiry: String,
    pub max_entries: Option<u64>,
}

impl Config {
    const DEFAULT_ADAPTER_NAME: &'static str = "default";
    const DEFAULT_NAMESPACE: &'static str = "user";
    const DEFAULT_EXPIRY: &'static str = "+1 hour";

    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let backend = match lookup("KILN_ADAPTER") {
            Some(raw) => Backend::parse(&raw).unwrap_or_else(|| {
                warn!("Unknown KILN_ADAPTER '{}', falling back to shm", raw);
                Backend::SharedMemory
            }),
            None => Backend::SharedMemory,
        };

        let max_entries = lookup("KILN_MAX_ENTRIES").and_then(|raw| match raw.parse::<u64>() {
            Ok(n) => Some(n),
            Err(_) => {
                warn!("Ignoring non-numeric KILN_MAX_ENTRIES '{}'", raw);
                None
            }
        });

        Self {
            backend,
            adapter_name: lookup("KILN_ADAPTER_NAME")
                .unwrap_or_else(|| Self::DEFAULT_ADAPTER_NAME.to_string()),
            namespace: lookup("KILN_NAMESPACE")
                .unwrap_or_else(|| Self::DEFAULT_NAMESPACE.to_string()),
            default_expiry: lookup("KILN_DEFAULT_EXPIRY")
                .unwrap_or_else(|| Self::DEFAULT_EXPIRY.to_string()),
            max_entries,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}
