use crate::domain::response::admin::{
    DescribeAdapterResponse, DropAdapterResponse, ListAdaptersResponse, RegisterAdapterResponse,
};
use crate::domain::{AdapterConfig, AdapterInfo};
use crate::ports::{AdapterFactory, CacheAdapter};
use crate::planes::control::operation::AdminOperations;
use async_trait::async_trait;
use shared::{Error, Result};
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;
use tokio::sync::RwLock;

/// AdapterRegistry selects adapters by name and builds new ones through an injected factory
#[derive(Clone, Default)]
pub struct AdapterRegistry {
    // Maps adapter name -> adapter (which owns its config)
    adapters: Arc<RwLock<HashMap<String, Arc<dyn CacheAdapter>>>>,
    factory: Option<Arc<dyn AdapterFactory>>,
}

impl Debug for AdapterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterRegistry")
            .field("adapters", &"<RwLock<HashMap>>")
            .field("factory", &self.factory.is_some())
            .finish()
    }
}

impl AdapterRegistry {
    /// Create an empty registry that only accepts prebuilt adapters
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_factory(factory: Arc<dyn AdapterFactory>) -> Self {
        Self {
            adapters: Arc::new(RwLock::new(HashMap::new())),
            factory: Some(factory),
        }
    }

    /// Create a registry and eagerly build one adapter per config
    pub async fn from_configs(
        factory: Arc<dyn AdapterFactory>,
        configs: impl IntoIterator<Item = AdapterConfig>,
    ) -> Result<Self> {
        let registry = Self::with_factory(factory);
        for config in configs {
            let response = registry.create_adapter(config).await?;
            if !response.registered {
                return Err(Error::AdapterExists(response.message));
            }
        }
        Ok(registry)
    }

    /// Get an adapter by name
    pub async fn get_adapter(&self, name: &str) -> Option<Arc<dyn CacheAdapter>> {
        let adapters = self.adapters.read().await;
        adapters.get(name).cloned()
    }
}

#[async_trait]
impl AdminOperations for AdapterRegistry {
    async fn register_adapter(
        &self,
        adapter: Arc<dyn CacheAdapter>,
    ) -> Result<RegisterAdapterResponse> {
        let mut adapters = self.adapters.write().await;
        let name = adapter.name().to_string();

        if adapters.contains_key(&name) {
            return Ok(RegisterAdapterResponse::new(
                false,
                format!("Adapter '{}' already exists", name),
            ));
        }

        tracing::info!(
            "Registered adapter '{}' ({:?}, default expiry {})",
            name,
            adapter.config().kind,
            adapter.config().expiry
        );
        adapters.insert(name.clone(), adapter);

        Ok(RegisterAdapterResponse::new(
            true,
            format!("Adapter '{}' registered successfully", name),
        ))
    }

    async fn create_adapter(&self, config: AdapterConfig) -> Result<RegisterAdapterResponse> {
        let factory = self.factory.as_ref().ok_or_else(|| {
            Error::InvalidConfig(format!(
                "no adapter factory available to build '{}'",
                config.name
            ))
        })?;
        let adapter = factory.create_from_config(&config)?;
        self.register_adapter(adapter).await
    }

    async fn drop_adapter(&self, name: &str) -> Result<DropAdapterResponse> {
        let mut adapters = self.adapters.write().await;
        let dropped = adapters.remove(name).is_some();
        if dropped {
            tracing::info!("Dropped adapter '{}'", name);
        }
        Ok(DropAdapterResponse::new(dropped))
    }

    async fn list_adapters(&self) -> Result<ListAdaptersResponse> {
        let adapters = self.adapters.read().await;
        let mut infos: Vec<AdapterInfo> = adapters
            .values()
            .map(|adapter| AdapterInfo::new(adapter.config(), adapter.enabled()))
            .collect();
        infos.sort_by(|a, b| a.config.name.cmp(&b.config.name));
        Ok(ListAdaptersResponse::new(infos))
    }

    async fn describe_adapter(&self, name: &str) -> Result<DescribeAdapterResponse> {
        let adapters = self.adapters.read().await;
        match adapters.get(name) {
            Some(adapter) => Ok(DescribeAdapterResponse::new(AdapterInfo::new(
                adapter.config(),
                adapter.enabled(),
            ))),
            None => Err(Error::AdapterNotFound(name.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::AdapterKind;
    use crate::expiry::Lifetime;
    use shared::{Entries, Key};

    /// Adapter that never stores anything; only its config matters here.
    struct NullAdapter {
        config: AdapterConfig,
    }

    #[async_trait]
    impl CacheAdapter for NullAdapter {
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
            true
        }

        async fn store_entries(&self, _entries: Entries, _lifetime: Lifetime) -> bool {
            false
        }

        async fn fetch_entries(&self, _keys: &[Key]) -> Entries {
            Entries::new()
        }

        async fn remove_entries(&self, _keys: &[Key]) -> bool {
            false
        }

        async fn incr(&self, _key: &str, _step: i64) -> Option<i64> {
            None
        }

        async fn decr(&self, _key: &str, _step: i64) -> Option<i64> {
            None
        }
    }

    struct NullFactory;

    impl AdapterFactory for NullFactory {
        fn create_from_config(&self, config: &AdapterConfig) -> Result<Arc<dyn CacheAdapter>> {
            Ok(Arc::new(NullAdapter {
                config: config.clone(),
            }))
        }
    }

    #[tokio::test]
    async fn test_register_and_lookup() {
        let registry = AdapterRegistry::new();
        let adapter = Arc::new(NullAdapter {
            config: AdapterConfig::new("primary", AdapterKind::Memory),
        });

        let response = registry.register_adapter(adapter.clone()).await.unwrap();
        assert!(response.registered);

        let again = registry.register_adapter(adapter).await.unwrap();
        assert!(!again.registered);
        assert!(again.message.contains("already exists"));

        assert!(registry.get_adapter("primary").await.is_some());
        assert!(registry.get_adapter("missing").await.is_none());
    }

    #[tokio::test]
    async fn test_create_requires_factory() {
        let registry = AdapterRegistry::new();
        let result = registry
            .create_adapter(AdapterConfig::new("x", AdapterKind::Memory))
            .await;
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn test_from_configs_list_describe_drop() {
        let registry = AdapterRegistry::from_configs(
            Arc::new(NullFactory),
            vec![
                AdapterConfig::new("b", AdapterKind::Memory),
                AdapterConfig::new("a", AdapterKind::SharedMemory).with_namespace("app"),
            ],
        )
        .await
        .unwrap();

        let listed = registry.list_adapters().await.unwrap();
        let names: Vec<&str> = listed
            .adapters
            .iter()
            .map(|info| info.config.name.as_str())
            .collect();
        assert_eq!(names, vec!["a", "b"]);

        let described = registry.describe_adapter("a").await.unwrap();
        assert_eq!(described.info.config.namespace, "app");
        assert!(described.info.enabled);

        assert!(registry.drop_adapter("a").await.unwrap().dropped);
        assert!(!registry.drop_adapter("a").await.unwrap().dropped);
        assert!(matches!(
            registry.describe_adapter("a").await,
            Err(Error::AdapterNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_from_configs_rejects_duplicates() {
        let result = AdapterRegistry::from_configs(
            Arc::new(NullFactory),
            vec![
                AdapterConfig::new("dup", AdapterKind::Memory),
                AdapterConfig::new("dup", AdapterKind::Memory),
            ],
        )
        .await;
        assert!(matches!(result, Err(Error::AdapterExists(_))));
    }
}
