use kiln::domain::{AdapterConfig, AdapterKind};
use kiln::events::CacheEvent;
use kiln::expiry::Expiry;
use kiln::planes::control::{AdapterRegistry, AdminOperations};
use kiln::planes::data::{
    CacheOperations, CacheService, Filter, FilterChain, Intercept, KeyPrefix, Operation,
    Outcome, TracingFilter,
};
use kiln::ports::CacheAdapter;
use serde_json::json;
use shared::{Entries, Error};
use std::sync::Arc;
use storage_engine::{ShmAdapter, ShmStore, UnifiedAdapterFactory};
use tokio::sync::broadcast;

fn entries(pairs: &[(&str, serde_json::Value)]) -> Entries {
    pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.clone()))
        .collect()
}

async fn service_with(configs: Vec<AdapterConfig>) -> CacheService {
    let registry = AdapterRegistry::from_configs(Arc::new(UnifiedAdapterFactory), configs)
        .await
        .unwrap();
    CacheService::new(registry)
}

#[tokio::test]
async fn test_end_to_end_on_both_backends() {
    let service = service_with(vec![
        AdapterConfig::new("apc", AdapterKind::SharedMemory).with_namespace("svc_e2e"),
        AdapterConfig::new("local", AdapterKind::Memory),
    ])
    .await;

    for name in ["apc", "local"] {
        let data = entries(&[
            ("key1", json!("data1")),
            ("key2", json!("data2")),
            ("key3", json!("data3")),
        ]);
        let keys: Vec<String> = vec!["key1".into(), "key2".into(), "key3".into()];

        let written = service
            .write(name, data.clone(), Some(Expiry::parse("+1 minute").unwrap()))
            .await
            .unwrap();
        assert!(written, "write failed on {}", name);

        assert_eq!(service.read(name, keys.clone()).await.unwrap(), data);
        assert!(service.delete(name, keys.clone()).await.unwrap());
        assert!(service.read(name, keys).await.unwrap().is_empty());
    }
}

#[tokio::test]
async fn test_counters_through_service() {
    let service = service_with(vec![
        AdapterConfig::new("apc", AdapterKind::SharedMemory).with_namespace("svc_counters"),
    ])
    .await;

    service
        .write("apc", entries(&[("n", json!(10))]), None)
        .await
        .unwrap();
    assert_eq!(service.increment("apc", "n", 1).await.unwrap(), Some(11));
    assert_eq!(service.decrement("apc", "n", 3).await.unwrap(), Some(8));

    service
        .write("apc", entries(&[("word", json!("no"))]), None)
        .await
        .unwrap();
    assert_eq!(service.increment("apc", "word", 1).await.unwrap(), None);
}

#[tokio::test]
async fn test_unknown_adapter_and_bad_keys() {
    let service = service_with(vec![]).await;
    let result = service.read("nope", vec!["k".into()]).await;
    assert!(matches!(result, Err(Error::AdapterNotFound(_))));

    let service = service_with(vec![AdapterConfig::new("local", AdapterKind::Memory)]).await;
    let result = service.read("local", vec![String::new()]).await;
    assert!(matches!(result, Err(Error::InvalidKey(_))));
}

#[tokio::test]
async fn test_disabled_store_is_unavailable() {
    let store = Arc::new(ShmStore::new());
    let adapter = ShmAdapter::with_store(
        AdapterConfig::new("offline", AdapterKind::SharedMemory),
        store.clone(),
    );
    let registry = AdapterRegistry::new();
    registry.register_adapter(Arc::new(adapter)).await.unwrap();
    let service = CacheService::new(registry);

    store.set_enabled(false);
    let result = service.write("offline", entries(&[("k", json!(1))]), None).await;
    assert!(matches!(result, Err(Error::Unavailable(_))));

    store.set_enabled(true);
    assert!(service
        .write("offline", entries(&[("k", json!(1))]), None)
        .await
        .unwrap());
}

#[tokio::test]
async fn test_key_prefix_filter_rewrites_parameters() {
    let store = Arc::new(ShmStore::new());
    let adapter = ShmAdapter::with_store(
        AdapterConfig::new("apc", AdapterKind::SharedMemory),
        store.clone(),
    );
    let registry = AdapterRegistry::new();
    registry.register_adapter(Arc::new(adapter)).await.unwrap();
    let service = CacheService::new(registry).with_filters(
        FilterChain::new()
            .with(TracingFilter)
            .with(KeyPrefix::new("app:")),
    );

    assert!(service
        .write("apc", entries(&[("greeting", json!("hi"))]), None)
        .await
        .unwrap());

    // Stored under the rewritten key, read back under the caller's key.
    assert_eq!(store.fetch("user", "app:greeting"), Some(json!("hi")));
    assert_eq!(store.fetch("user", "greeting"), None);
    assert_eq!(
        service.read("apc", vec!["greeting".into()]).await.unwrap(),
        entries(&[("greeting", json!("hi"))])
    );
}

struct ReadOnly;

impl Filter for ReadOnly {
    fn before(&self, _adapter: &str, operation: Operation) -> Intercept {
        match operation {
            Operation::Write { .. } => Intercept::Respond(Outcome::Written(false)),
            Operation::Delete { .. } => Intercept::Respond(Outcome::Deleted(false)),
            other => Intercept::Proceed(other),
        }
    }
}

#[tokio::test]
async fn test_filter_can_short_circuit() {
    let registry = AdapterRegistry::new();
    let adapter = storage_engine::MemoryAdapter::new(AdapterConfig::new("local", AdapterKind::Memory));
    registry.register_adapter(Arc::new(adapter)).await.unwrap();
    let service = CacheService::new(registry).with_filters(FilterChain::new().with(ReadOnly));

    let written = service
        .write("local", entries(&[("k", json!(1))]), None)
        .await
        .unwrap();
    assert!(!written);
    assert!(service.read("local", vec!["k".into()]).await.unwrap().is_empty());

    // A filter answering with the wrong shape is an internal error.
    struct Confused;
    impl Filter for Confused {
        fn before(&self, _adapter: &str, _operation: Operation) -> Intercept {
            Intercept::Respond(Outcome::Counter(Some(1)))
        }
    }
    let registry = AdapterRegistry::new();
    registry
        .register_adapter(Arc::new(storage_engine::MemoryAdapter::new(AdapterConfig::new(
            "local",
            AdapterKind::Memory,
        ))))
        .await
        .unwrap();
    let service = CacheService::new(registry).with_filters(FilterChain::new().with(Confused));
    let result = service.read("local", vec!["k".into()]).await;
    assert!(matches!(result, Err(Error::Internal(_))));
}

#[tokio::test]
async fn test_events_are_broadcast() {
    let (tx, mut rx) = broadcast::channel(16);
    let registry = AdapterRegistry::with_factory(Arc::new(UnifiedAdapterFactory));
    registry
        .create_adapter(AdapterConfig::new("local", AdapterKind::Memory))
        .await
        .unwrap();
    let service = CacheService::new(registry).with_event_broadcaster(tx);

    service
        .write("local", entries(&[("k", json!(1))]), Some(Expiry::Ttl(30)))
        .await
        .unwrap();
    match rx.recv().await.unwrap() {
        CacheEvent::Written(event) => {
            assert_eq!(event.adapter, "local");
            assert_eq!(event.keys, vec!["k".to_string()]);
            assert_eq!(event.ttl_secs, Some(30));
        }
        other => panic!("unexpected event: {:?}", other),
    }

    // A failed delete publishes nothing.
    assert!(!service.delete("local", vec!["missing".into()]).await.unwrap());
    assert!(service.delete("local", vec!["k".into()]).await.unwrap());
    match rx.recv().await.unwrap() {
        CacheEvent::Deleted(event) => assert_eq!(event.keys, vec!["k".to_string()]),
        other => panic!("unexpected event: {:?}", other),
    }

    assert!(service.clear("local").await.unwrap());
    assert!(matches!(rx.recv().await.unwrap(), CacheEvent::Cleared(_)));
}

#[tokio::test]
async fn test_run_executes_prebuilt_operations() {
    let service = service_with(vec![AdapterConfig::new("local", AdapterKind::Memory)]).await;
    let adapter = storage_engine::MemoryAdapter::new(AdapterConfig::new("scratch", AdapterKind::Memory));

    // Operations are plain values: build with any adapter, run on a named one.
    let write = adapter.write_one("k", json!("v"), Some(Expiry::Never));
    assert_eq!(service.run("local", write).await.unwrap(), Outcome::Written(true));
    let read = adapter.read(vec!["k".into()]);
    assert_eq!(
        service.run("local", read).await.unwrap(),
        Outcome::Values(entries(&[("k", json!("v"))]))
    );
}

#[tokio::test]
async fn test_events_carry_caller_keys_under_key_prefix() {
    let (tx, mut rx) = broadcast::channel(16);
    let store = Arc::new(ShmStore::new());
    let adapter = ShmAdapter::with_store(
        AdapterConfig::new("apc", AdapterKind::SharedMemory),
        store.clone(),
    );
    let registry = AdapterRegistry::new();
    registry.register_adapter(Arc::new(adapter)).await.unwrap();
    let service = CacheService::new(registry)
        .with_filters(FilterChain::new().with(KeyPrefix::new("app:")))
        .with_event_broadcaster(tx);

    service
        .write("apc", entries(&[("greeting", json!("hi"))]), Some(Expiry::parse("+90 seconds").unwrap()))
        .await
        .unwrap();
    assert!(store.exists("user", "app:greeting"));
    match rx.recv().await.unwrap() {
        CacheEvent::Written(event) => {
            assert_eq!(event.keys, vec!["greeting".to_string()]);
            assert_eq!(event.ttl_secs, Some(90));
        }
        other => panic!("unexpected event: {:?}", other),
    }

    assert!(service.delete("apc", vec!["greeting".into()]).await.unwrap());
    match rx.recv().await.unwrap() {
        CacheEvent::Deleted(event) => assert_eq!(event.keys, vec!["greeting".to_string()]),
        other => panic!("unexpected event: {:?}", other),
    }
}
