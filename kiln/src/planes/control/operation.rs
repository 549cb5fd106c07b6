use std::sync::Arc;

use async_trait::async_trait;

use shared::Result;

use crate::{
    domain::{
        AdapterConfig,
        response::admin::{
            DescribeAdapterResponse, DropAdapterResponse, ListAdaptersResponse,
            RegisterAdapterResponse,
        },
    },
    ports::CacheAdapter,
};

#[async_trait]
pub trait AdminOperations: Send + Sync + 'static {
    async fn register_adapter(
        &self,
        adapter: Arc<dyn CacheAdapter>,
    ) -> Result<RegisterAdapterResponse>;
    async fn create_adapter(&self, config: AdapterConfig) -> Result<RegisterAdapterResponse>;
    async fn drop_adapter(&self, name: &str) -> Result<DropAdapterResponse>;
    async fn list_adapters(&self) -> Result<ListAdaptersResponse>;
    async fn describe_adapter(&self, name: &str) -> Result<DescribeAdapterResponse>;
}
