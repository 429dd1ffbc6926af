use std::sync::Arc;

use crate::config::StoreConfig;
use crate::errors::Result;

pub mod backend;
pub mod link_store;
pub mod models;
pub mod retry;

pub use backend::{BackendFactory, KvBackend, MemoryBackend, RedisBackend};
pub use link_store::{AliasBinding, LinkRecordStore, OriginalClaim};
pub use models::LinkRecord;

pub struct StorageFactory;

impl StorageFactory {
    /// Connect the configured backend and wrap it in a [`LinkRecordStore`].
    pub async fn create(config: &StoreConfig) -> Result<Arc<LinkRecordStore>> {
        let backend = BackendFactory::create(config).await?;
        Ok(Arc::new(LinkRecordStore::new(backend, config)))
    }
}
