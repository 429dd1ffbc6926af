//! Key-value storage backends
//!
//! The link store only needs single-key primitives: plain get/set, a
//! conditional create, and compare-and-swap. No multi-key transactions
//! are assumed.

mod memory;
mod redis;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::config::{BackendKind, StoreConfig};
use crate::errors::Result;

pub use self::memory::MemoryBackend;
pub use self::redis::RedisBackend;

#[async_trait]
pub trait KvBackend: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Unconditional overwrite.
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Write only if `key` is absent. Returns `false` when it already exists.
    async fn set_if_absent(&self, key: &str, value: &str) -> Result<bool>;

    /// Replace the value only if it still equals `expected`.
    /// Returns `false` when the stored value differs or the key is missing.
    async fn compare_and_swap(&self, key: &str, expected: &str, value: &str) -> Result<bool>;

    /// Remove `key`; removing a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<()>;

    fn backend_name(&self) -> &'static str;
}

pub struct BackendFactory;

impl BackendFactory {
    pub async fn create(config: &StoreConfig) -> Result<Arc<dyn KvBackend>> {
        let backend: Arc<dyn KvBackend> = match config.backend {
            BackendKind::Memory => Arc::new(MemoryBackend::new()),
            BackendKind::Redis => Arc::new(RedisBackend::connect(&config.redis_url).await?),
        };
        info!("Using key-value backend: {}", backend.backend_name());
        Ok(backend)
    }
}
