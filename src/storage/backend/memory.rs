use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::trace;

use super::KvBackend;
use crate::errors::Result;

/// 进程内键值存储
///
/// Every primitive runs under the DashMap shard lock for its key, so
/// `set_if_absent` and `compare_and_swap` are atomic per key.
#[derive(Default)]
pub struct MemoryBackend {
    data: DashMap<String, String>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keys beginning with `prefix` (for inspection in tests and tooling).
    pub fn keys_with_prefix(&self, prefix: &str) -> Vec<String> {
        self.data
            .iter()
            .filter(|e| e.key().starts_with(prefix))
            .map(|e| e.key().clone())
            .collect()
    }
}

#[async_trait]
impl KvBackend for MemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.data.get(key).map(|v| v.value().clone()))
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.data.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn set_if_absent(&self, key: &str, value: &str) -> Result<bool> {
        match self.data.entry(key.to_string()) {
            Entry::Occupied(_) => {
                trace!("MemoryBackend: key already present: {}", key);
                Ok(false)
            }
            Entry::Vacant(slot) => {
                slot.insert(value.to_string());
                Ok(true)
            }
        }
    }

    async fn compare_and_swap(&self, key: &str, expected: &str, value: &str) -> Result<bool> {
        match self.data.get_mut(key) {
            Some(mut current) if current.value() == expected => {
                *current = value.to_string();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.data.remove(key);
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
