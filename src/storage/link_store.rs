//! Link record store
//!
//! Three logical key spaces layered on a [`KvBackend`]:
//!
//! - `{prefix}link:{suffix}`   → serialized [`LinkRecord`]
//! - `{prefix}orig:{hash}`     → suffix (one per distinct original URL)
//! - `{prefix}alias:{hash}`    → suffix (one per distinct alias)
//!
//! The backend has no multi-key transactions, so creation writes the record
//! first and the pointers afterwards. An interrupted creation leaves at worst
//! an unreachable record, never a pointer to a missing one.

use std::sync::Arc;

use tracing::{debug, error, trace, warn};

use super::backend::KvBackend;
use super::models::LinkRecord;
use super::retry::{RetryConfig, with_retry};
use crate::config::StoreConfig;
use crate::errors::{Result, ShortstatError};
use crate::utils::{IndexKey, hash};

/// Result of binding an alias hash to a suffix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AliasBinding {
    /// The alias now points at the requested suffix (newly or already).
    Bound,
    /// The alias already points at another suffix.
    Conflict(String),
}

/// Result of claiming the original-URL pointer for a suffix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OriginalClaim {
    Claimed,
    /// Another record already owns this URL.
    Existing(String),
}

pub struct LinkRecordStore {
    backend: Arc<dyn KvBackend>,
    key_prefix: String,
    retry: RetryConfig,
    max_update_attempts: u32,
}

impl LinkRecordStore {
    pub fn new(backend: Arc<dyn KvBackend>, config: &StoreConfig) -> Self {
        Self {
            backend,
            key_prefix: config.key_prefix.clone(),
            retry: RetryConfig::from(config),
            max_update_attempts: config.max_update_attempts.max(1),
        }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.backend_name()
    }

    fn record_key(&self, suffix: &str) -> String {
        format!("{}link:{}", self.key_prefix, suffix)
    }

    fn original_key(&self, key: &IndexKey) -> String {
        format!("{}orig:{}", self.key_prefix, key)
    }

    fn alias_key(&self, key: &IndexKey) -> String {
        format!("{}alias:{}", self.key_prefix, key)
    }

    async fn read(&self, key: &str) -> Result<Option<String>> {
        with_retry("get", self.retry, || self.backend.get(key)).await
    }

    pub async fn get_by_suffix(&self, suffix: &str) -> Result<Option<LinkRecord>> {
        match self.read(&self.record_key(suffix)).await? {
            Some(raw) => Ok(Some(LinkRecord::from_json(&raw)?)),
            None => Ok(None),
        }
    }

    pub async fn exists(&self, suffix: &str) -> Result<bool> {
        Ok(self.read(&self.record_key(suffix)).await?.is_some())
    }

    pub async fn get_by_original(&self, url: &str) -> Result<Option<LinkRecord>> {
        let pointer = self.original_key(&hash(url));
        self.follow(&pointer).await
    }

    pub async fn get_by_alias(&self, alias: &str) -> Result<Option<LinkRecord>> {
        let pointer = self.alias_key(&hash(alias));
        self.follow(&pointer).await
    }

    /// Pointer → suffix → record.
    async fn follow(&self, pointer: &str) -> Result<Option<LinkRecord>> {
        let Some(suffix) = self.read(pointer).await? else {
            return Ok(None);
        };
        let record = self.get_by_suffix(&suffix).await?;
        if record.is_none() {
            // 写入顺序保证不会出现悬空指针；出现即说明数据被外部篡改
            error!("Dangling index pointer {} -> {}", pointer, suffix);
        }
        Ok(record)
    }

    /// Conditional create on the suffix key. `false` if the suffix is taken.
    pub async fn create_if_absent(&self, record: &LinkRecord) -> Result<bool> {
        let key = self.record_key(&record.suffix);
        let value = record.to_json()?;
        let created =
            with_retry("set_if_absent", self.retry, || self.backend.set_if_absent(&key, &value))
                .await?;
        trace!("create_if_absent {} -> {}", record.suffix, created);
        Ok(created)
    }

    /// Point the original-URL hash at `suffix` unless another suffix owns it.
    pub async fn claim_original(&self, url: &str, suffix: &str) -> Result<OriginalClaim> {
        let key = self.original_key(&hash(url));
        match self.claim_pointer(&key, suffix).await? {
            None => Ok(OriginalClaim::Claimed),
            Some(existing) => Ok(OriginalClaim::Existing(existing)),
        }
    }

    /// Bind `alias` to `suffix`. Succeeds if the alias is free or already
    /// points at `suffix`; an existing binding is never overwritten.
    pub async fn bind_alias(&self, alias: &str, suffix: &str) -> Result<AliasBinding> {
        let key = self.alias_key(&hash(alias));
        match self.claim_pointer(&key, suffix).await? {
            None => {
                debug!("Alias '{}' bound to {}", alias, suffix);
                Ok(AliasBinding::Bound)
            }
            Some(existing) => Ok(AliasBinding::Conflict(existing)),
        }
    }

    /// `None` when the pointer now holds `suffix`, otherwise the other owner.
    async fn claim_pointer(&self, key: &str, suffix: &str) -> Result<Option<String>> {
        let created =
            with_retry("set_if_absent", self.retry, || self.backend.set_if_absent(key, suffix))
                .await?;
        if created {
            return Ok(None);
        }

        match self.read(key).await? {
            Some(existing) if existing == suffix => Ok(None),
            Some(existing) => Ok(Some(existing)),
            // 指针从不删除，读不到只可能是后端异常
            None => Err(ShortstatError::backend_unavailable(format!(
                "pointer {} vanished after conditional write",
                key
            ))),
        }
    }

    /// Unconditional overwrite of the record.
    pub async fn persist(&self, record: &LinkRecord) -> Result<()> {
        let key = self.record_key(&record.suffix);
        let value = record.to_json()?;
        with_retry("set", self.retry, || self.backend.set(&key, &value)).await
    }

    /// Optimistic read-modify-write of one record.
    ///
    /// `mutate` runs against the freshly read record; the result is written
    /// back only if the stored value is unchanged since the read, otherwise
    /// the cycle restarts. If `mutate` fails nothing is written.
    pub async fn update<F>(&self, suffix: &str, mut mutate: F) -> Result<LinkRecord>
    where
        F: FnMut(&mut LinkRecord) -> Result<()>,
    {
        let key = self.record_key(suffix);
        // CAS 超时后结果不确定，重放可能重复计数，因此不自动重试
        let cas_retry = RetryConfig {
            max_retries: 0,
            ..self.retry
        };

        for attempt in 1..=self.max_update_attempts {
            let raw = self
                .read(&key)
                .await?
                .ok_or_else(|| ShortstatError::not_found(format!("no record for {}", suffix)))?;
            let mut record = LinkRecord::from_json(&raw)?;
            mutate(&mut record)?;
            let next = record.to_json()?;

            let swapped = with_retry("compare_and_swap", cas_retry, || {
                self.backend.compare_and_swap(&key, &raw, &next)
            })
            .await?;
            if swapped {
                return Ok(record);
            }

            trace!(
                "Concurrent update on {} (attempt {}/{}), retrying",
                suffix, attempt, self.max_update_attempts
            );
            tokio::task::yield_now().await;
        }

        warn!(
            "Gave up updating {} after {} attempts",
            suffix, self.max_update_attempts
        );
        Err(ShortstatError::conflict(format!(
            "record {} changed concurrently {} times",
            suffix, self.max_update_attempts
        )))
    }

    /// Remove a record that was created but never became reachable through
    /// any pointer (lost the original-URL race).
    pub async fn discard_orphan(&self, suffix: &str) -> Result<()> {
        let key = self.record_key(suffix);
        debug!("Discarding orphan record {}", suffix);
        with_retry("delete", self.retry, || self.backend.delete(&key)).await
    }
}
