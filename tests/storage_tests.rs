//! Storage tests with fault-injecting backends
//!
//! Wraps `MemoryBackend` to simulate transient outages, slow calls and
//! permanently lost compare-and-swap races.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use shortstat::analytics::MemoryVisitSink;
use shortstat::config::StoreConfig;
use shortstat::errors::{Result, ShortstatError};
use shortstat::histogram::VisitHistogram;
use shortstat::services::{LinkResolver, ResolverOptions, SuffixGenerator};
use shortstat::storage::{KvBackend, LinkRecord, LinkRecordStore, MemoryBackend};

// =============================================================================
// Test Backends
// =============================================================================

/// Fails the first `failures` calls of every kind with `BackendUnavailable`.
struct FlakyBackend {
    inner: MemoryBackend,
    remaining: AtomicU32,
    calls: AtomicU32,
}

impl FlakyBackend {
    fn new(failures: u32) -> Self {
        Self {
            inner: MemoryBackend::new(),
            remaining: AtomicU32::new(failures),
            calls: AtomicU32::new(0),
        }
    }

    fn trip(&self) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let left = self.remaining.load(Ordering::SeqCst);
        if left > 0 {
            self.remaining.store(left - 1, Ordering::SeqCst);
            return Err(ShortstatError::backend_unavailable("injected outage"));
        }
        Ok(())
    }
}

#[async_trait]
impl KvBackend for FlakyBackend {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.trip()?;
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.trip()?;
        self.inner.set(key, value).await
    }

    async fn set_if_absent(&self, key: &str, value: &str) -> Result<bool> {
        self.trip()?;
        self.inner.set_if_absent(key, value).await
    }

    async fn compare_and_swap(&self, key: &str, expected: &str, value: &str) -> Result<bool> {
        self.trip()?;
        self.inner.compare_and_swap(key, expected, value).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.trip()?;
        self.inner.delete(key).await
    }

    fn backend_name(&self) -> &'static str {
        "flaky"
    }
}

/// Every read hangs longer than any sane timeout.
struct StallingBackend;

#[async_trait]
impl KvBackend for StallingBackend {
    async fn get(&self, _key: &str) -> Result<Option<String>> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: &str) -> Result<()> {
        Ok(())
    }

    async fn set_if_absent(&self, _key: &str, _value: &str) -> Result<bool> {
        Ok(true)
    }

    async fn compare_and_swap(&self, _key: &str, _expected: &str, _value: &str) -> Result<bool> {
        Ok(true)
    }

    async fn delete(&self, _key: &str) -> Result<()> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "stalling"
    }
}

/// Compare-and-swap always loses, as if another writer always got there first.
struct LosingCasBackend {
    inner: MemoryBackend,
}

#[async_trait]
impl KvBackend for LosingCasBackend {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.inner.set(key, value).await
    }

    async fn set_if_absent(&self, key: &str, value: &str) -> Result<bool> {
        self.inner.set_if_absent(key, value).await
    }

    async fn compare_and_swap(&self, _key: &str, _expected: &str, _value: &str) -> Result<bool> {
        Ok(false)
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.inner.delete(key).await
    }

    fn backend_name(&self) -> &'static str {
        "losing-cas"
    }
}

fn fast_config() -> StoreConfig {
    StoreConfig {
        timeout_ms: 50,
        retry_count: 3,
        retry_base_delay_ms: 1,
        retry_max_delay_ms: 5,
        max_update_attempts: 4,
        ..StoreConfig::default()
    }
}

fn sample_record(suffix: &str) -> LinkRecord {
    let now = Utc::now();
    let histogram = VisitHistogram::for_window(now, 30, 3).unwrap();
    LinkRecord::new(suffix.to_string(), "https://example.com/".to_string(), now, &histogram)
        .unwrap()
}

// =============================================================================
// Retry Behavior
// =============================================================================

#[tokio::test]
async fn test_transient_failures_are_retried() {
    let backend = Arc::new(FlakyBackend::new(2));
    let kv: Arc<dyn KvBackend> = backend.clone();
    let store = LinkRecordStore::new(kv, &fast_config());

    assert!(store.get_by_suffix("missing").await.unwrap().is_none());
    assert_eq!(backend.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_persistent_outage_surfaces_backend_unavailable() {
    let backend = Arc::new(FlakyBackend::new(100));
    let store = LinkRecordStore::new(backend.clone(), &fast_config());

    let err = store.get_by_suffix("x").await.unwrap_err();
    assert!(matches!(err, ShortstatError::BackendUnavailable(_)));
    assert!(err.is_retryable());
    // 1 次初始调用 + 3 次重试
    assert_eq!(backend.calls.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn test_stalled_call_times_out() {
    let store = LinkRecordStore::new(
        Arc::new(StallingBackend),
        &StoreConfig {
            retry_count: 0,
            ..fast_config()
        },
    );

    let err = store.exists("x").await.unwrap_err();
    assert!(matches!(err, ShortstatError::BackendUnavailable(_)));
    assert!(err.message().contains("timed out"));
}

#[tokio::test]
async fn test_compare_and_swap_is_not_replayed() {
    let backend = Arc::new(FlakyBackend::new(0));
    let store = LinkRecordStore::new(backend.clone(), &fast_config());
    let record = sample_record("abc");
    assert!(store.create_if_absent(&record).await.unwrap());

    let calls_before = backend.calls.load(Ordering::SeqCst);
    let result = store
        .update("abc", |_| {
            // 在读之后、CAS 之前注入一次故障
            backend.remaining.store(1, Ordering::SeqCst);
            Ok(())
        })
        .await;

    assert!(matches!(result, Err(ShortstatError::BackendUnavailable(_))));
    // one read, one CAS
    assert_eq!(backend.calls.load(Ordering::SeqCst) - calls_before, 2);
}

// =============================================================================
// Optimistic Update
// =============================================================================

#[tokio::test]
async fn test_update_gives_up_with_conflict() {
    let store = LinkRecordStore::new(
        Arc::new(LosingCasBackend {
            inner: MemoryBackend::new(),
        }),
        &fast_config(),
    );
    let record = sample_record("abc");
    store.create_if_absent(&record).await.unwrap();

    let mut runs = 0;
    let result = store
        .update("abc", |_| {
            runs += 1;
            Ok(())
        })
        .await;
    assert!(matches!(result, Err(ShortstatError::Conflict(_))));
    assert_eq!(runs, 4);
}

#[tokio::test]
async fn test_update_missing_record_not_found() {
    let store = LinkRecordStore::new(Arc::new(MemoryBackend::new()), &fast_config());
    let result = store.update("nope", |_| Ok(())).await;
    assert!(matches!(result, Err(ShortstatError::NotFound(_))));
}

#[tokio::test]
async fn test_failed_mutation_writes_nothing() {
    let store = LinkRecordStore::new(Arc::new(MemoryBackend::new()), &fast_config());
    let record = sample_record("abc");
    store.create_if_absent(&record).await.unwrap();

    let result = store
        .update("abc", |r| {
            r.visit_count = 99;
            Err(ShortstatError::out_of_range("late"))
        })
        .await;
    assert!(matches!(result, Err(ShortstatError::OutOfRangeValue(_))));
    assert_eq!(store.get_by_suffix("abc").await.unwrap().unwrap(), record);
}

#[tokio::test]
async fn test_contended_visit_is_reported_not_fatal() {
    let store = Arc::new(LinkRecordStore::new(
        Arc::new(LosingCasBackend {
            inner: MemoryBackend::new(),
        }),
        &fast_config(),
    ));
    let sink = Arc::new(MemoryVisitSink::new());
    let resolver = LinkResolver::new(store, SuffixGenerator::default(), ResolverOptions::default())
        .with_sink(sink.clone());

    let record = resolver
        .create_or_fetch("https://example.com/", None)
        .await
        .unwrap();
    let url = resolver.resolve(&record.suffix).await.unwrap();
    assert_eq!(url, "https://example.com/");

    let failures = sink.failures();
    assert_eq!(failures.len(), 1);
    assert!(matches!(failures[0].error, ShortstatError::Conflict(_)));
}
