//! Link resolution service
//!
//! Create-or-fetch, alias binding, redirect-time visit recording and
//! stats lookup, shared by the HTTP handlers and anything else that embeds
//! the engine.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, warn};

use super::suffix::SuffixGenerator;
use crate::analytics::{TracingVisitSink, VisitFailure, VisitSink};
use crate::config::{StaticConfig, WindowExhaustion};
use crate::errors::{Result, ShortstatError};
use crate::histogram::{Distribution, VisitHistogram};
use crate::storage::{AliasBinding, LinkRecord, LinkRecordStore, OriginalClaim};
use crate::utils::is_valid_alias;
use crate::utils::url_validator::validate_url;

/// Per-resolver knobs taken from the static configuration.
#[derive(Debug, Clone)]
pub struct ResolverOptions {
    pub window_days: u32,
    pub precision: u8,
    pub exhaustion: WindowExhaustion,
    pub max_alias_length: usize,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self::from(&StaticConfig::default())
    }
}

impl From<&StaticConfig> for ResolverOptions {
    fn from(config: &StaticConfig) -> Self {
        Self {
            window_days: config.histogram.window_days,
            precision: config.histogram.precision,
            exhaustion: config.histogram.exhaustion,
            max_alias_length: config.links.max_alias_length,
        }
    }
}

/// Stats for one link with its decoded histogram.
#[derive(Debug, Clone)]
pub struct LinkStats {
    pub suffix: String,
    pub original_url: String,
    pub alias: Option<String>,
    pub created_at: DateTime<Utc>,
    pub visit_count: u64,
    pub histogram: VisitHistogram,
    /// The opaque encoded form, as persisted.
    pub encoded: Vec<u8>,
}

impl LinkStats {
    pub fn distribution(&self) -> Distribution<'_> {
        self.histogram.distribution()
    }
}

pub struct LinkResolver {
    store: Arc<LinkRecordStore>,
    generator: SuffixGenerator,
    sink: Arc<dyn VisitSink>,
    options: ResolverOptions,
}

impl LinkResolver {
    pub fn new(store: Arc<LinkRecordStore>, generator: SuffixGenerator, options: ResolverOptions) -> Self {
        Self {
            store,
            generator,
            sink: Arc::new(TracingVisitSink),
            options,
        }
    }

    pub fn from_config(store: Arc<LinkRecordStore>, config: &StaticConfig) -> Result<Self> {
        config.validate()?;
        let generator =
            SuffixGenerator::new(config.links.suffix_bytes, config.links.max_generate_attempts)?;
        Ok(Self::new(store, generator, ResolverOptions::from(config)))
    }

    /// Replace the sink that receives unrecorded visits.
    pub fn with_sink(mut self, sink: Arc<dyn VisitSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn store(&self) -> &LinkRecordStore {
        &self.store
    }

    pub async fn create_or_fetch(&self, original_url: &str, alias: Option<&str>) -> Result<LinkRecord> {
        self.create_or_fetch_at(original_url, alias, Utc::now()).await
    }

    /// Return the record for `original_url`, creating it on first sight,
    /// and bind `alias` to it when given.
    #[instrument(skip(self), fields(url = %original_url))]
    pub async fn create_or_fetch_at(
        &self,
        original_url: &str,
        alias: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<LinkRecord> {
        // 校验全部在访问后端之前完成
        let url = validate_url(original_url)?;
        let alias = self.normalize_alias(alias)?;

        let record = match self.store.get_by_original(url).await? {
            Some(existing) => {
                debug!("Reusing record {} for {}", existing.suffix, url);
                existing
            }
            None => {
                if let Some(alias) = alias {
                    self.ensure_alias_available(alias, None).await?;
                }
                self.create_record(url, now).await?
            }
        };

        match alias {
            Some(alias) => self.attach_alias(record, alias).await,
            None => Ok(record),
        }
    }

    fn normalize_alias<'a>(&self, alias: Option<&'a str>) -> Result<Option<&'a str>> {
        match alias.map(str::trim) {
            None | Some("") => Ok(None),
            Some(alias) if is_valid_alias(alias, self.options.max_alias_length) => Ok(Some(alias)),
            Some(alias) => Err(ShortstatError::invalid_input(format!(
                "alias '{}' must be 1-{} characters of [A-Za-z0-9_-]",
                alias, self.options.max_alias_length
            ))),
        }
    }

    /// Reject aliases owned by another record, or equal to another record's
    /// suffix (suffix lookup wins at resolve time, so it would be shadowed).
    async fn ensure_alias_available(&self, alias: &str, suffix: Option<&str>) -> Result<()> {
        if let Some(owner) = self.store.get_by_alias(alias).await?
            && Some(owner.suffix.as_str()) != suffix
        {
            return Err(alias_in_use(alias));
        }
        if Some(alias) != suffix && self.store.exists(alias).await? {
            return Err(alias_in_use(alias));
        }
        Ok(())
    }

    async fn create_record(&self, url: &str, now: DateTime<Utc>) -> Result<LinkRecord> {
        for attempt in 1..=self.generator.max_attempts() {
            let suffix = self.generator.generate(&self.store).await?;
            let histogram =
                VisitHistogram::for_window(now, self.options.window_days, self.options.precision)?;
            let record = LinkRecord::new(suffix, url.to_string(), now, &histogram)?;

            if !self.store.create_if_absent(&record).await? {
                // 检查与写入之间后缀被占用，重新生成
                debug!(
                    "Suffix {} taken before commit (attempt {})",
                    record.suffix, attempt
                );
                continue;
            }

            match self.store.claim_original(url, &record.suffix).await? {
                OriginalClaim::Claimed => {
                    info!("Created short link {} -> {}", record.suffix, url);
                    return Ok(record);
                }
                OriginalClaim::Existing(winner) => {
                    debug!(
                        "Lost creation race for {}: {} wins over {}",
                        url, winner, record.suffix
                    );
                    if let Err(e) = self.store.discard_orphan(&record.suffix).await {
                        warn!("Failed to discard orphan record {}: {}", record.suffix, e);
                    }
                    return self.store.get_by_suffix(&winner).await?.ok_or_else(|| {
                        ShortstatError::not_found(format!("record {} for {} is missing", winner, url))
                    });
                }
            }
        }

        Err(ShortstatError::generation_exhausted(format!(
            "could not commit a suffix for {} after {} attempts",
            url,
            self.generator.max_attempts()
        )))
    }

    async fn attach_alias(&self, record: LinkRecord, alias: &str) -> Result<LinkRecord> {
        self.ensure_alias_available(alias, Some(&record.suffix)).await?;

        if let AliasBinding::Conflict(existing) = self.store.bind_alias(alias, &record.suffix).await? {
            debug!(
                "Alias '{}' already bound to {}, refusing {}",
                alias, existing, record.suffix
            );
            return Err(alias_in_use(alias));
        }

        if record.alias.as_deref() == Some(alias) {
            return Ok(record);
        }
        self.store
            .update(&record.suffix, |r| {
                r.alias = Some(alias.to_string());
                Ok(())
            })
            .await
    }

    /// Suffix first, then alias.
    async fn lookup(&self, token: &str) -> Result<Option<LinkRecord>> {
        let token = token.trim();
        if token.is_empty() {
            return Ok(None);
        }
        if let Some(record) = self.store.get_by_suffix(token).await? {
            return Ok(Some(record));
        }
        self.store.get_by_alias(token).await
    }

    pub async fn resolve(&self, token: &str) -> Result<String> {
        self.resolve_at(token, Utc::now()).await
    }

    /// Resolve `token` to its original URL and record one visit at `now`.
    ///
    /// Histogram failures (window elapsed, too much contention) go to the
    /// visit sink and do not block the redirect; visit count and histogram
    /// then both stay unchanged.
    #[instrument(skip(self))]
    pub async fn resolve_at(&self, token: &str, now: DateTime<Utc>) -> Result<String> {
        let record = self
            .lookup(token)
            .await?
            .ok_or_else(|| ShortstatError::not_found(format!("no link for '{}'", token)))?;

        let policy = self.options.exhaustion;
        match self
            .store
            .update(&record.suffix, |r| record_visit(r, now, policy))
            .await
        {
            Ok(updated) => {
                debug!("Visit {} recorded for {}", updated.visit_count, updated.suffix);
                Ok(updated.original_url)
            }
            Err(e @ (ShortstatError::OutOfRangeValue(_) | ShortstatError::Conflict(_))) => {
                self.sink
                    .report(VisitFailure::new(record.suffix.clone(), now, e))
                    .await;
                Ok(record.original_url)
            }
            Err(e) => Err(e),
        }
    }

    pub async fn stats(&self, token: &str) -> Result<LinkStats> {
        let record = self
            .lookup(token)
            .await?
            .ok_or_else(|| ShortstatError::not_found(format!("no link for '{}'", token)))?;
        let histogram = record.decode_histogram()?;

        Ok(LinkStats {
            suffix: record.suffix,
            original_url: record.original_url,
            alias: record.alias,
            created_at: record.created_at,
            visit_count: record.visit_count,
            histogram,
            encoded: record.histogram,
        })
    }
}

/// Decode, count one visit, re-encode. Both counters change or neither.
fn record_visit(record: &mut LinkRecord, now: DateTime<Utc>, policy: WindowExhaustion) -> Result<()> {
    let mut histogram = record.decode_histogram()?;
    match policy {
        WindowExhaustion::Reject => histogram.record(now)?,
        WindowExhaustion::Saturate => histogram.record_saturating(now)?,
    }
    record.histogram = histogram.encode()?;
    record.visit_count = histogram.total_count();
    Ok(())
}

fn alias_in_use(alias: &str) -> ShortstatError {
    ShortstatError::alias_in_use(format!("alias '{}' is already in use", alias))
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;
    use crate::analytics::MemoryVisitSink;
    use crate::config::StoreConfig;
    use crate::storage::MemoryBackend;

    fn resolver_with(options: ResolverOptions) -> LinkResolver {
        let store = Arc::new(LinkRecordStore::new(
            Arc::new(MemoryBackend::new()),
            &StoreConfig::default(),
        ));
        LinkResolver::new(store, SuffixGenerator::default(), options)
    }

    fn created() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_invalid_url_rejected_before_backend() {
        let resolver = resolver_with(ResolverOptions::default());
        for bad in ["", "   ", "javascript:alert(1)", "not a url"] {
            assert!(matches!(
                resolver.create_or_fetch(bad, None).await,
                Err(ShortstatError::InvalidInput(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_invalid_alias_rejected() {
        let resolver = resolver_with(ResolverOptions::default());
        let result = resolver
            .create_or_fetch("https://example.com/", Some("has space"))
            .await;
        assert!(matches!(result, Err(ShortstatError::InvalidInput(_))));
        // nothing was created
        assert!(
            resolver
                .store()
                .get_by_original("https://example.com/")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_empty_alias_means_none() {
        let resolver = resolver_with(ResolverOptions::default());
        let record = resolver
            .create_or_fetch("https://example.com/", Some(""))
            .await
            .unwrap();
        assert!(record.alias.is_none());
        assert!(resolver.store().get_by_alias("").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_alias_equal_to_foreign_suffix_rejected() {
        let resolver = resolver_with(ResolverOptions::default());
        let first = resolver.create_or_fetch("https://a.io/", None).await.unwrap();
        let result = resolver
            .create_or_fetch("https://b.io/", Some(&first.suffix))
            .await;
        assert!(matches!(result, Err(ShortstatError::AliasInUse(_))));
    }

    #[tokio::test]
    async fn test_window_reject_reports_and_still_redirects() {
        let sink = Arc::new(MemoryVisitSink::new());
        let resolver = resolver_with(ResolverOptions {
            window_days: 1,
            ..ResolverOptions::default()
        })
        .with_sink(sink.clone());

        let record = resolver
            .create_or_fetch_at("https://example.com/", None, created())
            .await
            .unwrap();
        let late = created() + Duration::days(3);
        let url = resolver.resolve_at(&record.suffix, late).await.unwrap();
        assert_eq!(url, "https://example.com/");

        let failures = sink.failures();
        assert_eq!(failures.len(), 1);
        assert!(matches!(failures[0].error, ShortstatError::OutOfRangeValue(_)));

        let stats = resolver.stats(&record.suffix).await.unwrap();
        assert_eq!(stats.visit_count, 0);
        assert_eq!(stats.histogram.total_count(), 0);
    }

    #[tokio::test]
    async fn test_window_saturate_counts_late_visits() {
        let sink = Arc::new(MemoryVisitSink::new());
        let resolver = resolver_with(ResolverOptions {
            window_days: 1,
            exhaustion: WindowExhaustion::Saturate,
            ..ResolverOptions::default()
        })
        .with_sink(sink.clone());

        let record = resolver
            .create_or_fetch_at("https://example.com/", None, created())
            .await
            .unwrap();
        resolver
            .resolve_at(&record.suffix, created() + Duration::days(3))
            .await
            .unwrap();

        assert!(sink.failures().is_empty());
        let stats = resolver.stats(&record.suffix).await.unwrap();
        assert_eq!(stats.visit_count, 1);
        assert_eq!(stats.distribution().map(|b| b.count).sum::<u64>(), 1);
    }

    #[tokio::test]
    async fn test_corrupt_histogram_surfaces_encoding_error() {
        let resolver = resolver_with(ResolverOptions::default());
        let mut record = resolver
            .create_or_fetch("https://example.com/", None)
            .await
            .unwrap();
        record.histogram = vec![1, 2, 3];
        resolver.store().persist(&record).await.unwrap();

        assert!(matches!(
            resolver.resolve(&record.suffix).await,
            Err(ShortstatError::Encoding(_))
        ));
        assert!(matches!(
            resolver.stats(&record.suffix).await,
            Err(ShortstatError::Encoding(_))
        ));
        let stored = resolver.store().get_by_suffix(&record.suffix).await.unwrap().unwrap();
        assert_eq!(stored.visit_count, 0);
    }
}
