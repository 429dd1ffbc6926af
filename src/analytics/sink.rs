use std::sync::Mutex;

use super::VisitFailure;

/// Observability sink for visits that could not be recorded.
///
/// Redirects never fail because of the histogram; the failure is handed
/// here instead.
#[async_trait::async_trait]
pub trait VisitSink: Send + Sync {
    async fn report(&self, failure: VisitFailure);
}

/// Default sink: one `warn!` per failure.
pub struct TracingVisitSink;

#[async_trait::async_trait]
impl VisitSink for TracingVisitSink {
    async fn report(&self, failure: VisitFailure) {
        tracing::warn!(
            suffix = %failure.suffix,
            at = %failure.timestamp.to_rfc3339(),
            code = failure.error.code(),
            "Visit not recorded: {}",
            failure.error
        );
    }
}

/// Keeps every failure in memory; handy for tests and diagnostics.
#[derive(Default)]
pub struct MemoryVisitSink {
    failures: Mutex<Vec<VisitFailure>>,
}

impl MemoryVisitSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failures(&self) -> Vec<VisitFailure> {
        self.failures
            .lock()
            .map(|f| f.clone())
            .unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl VisitSink for MemoryVisitSink {
    async fn report(&self, failure: VisitFailure) {
        if let Ok(mut failures) = self.failures.lock() {
            failures.push(failure);
        }
    }
}
