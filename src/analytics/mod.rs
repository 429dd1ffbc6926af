pub mod sink;

pub use sink::{MemoryVisitSink, TracingVisitSink, VisitSink};

use chrono::{DateTime, Utc};

use crate::errors::ShortstatError;

/// 未能计入直方图的访问
#[derive(Debug, Clone)]
pub struct VisitFailure {
    /// 短链接后缀
    pub suffix: String,
    /// 访问时间
    pub timestamp: DateTime<Utc>,
    pub error: ShortstatError,
}

impl VisitFailure {
    pub fn new(suffix: impl Into<String>, timestamp: DateTime<Utc>, error: ShortstatError) -> Self {
        Self {
            suffix: suffix.into(),
            timestamp,
            error,
        }
    }
}
