//! 请求与响应类型

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::histogram::DistributionBucket;
use crate::services::LinkStats;
use crate::storage::LinkRecord;

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ApiResponse<T> {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

#[derive(Deserialize, Clone, Debug)]
pub struct ShortenRequest {
    pub url: String,
    #[serde(default)]
    pub custom_suffix: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct LinkView {
    pub suffix: String,
    pub original_url: String,
    pub alias: Option<String>,
    pub created_at: DateTime<Utc>,
    pub visit_count: u64,
}

impl From<LinkRecord> for LinkView {
    fn from(record: LinkRecord) -> Self {
        Self {
            suffix: record.suffix,
            original_url: record.original_url,
            alias: record.alias,
            created_at: record.created_at,
            visit_count: record.visit_count,
        }
    }
}

#[derive(Serialize, Clone, Debug)]
pub struct StatsView {
    pub suffix: String,
    pub original_url: String,
    pub alias: Option<String>,
    pub created_at: DateTime<Utc>,
    pub visit_count: u64,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub distribution: Vec<DistributionBucket>,
    /// URL-safe base64 of the encoded histogram
    pub histogram: String,
}

impl From<&LinkStats> for StatsView {
    fn from(stats: &LinkStats) -> Self {
        use base64::Engine as _;
        use base64::engine::general_purpose::URL_SAFE_NO_PAD;

        Self {
            suffix: stats.suffix.clone(),
            original_url: stats.original_url.clone(),
            alias: stats.alias.clone(),
            created_at: stats.created_at,
            visit_count: stats.visit_count,
            window_start: stats.histogram.window_start_time(),
            window_end: stats.histogram.window_end_time(),
            distribution: stats.distribution().collect(),
            histogram: URL_SAFE_NO_PAD.encode(&stats.encoded),
        }
    }
}

#[derive(Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StatsFormat {
    #[default]
    Json,
    Csv,
}

#[derive(Deserialize, Clone, Debug, Default)]
pub struct StatsQuery {
    #[serde(default)]
    pub format: StatsFormat,
}
