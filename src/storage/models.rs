use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::histogram::VisitHistogram;

/// The unit of truth for one shortened link.
///
/// Serialized as a JSON object; the histogram is stored as URL-safe base64
/// of its compact binary encoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkRecord {
    #[serde(rename = "originalURL")]
    pub original_url: String,
    pub suffix: String,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "visitCount", default)]
    pub visit_count: u64,
    #[serde(with = "histogram_b64")]
    pub histogram: Vec<u8>,
}

impl LinkRecord {
    /// Fresh record with zero visits and an empty, already encoded histogram.
    pub fn new(
        suffix: String,
        original_url: String,
        created_at: DateTime<Utc>,
        histogram: &VisitHistogram,
    ) -> Result<Self> {
        Ok(Self {
            original_url,
            suffix,
            alias: None,
            created_at,
            visit_count: 0,
            histogram: histogram.encode()?,
        })
    }

    pub fn decode_histogram(&self) -> Result<VisitHistogram> {
        VisitHistogram::decode(&self.histogram)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(data: &str) -> Result<Self> {
        Ok(serde_json::from_str(data)?)
    }
}

mod histogram_b64 {
    use super::*;
    use serde::{Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&URL_SAFE_NO_PAD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        URL_SAFE_NO_PAD.decode(encoded.as_bytes()).map_err(D::Error::custom)
    }
}
