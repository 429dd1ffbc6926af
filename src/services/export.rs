//! 访问分布 CSV 导出

use std::io::Write;

use csv::WriterBuilder;
use serde::Serialize;

use crate::errors::{Result, ShortstatError};
use crate::histogram::DistributionBucket;

/// CSV 行（仅用于序列化）
#[derive(Debug, Clone, Serialize)]
pub struct DistributionCsvRow {
    pub from: String,
    pub to: String,
    pub count: u64,
}

impl From<DistributionBucket> for DistributionCsvRow {
    fn from(bucket: DistributionBucket) -> Self {
        Self {
            from: bucket.start.to_rfc3339(),
            to: bucket.end.to_rfc3339(),
            count: bucket.count,
        }
    }
}

/// 将分布写入任意 writer，表头为 `from,to,count`
pub fn write_distribution_csv<W, I>(buckets: I, writer: W) -> Result<()>
where
    W: Write,
    I: IntoIterator<Item = DistributionBucket>,
{
    let mut csv_writer = WriterBuilder::new().has_headers(false).from_writer(writer);

    // 空分布也要输出表头
    csv_writer
        .write_record(["from", "to", "count"])
        .map_err(|e| ShortstatError::serialization(format!("Failed to write CSV header: {}", e)))?;

    for bucket in buckets {
        csv_writer
            .serialize(DistributionCsvRow::from(bucket))
            .map_err(|e| ShortstatError::serialization(format!("Failed to write CSV row: {}", e)))?;
    }

    csv_writer
        .flush()
        .map_err(|e| ShortstatError::serialization(format!("Failed to flush CSV: {}", e)))?;
    Ok(())
}

pub fn distribution_csv<I>(buckets: I) -> Result<String>
where
    I: IntoIterator<Item = DistributionBucket>,
{
    let mut out = Vec::new();
    write_distribution_csv(buckets, &mut out)?;
    String::from_utf8(out).map_err(|e| ShortstatError::serialization(e.to_string()))
}
