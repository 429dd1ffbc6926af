//! 访问时间序列直方图
//!
//! A bounded, logarithmic-bucket counter of visit timestamps. Each histogram
//! covers a fixed time window; timestamps are stored as seconds since the
//! window start and counted into HDR-style buckets: every power-of-two range
//! is split into the same number of linear sub-buckets, so the relative
//! bucket width is bounded by the configured number of significant digits.
//!
//! The counts array length depends only on the window length and precision,
//! never on the number of recorded visits, which keeps the encoded form of a
//! very popular link as small as that of an unpopular one.

mod codec;
mod distribution;

use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::errors::{Result, ShortstatError};

pub use distribution::{Distribution, DistributionBucket};

pub const MIN_PRECISION: u8 = 1;
pub const MAX_PRECISION: u8 = 5;
/// 窗口长度上限（约 10 年）
pub const MAX_WINDOW_DAYS: u32 = 3_650;
const MAX_WINDOW_SECS: i64 = MAX_WINDOW_DAYS as i64 * 86_400;

/// Bucket geometry derived from `(precision, window length)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Layout {
    sub_bucket_half_count_magnitude: u32,
    sub_bucket_half_count: u64,
    sub_bucket_mask: u64,
    leading_zero_count_base: u32,
    counts_len: usize,
}

impl Layout {
    fn new(precision: u8, highest: u64) -> Self {
        // 单位分辨率下需要区分的最大值
        let largest_single_unit = 2 * 10u64.pow(precision as u32);
        let sub_bucket_count_magnitude = 64 - (largest_single_unit - 1).leading_zeros();
        let sub_bucket_count = 1u64 << sub_bucket_count_magnitude;
        let sub_bucket_half_count = sub_bucket_count / 2;

        let mut smallest_untrackable = sub_bucket_count;
        let mut bucket_count: u64 = 1;
        while smallest_untrackable <= highest {
            if smallest_untrackable > u64::MAX / 2 {
                bucket_count += 1;
                break;
            }
            smallest_untrackable <<= 1;
            bucket_count += 1;
        }

        Self {
            sub_bucket_half_count_magnitude: sub_bucket_count_magnitude - 1,
            sub_bucket_half_count,
            sub_bucket_mask: sub_bucket_count - 1,
            leading_zero_count_base: 64 - sub_bucket_count_magnitude,
            counts_len: ((bucket_count + 1) * sub_bucket_half_count) as usize,
        }
    }

    fn bucket_for(&self, value: u64) -> u32 {
        self.leading_zero_count_base - (value | self.sub_bucket_mask).leading_zeros()
    }

    fn index_for(&self, value: u64) -> usize {
        let bucket = self.bucket_for(value);
        let sub_bucket = value >> bucket;
        let bucket_base = ((bucket as u64) + 1) << self.sub_bucket_half_count_magnitude;
        (bucket_base + sub_bucket - self.sub_bucket_half_count) as usize
    }

    /// Lowest value and width of the bucket at `index`.
    fn range_at(&self, index: usize) -> (u64, u64) {
        let index = index as u64;
        let mut bucket = (index >> self.sub_bucket_half_count_magnitude) as i64 - 1;
        let mut sub_bucket = (index & (self.sub_bucket_half_count - 1)) + self.sub_bucket_half_count;
        if bucket < 0 {
            sub_bucket -= self.sub_bucket_half_count;
            bucket = 0;
        }
        (sub_bucket << bucket, 1u64 << bucket)
    }
}

/// Visit histogram over `[window_start, window_end]`, second resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisitHistogram {
    window_start: i64,
    window_end: i64,
    precision: u8,
    counts: Vec<u64>,
    total: u64,
    layout: Layout,
}

impl VisitHistogram {
    /// Allocate an empty histogram spanning the given window.
    pub fn init(
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
        precision: u8,
    ) -> Result<Self> {
        Self::from_bounds(window_start.timestamp(), window_end.timestamp(), precision)
    }

    /// Window of `days` days beginning at `start`.
    pub fn for_window(start: DateTime<Utc>, days: u32, precision: u8) -> Result<Self> {
        if days > MAX_WINDOW_DAYS {
            return Err(ShortstatError::invalid_input(format!(
                "histogram window of {} days exceeds {} days",
                days, MAX_WINDOW_DAYS
            )));
        }
        let end = start
            .checked_add_signed(Duration::days(days as i64))
            .ok_or_else(|| ShortstatError::invalid_input("histogram window end overflows"))?;
        Self::init(start, end, precision)
    }

    /// Window length in seconds; bounded by `MAX_WINDOW_SECS`.
    fn span(&self) -> u64 {
        (self.window_end - self.window_start) as u64
    }

    fn from_bounds(window_start: i64, window_end: i64, precision: u8) -> Result<Self> {
        if !(MIN_PRECISION..=MAX_PRECISION).contains(&precision) {
            return Err(ShortstatError::invalid_input(format!(
                "histogram precision must be within {}..={}, got {}",
                MIN_PRECISION, MAX_PRECISION, precision
            )));
        }
        if window_end <= window_start {
            return Err(ShortstatError::invalid_input(format!(
                "histogram window end ({}) must be after start ({})",
                window_end, window_start
            )));
        }
        let span = window_end
            .checked_sub(window_start)
            .filter(|span| *span <= MAX_WINDOW_SECS)
            .ok_or_else(|| {
                ShortstatError::invalid_input(format!(
                    "histogram window [{}, {}] exceeds {} days",
                    window_start, window_end, MAX_WINDOW_DAYS
                ))
            })?;
        if Utc.timestamp_opt(window_start, 0).single().is_none()
            || Utc.timestamp_opt(window_end, 0).single().is_none()
        {
            return Err(ShortstatError::invalid_input(format!(
                "histogram window [{}, {}] is not representable",
                window_start, window_end
            )));
        }

        let layout = Layout::new(precision, span as u64);
        Ok(Self {
            window_start,
            window_end,
            precision,
            counts: vec![0; layout.counts_len],
            total: 0,
            layout,
        })
    }

    /// Add one observation.
    ///
    /// Timestamps outside the window fail with `OutOfRangeValue`; nothing is
    /// changed in that case.
    pub fn record(&mut self, at: DateTime<Utc>) -> Result<()> {
        let secs = at.timestamp();
        if secs < self.window_start || secs > self.window_end {
            return Err(ShortstatError::out_of_range(format!(
                "timestamp {} is outside histogram window [{}, {}]",
                at.to_rfc3339(),
                self.window_start_time().to_rfc3339(),
                self.window_end_time().to_rfc3339()
            )));
        }
        self.record_offset((secs - self.window_start) as u64)
    }

    /// Like [`record`](Self::record), but visits after the window end are
    /// counted in the final bucket instead of being rejected.
    pub fn record_saturating(&mut self, at: DateTime<Utc>) -> Result<()> {
        let end = self.window_end_time();
        self.record(at.min(end))
    }

    fn record_offset(&mut self, offset: u64) -> Result<()> {
        let index = self.layout.index_for(offset);
        let slot = self.counts.get_mut(index).ok_or_else(|| {
            ShortstatError::out_of_range(format!("offset {} has no bucket", offset))
        })?;
        let next_total = self
            .total
            .checked_add(1)
            .filter(|t| *t <= i64::MAX as u64)
            .ok_or_else(|| ShortstatError::out_of_range("histogram total count overflow"))?;
        *slot += 1;
        self.total = next_total;
        Ok(())
    }

    pub fn total_count(&self) -> u64 {
        self.total
    }

    pub fn precision(&self) -> u8 {
        self.precision
    }

    pub fn window_start_time(&self) -> DateTime<Utc> {
        seconds_to_time(self.window_start)
    }

    pub fn window_end_time(&self) -> DateTime<Utc> {
        seconds_to_time(self.window_end)
    }

    /// Non-empty buckets in time order.
    pub fn distribution(&self) -> Distribution<'_> {
        Distribution::new(self, false)
    }

    /// Every bucket that overlaps the window, including empty ones.
    pub fn distribution_all(&self) -> Distribution<'_> {
        Distribution::new(self, true)
    }
}

fn seconds_to_time(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}
