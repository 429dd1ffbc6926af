use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{VisitHistogram, seconds_to_time};

/// One time bucket: `[start, end)` with the visits counted inside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DistributionBucket {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub count: u64,
}

/// Lazy, time-ordered walk over the buckets of a [`VisitHistogram`].
///
/// Cloning the iterator (or calling `distribution()` again) restarts it.
#[derive(Debug, Clone)]
pub struct Distribution<'a> {
    histogram: &'a VisitHistogram,
    index: usize,
    include_empty: bool,
}

impl<'a> Distribution<'a> {
    pub(super) fn new(histogram: &'a VisitHistogram, include_empty: bool) -> Self {
        Self {
            histogram,
            index: 0,
            include_empty,
        }
    }
}

impl Iterator for Distribution<'_> {
    type Item = DistributionBucket;

    fn next(&mut self) -> Option<Self::Item> {
        let h = self.histogram;
        let highest = h.span();

        while self.index < h.counts.len() {
            let index = self.index;
            self.index += 1;

            let (low, width) = h.layout.range_at(index);
            if low > highest {
                // 之后的桶全部落在窗口之外
                self.index = h.counts.len();
                return None;
            }

            let count = h.counts[index];
            if count == 0 && !self.include_empty {
                continue;
            }

            let start = h.window_start + low as i64;
            let end = start
                .saturating_add(width as i64)
                .min(h.window_end.saturating_add(1));
            return Some(DistributionBucket {
                start: seconds_to_time(start),
                end: seconds_to_time(end),
                count,
            });
        }

        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.histogram.counts.len() - self.index))
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_empty_histogram_has_no_non_empty_buckets() {
        let h = VisitHistogram::for_window(start(), 30, 3).unwrap();
        assert_eq!(h.distribution().count(), 0);
    }

    #[test]
    fn test_distribution_counts_sum_to_total() {
        let mut h = VisitHistogram::for_window(start(), 30, 2).unwrap();
        for hours in [0, 1, 1, 5, 48, 240, 700] {
            h.record(start() + Duration::hours(hours)).unwrap();
        }
        let sum: u64 = h.distribution().map(|b| b.count).sum();
        assert_eq!(sum, h.total_count());
        assert_eq!(sum, 7);
    }

    #[test]
    fn test_buckets_are_time_ordered_and_contain_visits() {
        let mut h = VisitHistogram::for_window(start(), 30, 3).unwrap();
        let visits = [
            start() + Duration::minutes(3),
            start() + Duration::days(2),
            start() + Duration::days(29),
        ];
        for v in visits {
            h.record(v).unwrap();
        }

        let buckets: Vec<_> = h.distribution().collect();
        assert_eq!(buckets.len(), 3);
        for pair in buckets.windows(2) {
            assert!(pair[0].end <= pair[1].start);
        }
        for (bucket, visit) in buckets.iter().zip(visits) {
            assert!(bucket.start <= visit && visit < bucket.end);
            assert_eq!(bucket.count, 1);
        }
    }

    #[test]
    fn test_full_distribution_tiles_the_window() {
        let h = VisitHistogram::for_window(start(), 1, 1).unwrap();
        let buckets: Vec<_> = h.distribution_all().collect();
        assert_eq!(buckets.first().unwrap().start, start());
        assert_eq!(
            buckets.last().unwrap().end,
            start() + Duration::days(1) + Duration::seconds(1)
        );
        for pair in buckets.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
        }
        assert!(buckets.iter().all(|b| b.count == 0));
    }

    #[test]
    fn test_distribution_is_restartable() {
        let mut h = VisitHistogram::for_window(start(), 7, 2).unwrap();
        h.record(start() + Duration::hours(3)).unwrap();
        let iter = h.distribution();
        let first: Vec<_> = iter.clone().collect();
        let second: Vec<_> = iter.collect();
        assert_eq!(first, second);
        assert_eq!(h.distribution().collect::<Vec<_>>(), first);
    }
}
