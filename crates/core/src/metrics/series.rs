//! Zero-filled time series over a date range.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::metrics::period::{DateRange, Granularity};

/// One money movement to aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FinancialEvent {
    /// When it happened.
    pub at: DateTime<Utc>,
    /// Gross amount, minor units.
    pub amount: i64,
    /// Instructor commission, minor units.
    pub commission: i64,
    /// Platform fee, minor units.
    pub platform_fee: i64,
}

/// Totals of one bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesPoint {
    /// First day of the bucket.
    pub bucket: NaiveDate,
    /// Σ gross amount.
    pub amount: i64,
    /// Σ commission.
    pub commission: i64,
    /// Σ platform fee.
    pub platform_fee: i64,
    /// Number of events.
    pub count: u64,
}

impl SeriesPoint {
    fn empty(bucket: NaiveDate) -> Self {
        Self {
            bucket,
            amount: 0,
            commission: 0,
            platform_fee: 0,
            count: 0,
        }
    }
}

/// Sums events per bucket, in chronological order, with empty buckets filled.
///
/// Events outside `range` are ignored.
#[must_use]
pub fn bucketize(
    events: &[FinancialEvent],
    range: &DateRange,
    granularity: Granularity,
) -> Vec<SeriesPoint> {
    let mut buckets: BTreeMap<NaiveDate, SeriesPoint> = BTreeMap::new();
    let mut cursor = granularity.bucket_start(range.start);
    while cursor <= range.end {
        buckets.insert(cursor, SeriesPoint::empty(cursor));
        let next = granularity.next_bucket(cursor);
        if next <= cursor {
            break;
        }
        cursor = next;
    }

    for event in events {
        let day = event.at.date_naive();
        if !range.contains(day) {
            continue;
        }
        let bucket = granularity.bucket_start(day);
        let point = buckets
            .entry(bucket)
            .or_insert_with(|| SeriesPoint::empty(bucket));
        point.amount += event.amount;
        point.commission += event.commission;
        point.platform_fee += event.platform_fee;
        point.count += 1;
    }

    buckets.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn event(y: i32, m: u32, day: u32, commission: i64) -> FinancialEvent {
        FinancialEvent {
            at: Utc.with_ymd_and_hms(y, m, day, 15, 30, 0).unwrap(),
            amount: commission * 5 / 4,
            commission,
            platform_fee: commission / 4,
        }
    }

    #[test]
    fn test_daily_zero_fill() {
        let range = DateRange::new(d(2024, 3, 1), d(2024, 3, 5)).unwrap();
        let series = bucketize(&[event(2024, 3, 2, 800), event(2024, 3, 2, 400)], &range, Granularity::Daily);
        assert_eq!(series.len(), 5);
        assert_eq!(series[0].count, 0);
        assert_eq!(series[1].bucket, d(2024, 3, 2));
        assert_eq!(series[1].commission, 1_200);
        assert_eq!(series[1].count, 2);
    }

    #[test]
    fn test_weekly_buckets_start_monday() {
        // 2024-03-13 is a Wednesday.
        let range = DateRange::new(d(2024, 3, 13), d(2024, 3, 26)).unwrap();
        let series = bucketize(&[event(2024, 3, 17, 100), event(2024, 3, 18, 100)], &range, Granularity::Weekly);
        let buckets: Vec<NaiveDate> = series.iter().map(|p| p.bucket).collect();
        assert_eq!(buckets, vec![d(2024, 3, 11), d(2024, 3, 18), d(2024, 3, 25)]);
        assert_eq!(series[0].commission, 100);
        assert_eq!(series[1].commission, 100);
    }

    #[test]
    fn test_monthly_ignores_out_of_range() {
        let range = DateRange::new(d(2024, 1, 15), d(2024, 3, 10)).unwrap();
        let series = bucketize(
            &[event(2024, 1, 10, 999), event(2024, 2, 1, 100), event(2024, 3, 20, 999)],
            &range,
            Granularity::Monthly,
        );
        assert_eq!(series.len(), 3);
        let total: i64 = series.iter().map(|p| p.commission).sum();
        assert_eq!(total, 100);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Buckets are strictly increasing and totals are conserved.
        #[test]
        fn prop_series_is_chronological_and_conserves_totals(
            offsets in prop::collection::vec((0_u32..60, 0_i64..100_000), 0..50),
            granularity in prop_oneof![Just(Granularity::Daily), Just(Granularity::Weekly), Just(Granularity::Monthly)],
        ) {
            let start = d(2024, 1, 1);
            let range = DateRange::new(start, d(2024, 2, 29)).unwrap();
            let events: Vec<FinancialEvent> = offsets
                .iter()
                .map(|(days, commission)| FinancialEvent {
                    at: start.and_hms_opt(12, 0, 0).unwrap().and_utc() + chrono::Duration::days(i64::from(*days)),
                    amount: *commission,
                    commission: *commission,
                    platform_fee: 0,
                })
                .collect();
            let series = bucketize(&events, &range, granularity);
            for pair in series.windows(2) {
                prop_assert!(pair[0].bucket < pair[1].bucket);
            }
            let expected: i64 = events
                .iter()
                .filter(|e| range.contains(e.at.date_naive()))
                .map(|e| e.commission)
                .sum();
            prop_assert_eq!(series.iter().map(|p| p.commission).sum::<i64>(), expected);
        }
    }
}
