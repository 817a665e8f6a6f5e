//! Granularity, bucket boundaries and date-range resolution (all UTC).

use chrono::{DateTime, Datelike, Days, Months, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::metrics::error::MetricsError;

/// Longest custom range accepted, in days between start and end.
pub const MAX_RANGE_DAYS: i64 = 365;

/// Length of the default trailing range, in days.
pub const DEFAULT_RANGE_DAYS: u64 = 30;

/// Bucket size of a time series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    /// One bucket per day.
    #[default]
    Daily,
    /// One bucket per ISO week, starting Monday.
    Weekly,
    /// One bucket per calendar month.
    Monthly,
}

impl Granularity {
    /// Returns the query-string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }

    /// Parses a granularity string.
    ///
    /// # Errors
    ///
    /// Returns `MetricsError::InvalidGranularity` for anything else.
    pub fn parse(s: &str) -> Result<Self, MetricsError> {
        match s.to_lowercase().as_str() {
            "daily" | "day" => Ok(Self::Daily),
            "weekly" | "week" => Ok(Self::Weekly),
            "monthly" | "month" => Ok(Self::Monthly),
            _ => Err(MetricsError::InvalidGranularity(s.to_string())),
        }
    }

    /// First day of the bucket containing `date`.
    #[must_use]
    pub fn bucket_start(self, date: NaiveDate) -> NaiveDate {
        match self {
            Self::Daily => date,
            Self::Weekly => {
                let offset = u64::from(date.weekday().num_days_from_monday());
                date.checked_sub_days(Days::new(offset)).unwrap_or(date)
            }
            Self::Monthly => date.with_day(1).unwrap_or(date),
        }
    }

    /// Start of the bucket after the one starting at `bucket`.
    #[must_use]
    pub fn next_bucket(self, bucket: NaiveDate) -> NaiveDate {
        let next = match self {
            Self::Daily => bucket.checked_add_days(Days::new(1)),
            Self::Weekly => bucket.checked_add_days(Days::new(7)),
            Self::Monthly => bucket.checked_add_months(Months::new(1)),
        };
        next.unwrap_or(NaiveDate::MAX)
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Range parameters as they arrive from a query string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeQuery {
    /// Calendar year; takes precedence over explicit dates.
    pub year: Option<i32>,
    /// Custom range start.
    pub start_date: Option<NaiveDate>,
    /// Custom range end.
    pub end_date: Option<NaiveDate>,
}

/// Inclusive UTC date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    /// First day.
    pub start: NaiveDate,
    /// Last day.
    pub end: NaiveDate,
}

impl DateRange {
    /// Creates a range.
    ///
    /// # Errors
    ///
    /// Returns `MetricsError::InvalidDateRange` if `start > end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, MetricsError> {
        if start > end {
            return Err(MetricsError::InvalidDateRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// Resolves query parameters against `today`.
    ///
    /// - `year` → Jan 1 .. Dec 31 of that year, end clamped to today
    /// - `startDate` + `endDate` → validated custom range
    /// - nothing → the trailing 30 days ending today
    ///
    /// # Errors
    ///
    /// Returns a `MetricsError` for an inverted, future, over-long or
    /// half-specified range.
    pub fn resolve(query: &RangeQuery, today: NaiveDate) -> Result<Self, MetricsError> {
        if let Some(year) = query.year {
            return Self::year(year, today);
        }
        match (query.start_date, query.end_date) {
            (Some(start), Some(end)) => {
                let range = Self::new(start, end)?;
                if start > today {
                    return Err(MetricsError::StartInFuture(start));
                }
                let days = (end - start).num_days();
                if days > MAX_RANGE_DAYS {
                    return Err(MetricsError::RangeTooLong {
                        days,
                        max: MAX_RANGE_DAYS,
                    });
                }
                Ok(range)
            }
            (None, None) => Ok(Self::trailing(DEFAULT_RANGE_DAYS, today)),
            _ => Err(MetricsError::IncompleteRange),
        }
    }

    /// Calendar year, end clamped to today.
    ///
    /// # Errors
    ///
    /// Returns an error for an unrepresentable or future year.
    pub fn year(year: i32, today: NaiveDate) -> Result<Self, MetricsError> {
        let start = NaiveDate::from_ymd_opt(year, 1, 1).ok_or(MetricsError::InvalidYear(year))?;
        let end = NaiveDate::from_ymd_opt(year, 12, 31).ok_or(MetricsError::InvalidYear(year))?;
        if start > today {
            return Err(MetricsError::StartInFuture(start));
        }
        Self::new(start, end.min(today))
    }

    /// The `days` days ending at `today`, inclusive.
    #[must_use]
    pub fn trailing(days: u64, today: NaiveDate) -> Self {
        let start = today
            .checked_sub_days(Days::new(days.saturating_sub(1)))
            .unwrap_or(today);
        Self { start, end: today }
    }

    /// The calendar month containing `date`.
    #[must_use]
    pub fn month_of(date: NaiveDate) -> Self {
        let start = Granularity::Monthly.bucket_start(date);
        let end = Granularity::Monthly
            .next_bucket(start)
            .pred_opt()
            .unwrap_or(start);
        Self { start, end }
    }

    /// The same-length range ending the day before `start`.
    #[must_use]
    pub fn previous(&self) -> Self {
        let len = u64::try_from(self.days()).unwrap_or(1);
        let end = self.start.pred_opt().unwrap_or(self.start);
        let start = end
            .checked_sub_days(Days::new(len.saturating_sub(1)))
            .unwrap_or(end);
        Self { start, end }
    }

    /// Number of days, inclusive.
    #[must_use]
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// True if `date` falls in the range.
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Inclusive lower bound as a timestamp.
    #[must_use]
    pub fn start_at(&self) -> DateTime<Utc> {
        self.start.and_time(NaiveTime::MIN).and_utc()
    }

    /// Exclusive upper bound as a timestamp (midnight after `end`).
    #[must_use]
    pub fn end_exclusive_at(&self) -> DateTime<Utc> {
        self.end
            .succ_opt()
            .unwrap_or(self.end)
            .and_time(NaiveTime::MIN)
            .and_utc()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[rstest]
    #[case(Granularity::Daily, d(2024, 3, 13), d(2024, 3, 13))]
    #[case(Granularity::Weekly, d(2024, 3, 13), d(2024, 3, 11))]
    #[case(Granularity::Weekly, d(2024, 3, 11), d(2024, 3, 11))]
    #[case(Granularity::Weekly, d(2024, 3, 17), d(2024, 3, 11))]
    #[case(Granularity::Monthly, d(2024, 2, 29), d(2024, 2, 1))]
    fn test_bucket_start(#[case] g: Granularity, #[case] date: NaiveDate, #[case] start: NaiveDate) {
        assert_eq!(g.bucket_start(date), start);
    }

    #[test]
    fn test_next_bucket_monthly_rolls_year() {
        assert_eq!(Granularity::Monthly.next_bucket(d(2023, 12, 1)), d(2024, 1, 1));
    }

    #[test]
    fn test_parse_granularity() {
        assert_eq!(Granularity::parse("WEEKLY").unwrap(), Granularity::Weekly);
        assert!(Granularity::parse("hourly").is_err());
    }

    #[test]
    fn test_resolve_default_trailing_30_days() {
        let today = d(2024, 3, 31);
        let range = DateRange::resolve(&RangeQuery::default(), today).unwrap();
        assert_eq!(range.end, today);
        assert_eq!(range.days(), 30);
    }

    #[test]
    fn test_resolve_year_clamps_to_today() {
        let today = d(2024, 3, 31);
        let q = RangeQuery {
            year: Some(2024),
            ..RangeQuery::default()
        };
        let range = DateRange::resolve(&q, today).unwrap();
        assert_eq!(range.start, d(2024, 1, 1));
        assert_eq!(range.end, today);

        let past = DateRange::year(2023, today).unwrap();
        assert_eq!(past.end, d(2023, 12, 31));
        assert!(DateRange::year(2025, today).is_err());
    }

    #[test]
    fn test_resolve_custom_validation() {
        let today = d(2024, 6, 1);
        let custom = |s, e| RangeQuery {
            year: None,
            start_date: Some(s),
            end_date: Some(e),
        };
        assert!(DateRange::resolve(&custom(d(2024, 1, 1), d(2024, 2, 1)), today).is_ok());
        assert!(matches!(
            DateRange::resolve(&custom(d(2024, 2, 1), d(2024, 1, 1)), today),
            Err(MetricsError::InvalidDateRange { .. })
        ));
        assert!(matches!(
            DateRange::resolve(&custom(d(2024, 7, 1), d(2024, 7, 2)), today),
            Err(MetricsError::StartInFuture(_))
        ));
        assert!(matches!(
            DateRange::resolve(&custom(d(2023, 1, 1), d(2024, 1, 2)), today),
            Err(MetricsError::RangeTooLong { .. })
        ));
        let half = RangeQuery {
            start_date: Some(d(2024, 1, 1)),
            ..RangeQuery::default()
        };
        assert!(matches!(
            DateRange::resolve(&half, today),
            Err(MetricsError::IncompleteRange)
        ));
    }

    #[test]
    fn test_month_and_previous() {
        let feb = DateRange::month_of(d(2024, 2, 10));
        assert_eq!(feb.start, d(2024, 2, 1));
        assert_eq!(feb.end, d(2024, 2, 29));

        let range = DateRange::new(d(2024, 3, 1), d(2024, 3, 10)).unwrap();
        let prev = range.previous();
        assert_eq!(prev.end, d(2024, 2, 29));
        assert_eq!(prev.days(), 10);
    }

    #[test]
    fn test_timestamp_bounds() {
        let range = DateRange::new(d(2024, 3, 1), d(2024, 3, 1)).unwrap();
        assert_eq!(range.start_at().to_rfc3339(), "2024-03-01T00:00:00+00:00");
        assert_eq!(range.end_exclusive_at().to_rfc3339(), "2024-03-02T00:00:00+00:00");
    }
}
