//! Metrics aggregation for instructor and admin dashboards.
//!
//! # Modules
//!
//! - `growth` - Period-over-period growth rates
//! - `period` - Granularity, bucket starts and date-range resolution
//! - `series` - Zero-filled time series
//! - `overview` - Earnings and revenue read models
//! - `error` - Metrics-specific error types

pub mod error;
pub mod growth;
pub mod overview;
pub mod period;
pub mod series;

pub use error::MetricsError;
pub use growth::{calculate_growth_rate, growth_rate_minor};
pub use overview::{EarningsOverview, RevenueOverview, RevenueSums};
pub use period::{DateRange, Granularity, RangeQuery};
pub use series::{FinancialEvent, SeriesPoint, bucketize};
