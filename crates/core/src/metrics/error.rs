//! Metrics error types.

use chrono::NaiveDate;
use edumart_shared::AppError;
use thiserror::Error;

/// Errors that can occur while resolving metric queries.
#[derive(Debug, Error)]
pub enum MetricsError {
    /// Start date is after end date.
    #[error("Invalid date range: start {start} is after end {end}")]
    InvalidDateRange {
        /// Start date.
        start: NaiveDate,
        /// End date.
        end: NaiveDate,
    },

    /// Start date lies in the future.
    #[error("Start date {0} is in the future")]
    StartInFuture(NaiveDate),

    /// Range longer than allowed.
    #[error("Date range spans {days} days, maximum is {max}")]
    RangeTooLong {
        /// Requested span.
        days: i64,
        /// Maximum span.
        max: i64,
    },

    /// Only one bound of a custom range was given.
    #[error("Both startDate and endDate are required for a custom range")]
    IncompleteRange,

    /// Year outside the supported calendar.
    #[error("Invalid year: {0}")]
    InvalidYear(i32),

    /// Unknown granularity.
    #[error("Invalid granularity: {0}, expected daily, weekly or monthly")]
    InvalidGranularity(String),
}

impl MetricsError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        400
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        "VALIDATION_ERROR"
    }
}

impl From<MetricsError> for AppError {
    fn from(err: MetricsError) -> Self {
        Self::Validation(err.to_string())
    }
}
