//! Report error types.

use edumart_shared::AppError;
use thiserror::Error;

/// Errors that can occur during report generation.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Tax year outside the supported window.
    #[error("Invalid tax year: {0}")]
    InvalidYear(i32),

    /// CSV encoding failed.
    #[error("CSV generation failed: {0}")]
    Csv(String),
}

impl From<csv::Error> for ReportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err.to_string())
    }
}

impl ReportError {
    /// Returns the API error code.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidYear(_) => "VALIDATION_ERROR",
            Self::Csv(_) => "INTERNAL_SERVER_ERROR",
        }
    }

    /// Returns the HTTP status code.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::InvalidYear(_) => 400,
            Self::Csv(_) => 500,
        }
    }
}

impl From<ReportError> for AppError {
    fn from(err: ReportError) -> Self {
        match err {
            ReportError::InvalidYear(_) => Self::Validation(err.to_string()),
            ReportError::Csv(_) => Self::Internal(err.to_string()),
        }
    }
}
