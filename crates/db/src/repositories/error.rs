//! Repository error type.

use edumart_core::metrics::MetricsError;
use edumart_core::payment::PaymentError;
use edumart_core::payout::PayoutError;
use edumart_core::reports::ReportError;
use edumart_shared::AppError;
use sea_orm::DbErr;

/// Errors returned by repositories.
///
/// Domain rule violations pass through unchanged so the API can map them to
/// their own codes; storage failures surface as `Database`.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// Payout rule violation.
    #[error(transparent)]
    Payout(#[from] PayoutError),

    /// Payment or refund rule violation.
    #[error(transparent)]
    Payment(#[from] PaymentError),

    /// Invalid metrics parameters.
    #[error(transparent)]
    Metrics(#[from] MetricsError),

    /// Report generation failure.
    #[error(transparent)]
    Report(#[from] ReportError),

    /// Row not found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Entity name.
        entity: &'static str,
        /// Identifier looked up.
        id: String,
    },

    /// Stored data violates a domain invariant.
    #[error("Data integrity error: {0}")]
    Integrity(String),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl RepositoryError {
    /// Shorthand for `NotFound`.
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Payout(e) => e.into(),
            RepositoryError::Payment(e) => e.into(),
            RepositoryError::Metrics(e) => e.into(),
            RepositoryError::Report(e) => e.into(),
            RepositoryError::NotFound { .. } => Self::NotFound(err.to_string()),
            RepositoryError::Integrity(msg) => Self::Internal(msg),
            RepositoryError::Database(e) => Self::Database(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use edumart_shared::types::{Currency, Money};

    #[test]
    fn test_domain_errors_keep_their_codes() {
        let err: AppError = RepositoryError::from(PayoutError::InsufficientBalance {
            requested: Money::new(100, Currency::Inr),
            available: Money::zero(Currency::Inr),
        })
        .into();
        assert_eq!(err.error_code(), "INSUFFICIENT_BALANCE");
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn test_storage_errors_are_internal() {
        let err: AppError = RepositoryError::Database(DbErr::Custom("boom".into())).into();
        assert_eq!(err.status_code(), 500);
        let err: AppError = RepositoryError::not_found("Payout", "abc").into();
        assert_eq!(err.status_code(), 404);
    }
}
