//! Payout error types.

use edumart_shared::AppError;
use edumart_shared::types::{Money, PayoutId};
use thiserror::Error;

use crate::payout::types::PayoutStatus;

/// Errors that can occur during payout operations.
#[derive(Debug, Error)]
pub enum PayoutError {
    /// Attempted an invalid status transition.
    #[error("Cannot move payout from {from} to {to}")]
    InvalidStatus {
        /// The current status.
        from: PayoutStatus,
        /// The attempted target status.
        to: PayoutStatus,
    },

    /// Amount is zero or negative.
    #[error("Payout amount must be positive")]
    NonPositiveAmount,

    /// Amount is below the currency minimum.
    #[error("Minimum payout amount is {minimum}")]
    BelowMinimum {
        /// Requested amount.
        amount: Money,
        /// Currency minimum.
        minimum: Money,
    },

    /// Currency is not supported for payouts.
    #[error("Unsupported payout currency: {0}")]
    UnsupportedCurrency(String),

    /// Instructor has no payout method on file.
    #[error("Payment details are not configured")]
    PaymentDetailsMissing,

    /// Amount exceeds the available balance.
    #[error("Insufficient balance: requested {requested}, available {available}")]
    InsufficientBalance {
        /// Requested amount.
        requested: Money,
        /// Available balance.
        available: Money,
    },

    /// Failure reason is required.
    #[error("A failure reason is required")]
    ReasonRequired,

    /// Payout does not exist or is not visible to the caller.
    #[error("Payout {0} not found")]
    NotFound(PayoutId),
}

impl PayoutError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            _ => 400,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidStatus { .. } => "INVALID_STATUS",
            Self::InsufficientBalance { .. } => "INSUFFICIENT_BALANCE",
            Self::NotFound(_) => "NOT_FOUND",
            Self::NonPositiveAmount
            | Self::BelowMinimum { .. }
            | Self::UnsupportedCurrency(_)
            | Self::PaymentDetailsMissing
            | Self::ReasonRequired => "VALIDATION_ERROR",
        }
    }
}

impl From<PayoutError> for AppError {
    fn from(err: PayoutError) -> Self {
        let message = err.to_string();
        match err {
            PayoutError::InvalidStatus { .. } => Self::InvalidStatus(message),
            PayoutError::InsufficientBalance { .. } => Self::InsufficientBalance(message),
            PayoutError::NotFound(_) => Self::NotFound(message),
            PayoutError::NonPositiveAmount
            | PayoutError::BelowMinimum { .. }
            | PayoutError::UnsupportedCurrency(_)
            | PayoutError::PaymentDetailsMissing
            | PayoutError::ReasonRequired => Self::Validation(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use edumart_shared::types::Currency;

    #[test]
    fn test_invalid_status_error() {
        let err = PayoutError::InvalidStatus {
            from: PayoutStatus::Failed,
            to: PayoutStatus::Completed,
        };
        assert_eq!(err.status_code(), 400);
        assert_eq!(err.error_code(), "INVALID_STATUS");
        assert!(err.to_string().contains("FAILED"));
    }

    #[test]
    fn test_insufficient_balance_maps_to_app_error() {
        let err = PayoutError::InsufficientBalance {
            requested: Money::new(100_100, Currency::Inr),
            available: Money::new(100_000, Currency::Inr),
        };
        assert_eq!(err.error_code(), "INSUFFICIENT_BALANCE");
        let app: AppError = err.into();
        assert_eq!(app.error_code(), "INSUFFICIENT_BALANCE");
        assert!(app.public_message().contains("₹1,000.00"));
    }

    #[test]
    fn test_below_minimum_is_validation() {
        let err = PayoutError::BelowMinimum {
            amount: Money::new(9_900, Currency::Inr),
            minimum: Money::new(10_000, Currency::Inr),
        };
        assert_eq!(err.error_code(), "VALIDATION_ERROR");
        assert_eq!(AppError::from(err).status_code(), 400);
    }

    #[test]
    fn test_not_found() {
        let err = PayoutError::NotFound(PayoutId::new());
        assert_eq!(err.status_code(), 404);
        assert_eq!(AppError::from(err).error_code(), "NOT_FOUND");
    }
}
