//! Payment error types.

use edumart_shared::AppError;
use edumart_shared::types::{Money, PaymentId};
use thiserror::Error;

use crate::payment::types::PaymentStatus;

/// Errors that can occur during payment completion and refunds.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// Payment is not in the status the operation requires.
    #[error("Payment is {current}, expected {expected}")]
    InvalidTransactionStatus {
        /// Current status.
        current: PaymentStatus,
        /// Required status.
        expected: PaymentStatus,
    },

    /// Refund amount is zero or negative.
    #[error("Refund amount must be positive")]
    NonPositiveRefund,

    /// Refund reason missing.
    #[error("A refund reason is required")]
    ReasonRequired,

    /// Refund would exceed what is left to refund.
    #[error("Refund of {requested} exceeds refundable amount {refundable}")]
    ExceedsRefundable {
        /// Requested refund.
        requested: Money,
        /// Still refundable.
        refundable: Money,
    },

    /// Platform fee rate or enrollment price is unusable.
    #[error("Invalid commission input: {0}")]
    InvalidCommission(String),

    /// Payment does not exist.
    #[error("Payment {0} not found")]
    NotFound(PaymentId),
}

impl PaymentError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::InvalidCommission(_) => 500,
            _ => 400,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidTransactionStatus { .. } => "INVALID_TRANSACTION_STATUS",
            Self::NonPositiveRefund | Self::ReasonRequired | Self::ExceedsRefundable { .. } => {
                "VALIDATION_ERROR"
            }
            Self::InvalidCommission(_) => "INTERNAL_SERVER_ERROR",
            Self::NotFound(_) => "NOT_FOUND",
        }
    }
}

impl From<PaymentError> for AppError {
    fn from(err: PaymentError) -> Self {
        let message = err.to_string();
        match err {
            PaymentError::InvalidTransactionStatus { .. } => Self::InvalidTransactionStatus(message),
            PaymentError::NonPositiveRefund
            | PaymentError::ReasonRequired
            | PaymentError::ExceedsRefundable { .. } => Self::Validation(message),
            PaymentError::InvalidCommission(_) => Self::Internal(message),
            PaymentError::NotFound(_) => Self::NotFound(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use edumart_shared::types::Currency;

    #[test]
    fn test_invalid_transaction_status() {
        let err = PaymentError::InvalidTransactionStatus {
            current: PaymentStatus::Refunded,
            expected: PaymentStatus::Completed,
        };
        assert_eq!(err.status_code(), 400);
        assert_eq!(
            AppError::from(err).error_code(),
            "INVALID_TRANSACTION_STATUS"
        );
    }

    #[test]
    fn test_exceeds_refundable_is_validation() {
        let err = PaymentError::ExceedsRefundable {
            requested: Money::new(60_000, Currency::Inr),
            refundable: Money::new(50_000, Currency::Inr),
        };
        assert_eq!(err.error_code(), "VALIDATION_ERROR");
        assert!(err.to_string().contains("₹500.00"));
    }
}
