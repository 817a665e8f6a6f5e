//! Payout service for request validation and state transitions.
//!
//! All methods are associated functions. Callers hold the row locks and
//! persist the returned actions inside one database transaction.

use chrono::{DateTime, Utc};
use edumart_shared::types::{Money, PayoutId};
use serde_json::json;

use crate::balance::BalanceSums;
use crate::payout::error::PayoutError;
use crate::payout::limits::minimum_payout;
use crate::payout::types::{PayoutAction, PayoutStatus};

/// Stateless service for payout requests and transitions.
pub struct PayoutService;

impl PayoutService {
    /// Validates a payout request against the locked balance.
    ///
    /// Checks run in order: positive amount, currency minimum, payment
    /// details on file, then available balance.
    ///
    /// # Errors
    ///
    /// Returns the first failed check.
    pub fn validate_request(
        amount: Money,
        sums: &BalanceSums,
        payment_details_configured: bool,
    ) -> Result<(), PayoutError> {
        if !amount.is_positive() {
            return Err(PayoutError::NonPositiveAmount);
        }
        let minimum = minimum_payout(amount.currency);
        if amount.amount < minimum.amount {
            return Err(PayoutError::BelowMinimum { amount, minimum });
        }
        if !payment_details_configured {
            return Err(PayoutError::PaymentDetailsMissing);
        }
        let available = sums.available();
        if amount.amount > available {
            return Err(PayoutError::InsufficientBalance {
                requested: amount,
                available: Money::new(available, amount.currency).floor_zero(),
            });
        }
        Ok(())
    }

    /// Start the transfer of a pending payout.
    ///
    /// # Errors
    ///
    /// Returns `PayoutError::InvalidStatus` unless the payout is PENDING.
    pub fn start_processing(current: PayoutStatus) -> Result<PayoutAction, PayoutError> {
        Self::guard(current, PayoutStatus::Processing)?;
        Ok(PayoutAction::StartProcessing {
            new_status: PayoutStatus::Processing,
        })
    }

    /// Complete a pending or processing payout.
    ///
    /// # Errors
    ///
    /// Returns `PayoutError::InvalidStatus` unless the payout is PENDING or PROCESSING.
    pub fn process(
        current: PayoutStatus,
        payout_id: PayoutId,
        amount: Money,
        now: DateTime<Utc>,
    ) -> Result<PayoutAction, PayoutError> {
        Self::guard(current, PayoutStatus::Completed)?;
        let gateway_id = Self::gateway_reference(payout_id, now);
        Ok(PayoutAction::Complete {
            new_status: PayoutStatus::Completed,
            processed_at: now,
            gateway_response: json!({
                "status": "success",
                "reference": gateway_id,
                "amount": amount.to_major().to_string(),
                "currency": amount.currency.code(),
                "processedAt": now.to_rfc3339(),
            }),
            gateway_id,
        })
    }

    /// Fail a processing payout or reverse a completed one.
    ///
    /// # Errors
    ///
    /// Returns `PayoutError::ReasonRequired` for a blank reason and
    /// `PayoutError::InvalidStatus` unless the payout is PROCESSING or COMPLETED.
    pub fn fail(
        current: PayoutStatus,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<PayoutAction, PayoutError> {
        if reason.trim().is_empty() {
            return Err(PayoutError::ReasonRequired);
        }
        Self::guard(current, PayoutStatus::Failed)?;
        Ok(PayoutAction::Fail {
            new_status: PayoutStatus::Failed,
            reason: reason.trim().to_string(),
            failed_at: now,
        })
    }

    /// Cancel a pending payout.
    ///
    /// # Errors
    ///
    /// Returns `PayoutError::InvalidStatus` unless the payout is PENDING.
    pub fn cancel(current: PayoutStatus, now: DateTime<Utc>) -> Result<PayoutAction, PayoutError> {
        Self::guard(current, PayoutStatus::Cancelled)?;
        Ok(PayoutAction::Cancel {
            new_status: PayoutStatus::Cancelled,
            cancelled_at: now,
        })
    }

    fn guard(from: PayoutStatus, to: PayoutStatus) -> Result<(), PayoutError> {
        if Self::is_valid_transition(from, to) {
            Ok(())
        } else {
            Err(PayoutError::InvalidStatus { from, to })
        }
    }

    /// Check if a status transition is valid.
    #[must_use]
    pub fn is_valid_transition(from: PayoutStatus, to: PayoutStatus) -> bool {
        matches!(
            (from, to),
            (
                PayoutStatus::Pending,
                PayoutStatus::Processing | PayoutStatus::Completed | PayoutStatus::Cancelled
            ) | (
                PayoutStatus::Processing,
                PayoutStatus::Completed | PayoutStatus::Failed
            ) | (PayoutStatus::Completed, PayoutStatus::Failed)
        )
    }

    /// Gateway reference `PO-YYYYMMDD-XXXXXXXX`; the suffix is the tail of the
    /// payout id in upper-case hex.
    #[must_use]
    pub fn gateway_reference(payout_id: PayoutId, at: DateTime<Utc>) -> String {
        let hex = payout_id.into_inner().simple().to_string().to_uppercase();
        let suffix = &hex[hex.len() - 8..];
        format!("PO-{}-{suffix}", at.format("%Y%m%d"))
    }
}
