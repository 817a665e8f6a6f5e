//! Refund validation and cascade planning.
//!
//! A refund is only accepted on a COMPLETED payment. It moves the payment to
//! REFUNDED or PARTIALLY_REFUNDED, revokes enrollments on a full refund and
//! cancels the payment's earnings according to `PartialRefundPolicy`.
//!
//! Only PENDING earnings are cancelled. PAID earnings already back a payout;
//! cancelling them would drive the instructor balance negative, so they are
//! reported as clawbacks instead.

use edumart_shared::config::PartialRefundPolicy;
use edumart_shared::types::{EarningId, Money};

use crate::earnings::{EarningSnapshot, EarningStatus};
use crate::payment::error::PaymentError;
use crate::payment::types::{PaymentSnapshot, PaymentStatus};

/// Admin refund input.
#[derive(Debug, Clone)]
pub struct RefundRequest {
    /// Amount to refund, minor units of the payment currency.
    pub amount: i64,
    /// Why the refund was issued.
    pub reason: String,
}

/// Everything a refund changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefundPlan {
    /// Payment status after the refund.
    pub new_status: PaymentStatus,
    /// Cumulative refunded amount after the refund.
    pub new_refund_amount: i64,
    /// True when the whole payment is refunded.
    pub is_full: bool,
    /// Move the payment's enrollments to REFUNDED.
    pub refund_enrollments: bool,
    /// PENDING earnings to cancel.
    pub cancel_earnings: Vec<EarningId>,
    /// Σ commission of `cancel_earnings`.
    pub cancelled_commission: i64,
    /// PAID earnings left untouched that the platform has to claw back.
    pub clawback_earnings: Vec<EarningId>,
    /// Σ commission of `clawback_earnings`.
    pub clawback_commission: i64,
}

/// Stateless refund planner.
pub struct RefundService;

impl RefundService {
    /// Validates a refund and plans its cascade.
    ///
    /// `earnings` are the earnings created by this payment.
    ///
    /// # Errors
    ///
    /// - `InvalidTransactionStatus` unless the payment is COMPLETED
    /// - `NonPositiveRefund` / `ReasonRequired` for bad input
    /// - `ExceedsRefundable` when `amount > payment.amount - payment.refund_amount`
    pub fn plan(
        payment: &PaymentSnapshot,
        request: &RefundRequest,
        earnings: &[EarningSnapshot],
        policy: PartialRefundPolicy,
    ) -> Result<RefundPlan, PaymentError> {
        if payment.status != PaymentStatus::Completed {
            return Err(PaymentError::InvalidTransactionStatus {
                current: payment.status,
                expected: PaymentStatus::Completed,
            });
        }
        if request.amount <= 0 {
            return Err(PaymentError::NonPositiveRefund);
        }
        if request.reason.trim().is_empty() {
            return Err(PaymentError::ReasonRequired);
        }
        let refundable = payment.refundable();
        if request.amount > refundable {
            return Err(PaymentError::ExceedsRefundable {
                requested: Money::new(request.amount, payment.currency),
                refundable: Money::new(refundable.max(0), payment.currency),
            });
        }

        let new_refund_amount = payment.refund_amount + request.amount;
        let is_full = new_refund_amount >= payment.amount;
        let cascade = is_full || policy == PartialRefundPolicy::CancelAll;

        let mut plan = RefundPlan {
            new_status: if is_full {
                PaymentStatus::Refunded
            } else {
                PaymentStatus::PartiallyRefunded
            },
            new_refund_amount,
            is_full,
            refund_enrollments: is_full,
            cancel_earnings: Vec::new(),
            cancelled_commission: 0,
            clawback_earnings: Vec::new(),
            clawback_commission: 0,
        };

        if cascade {
            for earning in earnings {
                match earning.status {
                    EarningStatus::Pending => {
                        plan.cancel_earnings.push(earning.id);
                        plan.cancelled_commission += earning.commission;
                    }
                    EarningStatus::Paid => {
                        plan.clawback_earnings.push(earning.id);
                        plan.clawback_commission += earning.commission;
                    }
                    EarningStatus::Cancelled => {}
                }
            }
        }
        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use edumart_shared::types::{Currency, PaymentId, PayoutId};

    fn payment(amount: i64, refunded: i64, status: PaymentStatus) -> PaymentSnapshot {
        PaymentSnapshot {
            id: PaymentId::new(),
            status,
            amount,
            refund_amount: refunded,
            currency: Currency::Inr,
        }
    }

    fn earning(commission: i64, status: EarningStatus) -> EarningSnapshot {
        EarningSnapshot {
            id: EarningId::new(),
            commission,
            status,
            payout_id: (status == EarningStatus::Paid).then(PayoutId::new),
            created_at: Utc::now(),
        }
    }

    fn request(amount: i64) -> RefundRequest {
        RefundRequest {
            amount,
            reason: "Course not as described".to_string(),
        }
    }

    #[test]
    fn test_full_refund() {
        let earnings = vec![earning(80_000, EarningStatus::Pending)];
        let plan = RefundService::plan(
            &payment(100_000, 0, PaymentStatus::Completed),
            &request(100_000),
            &earnings,
            PartialRefundPolicy::CancelAll,
        )
        .unwrap();
        assert_eq!(plan.new_status, PaymentStatus::Refunded);
        assert!(plan.is_full);
        assert!(plan.refund_enrollments);
        assert_eq!(plan.cancel_earnings, vec![earnings[0].id]);
        assert_eq!(plan.cancelled_commission, 80_000);
    }

    #[test]
    fn test_partial_refund_cancels_earnings_by_default() {
        let earnings = vec![earning(80_000, EarningStatus::Pending)];
        let plan = RefundService::plan(
            &payment(100_000, 0, PaymentStatus::Completed),
            &request(30_000),
            &earnings,
            PartialRefundPolicy::CancelAll,
        )
        .unwrap();
        assert_eq!(plan.new_status, PaymentStatus::PartiallyRefunded);
        assert_eq!(plan.new_refund_amount, 30_000);
        assert!(!plan.refund_enrollments);
        assert_eq!(plan.cancel_earnings.len(), 1);
    }

    #[test]
    fn test_partial_refund_retain_policy_keeps_earnings() {
        let earnings = vec![earning(80_000, EarningStatus::Pending)];
        let plan = RefundService::plan(
            &payment(100_000, 0, PaymentStatus::Completed),
            &request(30_000),
            &earnings,
            PartialRefundPolicy::Retain,
        )
        .unwrap();
        assert!(plan.cancel_earnings.is_empty());
        assert_eq!(plan.cancelled_commission, 0);
    }

    #[test]
    fn test_paid_earnings_become_clawbacks() {
        let pending = earning(40_000, EarningStatus::Pending);
        let paid = earning(40_000, EarningStatus::Paid);
        let plan = RefundService::plan(
            &payment(100_000, 0, PaymentStatus::Completed),
            &request(100_000),
            &[pending.clone(), paid.clone()],
            PartialRefundPolicy::CancelAll,
        )
        .unwrap();
        assert_eq!(plan.cancel_earnings, vec![pending.id]);
        assert_eq!(plan.clawback_earnings, vec![paid.id]);
        assert_eq!(plan.clawback_commission, 40_000);
    }

    #[test]
    fn test_refund_requires_completed_payment() {
        for status in [
            PaymentStatus::Pending,
            PaymentStatus::Refunded,
            PaymentStatus::PartiallyRefunded,
            PaymentStatus::Failed,
        ] {
            let result = RefundService::plan(
                &payment(100_000, 0, status),
                &request(1_000),
                &[],
                PartialRefundPolicy::CancelAll,
            );
            assert!(matches!(
                result,
                Err(PaymentError::InvalidTransactionStatus { .. })
            ));
        }
    }

    #[test]
    fn test_refund_exceeding_refundable_rejected() {
        let result = RefundService::plan(
            &payment(100_000, 40_000, PaymentStatus::Completed),
            &request(60_001),
            &[],
            PartialRefundPolicy::CancelAll,
        );
        assert!(matches!(result, Err(PaymentError::ExceedsRefundable { .. })));
    }

    #[test]
    fn test_refund_input_validation() {
        let p = payment(100_000, 0, PaymentStatus::Completed);
        assert!(matches!(
            RefundService::plan(&p, &request(0), &[], PartialRefundPolicy::CancelAll),
            Err(PaymentError::NonPositiveRefund)
        ));
        let blank = RefundRequest {
            amount: 1_000,
            reason: "   ".to_string(),
        };
        assert!(matches!(
            RefundService::plan(&p, &blank, &[], PartialRefundPolicy::CancelAll),
            Err(PaymentError::ReasonRequired)
        ));
    }
}
