//! Property-based tests for refund planning.

use chrono::Utc;
use edumart_shared::config::PartialRefundPolicy;
use edumart_shared::types::{Currency, EarningId, PaymentId, PayoutId};
use proptest::prelude::*;

use crate::earnings::{EarningSnapshot, EarningStatus};
use crate::payment::refund::{RefundRequest, RefundService};
use crate::payment::types::{PaymentSnapshot, PaymentStatus};

fn arb_earning_status() -> impl Strategy<Value = EarningStatus> {
    prop_oneof![
        Just(EarningStatus::Pending),
        Just(EarningStatus::Paid),
        Just(EarningStatus::Cancelled),
    ]
}

fn arb_policy() -> impl Strategy<Value = PartialRefundPolicy> {
    prop_oneof![
        Just(PartialRefundPolicy::CancelAll),
        Just(PartialRefundPolicy::Retain)
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Refunds never exceed the charged amount, and the resulting status
    /// matches whether the cumulative refund covers it.
    #[test]
    fn prop_refund_never_exceeds_amount(
        amount in 1_i64..10_000_000,
        requested in 1_i64..20_000_000,
        policy in arb_policy(),
    ) {
        let payment = PaymentSnapshot {
            id: PaymentId::new(),
            status: PaymentStatus::Completed,
            amount,
            refund_amount: 0,
            currency: Currency::Usd,
        };
        let request = RefundRequest { amount: requested, reason: "duplicate".to_string() };
        match RefundService::plan(&payment, &request, &[], policy) {
            Ok(plan) => {
                prop_assert!(requested <= amount);
                prop_assert!(plan.new_refund_amount <= amount);
                prop_assert_eq!(plan.is_full, requested == amount);
                prop_assert_eq!(
                    plan.new_status,
                    if requested == amount { PaymentStatus::Refunded } else { PaymentStatus::PartiallyRefunded }
                );
            }
            Err(_) => prop_assert!(requested > amount),
        }
    }

    /// Only PENDING earnings are ever cancelled.
    #[test]
    fn prop_only_pending_earnings_cancelled(
        statuses in prop::collection::vec(arb_earning_status(), 0..10),
        policy in arb_policy(),
    ) {
        let earnings: Vec<EarningSnapshot> = statuses
            .iter()
            .map(|&status| EarningSnapshot {
                id: EarningId::new(),
                commission: 1_000,
                status,
                payout_id: (status == EarningStatus::Paid).then(PayoutId::new),
                created_at: Utc::now(),
            })
            .collect();
        let payment = PaymentSnapshot {
            id: PaymentId::new(),
            status: PaymentStatus::Completed,
            amount: 10_000,
            refund_amount: 0,
            currency: Currency::Inr,
        };
        let request = RefundRequest { amount: 10_000, reason: "chargeback".to_string() };
        let plan = RefundService::plan(&payment, &request, &earnings, policy).unwrap();
        for id in &plan.cancel_earnings {
            let e = earnings.iter().find(|e| e.id == *id).unwrap();
            prop_assert_eq!(e.status, EarningStatus::Pending);
        }
        let pending = statuses.iter().filter(|s| **s == EarningStatus::Pending).count();
        prop_assert_eq!(plan.cancel_earnings.len(), pending);
    }
}
