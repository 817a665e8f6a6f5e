//! Property-based tests for settlement planning.

use chrono::{Duration, TimeZone, Utc};
use edumart_shared::types::EarningId;
use proptest::prelude::*;

use crate::balance::BalanceSums;
use crate::earnings::{EarningSnapshot, EarningStatus};
use crate::payout::settlement::plan_settlement;

fn arb_pending() -> impl Strategy<Value = Vec<EarningSnapshot>> {
    prop::collection::vec((1_i64..500_000, 0_i64..10_000), 0..20).prop_map(|rows| {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        rows.into_iter()
            .map(|(commission, minutes)| EarningSnapshot {
                id: EarningId::new(),
                commission,
                status: EarningStatus::Pending,
                payout_id: None,
                created_at: base + Duration::minutes(minutes),
            })
            .collect()
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// A payout within the balance is always fully covered after settlement.
    #[test]
    fn prop_payout_within_balance_is_covered(
        pending in arb_pending(),
        fraction in 0_u32..=100,
    ) {
        let pending_total: i64 = pending.iter().map(|e| e.commission).sum();
        let amount = pending_total * i64::from(fraction) / 100;
        let sums = BalanceSums { pending_earnings: pending_total, ..BalanceSums::default() }
            .with_new_payout(amount);

        let plan = plan_settlement(&pending, &sums);
        prop_assert_eq!(plan.shortfall, 0);
        prop_assert!(plan.settled_amount >= amount);

        let after = BalanceSums {
            pending_earnings: pending_total - plan.settled_amount,
            paid_earnings: plan.settled_amount,
            ..sums
        };
        prop_assert!(after.is_reconciled());
        prop_assert_eq!(after.available(), sums.available());
    }

    /// Settlement never picks more earnings than needed: dropping the last
    /// one would leave the payout uncovered.
    #[test]
    fn prop_settlement_is_minimal_prefix(pending in arb_pending(), amount in 1_i64..2_000_000) {
        let sums = BalanceSums::default().with_new_payout(amount);
        let plan = plan_settlement(&pending, &sums);
        if plan.shortfall == 0 && !plan.settle.is_empty() {
            let last = plan.settle[plan.settle.len() - 1];
            let last_commission = pending.iter().find(|e| e.id == last).map_or(0, |e| e.commission);
            prop_assert!(plan.settled_amount - last_commission < amount);
        }
    }
}
