//! Settlement: keeping every active payout backed by PAID earnings.
//!
//! Coverage rule per instructor and currency:
//! `Σ commission(PAID) ≥ Σ amount(PENDING | PROCESSING | COMPLETED payouts)`.
//!
//! When a payout is requested the shortfall is closed by marking PENDING
//! earnings PAID, oldest first. When a payout fails or is cancelled its
//! earnings return to PENDING and the rule is re-applied against the payouts
//! that remain active.

use chrono::{DateTime, Utc};
use edumart_shared::types::{EarningId, PayoutId};

use crate::balance::BalanceSums;
use crate::earnings::{EarningSnapshot, EarningStatus};

/// Earnings to mark PAID.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettlementPlan {
    /// Earnings to settle, oldest first.
    pub settle: Vec<EarningId>,
    /// Σ commission of `settle`.
    pub settled_amount: i64,
    /// Coverage still missing after settling every pending earning.
    pub shortfall: i64,
}

impl SettlementPlan {
    /// True when nothing needs to change.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.settle.is_empty()
    }
}

/// Chooses which PENDING earnings to settle so `sums` becomes covered.
///
/// `sums` must already include any payout being created. Non-pending entries
/// in `pending` are ignored.
#[must_use]
pub fn plan_settlement(pending: &[EarningSnapshot], sums: &BalanceSums) -> SettlementPlan {
    let mut need = sums.settlement_shortfall();
    if need == 0 {
        return SettlementPlan::default();
    }

    let mut candidates: Vec<&EarningSnapshot> = pending
        .iter()
        .filter(|e| e.status == EarningStatus::Pending && e.commission > 0)
        .collect();
    candidates.sort_by(|a, b| {
        a.created_at
            .cmp(&b.created_at)
            .then_with(|| a.id.into_inner().cmp(&b.id.into_inner()))
    });

    let mut plan = SettlementPlan::default();
    for earning in candidates {
        if need <= 0 {
            break;
        }
        plan.settle.push(earning.id);
        plan.settled_amount += earning.commission;
        need -= earning.commission;
    }
    plan.shortfall = need.max(0);
    plan
}

/// Payout that newly settled earnings are attributed to after a release:
/// the most recently requested one still active.
#[must_use]
pub fn settlement_target(active: &[(PayoutId, DateTime<Utc>)]) -> Option<PayoutId> {
    active
        .iter()
        .max_by(|a, b| {
            a.1.cmp(&b.1)
                .then_with(|| a.0.into_inner().cmp(&b.0.into_inner()))
        })
        .map(|(id, _)| *id)
}

/// Earnings a failed or cancelled payout gives back.
#[must_use]
pub fn released_earnings(payout_id: PayoutId, earnings: &[EarningSnapshot]) -> Vec<EarningId> {
    earnings
        .iter()
        .filter(|e| e.status == EarningStatus::Paid && e.payout_id == Some(payout_id))
        .map(|e| e.id)
        .collect()
}
