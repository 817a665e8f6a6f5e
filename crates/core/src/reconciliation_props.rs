//! Ledger model driven by the core planners.
//!
//! Replays random sales, payout requests, payout transitions and refunds
//! against in-memory ledgers and checks after every step that the balance
//! stays non-negative and every active payout is backed by PAID earnings.

use chrono::{DateTime, Duration, TimeZone, Utc};
use edumart_shared::config::PartialRefundPolicy;
use edumart_shared::types::{Currency, EarningId, EnrollmentId, Money, PaymentId, PayoutId, UserId};
use proptest::prelude::*;

use crate::balance::BalanceSums;
use crate::earnings::{EarningSnapshot, EarningStatus};
use crate::payment::{
    CompletionService, EnrollmentLine, PaymentSnapshot, PaymentStatus, RefundRequest, RefundService,
};
use crate::payout::{
    PayoutAction, PayoutError, PayoutService, PayoutStatus, plan_settlement, released_earnings,
    settlement_target,
};

const FEE_BPS: u32 = 2000;

struct Payout {
    id: PayoutId,
    status: PayoutStatus,
    amount: i64,
    requested_at: DateTime<Utc>,
}

struct Ledger {
    clock: DateTime<Utc>,
    payments: Vec<(PaymentSnapshot, Vec<usize>)>,
    earnings: Vec<EarningSnapshot>,
    payouts: Vec<Payout>,
    policy: PartialRefundPolicy,
}

impl Ledger {
    fn new(policy: PartialRefundPolicy) -> Self {
        Self {
            clock: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            payments: Vec::new(),
            earnings: Vec::new(),
            payouts: Vec::new(),
            policy,
        }
    }

    fn tick(&mut self) -> DateTime<Utc> {
        self.clock += Duration::minutes(1);
        self.clock
    }

    fn sums(&self) -> BalanceSums {
        let mut sums = BalanceSums::default();
        for e in &self.earnings {
            match e.status {
                EarningStatus::Pending => sums.pending_earnings += e.commission,
                EarningStatus::Paid => sums.paid_earnings += e.commission,
                EarningStatus::Cancelled => {}
            }
        }
        for p in &self.payouts {
            match p.status {
                PayoutStatus::Pending | PayoutStatus::Processing => sums.in_flight_payouts += p.amount,
                PayoutStatus::Completed => sums.completed_payouts += p.amount,
                PayoutStatus::Failed | PayoutStatus::Cancelled => {}
            }
        }
        sums
    }

    /// Records a completed sale with one enrollment per price.
    fn sell(&mut self, prices: &[i64]) {
        let lines: Vec<EnrollmentLine> = prices
            .iter()
            .map(|price| EnrollmentLine {
                enrollment_id: EnrollmentId::new(),
                instructor_id: UserId::new(),
                price: *price,
            })
            .collect();
        let planned = CompletionService::plan(PaymentStatus::Pending, &lines, FEE_BPS).unwrap();
        let mut indices = Vec::new();
        for earning in planned {
            let created_at = self.tick();
            indices.push(self.earnings.len());
            self.earnings.push(EarningSnapshot {
                id: EarningId::new(),
                commission: earning.split.commission,
                status: EarningStatus::Pending,
                payout_id: None,
                created_at,
            });
        }
        let snapshot = PaymentSnapshot {
            id: PaymentId::new(),
            status: PaymentStatus::Completed,
            amount: prices.iter().sum(),
            refund_amount: 0,
            currency: Currency::Inr,
        };
        self.payments.push((snapshot, indices));
    }

    /// Pushes PENDING earnings to PAID, oldest first, into `target`.
    fn settle(&mut self, sums: &BalanceSums, target: PayoutId) -> i64 {
        let plan = plan_settlement(&self.earnings, sums);
        for id in &plan.settle {
            if let Some(e) = self.earnings.iter_mut().find(|e| e.id == *id) {
                e.status = EarningStatus::Paid;
                e.payout_id = Some(target);
            }
        }
        plan.shortfall
    }

    fn request_payout(&mut self, amount: i64) -> Result<PayoutId, PayoutError> {
        let money = Money::new(amount, Currency::Inr);
        let sums = self.sums();
        PayoutService::validate_request(money, &sums, true)?;
        let id = PayoutId::new();
        let requested_at = self.tick();
        self.payouts.push(Payout {
            id,
            status: PayoutStatus::Pending,
            amount,
            requested_at,
        });
        let shortfall = self.settle(&sums.with_new_payout(amount), id);
        assert_eq!(shortfall, 0, "accepted payout left uncovered");
        Ok(id)
    }

    fn transition(&mut self, index: usize, op: u8) {
        let Some(payout) = self.payouts.get(index) else {
            return;
        };
        let (id, current, amount) = (payout.id, payout.status, payout.amount);
        let now = self.tick();
        let action = match op {
            0 => PayoutService::start_processing(current),
            1 => PayoutService::process(current, id, Money::new(amount, Currency::Inr), now),
            2 => PayoutService::fail(current, "bank rejected transfer", now),
            _ => PayoutService::cancel(current, now),
        };
        let Ok(action) = action else {
            return;
        };
        self.apply(index, &action);
    }

    fn apply(&mut self, index: usize, action: &PayoutAction) {
        let id = self.payouts[index].id;
        self.payouts[index].status = action.new_status();
        if !action.releases_earnings() {
            return;
        }
        for released in released_earnings(id, &self.earnings) {
            if let Some(e) = self.earnings.iter_mut().find(|e| e.id == released) {
                e.status = EarningStatus::Pending;
                e.payout_id = None;
            }
        }
        let active: Vec<(PayoutId, DateTime<Utc>)> = self
            .payouts
            .iter()
            .filter(|p| p.status.is_active())
            .map(|p| (p.id, p.requested_at))
            .collect();
        if let Some(target) = settlement_target(&active) {
            let sums = self.sums();
            let shortfall = self.settle(&sums, target);
            assert_eq!(shortfall, 0, "release left an active payout uncovered");
        }
    }

    fn refund(&mut self, index: usize, amount: i64) {
        let Some((payment, indices)) = self.payments.get(index) else {
            return;
        };
        let earnings: Vec<EarningSnapshot> =
            indices.iter().map(|i| self.earnings[*i].clone()).collect();
        let request = RefundRequest {
            amount,
            reason: "requested by student".to_string(),
        };
        let Ok(plan) = RefundService::plan(payment, &request, &earnings, self.policy) else {
            return;
        };
        let payment = &mut self.payments[index].0;
        payment.status = plan.new_status;
        payment.refund_amount = plan.new_refund_amount;
        for id in &plan.cancel_earnings {
            if let Some(e) = self.earnings.iter_mut().find(|e| e.id == *id) {
                e.status = EarningStatus::Cancelled;
            }
        }
    }

    fn assert_reconciled(&self) {
        let sums = self.sums();
        assert!(sums.available() >= 0, "negative balance: {sums:?}");
        assert!(sums.is_reconciled(), "uncovered payouts: {sums:?}");
    }
}

#[derive(Debug, Clone)]
enum Op {
    Sale(Vec<i64>),
    Payout(i64),
    Transition(usize, u8),
    Refund(usize, i64),
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        prop::collection::vec(1_000_i64..500_000, 1..4).prop_map(Op::Sale),
        (10_000_i64..1_500_000).prop_map(Op::Payout),
        (0_usize..8, 0_u8..4).prop_map(|(i, op)| Op::Transition(i, op)),
        (0_usize..8, 1_i64..600_000).prop_map(|(i, amount)| Op::Refund(i, amount)),
    ]
}

fn arb_policy() -> impl Strategy<Value = PartialRefundPolicy> {
    prop_oneof![Just(PartialRefundPolicy::CancelAll), Just(PartialRefundPolicy::Retain)]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Balance stays non-negative and payouts stay covered after any sequence.
    #[test]
    fn prop_ledger_stays_reconciled(ops in prop::collection::vec(arb_op(), 1..40), policy in arb_policy()) {
        let mut ledger = Ledger::new(policy);
        for op in ops {
            match op {
                Op::Sale(prices) => ledger.sell(&prices),
                Op::Payout(amount) => {
                    let before = ledger.payouts.len();
                    let available = ledger.sums().available();
                    match ledger.request_payout(amount) {
                        Ok(_) => prop_assert!(amount <= available),
                        Err(_) => prop_assert_eq!(ledger.payouts.len(), before),
                    }
                }
                Op::Transition(index, op) => ledger.transition(index, op),
                Op::Refund(index, amount) => ledger.refund(index, amount),
            }
            ledger.assert_reconciled();
        }
    }
}

#[test]
fn test_full_balance_payout_end_to_end() {
    let mut ledger = Ledger::new(PartialRefundPolicy::CancelAll);
    // Commission 200, 300, 500 INR at a 20% fee.
    ledger.sell(&[25_000]);
    ledger.sell(&[37_500]);
    ledger.sell(&[62_500]);
    assert_eq!(ledger.sums().available(), 100_000);

    let payout = ledger.request_payout(100_000).unwrap();
    assert_eq!(ledger.payouts[0].status, PayoutStatus::Pending);
    assert!(
        ledger
            .earnings
            .iter()
            .all(|e| e.status == EarningStatus::Paid && e.payout_id == Some(payout))
    );
    assert_eq!(ledger.sums().available(), 0);
    ledger.assert_reconciled();

    for amount in [1, 10_000, 100_000] {
        assert!(matches!(
            ledger.request_payout(amount),
            Err(PayoutError::InsufficientBalance { .. } | PayoutError::BelowMinimum { .. })
        ));
    }
    assert!(matches!(
        ledger.request_payout(10_000),
        Err(PayoutError::InsufficientBalance { .. })
    ));
    assert_eq!(ledger.payouts.len(), 1);
}

#[test]
fn test_failed_payout_restores_balance() {
    let mut ledger = Ledger::new(PartialRefundPolicy::CancelAll);
    ledger.sell(&[25_000, 37_500, 62_500]);
    ledger.request_payout(100_000).unwrap();
    ledger.transition(0, 0);
    assert_eq!(ledger.payouts[0].status, PayoutStatus::Processing);
    ledger.transition(0, 2);
    assert_eq!(ledger.payouts[0].status, PayoutStatus::Failed);

    assert_eq!(ledger.sums().available(), 100_000);
    assert!(
        ledger
            .earnings
            .iter()
            .all(|e| e.status == EarningStatus::Pending && e.payout_id.is_none())
    );
}

#[test]
fn test_cancel_reattributes_to_remaining_payout() {
    let mut ledger = Ledger::new(PartialRefundPolicy::CancelAll);
    ledger.sell(&[125_000]);
    ledger.sell(&[125_000]);
    // First payout over-settles the oldest earning; the second needs none.
    let first = ledger.request_payout(50_000).unwrap();
    let second = ledger.request_payout(50_000).unwrap();
    assert!(ledger.earnings.iter().all(|e| e.payout_id != Some(second)));

    ledger.transition(0, 3);
    assert_eq!(ledger.payouts[0].status, PayoutStatus::Cancelled);
    assert!(ledger.earnings.iter().all(|e| e.payout_id != Some(first)));
    assert!(ledger.earnings.iter().any(|e| e.payout_id == Some(second)));
    assert_eq!(ledger.sums().available(), 150_000);
    ledger.assert_reconciled();
}

#[test]
fn test_refund_after_payout_keeps_paid_earnings() {
    let mut ledger = Ledger::new(PartialRefundPolicy::CancelAll);
    ledger.sell(&[125_000]);
    ledger.request_payout(100_000).unwrap();
    ledger.refund(0, 125_000);
    assert_eq!(ledger.payments[0].0.status, PaymentStatus::Refunded);
    assert_eq!(ledger.earnings[0].status, EarningStatus::Paid);
    ledger.assert_reconciled();
}
