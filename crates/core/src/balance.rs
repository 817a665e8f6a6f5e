//! Withdrawable balance derived from the earnings and payout ledgers.
//!
//! ```text
//! available = pending_earnings + paid_earnings
//!           - in_flight_payouts - completed_payouts
//! ```
//!
//! Everything earned and not cancelled, minus everything paid out or on its
//! way out. Settling earnings into a payout moves value from pending to paid
//! and leaves the balance unchanged.

use edumart_shared::types::{Currency, Money};
use serde::{Deserialize, Serialize};

/// Aggregates for one instructor and currency, read in one statement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceSums {
    /// Σ commission of PENDING earnings.
    pub pending_earnings: i64,
    /// Σ commission of PAID earnings.
    pub paid_earnings: i64,
    /// Σ amount of PENDING or PROCESSING payouts.
    pub in_flight_payouts: i64,
    /// Σ amount of COMPLETED payouts.
    pub completed_payouts: i64,
}

impl BalanceSums {
    /// Raw available balance. Never negative while the ledgers reconcile.
    #[must_use]
    pub const fn available(&self) -> i64 {
        self.pending_earnings
            .saturating_add(self.paid_earnings)
            .saturating_sub(self.in_flight_payouts)
            .saturating_sub(self.completed_payouts)
    }

    /// Σ of payouts that must be backed by settled earnings.
    #[must_use]
    pub const fn active_payouts(&self) -> i64 {
        self.in_flight_payouts.saturating_add(self.completed_payouts)
    }

    /// Commission still to settle before every active payout is backed.
    #[must_use]
    pub fn settlement_shortfall(&self) -> i64 {
        (self.active_payouts() - self.paid_earnings).max(0)
    }

    /// Lifetime commission that was not cancelled.
    #[must_use]
    pub const fn lifetime_earned(&self) -> i64 {
        self.pending_earnings.saturating_add(self.paid_earnings)
    }

    /// True when the balance is non-negative and every active payout is backed.
    #[must_use]
    pub fn is_reconciled(&self) -> bool {
        self.available() >= 0 && self.paid_earnings >= self.active_payouts()
    }

    /// Adds a new in-flight payout.
    #[must_use]
    pub const fn with_new_payout(self, amount: i64) -> Self {
        Self {
            in_flight_payouts: self.in_flight_payouts.saturating_add(amount),
            ..self
        }
    }
}

/// Balance ready for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailableBalance {
    /// Balance floored at zero.
    pub available: Money,
    /// Σ in-flight payouts.
    pub pending_payouts: Money,
    /// Σ completed payouts.
    pub completed_payouts: Money,
    /// Σ pending and paid commission.
    pub lifetime_earned: Money,
}

/// Stateless balance calculator.
pub struct BalanceCalculator;

impl BalanceCalculator {
    /// Derives the displayable balance.
    ///
    /// A negative raw balance means the ledgers disagree; it is logged by the
    /// caller and shown as zero.
    #[must_use]
    pub fn summarize(sums: &BalanceSums, currency: Currency) -> AvailableBalance {
        AvailableBalance {
            available: Money::new(sums.available(), currency).floor_zero(),
            pending_payouts: Money::new(sums.in_flight_payouts, currency),
            completed_payouts: Money::new(sums.completed_payouts, currency),
            lifetime_earned: Money::new(sums.lifetime_earned(), currency),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_balance_with_only_pending_earnings() {
        let sums = BalanceSums {
            pending_earnings: 100_000,
            ..BalanceSums::default()
        };
        assert_eq!(sums.available(), 100_000);
        assert_eq!(sums.settlement_shortfall(), 0);
        assert!(sums.is_reconciled());
    }

    #[test]
    fn test_settled_payout_leaves_zero() {
        // 1000 earned, all settled into a 1000 pending payout.
        let sums = BalanceSums {
            pending_earnings: 0,
            paid_earnings: 100_000,
            in_flight_payouts: 100_000,
            completed_payouts: 0,
        };
        assert_eq!(sums.available(), 0);
        assert!(sums.is_reconciled());
    }

    #[test]
    fn test_new_payout_opens_shortfall() {
        let sums = BalanceSums {
            pending_earnings: 50_000,
            paid_earnings: 20_000,
            in_flight_payouts: 0,
            completed_payouts: 20_000,
        }
        .with_new_payout(30_000);
        assert_eq!(sums.settlement_shortfall(), 30_000);
        assert_eq!(sums.available(), 20_000);
        assert!(!sums.is_reconciled());
    }

    #[test]
    fn test_summarize_floors_negative() {
        let sums = BalanceSums {
            pending_earnings: 0,
            paid_earnings: 0,
            in_flight_payouts: 500,
            completed_payouts: 0,
        };
        let summary = BalanceCalculator::summarize(&sums, Currency::Inr);
        assert_eq!(summary.available, Money::zero(Currency::Inr));
        assert_eq!(summary.pending_payouts.amount, 500);
    }
}
