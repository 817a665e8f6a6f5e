//! Instructor and admin read models.

use edumart_shared::types::{Currency, Money};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::balance::BalanceSums;
use crate::metrics::growth::growth_rate_minor;
use crate::metrics::period::DateRange;

/// Instructor earnings overview for one currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EarningsOverview {
    /// Currency of every amount below.
    pub currency: Currency,
    /// Σ non-cancelled commission.
    pub lifetime_earned: Money,
    /// Withdrawable balance, floored at zero.
    pub available_balance: Money,
    /// Σ PENDING and PROCESSING payouts.
    pub pending_payouts: Money,
    /// Σ COMPLETED payouts.
    pub completed_payouts: Money,
    /// Commission earned this calendar month.
    pub this_month: Money,
    /// Commission earned last calendar month.
    pub last_month: Money,
    /// Month-over-month growth in percent.
    pub growth_rate: Decimal,
    /// Number of non-cancelled earnings.
    pub total_sales: u64,
}

impl EarningsOverview {
    /// Builds the overview from ledger aggregates.
    #[must_use]
    pub fn compute(
        sums: &BalanceSums,
        this_month: i64,
        last_month: i64,
        total_sales: u64,
        currency: Currency,
    ) -> Self {
        Self {
            currency,
            lifetime_earned: Money::new(sums.lifetime_earned(), currency),
            available_balance: Money::new(sums.available(), currency).floor_zero(),
            pending_payouts: Money::new(sums.in_flight_payouts, currency),
            completed_payouts: Money::new(sums.completed_payouts, currency),
            this_month: Money::new(this_month, currency),
            last_month: Money::new(last_month, currency),
            growth_rate: growth_rate_minor(this_month, last_month),
            total_sales,
        }
    }
}

/// Platform revenue totals over one range, minor units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevenueSums {
    /// Σ list price before discounts.
    pub gross: i64,
    /// Σ discounts.
    pub discounts: i64,
    /// Σ refunded.
    pub refunds: i64,
    /// Σ platform fees on non-cancelled earnings.
    pub platform_fees: i64,
    /// Σ instructor commission on non-cancelled earnings.
    pub instructor_commission: i64,
    /// Number of captured payments.
    pub transactions: u64,
}

impl RevenueSums {
    /// Collected minus refunded.
    #[must_use]
    pub const fn net(&self) -> i64 {
        self.gross
            .saturating_sub(self.discounts)
            .saturating_sub(self.refunds)
    }
}

/// Revenue overview with growth against the preceding period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevenueOverview {
    /// Currency of every amount below.
    pub currency: Currency,
    /// Range covered.
    pub range: DateRange,
    /// Σ list price.
    pub gross_revenue: Money,
    /// Σ discounts.
    pub discounts: Money,
    /// Σ refunds.
    pub refunds: Money,
    /// Σ platform fees.
    pub platform_fees: Money,
    /// Σ instructor commission.
    pub instructor_commission: Money,
    /// Gross minus discounts minus refunds.
    pub net_revenue: Money,
    /// Captured payments.
    pub transactions: u64,
    /// Net revenue growth over the previous range, in percent.
    pub growth_rate: Decimal,
}

impl RevenueOverview {
    /// Builds the overview from current and previous period sums.
    #[must_use]
    pub fn compute(
        current: &RevenueSums,
        previous: &RevenueSums,
        range: DateRange,
        currency: Currency,
    ) -> Self {
        let money = |amount| Money::new(amount, currency);
        Self {
            currency,
            range,
            gross_revenue: money(current.gross),
            discounts: money(current.discounts),
            refunds: money(current.refunds),
            platform_fees: money(current.platform_fees),
            instructor_commission: money(current.instructor_commission),
            net_revenue: money(current.net()),
            transactions: current.transactions,
            growth_rate: growth_rate_minor(current.net(), previous.net()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    #[test]
    fn test_earnings_overview() {
        let sums = BalanceSums {
            pending_earnings: 30_000,
            paid_earnings: 70_000,
            in_flight_payouts: 50_000,
            completed_payouts: 20_000,
        };
        let overview = EarningsOverview::compute(&sums, 15_000, 10_000, 7, Currency::Inr);
        assert_eq!(overview.lifetime_earned.amount, 100_000);
        assert_eq!(overview.available_balance.amount, 30_000);
        assert_eq!(overview.pending_payouts.amount, 50_000);
        assert_eq!(overview.growth_rate, dec!(50));
        assert_eq!(overview.total_sales, 7);
    }

    #[test]
    fn test_revenue_overview_net_and_growth() {
        let current = RevenueSums {
            gross: 120_000,
            discounts: 10_000,
            refunds: 10_000,
            platform_fees: 20_000,
            instructor_commission: 80_000,
            transactions: 4,
        };
        let previous = RevenueSums {
            gross: 80_000,
            ..RevenueSums::default()
        };
        let range = DateRange::new(
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
        )
        .unwrap();
        let overview = RevenueOverview::compute(&current, &previous, range, Currency::Usd);
        assert_eq!(overview.net_revenue.amount, 100_000);
        assert_eq!(overview.growth_rate, dec!(25));
    }

    #[test]
    fn test_revenue_growth_from_nothing() {
        let current = RevenueSums {
            gross: 1_000,
            ..RevenueSums::default()
        };
        let range = DateRange::new(
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
        )
        .unwrap();
        let overview =
            RevenueOverview::compute(&current, &RevenueSums::default(), range, Currency::Inr);
        assert_eq!(overview.growth_rate, dec!(100));
    }
}
