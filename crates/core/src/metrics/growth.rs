//! Period-over-period growth rates.

use rust_decimal::{Decimal, RoundingStrategy};

/// Growth of `current` over `previous` in percent, rounded to two places
/// (midpoint away from zero).
///
/// - 100 when `previous ≤ 0` and `current > 0`
/// - -100 when `current` is missing
/// - 0 when `previous == 0`
/// - `(current - previous) / |previous| * 100` otherwise
///
/// A missing `previous` counts as zero.
#[must_use]
pub fn calculate_growth_rate(current: Option<Decimal>, previous: Option<Decimal>) -> Decimal {
    let previous = previous.unwrap_or(Decimal::ZERO);
    let hundred = Decimal::ONE_HUNDRED;

    if previous <= Decimal::ZERO && current.is_some_and(|c| c > Decimal::ZERO) {
        return hundred;
    }
    let Some(current) = current else {
        return -hundred;
    };
    if previous.is_zero() {
        return Decimal::ZERO;
    }

    ((current - previous) / previous.abs() * hundred)
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Growth rate between two minor-unit totals.
#[must_use]
pub fn growth_rate_minor(current: i64, previous: i64) -> Decimal {
    calculate_growth_rate(Some(Decimal::from(current)), Some(Decimal::from(previous)))
}
