//! Minimum payout amounts per currency.

use std::str::FromStr;

use edumart_shared::types::{Currency, Money};
use rust_decimal::Decimal;

/// Smallest payout accepted in `currency`.
#[must_use]
pub const fn minimum_payout(currency: Currency) -> Money {
    let major = match currency {
        Currency::Inr => 100,
        Currency::Usd | Currency::Eur => 10,
        Currency::Gbp => 8,
        Currency::Aud => 15,
        Currency::Cad => 13,
    };
    Money::new(major * 100, currency)
}

/// Checks a major-unit amount against the minimum for a currency code.
///
/// Unknown currencies and amounts with sub-minor precision fail.
#[must_use]
pub fn validate_min_payout_amount(amount: Decimal, currency: &str) -> bool {
    let Ok(currency) = Currency::from_str(currency) else {
        return false;
    };
    Money::from_major(amount, currency)
        .is_some_and(|money| money.amount >= minimum_payout(currency).amount)
}
