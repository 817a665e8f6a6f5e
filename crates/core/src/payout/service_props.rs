//! Property-based tests for PayoutService.

use chrono::Utc;
use edumart_shared::types::{Currency, Money, PayoutId};
use proptest::prelude::*;

use crate::balance::BalanceSums;
use crate::payout::error::PayoutError;
use crate::payout::limits::minimum_payout;
use crate::payout::service::PayoutService;
use crate::payout::types::PayoutStatus;

/// Strategy for generating random PayoutStatus values.
fn arb_status() -> impl Strategy<Value = PayoutStatus> {
    prop_oneof![
        Just(PayoutStatus::Pending),
        Just(PayoutStatus::Processing),
        Just(PayoutStatus::Completed),
        Just(PayoutStatus::Failed),
        Just(PayoutStatus::Cancelled),
    ]
}

fn arb_currency() -> impl Strategy<Value = Currency> {
    prop_oneof![
        Just(Currency::Inr),
        Just(Currency::Usd),
        Just(Currency::Eur),
        Just(Currency::Gbp),
        Just(Currency::Aud),
        Just(Currency::Cad),
    ]
}

fn arb_sums() -> impl Strategy<Value = BalanceSums> {
    (0_i64..10_000_000, 0_i64..10_000_000, 0_i64..10_000_000).prop_map(
        |(pending, paid, extra_completed)| BalanceSums {
            pending_earnings: pending,
            paid_earnings: paid + extra_completed,
            in_flight_payouts: paid,
            completed_payouts: extra_completed,
        },
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Every transition method agrees with `is_valid_transition`.
    #[test]
    fn prop_transitions_match_table(current in arb_status()) {
        let now = Utc::now();
        let amount = Money::new(10_000, Currency::Inr);
        prop_assert_eq!(
            PayoutService::start_processing(current).is_ok(),
            PayoutService::is_valid_transition(current, PayoutStatus::Processing)
        );
        prop_assert_eq!(
            PayoutService::process(current, PayoutId::new(), amount, now).is_ok(),
            PayoutService::is_valid_transition(current, PayoutStatus::Completed)
        );
        prop_assert_eq!(
            PayoutService::fail(current, "bounced", now).is_ok(),
            PayoutService::is_valid_transition(current, PayoutStatus::Failed)
        );
        prop_assert_eq!(
            PayoutService::cancel(current, now).is_ok(),
            PayoutService::is_valid_transition(current, PayoutStatus::Cancelled)
        );
    }

    /// Terminal states accept nothing, except the COMPLETED reversal.
    #[test]
    fn prop_terminal_states_are_closed(to in arb_status()) {
        prop_assert!(!PayoutService::is_valid_transition(PayoutStatus::Failed, to));
        prop_assert!(!PayoutService::is_valid_transition(PayoutStatus::Cancelled, to));
        prop_assert_eq!(
            PayoutService::is_valid_transition(PayoutStatus::Completed, to),
            to == PayoutStatus::Failed
        );
    }

    /// An accepted request never drives the balance negative.
    #[test]
    fn prop_accepted_request_keeps_balance_non_negative(
        sums in arb_sums(),
        currency in arb_currency(),
        amount in 1_i64..20_000_000,
    ) {
        let money = Money::new(amount, currency);
        match PayoutService::validate_request(money, &sums, true) {
            Ok(()) => {
                prop_assert!(sums.with_new_payout(amount).available() >= 0);
                prop_assert!(amount >= minimum_payout(currency).amount);
            }
            Err(PayoutError::InsufficientBalance { .. }) => prop_assert!(amount > sums.available()),
            Err(PayoutError::BelowMinimum { .. }) => {
                prop_assert!(amount < minimum_payout(currency).amount);
            }
            Err(other) => prop_assert!(false, "unexpected error {other:?}"),
        }
    }
}
