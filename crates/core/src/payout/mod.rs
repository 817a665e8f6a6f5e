//! Payout lifecycle for instructor withdrawals.
//!
//! # Modules
//!
//! - `types` - Payout status and actions
//! - `error` - Payout-specific error types
//! - `limits` - Per-currency minimum payout amounts
//! - `settlement` - Marking earnings PAID so active payouts stay backed
//! - `service` - Request validation and state transitions

pub mod error;
pub mod limits;
pub mod service;
pub mod settlement;
pub mod types;

#[cfg(test)]
mod service_props;
#[cfg(test)]
mod settlement_props;

pub use error::PayoutError;
pub use limits::{minimum_payout, validate_min_payout_amount};
pub use service::PayoutService;
pub use settlement::{SettlementPlan, plan_settlement, released_earnings, settlement_target};
pub use types::{PayoutAction, PayoutStatus};
