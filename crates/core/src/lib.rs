//! Core business logic for Edumart.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! Repositories load snapshots, call into these services, and persist the
//! returned plans inside one transaction.
//!
//! # Modules
//!
//! - `earnings` - Commission records and the fee split
//! - `balance` - Withdrawable balance from ledger aggregates
//! - `payout` - Payout state machine and settlement coverage
//! - `payment` - Payment completion and refund cascades
//! - `metrics` - Growth rates, date ranges, time series, overviews
//! - `cache_keys` - Cache key families and invalidation rules
//! - `reports` - CSV exports and tax documents

pub mod balance;
pub mod cache_keys;
pub mod earnings;
pub mod metrics;
pub mod payment;
pub mod payout;
pub mod reports;

#[cfg(test)]
mod reconciliation_props;
