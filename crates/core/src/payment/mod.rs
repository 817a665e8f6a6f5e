//! Payments: completion into earnings and refunds back out of them.
//!
//! # Modules
//!
//! - `types` - Payment and enrollment status, snapshots
//! - `error` - Payment-specific error types
//! - `completion` - PENDING → COMPLETED, one earning per enrollment
//! - `refund` - Refund validation and cascade planning

pub mod completion;
pub mod error;
pub mod refund;
pub mod types;

#[cfg(test)]
mod refund_props;

pub use completion::{CompletionService, EnrollmentLine, PlannedEarning};
pub use error::PaymentError;
pub use refund::{RefundPlan, RefundRequest, RefundService};
pub use types::{EnrollmentStatus, PaymentSnapshot, PaymentStatus};
