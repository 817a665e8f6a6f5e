//! Repository abstractions for data access.
//!
//! Repositories provide a clean interface for database operations,
//! hiding the `SeaORM` implementation details from the rest of the application.
//! Ledger writes go through `txn::begin_with_timeouts` so every lock wait is bounded.

mod convert;
pub mod earning;
pub mod error;
pub mod instructor;
pub mod metrics;
pub mod notification;
pub mod payment;
pub mod payout;
pub mod txn;
pub mod user;

pub use earning::{EarningFilter, EarningRepository};
pub use error::RepositoryError;
pub use instructor::InstructorRepository;
pub use metrics::MetricsRepository;
pub use notification::NotificationRepository;
pub use payment::{
    CheckoutLine, NewPayment, PaymentCompleted, PaymentDetails, PaymentRepository, RefundOutcome,
};
pub use payout::{PayoutRepository, PayoutRequested, PayoutTransition, load_balance_sums};
pub use user::UserRepository;
