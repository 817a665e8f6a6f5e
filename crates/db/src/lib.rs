//! Database layer with `SeaORM` entities and repositories.
//!
//! This crate provides:
//! - `SeaORM` entity definitions
//! - Repository abstractions for the earnings, payout and payment ledgers
//! - Database migrations

pub mod entities;
pub mod migration;
pub mod repositories;

pub use repositories::{
    CheckoutLine, EarningRepository, InstructorRepository, MetricsRepository, NewPayment,
    NotificationRepository, PaymentCompleted, PaymentRepository, PayoutRepository,
    RefundOutcome, RepositoryError, UserRepository,
};

use std::time::Duration;

use edumart_shared::config::DatabaseConfig;
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};

/// Establishes a pooled connection to the database.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(config.url.clone());
    options
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(Duration::from_secs(10))
        .sqlx_logging(false);
    Database::connect(options).await
}

#[cfg(test)]
mod tests {
    use edumart_shared::types::{CourseId, Currency, UserId};

    #[test]
    fn test_checkout_types_are_exported_at_root() {
        let instructor = UserId::new();
        let order = crate::NewPayment {
            student_id: UserId::new(),
            currency: Currency::Inr,
            gateway: "razorpay".to_string(),
            method: "card".to_string(),
            discount: 0,
            lines: vec![crate::CheckoutLine {
                course_id: CourseId::new(),
                instructor_id: instructor,
                price: 25_000,
            }],
        };
        assert_eq!(order.lines.len(), 1);
        assert_eq!(order.lines[0].instructor_id, instructor);
    }
}
