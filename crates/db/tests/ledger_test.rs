//! Earnings and payout ledger tests against a real PostgreSQL database.
//!
//! Run with `DATABASE_URL=postgres://... cargo test -p edumart-db -- --ignored`.

use std::env;
use std::sync::Arc;

use chrono::Utc;
use edumart_core::payment::{PaymentError, RefundRequest};
use edumart_core::payout::PayoutError;
use edumart_db::entities::sea_orm_active_enums::{
    EarningStatus, EnrollmentStatus, PaymentStatus, UserRole,
};
use edumart_db::entities::{courses, earnings, enrollments, payouts, users};
use edumart_db::migration::{Migrator, MigratorTrait};
use edumart_db::repositories::{CheckoutLine, NewPayment};
use edumart_db::{InstructorRepository, PaymentRepository, PayoutRepository, RepositoryError};
use edumart_shared::config::PartialRefundPolicy;
use edumart_shared::types::{CourseId, Currency, Money, PaymentId, PayoutId, UserId};
use futures::future::join_all;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Database, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, Set,
};
use serde_json::json;
use tokio::sync::Barrier;
use uuid::Uuid;

const FEE_BPS: u32 = 2000;
const TIMEOUT_MS: u64 = 10_000;

async fn connect() -> Option<DatabaseConnection> {
    let url = env::var("DATABASE_URL").ok()?;
    let db = Database::connect(url).await.unwrap();
    Migrator::up(&db, None).await.unwrap();
    Some(db)
}

async fn user(db: &DatabaseConnection, role: UserRole) -> UserId {
    let now = Utc::now().into();
    let id = Uuid::now_v7();
    users::ActiveModel {
        id: Set(id),
        email: Set(format!("ledger-{id}@example.com")),
        full_name: Set("Ledger Test".to_string()),
        role: Set(role),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
    .unwrap();
    UserId::from_uuid(id)
}

struct Fixture {
    instructor: UserId,
    student: UserId,
    course: CourseId,
    payments: PaymentRepository,
    payouts: PayoutRepository,
}

/// Instructor with payment details and one course.
async fn fixture(db: &DatabaseConnection) -> Fixture {
    let instructor = user(db, UserRole::Instructor).await;
    let student = user(db, UserRole::Student).await;
    InstructorRepository::new(db.clone())
        .update_payment_details(instructor, "bank_transfer", json!({"account": "XXXX1234"}))
        .await
        .unwrap();

    let course = CourseId::new();
    courses::ActiveModel {
        id: Set(course.into_inner()),
        instructor_id: Set(instructor.into_inner()),
        title: Set("Rust for Accountants".to_string()),
        price: Set(25_000),
        currency: Set("INR".to_string()),
        created_at: Set(Utc::now().into()),
    }
    .insert(db)
    .await
    .unwrap();

    Fixture {
        instructor,
        student,
        course,
        payments: PaymentRepository::new(db.clone(), TIMEOUT_MS),
        payouts: PayoutRepository::new(db.clone(), TIMEOUT_MS),
    }
}

impl Fixture {
    /// A completed one-course sale at `price` paise.
    async fn sale(&self, price: i64) -> PaymentId {
        let created = self
            .payments
            .create_pending(NewPayment {
                student_id: self.student,
                currency: Currency::Inr,
                gateway: "test".to_string(),
                method: "card".to_string(),
                discount: 0,
                lines: vec![CheckoutLine {
                    course_id: self.course,
                    instructor_id: self.instructor,
                    price,
                }],
            })
            .await
            .unwrap();
        let id = PaymentId::from_uuid(created.payment.id);
        self.payments.complete(id, FEE_BPS).await.unwrap();
        id
    }

    async fn available(&self) -> i64 {
        self.payouts
            .balance(self.instructor, Currency::Inr)
            .await
            .unwrap()
            .available()
    }
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_full_balance_payout_settles_all_earnings() {
    let Some(db) = connect().await else { return };
    let f = fixture(&db).await;
    // 200, 300 and 500 INR of commission at a 20% fee.
    for price in [25_000, 37_500, 62_500] {
        f.sale(price).await;
    }
    assert_eq!(f.available().await, 100_000);

    let requested = f
        .payouts
        .request_payout(f.instructor, Money::new(100_000, Currency::Inr))
        .await
        .unwrap();
    assert_eq!(requested.settled, 3);
    assert_eq!(f.available().await, 0);

    let paid = earnings::Entity::find()
        .filter(earnings::Column::InstructorId.eq(f.instructor.into_inner()))
        .filter(earnings::Column::Status.eq(EarningStatus::Paid))
        .filter(earnings::Column::PayoutId.eq(requested.payout.id))
        .count(&db)
        .await
        .unwrap();
    assert_eq!(paid, 3);

    let err = f
        .payouts
        .request_payout(f.instructor, Money::new(10_000, Currency::Inr))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        RepositoryError::Payout(PayoutError::InsufficientBalance { .. })
    ));
    let payout_rows = payouts::Entity::find()
        .filter(payouts::Column::InstructorId.eq(f.instructor.into_inner()))
        .count(&db)
        .await
        .unwrap();
    assert_eq!(payout_rows, 1);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_failed_payout_releases_earnings() {
    let Some(db) = connect().await else { return };
    let f = fixture(&db).await;
    f.sale(25_000).await;
    f.sale(37_500).await;

    let requested = f
        .payouts
        .request_payout(f.instructor, Money::new(50_000, Currency::Inr))
        .await
        .unwrap();
    let id = PayoutId::from_uuid(requested.payout.id);
    f.payouts.start_processing(id).await.unwrap();
    let failed = f.payouts.fail(id, "Account closed").await.unwrap();

    assert_eq!(failed.released, 2);
    assert_eq!(failed.resettled, 0);
    assert_eq!(failed.payout.failure_reason.as_deref(), Some("Account closed"));
    assert_eq!(f.available().await, 50_000);

    let pending = earnings::Entity::find()
        .filter(earnings::Column::InstructorId.eq(f.instructor.into_inner()))
        .filter(earnings::Column::Status.eq(EarningStatus::Pending))
        .filter(earnings::Column::PayoutId.is_null())
        .count(&db)
        .await
        .unwrap();
    assert_eq!(pending, 2);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_cancel_resettles_into_remaining_payout() {
    let Some(db) = connect().await else { return };
    let f = fixture(&db).await;
    for price in [25_000, 37_500, 62_500] {
        f.sale(price).await;
    }

    let first = f
        .payouts
        .request_payout(f.instructor, Money::new(20_000, Currency::Inr))
        .await
        .unwrap();
    let second = f
        .payouts
        .request_payout(f.instructor, Money::new(30_000, Currency::Inr))
        .await
        .unwrap();
    let cancelled = f
        .payouts
        .cancel(
            PayoutId::from_uuid(first.payout.id),
            f.instructor,
        )
        .await
        .unwrap();

    assert_eq!(cancelled.released, 1);
    assert_eq!(f.available().await, 70_000);
    let sums = f.payouts.balance(f.instructor, Currency::Inr).await.unwrap();
    assert!(sums.is_reconciled());
    let backing: i64 = earnings::Entity::find()
        .filter(earnings::Column::PayoutId.eq(second.payout.id))
        .all(&db)
        .await
        .unwrap()
        .iter()
        .map(|e| e.commission)
        .sum();
    assert!(backing >= 30_000);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_cancel_by_other_instructor_is_not_found() {
    let Some(db) = connect().await else { return };
    let f = fixture(&db).await;
    f.sale(25_000).await;
    let requested = f
        .payouts
        .request_payout(f.instructor, Money::new(20_000, Currency::Inr))
        .await
        .unwrap();
    let stranger = user(&db, UserRole::Instructor).await;

    let err = f
        .payouts
        .cancel(
            PayoutId::from_uuid(requested.payout.id),
            stranger,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryError::Payout(PayoutError::NotFound(_))));
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_concurrent_full_balance_requests_only_one_wins() {
    const REQUESTS: usize = 8;
    let Some(db) = connect().await else { return };
    let f = fixture(&db).await;
    f.sale(25_000).await;
    f.sale(62_500).await;
    let full = f.available().await;

    let barrier = Arc::new(Barrier::new(REQUESTS));
    let handles: Vec<_> = (0..REQUESTS)
        .map(|_| {
            let repo = f.payouts.clone();
            let barrier = Arc::clone(&barrier);
            let instructor = f.instructor;
            tokio::spawn(async move {
                barrier.wait().await;
                repo.request_payout(instructor, Money::new(full, Currency::Inr))
                    .await
            })
        })
        .collect();

    let results: Vec<_> = join_all(handles)
        .await
        .into_iter()
        .map(Result::unwrap)
        .collect();
    let successes = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1);
    for result in results.iter().filter_map(|r| r.as_ref().err()) {
        assert!(
            matches!(
                result,
                RepositoryError::Payout(PayoutError::InsufficientBalance { .. })
            ),
            "unexpected error: {result}"
        );
    }
    assert_eq!(f.available().await, 0);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_full_refund_cascades() {
    let Some(db) = connect().await else { return };
    let f = fixture(&db).await;
    let payment = f.sale(25_000).await;

    let outcome = f
        .payments
        .refund(
            payment,
            &RefundRequest {
                amount: 25_000,
                reason: "Course not as described".to_string(),
            },
            PartialRefundPolicy::CancelAll,
        )
        .await
        .unwrap();
    assert_eq!(outcome.payment.status, PaymentStatus::Refunded);
    assert_eq!(outcome.instructors, vec![f.instructor]);
    assert_eq!(f.available().await, 0);

    let details = f.payments.details(payment).await.unwrap();
    assert!(
        details
            .enrollments
            .iter()
            .all(|e| e.status == EnrollmentStatus::Refunded)
    );
    assert!(
        details
            .earnings
            .iter()
            .all(|e| e.status == EarningStatus::Cancelled)
    );

    let err = f
        .payments
        .refund(
            payment,
            &RefundRequest {
                amount: 1,
                reason: "again".to_string(),
            },
            PartialRefundPolicy::CancelAll,
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        RepositoryError::Payment(PaymentError::InvalidTransactionStatus { .. })
    ));
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_partial_refund_keeps_enrollments() {
    let Some(db) = connect().await else { return };
    let f = fixture(&db).await;
    let payment = f.sale(25_000).await;

    let outcome = f
        .payments
        .refund(
            payment,
            &RefundRequest {
                amount: 10_000,
                reason: "Partial goodwill".to_string(),
            },
            PartialRefundPolicy::Retain,
        )
        .await
        .unwrap();
    assert_eq!(outcome.payment.status, PaymentStatus::PartiallyRefunded);
    assert_eq!(outcome.payment.refund_amount, 10_000);
    assert!(outcome.instructors.is_empty());

    let active = enrollments::Entity::find()
        .filter(enrollments::Column::PaymentId.eq(payment.into_inner()))
        .filter(enrollments::Column::Status.eq(EnrollmentStatus::Active))
        .count(&db)
        .await
        .unwrap();
    assert_eq!(active, 1);
    assert_eq!(f.available().await, 20_000);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_refund_after_payout_keeps_paid_earnings() {
    let Some(db) = connect().await else { return };
    let f = fixture(&db).await;
    let payment = f.sale(25_000).await;
    f.payouts
        .request_payout(f.instructor, Money::new(20_000, Currency::Inr))
        .await
        .unwrap();

    let outcome = f
        .payments
        .refund(
            payment,
            &RefundRequest {
                amount: 25_000,
                reason: "Chargeback".to_string(),
            },
            PartialRefundPolicy::CancelAll,
        )
        .await
        .unwrap();
    assert!(outcome.plan.cancel_earnings.is_empty());
    assert_eq!(outcome.plan.clawback_earnings.len(), 1);
    assert_eq!(f.available().await, 0);
}
