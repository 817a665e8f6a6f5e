//! Finance service cache behaviour against a real PostgreSQL database.
//!
//! Run with `DATABASE_URL=postgres://... cargo test -p edumart-api -- --ignored`.

use std::env;
use std::sync::Arc;

use chrono::Utc;
use edumart_api::FinanceService;
use edumart_api::views::AmountInput;
use edumart_db::entities::sea_orm_active_enums::{PaymentStatus, UserRole};
use edumart_db::entities::{courses, users};
use edumart_db::migration::{Migrator, MigratorTrait};
use edumart_db::{CheckoutLine, NewPayment, NotificationRepository, PaymentRepository};
use edumart_shared::config::{DatabaseConfig, JwtConfig};
use edumart_shared::email::LogMailer;
use edumart_shared::types::{CourseId, Currency, PageRequest, PaymentId, UserId};
use edumart_shared::{AppConfig, MokaCacheStore};
use sea_orm::{ActiveModelTrait, Database, DatabaseConnection, Set};
use uuid::Uuid;

const TIMEOUT_MS: u64 = 10_000;

async fn connect() -> Option<(DatabaseConnection, String)> {
    let url = env::var("DATABASE_URL").ok()?;
    let db = Database::connect(url.as_str()).await.unwrap();
    Migrator::up(&db, None).await.unwrap();
    Some((db, url))
}

fn config(url: String) -> AppConfig {
    AppConfig {
        server: Default::default(),
        database: DatabaseConfig {
            url,
            max_connections: 2,
            min_connections: 1,
            transaction_timeout_ms: TIMEOUT_MS,
        },
        jwt: JwtConfig {
            secret: "finance-cache-secret".to_string(),
            access_token_expiry_secs: 300,
        },
        cache: Default::default(),
        email: Default::default(),
        finance: Default::default(),
        rate_limit: Default::default(),
        otp: Default::default(),
        log: Default::default(),
    }
}

async fn user(db: &DatabaseConnection, role: UserRole) -> UserId {
    let now = Utc::now().into();
    let id = Uuid::now_v7();
    users::ActiveModel {
        id: Set(id),
        email: Set(format!("finance-{id}@example.com")),
        full_name: Set("Finance Test".to_string()),
        role: Set(role),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
    .unwrap();
    UserId::from_uuid(id)
}

/// A pending one-course checkout of 250 INR, with the course's instructor.
async fn checkout(db: &DatabaseConnection) -> (PaymentId, UserId) {
    let instructor = user(db, UserRole::Instructor).await;
    let student = user(db, UserRole::Student).await;
    let course = CourseId::new();
    courses::ActiveModel {
        id: Set(course.into_inner()),
        instructor_id: Set(instructor.into_inner()),
        title: Set("Ledgers in Practice".to_string()),
        price: Set(25_000),
        currency: Set("INR".to_string()),
        created_at: Set(Utc::now().into()),
    }
    .insert(db)
    .await
    .unwrap();

    let created = PaymentRepository::new(db.clone(), TIMEOUT_MS)
        .create_pending(NewPayment {
            student_id: student,
            currency: Currency::Inr,
            gateway: "test".to_string(),
            method: "card".to_string(),
            discount: 0,
            lines: vec![CheckoutLine {
                course_id: course,
                instructor_id: instructor,
                price: 25_000,
            }],
        })
        .await
        .unwrap();
    (PaymentId::from_uuid(created.payment.id), instructor)
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_refund_evicts_cached_transaction_views() {
    let Some((db, url)) = connect().await else { return };
    let finance = FinanceService::new(
        &db,
        &config(url),
        Arc::new(MokaCacheStore::new(1_000)),
        Arc::new(LogMailer),
        Arc::new(NotificationRepository::new(db.clone())),
    );
    let (id, instructor) = checkout(&db).await;
    finance.complete_payment(id).await.unwrap();

    let page = PageRequest {
        page: 1,
        per_page: 100,
    };
    let status_in_list = |rows: &[edumart_db::entities::payments::Model]| {
        rows.iter()
            .find(|p| p.id == id.into_inner())
            .map(|p| p.status)
    };

    let first = finance.transactions(&page, None).await.unwrap();
    assert!(!first.hit);
    let second = finance.transactions(&page, None).await.unwrap();
    assert!(second.hit);
    assert_eq!(
        status_in_list(&second.value.data),
        Some(PaymentStatus::Completed)
    );
    let details = finance.transaction_details(id).await.unwrap();
    assert_eq!(details.value.payment.status, PaymentStatus::Completed);

    let outcome = finance
        .refund(id, &AmountInput::Text("250.00".to_string()), "Course cancelled")
        .await
        .unwrap();
    assert!(outcome.plan.is_full);

    let after = finance.transactions(&page, None).await.unwrap();
    assert!(!after.hit);
    assert_eq!(
        status_in_list(&after.value.data),
        Some(PaymentStatus::Refunded)
    );
    let details = finance.transaction_details(id).await.unwrap();
    assert!(!details.hit);
    assert_eq!(details.value.payment.status, PaymentStatus::Refunded);

    let balance = finance.balance(instructor, Currency::Inr).await.unwrap();
    assert_eq!(balance.available.amount, 0);
    assert_eq!(balance.lifetime_earned.amount, 0);
}
