//! Database seeder for Edumart development and testing.
//!
//! Seeds an admin, two instructors with courses, a student, and a handful
//! of completed purchases so the earnings and payout endpoints have data.
//!
//! Usage: cargo run --bin seeder

use anyhow::Context;
use chrono::Utc;
use edumart_db::entities::{courses, users};
use edumart_db::{CheckoutLine, InstructorRepository, NewPayment, PaymentRepository, UserRepository};
use edumart_shared::AppConfig;
use edumart_shared::auth::Role;
use edumart_shared::types::{CourseId, Currency, PaymentId, UserId};
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use serde_json::json;
use uuid::Uuid;

/// (email, name, role)
const USERS: [(&str, &str, Role); 4] = [
    ("admin@edumart.dev", "Platform Admin", Role::Admin),
    ("asha@edumart.dev", "Asha Rao", Role::Instructor),
    ("daniel@edumart.dev", "Daniel Kim", Role::Instructor),
    ("student@edumart.dev", "Sam Student", Role::Student),
];

/// (instructor index, title, price in minor units, currency)
const COURSES: [(usize, &str, i64, Currency); 4] = [
    (1, "Rust for Backend Engineers", 249_900, Currency::Inr),
    (1, "Async Rust in Practice", 199_900, Currency::Inr),
    (2, "Postgres Internals", 4_900, Currency::Usd),
    (2, "Designing Payment Systems", 7_900, Currency::Usd),
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("failed to load configuration")?;

    println!("Connecting to database...");
    let db = edumart_db::connect(&config.database)
        .await
        .context("failed to connect to database")?;

    println!("Seeding users...");
    let Some(users) = seed_users(&db).await? else {
        println!("  Seed users already exist, skipping the rest.");
        return Ok(());
    };

    println!("Seeding payment details...");
    seed_payment_details(&db, &users).await?;

    println!("Seeding courses...");
    let courses = seed_courses(&db, &users).await?;

    println!("Seeding purchases...");
    seed_purchases(&db, &config, &users, &courses).await?;

    println!("Seeding complete!");
    Ok(())
}

/// Creates the seed users, or returns `None` if they are already there.
async fn seed_users(db: &DatabaseConnection) -> anyhow::Result<Option<Vec<UserId>>> {
    let repo = UserRepository::new(db.clone());
    if repo.email_exists(USERS[0].0).await? {
        return Ok(None);
    }

    let mut ids = Vec::with_capacity(USERS.len());
    for (email, name, role) in USERS {
        let user: users::Model = repo.create(email, name, role).await?;
        println!("  Created {role}: {email}");
        ids.push(UserId::from_uuid(user.id));
    }
    Ok(Some(ids))
}

async fn seed_payment_details(db: &DatabaseConnection, users: &[UserId]) -> anyhow::Result<()> {
    let repo = InstructorRepository::new(db.clone());
    repo.update_payment_details(
        users[1],
        "upi",
        json!({ "upiId": "asha@okbank" }),
    )
    .await?;
    repo.update_payment_details(
        users[2],
        "bank_transfer",
        json!({ "accountName": "Daniel Kim", "accountNumber": "000123456789", "ifsc": "HDFC0000001" }),
    )
    .await?;
    println!("  Configured payout methods for 2 instructors");
    Ok(())
}

async fn seed_courses(
    db: &DatabaseConnection,
    users: &[UserId],
) -> anyhow::Result<Vec<courses::Model>> {
    let mut created = Vec::with_capacity(COURSES.len());
    for (owner, title, price, currency) in COURSES {
        let course = courses::ActiveModel {
            id: Set(Uuid::new_v4()),
            instructor_id: Set(users[owner].into_inner()),
            title: Set(title.to_string()),
            price: Set(price),
            currency: Set(currency.code().to_string()),
            created_at: Set(Utc::now().into()),
        }
        .insert(db)
        .await?;
        created.push(course);
    }
    println!("  Inserted {} courses", created.len());
    Ok(created)
}

/// One checkout per currency, completed so earnings exist.
async fn seed_purchases(
    db: &DatabaseConnection,
    config: &AppConfig,
    users: &[UserId],
    courses: &[courses::Model],
) -> anyhow::Result<()> {
    let repo = PaymentRepository::new(db.clone(), config.database.transaction_timeout_ms);
    let student = users[3];

    for currency in [Currency::Inr, Currency::Usd] {
        let lines: Vec<CheckoutLine> = courses
            .iter()
            .filter(|c| c.currency == currency.code())
            .map(|c| CheckoutLine {
                course_id: CourseId::from_uuid(c.id),
                instructor_id: UserId::from_uuid(c.instructor_id),
                price: c.price,
            })
            .collect();

        let pending = repo
            .create_pending(NewPayment {
                student_id: student,
                currency,
                gateway: "seeder".to_string(),
                method: "card".to_string(),
                discount: 0,
                lines,
            })
            .await?;
        let completed = repo
            .complete(
                PaymentId::from_uuid(pending.payment.id),
                config.finance.platform_fee_bps,
            )
            .await?;
        println!(
            "  Completed {} payment with {} earnings",
            currency.code(),
            completed.earnings.len()
        );
    }
    Ok(())
}
