//! Initial database migration.
//!
//! Creates the enums, the marketplace tables (users, instructor profiles,
//! courses, payments, enrollments) and the earnings/payout ledgers.
//! Amounts are BIGINT minor units.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        // ============================================================
        // PART 1: ENUMS
        // ============================================================
        db.execute_unprepared(ENUMS_SQL).await?;

        // ============================================================
        // PART 2: ACCOUNTS & CATALOG
        // ============================================================
        db.execute_unprepared(USERS_SQL).await?;
        db.execute_unprepared(INSTRUCTOR_PROFILES_SQL).await?;
        db.execute_unprepared(COURSES_SQL).await?;

        // ============================================================
        // PART 3: PAYMENTS & ENROLLMENTS
        // ============================================================
        db.execute_unprepared(PAYMENTS_SQL).await?;
        db.execute_unprepared(ENROLLMENTS_SQL).await?;

        // ============================================================
        // PART 4: EARNINGS & PAYOUT LEDGERS
        // ============================================================
        db.execute_unprepared(PAYOUTS_SQL).await?;
        db.execute_unprepared(EARNINGS_SQL).await?;

        // ============================================================
        // PART 5: NOTIFICATIONS
        // ============================================================
        db.execute_unprepared(NOTIFICATIONS_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.get_connection().execute_unprepared(DROP_SQL).await?;
        Ok(())
    }
}

const ENUMS_SQL: &str = r"
CREATE TYPE user_role AS ENUM ('student', 'instructor', 'admin');
CREATE TYPE payment_status AS ENUM ('PENDING', 'COMPLETED', 'REFUNDED', 'PARTIALLY_REFUNDED', 'FAILED');
CREATE TYPE enrollment_status AS ENUM ('ACTIVE', 'COMPLETED', 'REFUNDED');
CREATE TYPE earning_status AS ENUM ('PENDING', 'PAID', 'CANCELLED');
CREATE TYPE payout_status AS ENUM ('PENDING', 'PROCESSING', 'COMPLETED', 'FAILED', 'CANCELLED');
CREATE TYPE notification_priority AS ENUM ('low', 'normal', 'high');
";

const USERS_SQL: &str = r"
CREATE TABLE users (
    id              UUID PRIMARY KEY,
    email           VARCHAR(255) NOT NULL UNIQUE,
    full_name       VARCHAR(255) NOT NULL,
    role            user_role NOT NULL DEFAULT 'student',
    created_at      TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at      TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
";

const INSTRUCTOR_PROFILES_SQL: &str = r"
CREATE TABLE instructor_profiles (
    user_id         UUID PRIMARY KEY REFERENCES users(id) ON DELETE CASCADE,
    payout_method   VARCHAR(50),
    payout_details  JSONB,
    created_at      TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at      TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
";

const COURSES_SQL: &str = r"
CREATE TABLE courses (
    id              UUID PRIMARY KEY,
    instructor_id   UUID NOT NULL REFERENCES users(id),
    title           VARCHAR(255) NOT NULL,
    price           BIGINT NOT NULL CHECK (price >= 0),
    currency        VARCHAR(3) NOT NULL,
    created_at      TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX idx_courses_instructor ON courses(instructor_id);
";

const PAYMENTS_SQL: &str = r"
CREATE TABLE payments (
    id                      UUID PRIMARY KEY,
    student_id              UUID NOT NULL REFERENCES users(id),
    amount                  BIGINT NOT NULL CHECK (amount >= 0),
    original_amount         BIGINT NOT NULL CHECK (original_amount >= 0),
    discount_amount         BIGINT NOT NULL DEFAULT 0 CHECK (discount_amount >= 0),
    refund_amount           BIGINT NOT NULL DEFAULT 0,
    currency                VARCHAR(3) NOT NULL,
    status                  payment_status NOT NULL DEFAULT 'PENDING',
    gateway                 VARCHAR(50) NOT NULL,
    method                  VARCHAR(50) NOT NULL,
    gateway_transaction_id  VARCHAR(255),
    refund_reason           TEXT,
    created_at              TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    completed_at            TIMESTAMPTZ,
    refunded_at             TIMESTAMPTZ,
    updated_at              TIMESTAMPTZ NOT NULL DEFAULT NOW(),

    CONSTRAINT chk_refund_within_amount CHECK (refund_amount BETWEEN 0 AND amount)
);

CREATE INDEX idx_payments_status_created ON payments(status, created_at DESC);
CREATE INDEX idx_payments_student ON payments(student_id);
";

const ENROLLMENTS_SQL: &str = r"
CREATE TABLE enrollments (
    id              UUID PRIMARY KEY,
    student_id      UUID NOT NULL REFERENCES users(id),
    course_id       UUID NOT NULL REFERENCES courses(id),
    instructor_id   UUID NOT NULL REFERENCES users(id),
    payment_id      UUID NOT NULL REFERENCES payments(id),
    price           BIGINT NOT NULL CHECK (price >= 0),
    status          enrollment_status NOT NULL DEFAULT 'ACTIVE',
    created_at      TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at      TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX idx_enrollments_payment ON enrollments(payment_id);
";

const PAYOUTS_SQL: &str = r"
CREATE TABLE payouts (
    id                  UUID PRIMARY KEY,
    instructor_id       UUID NOT NULL REFERENCES users(id),
    amount              BIGINT NOT NULL CHECK (amount > 0),
    currency            VARCHAR(3) NOT NULL,
    status              payout_status NOT NULL DEFAULT 'PENDING',
    gateway_id          VARCHAR(64),
    gateway_response    JSONB,
    failure_reason      TEXT,
    requested_at        TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    processed_at        TIMESTAMPTZ,
    failed_at           TIMESTAMPTZ,
    cancelled_at        TIMESTAMPTZ,
    updated_at          TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX idx_payouts_instructor_status ON payouts(instructor_id, currency, status);
CREATE INDEX idx_payouts_status_requested ON payouts(status, requested_at DESC);
";

const EARNINGS_SQL: &str = r"
CREATE TABLE earnings (
    id              UUID PRIMARY KEY,
    instructor_id   UUID NOT NULL REFERENCES users(id),
    payment_id      UUID NOT NULL REFERENCES payments(id),
    enrollment_id   UUID REFERENCES enrollments(id),
    amount          BIGINT NOT NULL CHECK (amount >= 0),
    commission      BIGINT NOT NULL CHECK (commission >= 0),
    platform_fee    BIGINT NOT NULL CHECK (platform_fee >= 0),
    currency        VARCHAR(3) NOT NULL,
    status          earning_status NOT NULL DEFAULT 'PENDING',
    payout_id       UUID REFERENCES payouts(id),
    created_at      TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    paid_at         TIMESTAMPTZ,
    cancelled_at    TIMESTAMPTZ,

    CONSTRAINT chk_split_adds_up CHECK (commission + platform_fee = amount),
    CONSTRAINT chk_paid_has_payout CHECK ((status = 'PAID') = (payout_id IS NOT NULL))
);

CREATE INDEX idx_earnings_instructor_status ON earnings(instructor_id, currency, status, created_at);
CREATE INDEX idx_earnings_payment ON earnings(payment_id);
CREATE INDEX idx_earnings_payout ON earnings(payout_id) WHERE payout_id IS NOT NULL;
";

const NOTIFICATIONS_SQL: &str = r"
CREATE TABLE notifications (
    id              UUID PRIMARY KEY,
    user_id         UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    type            VARCHAR(64) NOT NULL,
    title           VARCHAR(255) NOT NULL,
    message         TEXT NOT NULL,
    priority        notification_priority NOT NULL DEFAULT 'normal',
    data            JSONB NOT NULL DEFAULT '{}'::jsonb,
    action_url      VARCHAR(512),
    is_read         BOOLEAN NOT NULL DEFAULT FALSE,
    created_at      TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX idx_notifications_user_unread ON notifications(user_id, is_read, created_at DESC);
";

const DROP_SQL: &str = r"
DROP TABLE IF EXISTS notifications;
DROP TABLE IF EXISTS earnings;
DROP TABLE IF EXISTS payouts;
DROP TABLE IF EXISTS enrollments;
DROP TABLE IF EXISTS payments;
DROP TABLE IF EXISTS courses;
DROP TABLE IF EXISTS instructor_profiles;
DROP TABLE IF EXISTS users;
DROP TYPE IF EXISTS notification_priority;
DROP TYPE IF EXISTS payout_status;
DROP TYPE IF EXISTS earning_status;
DROP TYPE IF EXISTS enrollment_status;
DROP TYPE IF EXISTS payment_status;
DROP TYPE IF EXISTS user_role;
";
