//! `SeaORM` active enums mirroring the PostgreSQL enum types.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// `user_role`
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "user_role")]
pub enum UserRole {
    /// Student
    #[sea_orm(string_value = "student")]
    Student,
    /// Instructor
    #[sea_orm(string_value = "instructor")]
    Instructor,
    /// Admin
    #[sea_orm(string_value = "admin")]
    Admin,
}

/// `payment_status`
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "payment_status")]
pub enum PaymentStatus {
    /// Pending
    #[sea_orm(string_value = "PENDING")]
    Pending,
    /// Completed
    #[sea_orm(string_value = "COMPLETED")]
    Completed,
    /// Refunded
    #[sea_orm(string_value = "REFUNDED")]
    Refunded,
    /// Partially refunded
    #[sea_orm(string_value = "PARTIALLY_REFUNDED")]
    PartiallyRefunded,
    /// Failed
    #[sea_orm(string_value = "FAILED")]
    Failed,
}

/// `enrollment_status`
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "enrollment_status")]
pub enum EnrollmentStatus {
    /// Active
    #[sea_orm(string_value = "ACTIVE")]
    Active,
    /// Completed
    #[sea_orm(string_value = "COMPLETED")]
    Completed,
    /// Refunded
    #[sea_orm(string_value = "REFUNDED")]
    Refunded,
}

/// `earning_status`
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "earning_status")]
pub enum EarningStatus {
    /// Pending
    #[sea_orm(string_value = "PENDING")]
    Pending,
    /// Paid
    #[sea_orm(string_value = "PAID")]
    Paid,
    /// Cancelled
    #[sea_orm(string_value = "CANCELLED")]
    Cancelled,
}

/// `payout_status`
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "payout_status")]
pub enum PayoutStatus {
    /// Pending
    #[sea_orm(string_value = "PENDING")]
    Pending,
    /// Processing
    #[sea_orm(string_value = "PROCESSING")]
    Processing,
    /// Completed
    #[sea_orm(string_value = "COMPLETED")]
    Completed,
    /// Failed
    #[sea_orm(string_value = "FAILED")]
    Failed,
    /// Cancelled
    #[sea_orm(string_value = "CANCELLED")]
    Cancelled,
}

/// `notification_priority`
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "notification_priority")]
pub enum NotificationPriority {
    /// Low
    #[sea_orm(string_value = "low")]
    Low,
    /// Normal
    #[sea_orm(string_value = "normal")]
    Normal,
    /// High
    #[sea_orm(string_value = "high")]
    High,
}
