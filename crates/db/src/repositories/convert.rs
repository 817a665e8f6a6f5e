//! Conversions between stored rows and core domain types.

use std::str::FromStr;

use chrono::{DateTime, FixedOffset, Utc};
use edumart_core::earnings::{EarningSnapshot, EarningStatus};
use edumart_core::payment::{EnrollmentStatus, PaymentSnapshot, PaymentStatus};
use edumart_core::payout::PayoutStatus;
use edumart_core::reports::{EarningRow, PayoutRow};
use edumart_shared::auth::Role;
use edumart_shared::notify::Priority;
use edumart_shared::types::{Currency, EarningId, PaymentId, PayoutId};

use super::error::RepositoryError;
use crate::entities::sea_orm_active_enums::{
    EarningStatus as DbEarningStatus, EnrollmentStatus as DbEnrollmentStatus,
    NotificationPriority as DbPriority, PaymentStatus as DbPaymentStatus,
    PayoutStatus as DbPayoutStatus, UserRole as DbUserRole,
};
use crate::entities::{earnings, payments, payouts};

/// Parses a stored currency code.
pub(crate) fn currency(code: &str) -> Result<Currency, RepositoryError> {
    Currency::from_str(code).map_err(RepositoryError::Integrity)
}

/// Stored timestamp as UTC.
pub(crate) fn utc(at: DateTime<FixedOffset>) -> DateTime<Utc> {
    at.with_timezone(&Utc)
}

macro_rules! mirror_enum {
    ($db:ident, $core:ident, [$($variant:ident),+ $(,)?]) => {
        impl From<$db> for $core {
            fn from(value: $db) -> Self {
                match value {
                    $($db::$variant => $core::$variant,)+
                }
            }
        }

        impl From<$core> for $db {
            fn from(value: $core) -> Self {
                match value {
                    $($core::$variant => $db::$variant,)+
                }
            }
        }
    };
}

mirror_enum!(DbEarningStatus, EarningStatus, [Pending, Paid, Cancelled]);
mirror_enum!(
    DbPayoutStatus,
    PayoutStatus,
    [Pending, Processing, Completed, Failed, Cancelled]
);
mirror_enum!(
    DbPaymentStatus,
    PaymentStatus,
    [Pending, Completed, Refunded, PartiallyRefunded, Failed]
);
mirror_enum!(DbEnrollmentStatus, EnrollmentStatus, [Active, Completed, Refunded]);
mirror_enum!(DbUserRole, Role, [Student, Instructor, Admin]);
mirror_enum!(DbPriority, Priority, [Low, Normal, High]);

/// The settlement view of an earning.
pub(crate) fn earning_snapshot(model: &earnings::Model) -> EarningSnapshot {
    EarningSnapshot {
        id: EarningId::from_uuid(model.id),
        commission: model.commission,
        status: model.status.into(),
        payout_id: model.payout_id.map(PayoutId::from_uuid),
        created_at: utc(model.created_at),
    }
}

/// The export view of an earning.
pub(crate) fn earning_row(model: &earnings::Model) -> Result<EarningRow, RepositoryError> {
    Ok(EarningRow {
        earning_id: EarningId::from_uuid(model.id),
        payment_id: PaymentId::from_uuid(model.payment_id),
        status: model.status.into(),
        currency: currency(&model.currency)?,
        gross: model.amount,
        platform_fee: model.platform_fee,
        commission: model.commission,
        created_at: utc(model.created_at),
    })
}

/// The export view of a payout.
pub(crate) fn payout_row(model: &payouts::Model) -> Result<PayoutRow, RepositoryError> {
    Ok(PayoutRow {
        payout_id: PayoutId::from_uuid(model.id),
        status: model.status.into(),
        currency: currency(&model.currency)?,
        amount: model.amount,
        gateway_id: model.gateway_id.clone(),
        requested_at: utc(model.requested_at),
        processed_at: model.processed_at.map(utc),
    })
}

/// The refund view of a payment.
pub(crate) fn payment_snapshot(model: &payments::Model) -> Result<PaymentSnapshot, RepositoryError> {
    Ok(PaymentSnapshot {
        id: PaymentId::from_uuid(model.id),
        status: model.status.into(),
        amount: model.amount,
        refund_amount: model.refund_amount,
        currency: currency(&model.currency)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mirrors_roundtrip() {
        for status in [
            PayoutStatus::Pending,
            PayoutStatus::Processing,
            PayoutStatus::Completed,
            PayoutStatus::Failed,
            PayoutStatus::Cancelled,
        ] {
            let stored: DbPayoutStatus = status.into();
            assert_eq!(PayoutStatus::from(stored), status);
        }
        assert_eq!(
            PaymentStatus::from(DbPaymentStatus::PartiallyRefunded),
            PaymentStatus::PartiallyRefunded
        );
        assert_eq!(Role::from(DbUserRole::Admin), Role::Admin);
    }

    #[test]
    fn test_unknown_currency_is_integrity_error() {
        assert!(currency("INR").is_ok());
        assert!(matches!(currency("XYZ"), Err(RepositoryError::Integrity(_))));
    }
}
