//! Earning domain types.

use chrono::{DateTime, Utc};
use edumart_shared::types::{EarningId, PayoutId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Earning status.
///
/// - Pending: earned, not yet backing a payout
/// - Paid: settled into a payout (`payout_id` set)
/// - Cancelled: reversed by a refund
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EarningStatus {
    /// Earned, withdrawable.
    Pending,
    /// Settled into a payout.
    Paid,
    /// Reversed by a refund.
    Cancelled,
}

impl EarningStatus {
    /// Returns the stored string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Paid => "PAID",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// Parses a status string (case-insensitive).
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "PENDING" => Some(Self::Pending),
            "PAID" => Some(Self::Paid),
            "CANCELLED" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

impl fmt::Display for EarningStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The slice of an earning that settlement and refund planning need.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EarningSnapshot {
    /// Earning id.
    pub id: EarningId,
    /// Instructor share in minor units.
    pub commission: i64,
    /// Current status.
    pub status: EarningStatus,
    /// Payout this earning was settled into.
    pub payout_id: Option<PayoutId>,
    /// Creation time; settlement consumes oldest first.
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_roundtrip() {
        for status in [
            EarningStatus::Pending,
            EarningStatus::Paid,
            EarningStatus::Cancelled,
        ] {
            assert_eq!(EarningStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(EarningStatus::parse("paid"), Some(EarningStatus::Paid));
        assert_eq!(EarningStatus::parse("settled"), None);
    }
}
