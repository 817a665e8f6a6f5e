//! Payout domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Payout status.
///
/// The valid transitions are:
/// - Pending → Processing (admin starts the transfer)
/// - Pending → Completed (admin processes directly)
/// - Pending → Cancelled (instructor withdraws the request)
/// - Processing → Completed
/// - Processing → Failed
/// - Completed → Failed (reversal, e.g. bounced transfer)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PayoutStatus {
    /// Requested, waiting for an admin.
    Pending,
    /// Transfer in progress.
    Processing,
    /// Money sent.
    Completed,
    /// Transfer failed or reversed.
    Failed,
    /// Withdrawn by the instructor.
    Cancelled,
}

impl PayoutStatus {
    /// Returns the stored string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Processing => "PROCESSING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// Parses a status string (case-insensitive).
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "PENDING" => Some(Self::Pending),
            "PROCESSING" => Some(Self::Processing),
            "COMPLETED" => Some(Self::Completed),
            "FAILED" => Some(Self::Failed),
            "CANCELLED" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// True while the payout counts against the balance.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Pending | Self::Processing | Self::Completed)
    }

    /// True while money has not left the platform yet.
    #[must_use]
    pub const fn is_in_flight(self) -> bool {
        matches!(self, Self::Pending | Self::Processing)
    }
}

impl fmt::Display for PayoutStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated payout transition and the data to persist with it.
#[derive(Debug, Clone)]
pub enum PayoutAction {
    /// Admin started the transfer.
    StartProcessing {
        /// The new status.
        new_status: PayoutStatus,
    },
    /// Admin completed the transfer.
    Complete {
        /// The new status.
        new_status: PayoutStatus,
        /// When the payout was processed.
        processed_at: DateTime<Utc>,
        /// Gateway reference, `PO-YYYYMMDD-XXXXXXXX`.
        gateway_id: String,
        /// Gateway response recorded with the payout.
        gateway_response: Value,
    },
    /// Transfer failed or was reversed. Earnings are released.
    Fail {
        /// The new status.
        new_status: PayoutStatus,
        /// Why it failed.
        reason: String,
        /// When it failed.
        failed_at: DateTime<Utc>,
    },
    /// Instructor withdrew the request. Earnings are released.
    Cancel {
        /// The new status.
        new_status: PayoutStatus,
        /// When it was cancelled.
        cancelled_at: DateTime<Utc>,
    },
}

impl PayoutAction {
    /// Returns the status after the action.
    #[must_use]
    pub const fn new_status(&self) -> PayoutStatus {
        match self {
            Self::StartProcessing { new_status }
            | Self::Complete { new_status, .. }
            | Self::Fail { new_status, .. }
            | Self::Cancel { new_status, .. } => *new_status,
        }
    }

    /// True when the payout's earnings go back to PENDING.
    #[must_use]
    pub const fn releases_earnings(&self) -> bool {
        matches!(self, Self::Fail { .. } | Self::Cancel { .. })
    }
}
