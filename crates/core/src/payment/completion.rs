//! Payment completion: PENDING → COMPLETED creates the earnings.

use edumart_shared::types::{EnrollmentId, UserId};

use crate::earnings::CommissionSplit;
use crate::payment::error::PaymentError;
use crate::payment::types::PaymentStatus;

/// One enrollment covered by the payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrollmentLine {
    /// Enrollment id.
    pub enrollment_id: EnrollmentId,
    /// Instructor of the enrolled course.
    pub instructor_id: UserId,
    /// Price paid for this course, minor units.
    pub price: i64,
}

/// Earning to insert for one enrollment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedEarning {
    /// Enrollment the earning belongs to.
    pub enrollment_id: EnrollmentId,
    /// Instructor who earns it.
    pub instructor_id: UserId,
    /// Price split.
    pub split: CommissionSplit,
}

/// Stateless completion planner.
pub struct CompletionService;

impl CompletionService {
    /// Plans the earnings created when a payment completes.
    ///
    /// # Errors
    ///
    /// - `InvalidTransactionStatus` unless the payment is PENDING
    /// - `InvalidCommission` for a negative price or a fee above 100%
    pub fn plan(
        status: PaymentStatus,
        lines: &[EnrollmentLine],
        fee_bps: u32,
    ) -> Result<Vec<PlannedEarning>, PaymentError> {
        if status != PaymentStatus::Pending {
            return Err(PaymentError::InvalidTransactionStatus {
                current: status,
                expected: PaymentStatus::Pending,
            });
        }
        lines
            .iter()
            .map(|line| {
                let split = CommissionSplit::compute(line.price, fee_bps).ok_or_else(|| {
                    PaymentError::InvalidCommission(format!(
                        "price {} with fee {fee_bps} bps",
                        line.price
                    ))
                })?;
                Ok(PlannedEarning {
                    enrollment_id: line.enrollment_id,
                    instructor_id: line.instructor_id,
                    split,
                })
            })
            .collect()
    }
}
