//! Commission split between platform and instructor.

use serde::{Deserialize, Serialize};

/// Basis points in one whole.
pub const BPS_DENOMINATOR: u32 = 10_000;

/// How a sale price divides into platform fee and instructor commission.
///
/// Invariant: `platform_fee + commission == gross`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommissionSplit {
    /// Sale price in minor units.
    pub gross: i64,
    /// Platform share in minor units.
    pub platform_fee: i64,
    /// Instructor share in minor units.
    pub commission: i64,
}

impl CommissionSplit {
    /// Splits `gross` with a platform fee of `fee_bps` basis points.
    ///
    /// The fee is rounded half-up to the minor unit; the instructor gets the
    /// remainder. Returns `None` for a negative price or a rate above 100%.
    #[must_use]
    pub fn compute(gross: i64, fee_bps: u32) -> Option<Self> {
        if gross < 0 || fee_bps > BPS_DENOMINATOR {
            return None;
        }
        let denominator = i128::from(BPS_DENOMINATOR);
        let scaled = i128::from(gross) * i128::from(fee_bps);
        let fee = (scaled + denominator / 2) / denominator;
        let platform_fee = i64::try_from(fee).ok()?;
        Some(Self {
            gross,
            platform_fee,
            commission: gross - platform_fee,
        })
    }
}
