//! Report data types. Amounts are minor units.

use chrono::{DateTime, Utc};
use edumart_shared::types::{Currency, EarningId, PaymentId, PayoutId, UserId};
use serde::{Deserialize, Serialize};

use crate::earnings::EarningStatus;
use crate::payout::PayoutStatus;

/// One earning as exported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EarningRow {
    /// Earning id.
    pub earning_id: EarningId,
    /// Payment that produced it.
    pub payment_id: PaymentId,
    /// Current status.
    pub status: EarningStatus,
    /// Currency.
    pub currency: Currency,
    /// Sale price.
    pub gross: i64,
    /// Platform share.
    pub platform_fee: i64,
    /// Instructor share.
    pub commission: i64,
    /// When the sale completed.
    pub created_at: DateTime<Utc>,
}

/// One payout as exported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayoutRow {
    /// Payout id.
    pub payout_id: PayoutId,
    /// Current status.
    pub status: PayoutStatus,
    /// Currency.
    pub currency: Currency,
    /// Amount.
    pub amount: i64,
    /// Gateway reference, once processed.
    pub gateway_id: Option<String>,
    /// Request time.
    pub requested_at: DateTime<Utc>,
    /// Completion time.
    pub processed_at: Option<DateTime<Utc>>,
}

/// Tax figures for a month or a whole year.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxFigures {
    /// Σ sale price of non-cancelled earnings.
    pub gross_sales: i64,
    /// Σ platform fees of non-cancelled earnings.
    pub platform_fees: i64,
    /// Σ commission of non-cancelled earnings.
    pub net_commission: i64,
    /// Σ commission reversed by refunds.
    pub cancelled_commission: i64,
    /// Σ completed payouts.
    pub completed_payouts: i64,
}

impl TaxFigures {
    /// Adds `other` into `self`.
    pub fn absorb(&mut self, other: &Self) {
        self.gross_sales += other.gross_sales;
        self.platform_fees += other.platform_fees;
        self.net_commission += other.net_commission;
        self.cancelled_commission += other.cancelled_commission;
        self.completed_payouts += other.completed_payouts;
    }
}

/// One month of a tax summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxMonth {
    /// Month number, 1 to 12.
    pub month: u32,
    /// Figures for the month.
    #[serde(flatten)]
    pub figures: TaxFigures,
}

/// Annual summary in one currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrencyTaxSummary {
    /// Currency.
    pub currency: Currency,
    /// Year totals.
    pub totals: TaxFigures,
    /// Always twelve rows, January first.
    pub months: Vec<TaxMonth>,
}

/// Annual tax document for one instructor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxDocument {
    /// Instructor.
    pub instructor_id: UserId,
    /// Calendar year.
    pub year: i32,
    /// One summary per currency with activity, in `Currency::ALL` order.
    pub currencies: Vec<CurrencyTaxSummary>,
    /// Generation time.
    pub generated_at: DateTime<Utc>,
}
