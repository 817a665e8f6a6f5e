//! JSON views of ledger rows and read models.
//!
//! Cached values hold minor units; amounts become `MoneyView`s only here.

use std::str::FromStr;

use chrono::{DateTime, FixedOffset, NaiveDate};
use edumart_core::balance::AvailableBalance;
use edumart_core::metrics::{DateRange, EarningsOverview, RevenueOverview, SeriesPoint};
use edumart_db::entities::{earnings, enrollments, payments, payouts};
use edumart_db::repositories::PaymentDetails;
use edumart_shared::types::{Currency, Money};
use edumart_shared::AppError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::finance::FinancialDashboard;

/// Money as the client renders it: `{ "amount": "₹1,000.00", "amountRaw": 1000.0, "currency": "INR" }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MoneyView {
    /// Locale-formatted amount with symbol.
    pub amount: String,
    /// Major units.
    #[serde(with = "rust_decimal::serde::float")]
    pub amount_raw: Decimal,
    /// ISO code.
    pub currency: Currency,
}

impl From<Money> for MoneyView {
    fn from(money: Money) -> Self {
        Self {
            amount: money.format_locale(),
            amount_raw: money.to_major(),
            currency: money.currency,
        }
    }
}

/// A stored amount, falling back to INR for an unknown code.
pub(crate) fn stored_money(amount: i64, code: &str) -> Money {
    Money::new(amount, Currency::from_str(code).unwrap_or(Currency::Inr))
}

fn money(amount: i64, code: &str) -> MoneyView {
    stored_money(amount, code).into()
}

/// A major-unit amount sent by a client, as a JSON number or string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AmountInput {
    /// `1000.50`
    Number(serde_json::Number),
    /// `"1000.50"`
    Text(String),
}

impl AmountInput {
    /// Converts to minor units of `currency`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` for non-numeric input or more decimals
    /// than the currency allows.
    pub fn to_money(&self, currency: Currency) -> Result<Money, AppError> {
        let text = match self {
            Self::Number(n) => n.to_string(),
            Self::Text(s) => s.trim().to_string(),
        };
        let major = Decimal::from_str(&text)
            .map_err(|_| AppError::Validation(format!("Invalid amount: {text}")))?;
        Money::from_major(major, currency).ok_or_else(|| {
            AppError::Validation(format!(
                "Amount {text} has more than {} decimal places",
                currency.minor_digits()
            ))
        })
    }
}

/// Parses a currency query or body value.
///
/// # Errors
///
/// Returns `AppError::Validation` for an unsupported code.
pub fn parse_currency(code: Option<&str>) -> Result<Currency, AppError> {
    code.map_or(Ok(Currency::Inr), |c| {
        Currency::from_str(c).map_err(AppError::Validation)
    })
}

/// Parses an optional status filter; an empty value means no filter.
///
/// # Errors
///
/// Returns `AppError::Validation` for an unknown value.
pub fn parse_filter<T>(
    raw: Option<&str>,
    parse: impl Fn(&str) -> Option<T>,
    field: &str,
) -> Result<Option<T>, AppError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => parse(value)
            .map(Some)
            .ok_or_else(|| AppError::Validation(format!("Invalid {field}: {value}"))),
    }
}

/// An earning.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EarningView {
    /// Earning id.
    pub id: Uuid,
    /// Payment that produced it.
    pub payment_id: Uuid,
    /// Enrollment that produced it.
    pub enrollment_id: Option<Uuid>,
    /// Sale price.
    pub amount: MoneyView,
    /// Instructor share.
    pub commission: MoneyView,
    /// Platform share.
    pub platform_fee: MoneyView,
    /// PENDING, PAID or CANCELLED.
    pub status: String,
    /// Payout that settled it.
    pub payout_id: Option<Uuid>,
    /// Created at.
    pub created_at: DateTime<FixedOffset>,
    /// Settled at.
    pub paid_at: Option<DateTime<FixedOffset>>,
    /// Cancelled at.
    pub cancelled_at: Option<DateTime<FixedOffset>>,
}

impl From<&earnings::Model> for EarningView {
    fn from(m: &earnings::Model) -> Self {
        Self {
            id: m.id,
            payment_id: m.payment_id,
            enrollment_id: m.enrollment_id,
            amount: money(m.amount, &m.currency),
            commission: money(m.commission, &m.currency),
            platform_fee: money(m.platform_fee, &m.currency),
            status: edumart_core::earnings::EarningStatus::from(m.status).to_string(),
            payout_id: m.payout_id,
            created_at: m.created_at,
            paid_at: m.paid_at,
            cancelled_at: m.cancelled_at,
        }
    }
}

/// A payout.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PayoutView {
    /// Payout id.
    pub id: Uuid,
    /// Owner.
    pub instructor_id: Uuid,
    /// Amount.
    pub amount: MoneyView,
    /// Lifecycle status.
    pub status: String,
    /// Gateway reference once processed.
    pub gateway_id: Option<String>,
    /// Gateway response once processed.
    pub gateway_response: Option<serde_json::Value>,
    /// Why it failed.
    pub failure_reason: Option<String>,
    /// Requested at.
    pub requested_at: DateTime<FixedOffset>,
    /// Processed at.
    pub processed_at: Option<DateTime<FixedOffset>>,
}

impl From<&payouts::Model> for PayoutView {
    fn from(m: &payouts::Model) -> Self {
        Self {
            id: m.id,
            instructor_id: m.instructor_id,
            amount: money(m.amount, &m.currency),
            status: edumart_core::payout::PayoutStatus::from(m.status).to_string(),
            gateway_id: m.gateway_id.clone(),
            gateway_response: m.gateway_response.clone(),
            failure_reason: m.failure_reason.clone(),
            requested_at: m.requested_at,
            processed_at: m.processed_at,
        }
    }
}

/// A payment.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentView {
    /// Payment id.
    pub id: Uuid,
    /// Buyer.
    pub student_id: Uuid,
    /// Charged amount.
    pub amount: MoneyView,
    /// List price before discounts.
    pub original_amount: MoneyView,
    /// Discount.
    pub discount_amount: MoneyView,
    /// Refunded so far.
    pub refund_amount: MoneyView,
    /// Lifecycle status.
    pub status: String,
    /// Gateway name.
    pub gateway: String,
    /// Payment method.
    pub method: String,
    /// Gateway transaction id.
    pub gateway_transaction_id: Option<String>,
    /// Last refund reason.
    pub refund_reason: Option<String>,
    /// Created at.
    pub created_at: DateTime<FixedOffset>,
    /// Completed at.
    pub completed_at: Option<DateTime<FixedOffset>>,
    /// Last refund at.
    pub refunded_at: Option<DateTime<FixedOffset>>,
}

impl From<&payments::Model> for PaymentView {
    fn from(m: &payments::Model) -> Self {
        Self {
            id: m.id,
            student_id: m.student_id,
            amount: money(m.amount, &m.currency),
            original_amount: money(m.original_amount, &m.currency),
            discount_amount: money(m.discount_amount, &m.currency),
            refund_amount: money(m.refund_amount, &m.currency),
            status: edumart_core::payment::PaymentStatus::from(m.status).to_string(),
            gateway: m.gateway.clone(),
            method: m.method.clone(),
            gateway_transaction_id: m.gateway_transaction_id.clone(),
            refund_reason: m.refund_reason.clone(),
            created_at: m.created_at,
            completed_at: m.completed_at,
            refunded_at: m.refunded_at,
        }
    }
}

/// An enrollment inside payment details.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentView {
    /// Enrollment id.
    pub id: Uuid,
    /// Course.
    pub course_id: Uuid,
    /// Course owner.
    pub instructor_id: Uuid,
    /// Price paid.
    pub price: MoneyView,
    /// ACTIVE, COMPLETED or REFUNDED.
    pub status: String,
}

fn enrollment_view(m: &enrollments::Model, currency: &str) -> EnrollmentView {
    EnrollmentView {
        id: m.id,
        course_id: m.course_id,
        instructor_id: m.instructor_id,
        price: money(m.price, currency),
        status: edumart_core::payment::EnrollmentStatus::from(m.status).to_string(),
    }
}

/// A payment with its enrollments and earnings.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDetailsView {
    /// The payment.
    pub payment: PaymentView,
    /// Its enrollments.
    pub enrollments: Vec<EnrollmentView>,
    /// Its earnings.
    pub earnings: Vec<EarningView>,
}

impl From<&PaymentDetails> for PaymentDetailsView {
    fn from(d: &PaymentDetails) -> Self {
        Self {
            payment: (&d.payment).into(),
            enrollments: d
                .enrollments
                .iter()
                .map(|e| enrollment_view(e, &d.payment.currency))
                .collect(),
            earnings: d.earnings.iter().map(EarningView::from).collect(),
        }
    }
}

/// Earnings overview for one currency.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverviewView {
    /// Currency.
    pub currency: Currency,
    /// Everything earned and not cancelled.
    pub lifetime_earnings: MoneyView,
    /// Withdrawable now.
    pub available_balance: MoneyView,
    /// Payouts in flight.
    pub pending_payouts: MoneyView,
    /// Payouts completed.
    pub completed_payouts: MoneyView,
    /// Commission this month.
    pub this_month: MoneyView,
    /// Commission last month.
    pub last_month: MoneyView,
    /// Month-over-month growth, percent.
    pub growth_rate: Decimal,
    /// Credited sales.
    pub total_sales: u64,
}

impl From<&EarningsOverview> for OverviewView {
    fn from(o: &EarningsOverview) -> Self {
        Self {
            currency: o.currency,
            lifetime_earnings: o.lifetime_earned.into(),
            available_balance: o.available_balance.into(),
            pending_payouts: o.pending_payouts.into(),
            completed_payouts: o.completed_payouts.into(),
            this_month: o.this_month.into(),
            last_month: o.last_month.into(),
            growth_rate: o.growth_rate,
            total_sales: o.total_sales,
        }
    }
}

/// Live balance.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceView {
    /// Withdrawable now.
    pub available_balance: MoneyView,
    /// Payouts in flight.
    pub pending_payouts: MoneyView,
    /// Payouts completed.
    pub completed_payouts: MoneyView,
    /// Everything earned and not cancelled.
    pub lifetime_earnings: MoneyView,
}

impl From<&AvailableBalance> for BalanceView {
    fn from(b: &AvailableBalance) -> Self {
        Self {
            available_balance: b.available.into(),
            pending_payouts: b.pending_payouts.into(),
            completed_payouts: b.completed_payouts.into(),
            lifetime_earnings: b.lifetime_earned.into(),
        }
    }
}

/// One time-series bucket.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesPointView {
    /// Bucket start.
    pub period: NaiveDate,
    /// Gross sales.
    pub amount: MoneyView,
    /// Instructor commission.
    pub commission: MoneyView,
    /// Platform fees.
    pub platform_fee: MoneyView,
    /// Sales in the bucket.
    pub count: u64,
}

/// Renders a series in `currency`.
#[must_use]
pub fn series_view(points: &[SeriesPoint], currency: Currency) -> Vec<SeriesPointView> {
    points
        .iter()
        .map(|p| SeriesPointView {
            period: p.bucket,
            amount: Money::new(p.amount, currency).into(),
            commission: Money::new(p.commission, currency).into(),
            platform_fee: Money::new(p.platform_fee, currency).into(),
            count: p.count,
        })
        .collect()
}

/// Instructor dashboard.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardView {
    /// Overview per currency.
    pub overview: Vec<OverviewView>,
    /// Currency of the monthly chart.
    pub chart_currency: Currency,
    /// Last twelve months.
    pub monthly: Vec<SeriesPointView>,
    /// Latest payouts.
    pub recent_payouts: Vec<PayoutView>,
}

impl From<&FinancialDashboard> for DashboardView {
    fn from(d: &FinancialDashboard) -> Self {
        Self {
            overview: d.overview.iter().map(OverviewView::from).collect(),
            chart_currency: d.chart_currency,
            monthly: series_view(&d.monthly, d.chart_currency),
            recent_payouts: d.recent_payouts.iter().map(PayoutView::from).collect(),
        }
    }
}

/// Platform revenue for one currency.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevenueView {
    /// Currency.
    pub currency: Currency,
    /// Period covered.
    pub range: DateRange,
    /// List-price revenue.
    pub gross_revenue: MoneyView,
    /// Discounts given.
    pub discounts: MoneyView,
    /// Refunds issued.
    pub refunds: MoneyView,
    /// Platform fees earned.
    pub platform_fees: MoneyView,
    /// Commission owed to instructors.
    pub instructor_commission: MoneyView,
    /// Gross minus discounts and refunds.
    pub net_revenue: MoneyView,
    /// Completed payments.
    pub transactions: u64,
    /// Net revenue growth over the previous period, percent.
    pub growth_rate: Decimal,
}

impl From<&RevenueOverview> for RevenueView {
    fn from(r: &RevenueOverview) -> Self {
        Self {
            currency: r.currency,
            range: r.range,
            gross_revenue: r.gross_revenue.into(),
            discounts: r.discounts.into(),
            refunds: r.refunds.into(),
            platform_fees: r.platform_fees.into(),
            instructor_commission: r.instructor_commission.into(),
            net_revenue: r.net_revenue.into(),
            transactions: r.transactions,
            growth_rate: r.growth_rate,
        }
    }
}
