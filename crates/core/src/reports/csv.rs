//! CSV renderings of earnings, payouts and tax documents.
//!
//! Amounts are written in major units with the currency's minor digits
//! (`2000.00`), timestamps as RFC 3339.

use edumart_shared::types::{Currency, Money};

use super::error::ReportError;
use super::types::{EarningRow, PayoutRow, TaxDocument, TaxFigures};

/// Header of the earnings export.
pub const EARNINGS_HEADER: [&str; 8] = [
    "date",
    "earning_id",
    "payment_id",
    "status",
    "currency",
    "gross",
    "platform_fee",
    "commission",
];

/// Header of the payouts export.
pub const PAYOUTS_HEADER: [&str; 7] = [
    "requested_at",
    "payout_id",
    "status",
    "currency",
    "amount",
    "gateway_id",
    "processed_at",
];

/// Header of the tax document CSV.
pub const TAX_HEADER: [&str; 8] = [
    "year",
    "currency",
    "month",
    "gross_sales",
    "platform_fees",
    "net_commission",
    "cancelled_commission",
    "completed_payouts",
];

fn major(amount: i64, currency: Currency) -> String {
    Money::new(amount, currency).to_major().to_string()
}

fn finish(writer: csv::Writer<Vec<u8>>) -> Result<String, ReportError> {
    let bytes = writer
        .into_inner()
        .map_err(|e| ReportError::Csv(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| ReportError::Csv(e.to_string()))
}

/// Renders an earnings export.
///
/// # Errors
///
/// Returns `ReportError::Csv` if encoding fails.
pub fn earnings_csv(rows: &[EarningRow]) -> Result<String, ReportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(EARNINGS_HEADER)?;
    for row in rows {
        writer.write_record([
            row.created_at.format("%Y-%m-%d").to_string(),
            row.earning_id.to_string(),
            row.payment_id.to_string(),
            row.status.as_str().to_string(),
            row.currency.code().to_string(),
            major(row.gross, row.currency),
            major(row.platform_fee, row.currency),
            major(row.commission, row.currency),
        ])?;
    }
    finish(writer)
}

/// Renders a payouts export.
///
/// # Errors
///
/// Returns `ReportError::Csv` if encoding fails.
pub fn payouts_csv(rows: &[PayoutRow]) -> Result<String, ReportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(PAYOUTS_HEADER)?;
    for row in rows {
        writer.write_record([
            row.requested_at.to_rfc3339(),
            row.payout_id.to_string(),
            row.status.as_str().to_string(),
            row.currency.code().to_string(),
            major(row.amount, row.currency),
            row.gateway_id.clone().unwrap_or_default(),
            row.processed_at.map(|t| t.to_rfc3339()).unwrap_or_default(),
        ])?;
    }
    finish(writer)
}

/// Renders a tax document: twelve monthly rows per currency, then a `total` row.
///
/// # Errors
///
/// Returns `ReportError::Csv` if encoding fails.
pub fn tax_document_csv(doc: &TaxDocument) -> Result<String, ReportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(TAX_HEADER)?;
    let year = doc.year.to_string();
    for summary in &doc.currencies {
        let currency = summary.currency;
        let mut write = |label: String, f: &TaxFigures| {
            writer.write_record([
                year.clone(),
                currency.code().to_string(),
                label,
                major(f.gross_sales, currency),
                major(f.platform_fees, currency),
                major(f.net_commission, currency),
                major(f.cancelled_commission, currency),
                major(f.completed_payouts, currency),
            ])
        };
        for month in &summary.months {
            write(format!("{:02}", month.month), &month.figures)?;
        }
        write("total".to_string(), &summary.totals)?;
    }
    finish(writer)
}
