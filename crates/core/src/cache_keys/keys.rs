//! Cache key builders.
//!
//! Keys are `family:{id}` for single read models and `family:{id}:{params}`
//! for parameterized lists, so `family:{id}:*` clears every variant.

use std::time::Duration;

use edumart_shared::types::{PaymentId, UserId};

/// TTL for paged lists.
pub const LIST_TTL: Duration = Duration::from_secs(300);

/// TTL for dashboards and detail views.
pub const DASHBOARD_TTL: Duration = Duration::from_secs(1800);

/// TTL for analytics and tax documents.
pub const ANALYTICS_TTL: Duration = Duration::from_secs(3600);

/// `earnings_overview:{instructor}`
#[must_use]
pub fn earnings_overview(instructor: UserId) -> String {
    format!("earnings_overview:{instructor}")
}

/// `detailed_earnings:{instructor}:{params}`
#[must_use]
pub fn detailed_earnings(instructor: UserId, params: &str) -> String {
    format!("detailed_earnings:{instructor}:{params}")
}

/// `payout_history:{instructor}:{params}`
#[must_use]
pub fn payout_history(instructor: UserId, params: &str) -> String {
    format!("payout_history:{instructor}:{params}")
}

/// `financial_dashboard:{instructor}`
#[must_use]
pub fn financial_dashboard(instructor: UserId) -> String {
    format!("financial_dashboard:{instructor}")
}

/// `tax_document:{instructor}:{year}:{format}`
#[must_use]
pub fn tax_document(instructor: UserId, year: i32, format: &str) -> String {
    format!("tax_document:{instructor}:{year}:{format}")
}

/// `admin_transactions:{params}`
#[must_use]
pub fn admin_transactions(params: &str) -> String {
    format!("admin_transactions:{params}")
}

/// `transaction_details:{payment}`
#[must_use]
pub fn transaction_details(payment: PaymentId) -> String {
    format!("transaction_details:{payment}")
}

/// `admin_payouts:{params}`
#[must_use]
pub fn admin_payouts(params: &str) -> String {
    format!("admin_payouts:{params}")
}

/// `revenue_overview:{params}`
#[must_use]
pub fn revenue_overview(params: &str) -> String {
    format!("revenue_overview:{params}")
}

/// `financial_analytics:{params}`
#[must_use]
pub fn financial_analytics(params: &str) -> String {
    format!("financial_analytics:{params}")
}

/// Joins query parameters into a stable key suffix, skipping unset ones.
///
/// `[("page", "1"), ("status", "")]` → `page=1`
#[must_use]
pub fn params(pairs: &[(&str, &str)]) -> String {
    let mut out = String::new();
    for (name, value) in pairs.iter().filter(|(_, v)| !v.is_empty()) {
        if !out.is_empty() {
            out.push('&');
        }
        out.push_str(name);
        out.push('=');
        out.push_str(value);
    }
    if out.is_empty() {
        out.push_str("all");
    }
    out
}
