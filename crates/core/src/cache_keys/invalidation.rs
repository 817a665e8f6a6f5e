//! Which cache entries each write makes stale.

use edumart_shared::types::{PaymentId, UserId};

use super::keys;

/// Exact keys and glob patterns to delete after a write commits.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheInvalidation {
    /// Exact keys.
    pub keys: Vec<String>,
    /// Glob patterns (`*`, `?`).
    pub patterns: Vec<String>,
}

impl CacheInvalidation {
    /// Every read model of one instructor.
    #[must_use]
    pub fn instructor(instructor: UserId) -> Self {
        Self {
            keys: vec![
                keys::earnings_overview(instructor),
                keys::financial_dashboard(instructor),
            ],
            patterns: vec![
                format!("detailed_earnings:{instructor}:*"),
                format!("payout_history:{instructor}:*"),
                format!("tax_document:{instructor}:*"),
            ],
        }
    }

    /// Payout requested, started, processed, failed or cancelled.
    #[must_use]
    pub fn for_payout_change(instructor: UserId) -> Self {
        let mut plan = Self::instructor(instructor);
        plan.patterns.push("admin_payouts:*".to_string());
        plan.patterns.push("financial_analytics:*".to_string());
        plan
    }

    /// Payment completed; `instructors` are those who gained earnings.
    #[must_use]
    pub fn for_payment_completion(payment: PaymentId, instructors: &[UserId]) -> Self {
        let mut plan = Self {
            keys: vec![keys::transaction_details(payment)],
            patterns: vec![
                "admin_transactions:*".to_string(),
                "revenue_overview:*".to_string(),
                "financial_analytics:*".to_string(),
            ],
        };
        for instructor in instructors {
            plan.merge(Self::instructor(*instructor));
        }
        plan
    }

    /// Refund processed; `instructors` are those whose earnings changed.
    #[must_use]
    pub fn for_refund(payment: PaymentId, instructors: &[UserId]) -> Self {
        let mut plan = Self::for_payment_completion(payment, instructors);
        plan.patterns.push("admin_payouts:*".to_string());
        plan.dedup();
        plan
    }

    /// Payout method or details changed.
    #[must_use]
    pub fn for_payment_details(instructor: UserId) -> Self {
        Self {
            keys: vec![
                keys::earnings_overview(instructor),
                keys::financial_dashboard(instructor),
            ],
            patterns: Vec::new(),
        }
    }

    /// Appends another plan, dropping duplicates.
    pub fn merge(&mut self, other: Self) {
        self.keys.extend(other.keys);
        self.patterns.extend(other.patterns);
        self.dedup();
    }

    fn dedup(&mut self) {
        self.keys.sort();
        self.keys.dedup();
        self.patterns.sort();
        self.patterns.dedup();
    }

    /// True if `key` would be removed by this plan.
    #[must_use]
    pub fn covers(&self, key: &str) -> bool {
        self.keys.iter().any(|k| k == key)
            || self
                .patterns
                .iter()
                .any(|p| edumart_shared::cache::glob_match(p, key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payout_change_covers_instructor_and_admin() {
        let instructor = UserId::new();
        let other = UserId::new();
        let plan = CacheInvalidation::for_payout_change(instructor);
        assert!(plan.covers(&keys::earnings_overview(instructor)));
        assert!(plan.covers(&keys::payout_history(instructor, "page=1")));
        assert!(plan.covers(&keys::tax_document(instructor, 2024, "json")));
        assert!(plan.covers(&keys::admin_payouts("page=1")));
        assert!(plan.covers(&keys::financial_analytics("daily")));
        assert!(!plan.covers(&keys::earnings_overview(other)));
        assert!(!plan.covers(&keys::admin_transactions("page=1")));
    }

    #[test]
    fn test_refund_covers_transactions_and_every_instructor() {
        let payment = PaymentId::new();
        let a = UserId::new();
        let b = UserId::new();
        let plan = CacheInvalidation::for_refund(payment, &[a, b]);
        assert!(plan.covers(&keys::transaction_details(payment)));
        assert!(plan.covers(&keys::admin_transactions("page=1&status=COMPLETED")));
        assert!(plan.covers(&keys::revenue_overview("month")));
        assert!(plan.covers(&keys::admin_payouts("all")));
        assert!(plan.covers(&keys::detailed_earnings(a, "page=1")));
        assert!(plan.covers(&keys::financial_dashboard(b)));
        assert!(!plan.covers(&keys::transaction_details(PaymentId::new())));
    }

    #[test]
    fn test_completion_leaves_admin_payouts() {
        let plan = CacheInvalidation::for_payment_completion(PaymentId::new(), &[UserId::new()]);
        assert!(!plan.covers(&keys::admin_payouts("all")));
        assert!(plan.covers(&keys::admin_transactions("all")));
    }

    #[test]
    fn test_payment_details_is_narrow() {
        let instructor = UserId::new();
        let plan = CacheInvalidation::for_payment_details(instructor);
        assert!(plan.covers(&keys::earnings_overview(instructor)));
        assert!(plan.covers(&keys::financial_dashboard(instructor)));
        assert!(!plan.covers(&keys::payout_history(instructor, "all")));
        assert!(plan.patterns.is_empty());
    }

    #[test]
    fn test_merge_dedups() {
        let instructor = UserId::new();
        let mut plan = CacheInvalidation::instructor(instructor);
        plan.merge(CacheInvalidation::instructor(instructor));
        assert_eq!(plan.keys.len(), 2);
        assert_eq!(plan.patterns.len(), 3);
    }
}
