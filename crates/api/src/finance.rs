//! Finance service: the read models behind the dashboards and the write
//! workflows with their cache invalidation and side effects.
//!
//! Reads go through the shared cache with the TTLs in `cache_keys`. Writes
//! delegate to the transactional repositories, delete the stale cache keys
//! before returning, then send email and in-app notifications concurrently.
//! Side-effect failures are logged and never change the result.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::{Months, NaiveDate, Utc};
use edumart_core::balance::{AvailableBalance, BalanceCalculator};
use edumart_core::cache_keys::{self, CacheInvalidation, ANALYTICS_TTL, DASHBOARD_TTL, LIST_TTL};
use edumart_core::metrics::{
    bucketize, DateRange, EarningsOverview, Granularity, RangeQuery, RevenueOverview,
    RevenueSums, SeriesPoint,
};
use edumart_core::payment::{PaymentError, PaymentStatus, RefundRequest};
use edumart_core::payout::PayoutStatus;
use edumart_core::reports::{self, ReportService, TaxDocument};
use edumart_db::entities::{earnings, instructor_profiles, payments, payouts};
use edumart_db::repositories::{
    EarningFilter, EarningRepository, InstructorRepository, MetricsRepository,
    PaymentCompleted, PaymentDetails, PaymentRepository, PayoutRepository, RefundOutcome,
    UserRepository,
};
use edumart_shared::config::{AppConfig, FinanceConfig};
use edumart_shared::email::{EmailMessage, EmailTemplate, Mailer};
use edumart_shared::notify::{NewNotification, Notifier, Priority};
use edumart_shared::otp::{OtpOutcome, OtpStore};
use edumart_shared::rate_limit::RateLimiter;
use edumart_shared::types::{
    Currency, Money, PageRequest, PageResponse, PaymentId, PayoutId, UserId,
};
use edumart_shared::{AppError, CacheStore, Cached};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{error, info, warn};

use crate::views::stored_money;

/// Payouts shown on the dashboard.
const RECENT_PAYOUTS: u64 = 5;

/// Months in the dashboard chart, including the current one.
const DASHBOARD_MONTHS: u32 = 12;

/// Instructor dashboard snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinancialDashboard {
    /// Overview per currency.
    pub overview: Vec<EarningsOverview>,
    /// Currency of the monthly chart.
    pub chart_currency: Currency,
    /// Monthly buckets, oldest first.
    pub monthly: Vec<SeriesPoint>,
    /// Latest payouts.
    pub recent_payouts: Vec<payouts::Model>,
}

#[derive(Debug, Clone, Copy)]
enum PayoutEvent {
    Requested,
    Processing,
    Processed,
    Failed,
    Cancelled,
}

impl PayoutEvent {
    const fn kind(self) -> &'static str {
        match self {
            Self::Requested => "payout_requested",
            Self::Processing => "payout_processing",
            Self::Processed => "payout_processed",
            Self::Failed => "payout_failed",
            Self::Cancelled => "payout_cancelled",
        }
    }

    const fn title(self) -> &'static str {
        match self {
            Self::Requested => "Payout requested",
            Self::Processing => "Payout in progress",
            Self::Processed => "Payout sent",
            Self::Failed => "Payout failed",
            Self::Cancelled => "Payout cancelled",
        }
    }

    const fn priority(self) -> Priority {
        match self {
            Self::Processed | Self::Failed => Priority::High,
            Self::Requested | Self::Processing | Self::Cancelled => Priority::Normal,
        }
    }

    const fn email(self) -> Option<EmailTemplate> {
        match self {
            Self::Requested => Some(EmailTemplate::PayoutRequested),
            Self::Processed => Some(EmailTemplate::PayoutProcessed),
            Self::Failed => Some(EmailTemplate::PayoutFailed),
            Self::Cancelled => Some(EmailTemplate::PayoutCancelled),
            Self::Processing => None,
        }
    }

    fn message(self, amount: &str, payout: &payouts::Model) -> String {
        match self {
            Self::Requested => format!("Your payout request of {amount} was received."),
            Self::Processing => format!("Your payout of {amount} is being transferred."),
            Self::Processed => format!(
                "Your payout of {amount} has been sent. Reference: {}.",
                payout.gateway_id.as_deref().unwrap_or("-")
            ),
            Self::Failed => format!(
                "Your payout of {amount} failed: {}. The amount is back in your balance.",
                payout.failure_reason.as_deref().unwrap_or("unknown reason")
            ),
            Self::Cancelled => {
                format!("Your payout of {amount} was cancelled. The amount is back in your balance.")
            }
        }
    }
}

/// An email plus the matching in-app notification for one user.
struct Announcement {
    user: UserId,
    email: Option<(EmailTemplate, String, Value)>,
    notification: NewNotification,
}

/// Earnings, payouts, payments and reporting.
pub struct FinanceService {
    earnings: EarningRepository,
    payouts: PayoutRepository,
    payments: PaymentRepository,
    instructors: InstructorRepository,
    metrics: MetricsRepository,
    users: UserRepository,
    cache: Arc<dyn CacheStore>,
    mailer: Arc<dyn Mailer>,
    notifier: Arc<dyn Notifier>,
    payout_limiter: RateLimiter,
    otp: OtpStore,
    finance: FinanceConfig,
    frontend_url: String,
}

impl FinanceService {
    /// Wires the repositories and infrastructure.
    #[must_use]
    pub fn new(
        db: &DatabaseConnection,
        config: &AppConfig,
        cache: Arc<dyn CacheStore>,
        mailer: Arc<dyn Mailer>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let tx_timeout_ms = config.database.transaction_timeout_ms;
        Self {
            earnings: EarningRepository::new(db.clone()),
            payouts: PayoutRepository::new(db.clone(), tx_timeout_ms),
            payments: PaymentRepository::new(db.clone(), tx_timeout_ms),
            instructors: InstructorRepository::new(db.clone()),
            metrics: MetricsRepository::new(db.clone()),
            users: UserRepository::new(db.clone()),
            payout_limiter: RateLimiter::new(
                Arc::clone(&cache),
                "payout_request",
                config.rate_limit.payout_requests,
                Duration::from_secs(config.rate_limit.payout_window_secs),
            ),
            otp: OtpStore::new(Arc::clone(&cache), &config.otp),
            cache,
            mailer,
            notifier,
            finance: config.finance.clone(),
            frontend_url: config.email.frontend_url.trim_end_matches('/').to_string(),
        }
    }

    fn today() -> NaiveDate {
        Utc::now().date_naive()
    }

    async fn invalidate(&self, plan: &CacheInvalidation) {
        self.cache.invalidate(&plan.keys, &plan.patterns).await;
    }

    // ------------------------------------------------------------------
    // Instructor read models
    // ------------------------------------------------------------------

    async fn currencies(&self, instructor: UserId) -> Result<Vec<Currency>, AppError> {
        let currencies = self.instructors.currencies(instructor).await?;
        Ok(if currencies.is_empty() {
            vec![Currency::Inr]
        } else {
            currencies
        })
    }

    async fn overview_for(&self, instructor: UserId, currency: Currency) -> Result<EarningsOverview, AppError> {
        let sums = self.payouts.balance(instructor, currency).await?;
        if !sums.is_reconciled() {
            error!(
                instructor_id = %instructor,
                currency = %currency,
                available = sums.available(),
                shortfall = sums.settlement_shortfall(),
                "balance ledgers disagree"
            );
        }

        let this_month = DateRange::month_of(Self::today());
        let last_month = DateRange::month_of(this_month.start.pred_opt().unwrap_or(this_month.start));
        let this_total = self
            .earnings
            .commission_between(instructor, currency, this_month.start_at(), this_month.end_exclusive_at())
            .await?;
        let last_total = self
            .earnings
            .commission_between(instructor, currency, last_month.start_at(), last_month.end_exclusive_at())
            .await?;
        let sales = self.metrics.sales_count(instructor, currency).await?;

        Ok(EarningsOverview::compute(&sums, this_total, last_total, sales, currency))
    }

    async fn compute_overview(&self, instructor: UserId) -> Result<Vec<EarningsOverview>, AppError> {
        let mut overview = Vec::new();
        for currency in self.currencies(instructor).await? {
            overview.push(self.overview_for(instructor, currency).await?);
        }
        Ok(overview)
    }

    /// Lifetime, balance and month-over-month figures, one entry per currency.
    ///
    /// # Errors
    ///
    /// Returns an error if a ledger query fails.
    pub async fn earnings_overview(&self, instructor: UserId) -> Result<Cached<Vec<EarningsOverview>>, AppError> {
        self.cache
            .read_through(&cache_keys::earnings_overview(instructor), LIST_TTL, || {
                self.compute_overview(instructor)
            })
            .await
    }

    /// Paged earnings with optional status, currency and date filters.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a bad range, otherwise query errors.
    pub async fn detailed_earnings(
        &self,
        instructor: UserId,
        page: &PageRequest,
        status: Option<edumart_core::earnings::EarningStatus>,
        currency: Option<Currency>,
        range: &RangeQuery,
    ) -> Result<Cached<PageResponse<earnings::Model>>, AppError> {
        let page = page.normalized();
        let range = if range == &RangeQuery::default() {
            None
        } else {
            Some(DateRange::resolve(range, Self::today())?)
        };
        let filter = EarningFilter {
            status,
            currency,
            range,
        };

        let page_no = page.page.to_string();
        let per_page = page.per_page.to_string();
        let status_key = status.map(|s| s.to_string()).unwrap_or_default();
        let currency_key = currency.map(|c| c.code().to_string()).unwrap_or_default();
        let start_key = range.map(|r| r.start.to_string()).unwrap_or_default();
        let end_key = range.map(|r| r.end.to_string()).unwrap_or_default();
        let key = cache_keys::detailed_earnings(
            instructor,
            &cache_keys::params(&[
                ("page", &page_no),
                ("perPage", &per_page),
                ("status", &status_key),
                ("currency", &currency_key),
                ("start", &start_key),
                ("end", &end_key),
            ]),
        );

        self.cache
            .read_through(&key, LIST_TTL, || async move {
                self.earnings
                    .list_for_instructor(instructor, &page, &filter)
                    .await
                    .map_err(AppError::from)
            })
            .await
    }

    /// Paged payouts, optionally by status.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn payout_history(
        &self,
        instructor: UserId,
        page: &PageRequest,
        status: Option<PayoutStatus>,
    ) -> Result<Cached<PageResponse<payouts::Model>>, AppError> {
        let page = page.normalized();
        let page_no = page.page.to_string();
        let per_page = page.per_page.to_string();
        let status_key = status.map(|s| s.to_string()).unwrap_or_default();
        let key = cache_keys::payout_history(
            instructor,
            &cache_keys::params(&[("page", &page_no), ("perPage", &per_page), ("status", &status_key)]),
        );

        self.cache
            .read_through(&key, LIST_TTL, || async move {
                self.payouts
                    .list_for_instructor(instructor, &page, status)
                    .await
                    .map_err(AppError::from)
            })
            .await
    }

    /// Live balance in one currency. Never cached.
    ///
    /// # Errors
    ///
    /// Returns an error if the balance query fails.
    pub async fn balance(&self, instructor: UserId, currency: Currency) -> Result<AvailableBalance, AppError> {
        let sums = self.payouts.balance(instructor, currency).await?;
        if sums.available() < 0 {
            error!(
                instructor_id = %instructor,
                currency = %currency,
                available = sums.available(),
                "negative available balance"
            );
        }
        Ok(BalanceCalculator::summarize(&sums, currency))
    }

    /// Overview, twelve monthly buckets and the latest payouts.
    ///
    /// # Errors
    ///
    /// Returns an error if a query fails.
    pub async fn financial_dashboard(&self, instructor: UserId) -> Result<Cached<FinancialDashboard>, AppError> {
        self.cache
            .read_through(&cache_keys::financial_dashboard(instructor), DASHBOARD_TTL, || {
                self.load_dashboard(instructor)
            })
            .await
    }

    async fn load_dashboard(&self, instructor: UserId) -> Result<FinancialDashboard, AppError> {
        let overview = self.compute_overview(instructor).await?;
        let chart_currency = overview.first().map_or(Currency::Inr, |o| o.currency);

        let today = Self::today();
        let start = Granularity::Monthly
            .bucket_start(today)
            .checked_sub_months(Months::new(DASHBOARD_MONTHS - 1))
            .unwrap_or(today);
        let range = DateRange::new(start, today)?;
        let events = self.metrics.earnings_events(instructor, chart_currency, &range).await?;

        Ok(FinancialDashboard {
            overview,
            chart_currency,
            monthly: bucketize(&events, &range, Granularity::Monthly),
            recent_payouts: self.payouts.recent(instructor, RECENT_PAYOUTS).await?,
        })
    }

    /// Earnings bucketed by day, week or month. Never cached.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a bad range, otherwise query errors.
    pub async fn earnings_timeseries(
        &self,
        instructor: UserId,
        currency: Currency,
        granularity: Granularity,
        range: &RangeQuery,
    ) -> Result<(DateRange, Vec<SeriesPoint>), AppError> {
        let range = DateRange::resolve(range, Self::today())?;
        let events = self.metrics.earnings_events(instructor, currency, &range).await?;
        Ok((range, bucketize(&events, &range, granularity)))
    }

    /// Earnings as CSV, optionally limited to a range.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a bad range, otherwise query or encoding errors.
    pub async fn export_earnings_csv(&self, instructor: UserId, range: &RangeQuery) -> Result<String, AppError> {
        let range = if range == &RangeQuery::default() {
            None
        } else {
            Some(DateRange::resolve(range, Self::today())?)
        };
        let rows = self.earnings.export_rows(instructor, range).await?;
        info!(instructor_id = %instructor, rows = rows.len(), "earnings exported");
        Ok(reports::csv::earnings_csv(&rows)?)
    }

    /// Every payout as CSV.
    ///
    /// # Errors
    ///
    /// Returns an error if the query or encoding fails.
    pub async fn export_payouts_csv(&self, instructor: UserId) -> Result<String, AppError> {
        let rows = self.payouts.export_rows(instructor).await?;
        info!(instructor_id = %instructor, rows = rows.len(), "payouts exported");
        Ok(reports::csv::payouts_csv(&rows)?)
    }

    async fn build_tax_document(&self, instructor: UserId, year: i32) -> Result<TaxDocument, AppError> {
        let now = Utc::now();
        let range = DateRange::year(year, now.date_naive()).ok();
        let earnings = self.earnings.export_rows(instructor, range).await?;
        let payouts = self.payouts.export_rows(instructor).await?;
        Ok(ReportService::tax_document(instructor, year, &earnings, &payouts, now)?)
    }

    async fn build_tax_csv(&self, instructor: UserId, year: i32) -> Result<String, AppError> {
        let document = self.build_tax_document(instructor, year).await?;
        Ok(reports::csv::tax_document_csv(&document)?)
    }

    /// Annual tax summary.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an out-of-range year.
    pub async fn tax_document(&self, instructor: UserId, year: i32) -> Result<Cached<TaxDocument>, AppError> {
        self.cache
            .read_through(&cache_keys::tax_document(instructor, year, "json"), ANALYTICS_TTL, || {
                self.build_tax_document(instructor, year)
            })
            .await
    }

    /// Annual tax summary as CSV.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an out-of-range year.
    pub async fn tax_document_csv(&self, instructor: UserId, year: i32) -> Result<Cached<String>, AppError> {
        self.cache
            .read_through(&cache_keys::tax_document(instructor, year, "csv"), ANALYTICS_TTL, || {
                self.build_tax_csv(instructor, year)
            })
            .await
    }

    // ------------------------------------------------------------------
    // Instructor writes
    // ------------------------------------------------------------------

    /// Requests a payout against the available balance.
    ///
    /// # Errors
    ///
    /// `RateLimited` when the instructor exceeded the request budget, or any
    /// payout rule violation.
    pub async fn request_payout(&self, instructor: UserId, amount: Money) -> Result<payouts::Model, AppError> {
        self.payout_limiter.check(&instructor.to_string()).await?;

        let requested = self.payouts.request_payout(instructor, amount).await?;
        self.invalidate(&CacheInvalidation::for_payout_change(instructor)).await;
        self.announce(self.payout_announcement(&requested.payout, PayoutEvent::Requested))
            .await;
        Ok(requested.payout)
    }

    /// Cancels one of the instructor's own pending payouts.
    ///
    /// # Errors
    ///
    /// `NotFound` for someone else's payout, `InvalidStatus` unless PENDING.
    pub async fn cancel_payout(&self, instructor: UserId, id: PayoutId) -> Result<payouts::Model, AppError> {
        let transition = self.payouts.cancel(id, instructor).await?;
        self.after_payout_change(&transition.payout, PayoutEvent::Cancelled).await;
        Ok(transition.payout)
    }

    /// Sends a one-time code to the instructor's email for a payment details change.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown user, `ExternalService` if the code cannot be stored.
    pub async fn request_payment_details_otp(&self, instructor: UserId) -> Result<(), AppError> {
        let user = self.user(instructor).await?;
        let code = self.otp.issue(&user.email).await?;
        let ttl_minutes = self.otp_ttl_minutes();
        let message = EmailMessage {
            to: user.email,
            subject: "Your verification code".to_string(),
            template: EmailTemplate::OneTimeCode,
            template_data: json!({
                "name": user.full_name,
                "code": code,
                "expiresInMinutes": ttl_minutes.to_string(),
            }),
        };
        if let Err(err) = self.mailer.send(message).await {
            warn!(instructor_id = %instructor, error = %err, code = err.error_code(), "one-time code email failed");
        }
        info!(instructor_id = %instructor, "payment details code issued");
        Ok(())
    }

    fn otp_ttl_minutes(&self) -> u64 {
        self.otp.ttl().as_secs().div_ceil(60)
    }

    /// Replaces the payout method and details after verifying a one-time code.
    ///
    /// # Errors
    ///
    /// `Validation` for an empty method, a wrong, expired or locked code.
    pub async fn update_payment_details(
        &self,
        instructor: UserId,
        method: &str,
        details: Value,
        otp: &str,
    ) -> Result<instructor_profiles::Model, AppError> {
        if method.trim().is_empty() {
            return Err(AppError::Validation("Payout method is required".to_string()));
        }
        if details.is_null() {
            return Err(AppError::Validation("Payout details are required".to_string()));
        }

        let user = self.user(instructor).await?;
        match self.otp.verify(&user.email, otp.trim()).await? {
            OtpOutcome::Verified => {}
            OtpOutcome::Mismatch { remaining_attempts } => {
                return Err(AppError::Validation(format!(
                    "Invalid verification code, {remaining_attempts} attempts left"
                )));
            }
            OtpOutcome::Expired => {
                return Err(AppError::Validation(
                    "Verification code expired, request a new one".to_string(),
                ));
            }
            OtpOutcome::Locked => {
                return Err(AppError::Validation(
                    "Too many wrong codes, request a new one".to_string(),
                ));
            }
        }

        let profile = self
            .instructors
            .update_payment_details(instructor, method, details)
            .await?;
        self.invalidate(&CacheInvalidation::for_payment_details(instructor)).await;
        Ok(profile)
    }

    // ------------------------------------------------------------------
    // Admin reads
    // ------------------------------------------------------------------

    /// Every payment, optionally by status.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn transactions(
        &self,
        page: &PageRequest,
        status: Option<PaymentStatus>,
    ) -> Result<Cached<PageResponse<payments::Model>>, AppError> {
        let page = page.normalized();
        let page_no = page.page.to_string();
        let per_page = page.per_page.to_string();
        let status_key = status.map(|s| s.to_string()).unwrap_or_default();
        let key = cache_keys::admin_transactions(&cache_keys::params(&[
            ("page", &page_no),
            ("perPage", &per_page),
            ("status", &status_key),
        ]));

        self.cache
            .read_through(&key, LIST_TTL, || async move {
                self.payments.list(&page, status).await.map_err(AppError::from)
            })
            .await
    }

    /// A payment with its enrollments and earnings.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown payment.
    pub async fn transaction_details(&self, id: PaymentId) -> Result<Cached<PaymentDetails>, AppError> {
        self.cache
            .read_through(&cache_keys::transaction_details(id), DASHBOARD_TTL, || async move {
                self.payments.details(id).await.map_err(AppError::from)
            })
            .await
    }

    /// Every payout, optionally by status.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn all_payouts(
        &self,
        page: &PageRequest,
        status: Option<PayoutStatus>,
    ) -> Result<Cached<PageResponse<payouts::Model>>, AppError> {
        let page = page.normalized();
        let page_no = page.page.to_string();
        let per_page = page.per_page.to_string();
        let status_key = status.map(|s| s.to_string()).unwrap_or_default();
        let key = cache_keys::admin_payouts(&cache_keys::params(&[
            ("page", &page_no),
            ("perPage", &per_page),
            ("status", &status_key),
        ]));

        self.cache
            .read_through(&key, LIST_TTL, || async move {
                self.payouts.list_all(&page, status).await.map_err(AppError::from)
            })
            .await
    }

    /// Platform revenue for the range against the preceding period of equal length.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a bad range, otherwise query errors.
    pub async fn revenue_overview(&self, range: &RangeQuery) -> Result<Cached<Vec<RevenueOverview>>, AppError> {
        let range = DateRange::resolve(range, Self::today())?;
        let start_key = range.start.to_string();
        let end_key = range.end.to_string();
        let key = cache_keys::revenue_overview(&cache_keys::params(&[("start", &start_key), ("end", &end_key)]));

        self.cache
            .read_through(&key, DASHBOARD_TTL, || self.load_revenue(range))
            .await
    }

    /// Platform revenue bucketed by day, week or month.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a bad range, otherwise query errors.
    pub async fn financial_analytics(
        &self,
        currency: Currency,
        granularity: Granularity,
        range: &RangeQuery,
    ) -> Result<Cached<(DateRange, Vec<SeriesPoint>)>, AppError> {
        let range = DateRange::resolve(range, Self::today())?;
        let start_key = range.start.to_string();
        let end_key = range.end.to_string();
        let key = cache_keys::financial_analytics(&cache_keys::params(&[
            ("currency", currency.code()),
            ("granularity", granularity.as_str()),
            ("start", &start_key),
            ("end", &end_key),
        ]));

        self.cache
            .read_through(&key, ANALYTICS_TTL, || {
                self.load_analytics(currency, granularity, range)
            })
            .await
    }

    async fn load_revenue(&self, range: DateRange) -> Result<Vec<RevenueOverview>, AppError> {
        let current = self.metrics.revenue_sums(&range).await?;
        let previous = self.metrics.revenue_sums(&range.previous()).await?;
        Ok(combine_revenue(&current, &previous, range))
    }

    async fn load_analytics(
        &self,
        currency: Currency,
        granularity: Granularity,
        range: DateRange,
    ) -> Result<(DateRange, Vec<SeriesPoint>), AppError> {
        let events = self.metrics.revenue_events(currency, &range).await?;
        Ok((range, bucketize(&events, &range, granularity)))
    }

    // ------------------------------------------------------------------
    // Admin writes
    // ------------------------------------------------------------------

    /// PENDING → PROCESSING.
    ///
    /// # Errors
    ///
    /// `NotFound` or `InvalidStatus`.
    pub async fn start_processing(&self, id: PayoutId) -> Result<payouts::Model, AppError> {
        let transition = self.payouts.start_processing(id).await?;
        self.after_payout_change(&transition.payout, PayoutEvent::Processing).await;
        Ok(transition.payout)
    }

    /// Marks a payout as sent.
    ///
    /// # Errors
    ///
    /// `NotFound` or `InvalidStatus`.
    pub async fn process_payout(&self, id: PayoutId) -> Result<payouts::Model, AppError> {
        let transition = self.payouts.process(id).await?;
        self.after_payout_change(&transition.payout, PayoutEvent::Processed).await;
        Ok(transition.payout)
    }

    /// Marks a payout as failed and returns its earnings to the balance.
    ///
    /// # Errors
    ///
    /// `NotFound`, `InvalidStatus` or a missing reason.
    pub async fn fail_payout(&self, id: PayoutId, reason: &str) -> Result<payouts::Model, AppError> {
        let transition = self.payouts.fail(id, reason).await?;
        self.after_payout_change(&transition.payout, PayoutEvent::Failed).await;
        Ok(transition.payout)
    }

    /// Completes a pending payment and credits its instructors.
    ///
    /// # Errors
    ///
    /// `NotFound` or `InvalidTransactionStatus`.
    pub async fn complete_payment(&self, id: PaymentId) -> Result<PaymentCompleted, AppError> {
        let completed = self.payments.complete(id, self.finance.platform_fee_bps).await?;
        self.invalidate(&CacheInvalidation::for_payment_completion(id, &completed.instructors))
            .await;

        let announcements = completed.earnings.iter().map(|earning| {
            let commission = stored_money(earning.commission, &earning.currency).format_locale();
            Announcement {
                user: UserId::from_uuid(earning.instructor_id),
                email: None,
                notification: NewNotification {
                    user_id: UserId::from_uuid(earning.instructor_id),
                    kind: "new_sale".to_string(),
                    title: "New sale".to_string(),
                    message: format!("You earned {commission} from a new enrollment."),
                    priority: Priority::Normal,
                    data: json!({ "paymentId": id, "earningId": earning.id }),
                    action_url: Some(format!("{}/instructor/earnings", self.frontend_url)),
                },
            }
        });
        futures::future::join_all(announcements.map(|a| self.announce(a))).await;

        Ok(completed)
    }

    /// Refunds part or all of a completed payment.
    ///
    /// `amount` is in major units of the payment currency.
    ///
    /// # Errors
    ///
    /// `NotFound`, `InvalidTransactionStatus` or a refund rule violation.
    pub async fn refund(
        &self,
        id: PaymentId,
        amount: &crate::views::AmountInput,
        reason: &str,
    ) -> Result<RefundOutcome, AppError> {
        let payment = self
            .payments
            .find(id)
            .await?
            .ok_or(PaymentError::NotFound(id))?;
        let currency = Currency::from_str(&payment.currency).map_err(AppError::Internal)?;
        let amount = amount.to_money(currency)?;

        let request = RefundRequest {
            amount: amount.amount,
            reason: reason.trim().to_string(),
        };
        let outcome = self
            .payments
            .refund(id, &request, self.finance.partial_refund_earnings)
            .await?;
        self.invalidate(&CacheInvalidation::for_refund(id, &outcome.instructors))
            .await;

        let formatted = amount.format_locale();
        let student = UserId::from_uuid(outcome.payment.student_id);
        self.announce(Announcement {
            user: student,
            email: Some((
                EmailTemplate::RefundProcessed,
                "Your refund has been processed".to_string(),
                json!({ "amount": formatted, "reason": request.reason }),
            )),
            notification: NewNotification {
                user_id: student,
                kind: "refund_processed".to_string(),
                title: "Refund processed".to_string(),
                message: format!("A refund of {formatted} has been issued."),
                priority: Priority::High,
                data: json!({ "paymentId": id, "status": outcome.plan.new_status.as_str() }),
                action_url: Some(format!("{}/purchases", self.frontend_url)),
            },
        })
        .await;

        Ok(outcome)
    }

    // ------------------------------------------------------------------
    // Side effects
    // ------------------------------------------------------------------

    async fn user(&self, id: UserId) -> Result<edumart_db::entities::users::Model, AppError> {
        self.users
            .find_by_id(id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
            .ok_or_else(|| AppError::NotFound(format!("User {id} not found")))
    }

    async fn after_payout_change(&self, payout: &payouts::Model, event: PayoutEvent) {
        let instructor = UserId::from_uuid(payout.instructor_id);
        self.invalidate(&CacheInvalidation::for_payout_change(instructor)).await;
        self.announce(self.payout_announcement(payout, event)).await;
    }

    fn payout_announcement(&self, payout: &payouts::Model, event: PayoutEvent) -> Announcement {
        let instructor = UserId::from_uuid(payout.instructor_id);
        let amount = stored_money(payout.amount, &payout.currency).format_locale();
        let email = event.email().map(|template| {
            (
                template,
                event.title().to_string(),
                json!({
                    "amount": amount,
                    "gatewayId": payout.gateway_id,
                    "reason": payout.failure_reason,
                }),
            )
        });
        Announcement {
            user: instructor,
            email,
            notification: NewNotification {
                user_id: instructor,
                kind: event.kind().to_string(),
                title: event.title().to_string(),
                message: event.message(&amount, payout),
                priority: event.priority(),
                data: json!({ "payoutId": payout.id, "status": payout_status(payout) }),
                action_url: Some(format!("{}/instructor/payouts", self.frontend_url)),
            },
        }
    }

    /// Sends the email and stores the notification concurrently.
    async fn announce(&self, announcement: Announcement) {
        let Announcement {
            user,
            email,
            notification,
        } = announcement;
        let kind = notification.kind.clone();

        let send_email = async {
            let Some((template, subject, mut data)) = email else {
                return;
            };
            let recipient = match self.users.find_by_id(user).await {
                Ok(Some(recipient)) => recipient,
                Ok(None) => {
                    warn!(user_id = %user, "email skipped, user not found");
                    return;
                }
                Err(err) => {
                    warn!(user_id = %user, error = %err, "email skipped, user lookup failed");
                    return;
                }
            };
            if let Value::Object(map) = &mut data {
                map.insert("name".to_string(), Value::String(recipient.full_name));
            }
            let message = EmailMessage {
                to: recipient.email,
                subject,
                template,
                template_data: data,
            };
            if let Err(err) = self.mailer.send(message).await {
                warn!(user_id = %user, error = %err, code = err.error_code(), "email delivery failed");
            }
        };

        let store_notification = async {
            if let Err(err) = self.notifier.create_notification(notification).await {
                warn!(user_id = %user, kind = %kind, error = %err, "notification failed");
            }
        };

        tokio::join!(send_email, store_notification);
    }
}

fn payout_status(payout: &payouts::Model) -> &'static str {
    PayoutStatus::from(payout.status).as_str()
}

/// Pairs current and previous period sums by currency. A quiet period still
/// yields one all-zero INR entry.
fn combine_revenue(
    current: &[(Currency, RevenueSums)],
    previous: &[(Currency, RevenueSums)],
    range: DateRange,
) -> Vec<RevenueOverview> {
    let lookup = |rows: &[(Currency, RevenueSums)], currency: Currency| {
        rows.iter()
            .find(|(c, _)| *c == currency)
            .map(|(_, sums)| *sums)
            .unwrap_or_default()
    };

    let mut currencies: Vec<Currency> = Currency::ALL
        .into_iter()
        .filter(|c| current.iter().chain(previous).any(|(code, _)| code == c))
        .collect();
    if currencies.is_empty() {
        currencies.push(Currency::Inr);
    }

    currencies
        .into_iter()
        .map(|currency| {
            RevenueOverview::compute(
                &lookup(current, currency),
                &lookup(previous, currency),
                range,
                currency,
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sums(gross: i64, refunds: i64) -> RevenueSums {
        RevenueSums {
            gross,
            refunds,
            transactions: 1,
            ..RevenueSums::default()
        }
    }

    fn range() -> DateRange {
        DateRange::new(
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 30).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_combine_revenue_pairs_currencies() {
        let current = vec![(Currency::Inr, sums(150_000, 0)), (Currency::Usd, sums(5_000, 0))];
        let previous = vec![(Currency::Inr, sums(100_000, 0))];
        let overview = combine_revenue(&current, &previous, range());

        assert_eq!(overview.len(), 2);
        assert_eq!(overview[0].currency, Currency::Inr);
        assert_eq!(overview[0].growth_rate, dec!(50));
        assert_eq!(overview[1].currency, Currency::Usd);
        assert_eq!(overview[1].growth_rate, dec!(100));
    }

    #[test]
    fn test_combine_revenue_keeps_currency_with_only_previous_activity() {
        let previous = vec![(Currency::Eur, sums(1_000, 0))];
        let overview = combine_revenue(&[], &previous, range());
        assert_eq!(overview.len(), 1);
        assert_eq!(overview[0].currency, Currency::Eur);
        assert_eq!(overview[0].net_revenue, Money::zero(Currency::Eur));
        assert_eq!(overview[0].growth_rate, dec!(-100));
    }

    #[test]
    fn test_combine_revenue_quiet_period() {
        let overview = combine_revenue(&[], &[], range());
        assert_eq!(overview.len(), 1);
        assert_eq!(overview[0].currency, Currency::Inr);
        assert_eq!(overview[0].transactions, 0);
    }

    #[test]
    fn test_payout_events_pick_templates() {
        assert_eq!(PayoutEvent::Processing.email(), None);
        assert_eq!(
            PayoutEvent::Failed.email(),
            Some(EmailTemplate::PayoutFailed)
        );
        assert_eq!(PayoutEvent::Processed.priority(), Priority::High);
        assert_eq!(PayoutEvent::Cancelled.kind(), "payout_cancelled");
    }
}
