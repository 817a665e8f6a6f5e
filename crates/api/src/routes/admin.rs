//! Admin transaction, payout and revenue routes.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use edumart_core::payment::PaymentStatus;
use edumart_core::payout::PayoutStatus;
use edumart_shared::Cached;
use edumart_shared::types::{PageResponse, PaymentId, PayoutId};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use super::earnings::SeriesResponse;
use super::{ListQuery, RangeParams};
use crate::AppState;
use crate::extract::{Body, Params};
use crate::middleware::AdminUser;
use crate::response::{ApiResponse, ApiResult, RequestContext};
use crate::views::{
    AmountInput, EarningView, MoneyView, PaymentDetailsView, PaymentView, PayoutView,
    RevenueView, parse_currency, parse_filter, series_view, stored_money,
};

/// Creates the admin routes (auth applied by the caller).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/admin/transactions", get(list_transactions))
        .route("/admin/transactions/{id}", get(transaction_details))
        .route("/admin/transactions/{id}/complete", post(complete_payment))
        .route("/admin/transactions/{id}/refund", post(refund_payment))
        .route("/admin/payouts", get(list_payouts))
        .route("/admin/payouts/{id}/processing", post(start_processing))
        .route("/admin/payouts/{id}/process", post(process_payout))
        .route("/admin/payouts/{id}/fail", post(fail_payout))
        .route("/admin/revenue/overview", get(revenue_overview))
        .route("/admin/revenue/analytics", get(financial_analytics))
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Body of a refund.
#[derive(Debug, Deserialize)]
pub struct RefundBody {
    /// Major units of the payment currency, number or string.
    pub amount: AmountInput,
    /// Why the refund was issued.
    pub reason: String,
}

/// Body of a payout failure.
#[derive(Debug, Deserialize)]
pub struct FailBody {
    /// Why the transfer failed.
    pub reason: String,
}

/// Result of completing a payment.
#[derive(Debug, Serialize)]
pub struct CompletionResponse {
    /// The payment after completion.
    pub payment: PaymentView,
    /// Earnings created, one per enrollment.
    pub earnings: Vec<EarningView>,
}

/// Result of a refund.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundResponse {
    /// The payment after the refund.
    pub payment: PaymentView,
    /// Whether nothing is left to refund.
    pub is_full: bool,
    /// Whether enrollments were revoked.
    pub enrollments_refunded: bool,
    /// Earnings cancelled.
    pub cancelled_earnings: usize,
    /// Commission removed from instructor balances.
    pub cancelled_commission: MoneyView,
    /// Earnings already paid out, to be recovered separately.
    pub clawback_earnings: usize,
    /// Commission already paid out.
    pub clawback_commission: MoneyView,
}

// ============================================================================
// Handlers
// ============================================================================

async fn list_transactions(
    State(state): State<AppState>,
    ctx: RequestContext,
    AdminUser(_admin): AdminUser,
    Params(query): Params<ListQuery>,
) -> ApiResult<Json<ApiResponse<PageResponse<PaymentView>>>> {
    let status = parse_filter(query.status.as_deref(), PaymentStatus::parse, "status")?;
    let Cached { value, hit } = state
        .finance
        .transactions(&query.page_request(), status)
        .await?;
    let data = value.map(|m| PaymentView::from(&m));
    Ok(ctx.cached("Transactions retrieved", Cached { value: data, hit }))
}

async fn transaction_details(
    State(state): State<AppState>,
    ctx: RequestContext,
    AdminUser(_admin): AdminUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<PaymentDetailsView>>> {
    let Cached { value, hit } = state
        .finance
        .transaction_details(PaymentId::from_uuid(id))
        .await?;
    Ok(ctx.cached(
        "Transaction details retrieved",
        Cached {
            value: PaymentDetailsView::from(&value),
            hit,
        },
    ))
}

async fn complete_payment(
    State(state): State<AppState>,
    ctx: RequestContext,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<CompletionResponse>>> {
    let completed = state
        .finance
        .complete_payment(PaymentId::from_uuid(id))
        .await?;
    info!(admin_id = %admin, payment_id = %id, earnings = completed.earnings.len(), "payment completed");
    Ok(ctx.ok(
        "Payment completed",
        CompletionResponse {
            payment: PaymentView::from(&completed.payment),
            earnings: completed.earnings.iter().map(EarningView::from).collect(),
        },
    ))
}

async fn refund_payment(
    State(state): State<AppState>,
    ctx: RequestContext,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
    Body(body): Body<RefundBody>,
) -> ApiResult<Json<ApiResponse<RefundResponse>>> {
    let outcome = state
        .finance
        .refund(PaymentId::from_uuid(id), &body.amount, &body.reason)
        .await?;
    info!(admin_id = %admin, payment_id = %id, status = %outcome.plan.new_status, "refund processed");

    let currency = &outcome.payment.currency;
    let plan = &outcome.plan;
    Ok(ctx.ok(
        "Refund processed",
        RefundResponse {
            payment: PaymentView::from(&outcome.payment),
            is_full: plan.is_full,
            enrollments_refunded: plan.refund_enrollments,
            cancelled_earnings: plan.cancel_earnings.len(),
            cancelled_commission: stored_money(plan.cancelled_commission, currency).into(),
            clawback_earnings: plan.clawback_earnings.len(),
            clawback_commission: stored_money(plan.clawback_commission, currency).into(),
        },
    ))
}

async fn list_payouts(
    State(state): State<AppState>,
    ctx: RequestContext,
    AdminUser(_admin): AdminUser,
    Params(query): Params<ListQuery>,
) -> ApiResult<Json<ApiResponse<PageResponse<PayoutView>>>> {
    let status = parse_filter(query.status.as_deref(), PayoutStatus::parse, "status")?;
    let Cached { value, hit } = state
        .finance
        .all_payouts(&query.page_request(), status)
        .await?;
    let data = value.map(|m| PayoutView::from(&m));
    Ok(ctx.cached("Payouts retrieved", Cached { value: data, hit }))
}

async fn start_processing(
    State(state): State<AppState>,
    ctx: RequestContext,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<PayoutView>>> {
    let payout = state
        .finance
        .start_processing(PayoutId::from_uuid(id))
        .await?;
    info!(admin_id = %admin, payout_id = %id, "payout processing started");
    Ok(ctx.ok("Payout processing started", PayoutView::from(&payout)))
}

async fn process_payout(
    State(state): State<AppState>,
    ctx: RequestContext,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<PayoutView>>> {
    let payout = state
        .finance
        .process_payout(PayoutId::from_uuid(id))
        .await?;
    info!(admin_id = %admin, payout_id = %id, "payout processed");
    Ok(ctx.ok("Payout processed", PayoutView::from(&payout)))
}

async fn fail_payout(
    State(state): State<AppState>,
    ctx: RequestContext,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
    Body(body): Body<FailBody>,
) -> ApiResult<Json<ApiResponse<PayoutView>>> {
    let payout = state
        .finance
        .fail_payout(PayoutId::from_uuid(id), &body.reason)
        .await?;
    info!(admin_id = %admin, payout_id = %id, "payout marked failed");
    Ok(ctx.ok("Payout marked as failed", PayoutView::from(&payout)))
}

async fn revenue_overview(
    State(state): State<AppState>,
    ctx: RequestContext,
    AdminUser(_admin): AdminUser,
    Params(params): Params<RangeParams>,
) -> ApiResult<Json<ApiResponse<Vec<RevenueView>>>> {
    let Cached { value, hit } = state.finance.revenue_overview(&params.range()).await?;
    let data = value.iter().map(RevenueView::from).collect();
    Ok(ctx.cached("Revenue overview retrieved", Cached { value: data, hit }))
}

async fn financial_analytics(
    State(state): State<AppState>,
    ctx: RequestContext,
    AdminUser(_admin): AdminUser,
    Params(params): Params<RangeParams>,
) -> ApiResult<Json<ApiResponse<SeriesResponse>>> {
    let currency = parse_currency(params.currency.as_deref())?;
    let granularity = params.granularity()?;
    let Cached { value, hit } = state
        .finance
        .financial_analytics(currency, granularity, &params.range())
        .await?;
    let (range, points) = value;
    Ok(ctx.cached(
        "Financial analytics retrieved",
        Cached {
            value: SeriesResponse {
                range,
                granularity: granularity.to_string(),
                currency,
                series: series_view(&points, currency),
            },
            hit,
        },
    ))
}
