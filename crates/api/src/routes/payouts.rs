//! Instructor payout and payment details routes.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::Response,
    routing::{get, post, put},
};
use edumart_core::payout::PayoutStatus;
use edumart_shared::Cached;
use edumart_shared::types::{PageResponse, PayoutId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use super::ListQuery;
use super::earnings::csv_attachment;
use crate::AppState;
use crate::extract::{Body, Params};
use crate::middleware::InstructorUser;
use crate::response::{ApiResponse, ApiResult, RequestContext};
use crate::views::{AmountInput, PayoutView, parse_currency, parse_filter};

/// Creates the instructor payout routes (auth applied by the caller).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/instructor/payouts", get(payout_history).post(request_payout))
        .route("/instructor/payouts/export", get(export_payouts))
        .route("/instructor/payouts/{id}/cancel", post(cancel_payout))
        .route("/instructor/payment-details", put(update_payment_details))
        .route("/instructor/payment-details/otp", post(request_otp))
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Body of a payout request.
#[derive(Debug, Deserialize)]
pub struct PayoutRequestBody {
    /// Major units, number or string.
    pub amount: AmountInput,
    /// Currency code, default INR.
    pub currency: Option<String>,
}

/// Body of a payment details change.
#[derive(Debug, Deserialize)]
pub struct PaymentDetailsBody {
    /// Payout method, e.g. `bank_transfer` or `upi`.
    pub method: String,
    /// Method-specific details.
    pub details: Value,
    /// Code sent by email.
    pub otp: String,
}

/// Payment details after a change.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDetailsResponse {
    /// Payout method.
    pub method: Option<String>,
    /// Whether payouts can be requested.
    pub configured: bool,
    /// When the profile changed.
    pub updated_at: chrono::DateTime<chrono::FixedOffset>,
}

/// Where the one-time code went.
#[derive(Debug, Serialize)]
pub struct OtpSent {
    /// Always true once the code is stored.
    pub sent: bool,
}

// ============================================================================
// Handlers
// ============================================================================

async fn payout_history(
    State(state): State<AppState>,
    ctx: RequestContext,
    InstructorUser(instructor): InstructorUser,
    Params(query): Params<ListQuery>,
) -> ApiResult<Json<ApiResponse<PageResponse<PayoutView>>>> {
    let status = parse_filter(query.status.as_deref(), PayoutStatus::parse, "status")?;
    let Cached { value, hit } = state
        .finance
        .payout_history(instructor, &query.page_request(), status)
        .await?;
    let data = value.map(|m| PayoutView::from(&m));
    Ok(ctx.cached("Payout history retrieved", Cached { value: data, hit }))
}

async fn request_payout(
    State(state): State<AppState>,
    ctx: RequestContext,
    InstructorUser(instructor): InstructorUser,
    Body(body): Body<PayoutRequestBody>,
) -> ApiResult<(StatusCode, Json<ApiResponse<PayoutView>>)> {
    let currency = parse_currency(body.currency.as_deref())?;
    let amount = body.amount.to_money(currency)?;
    let payout = state.finance.request_payout(instructor, amount).await?;
    info!(instructor_id = %instructor, payout_id = %payout.id, "payout request accepted");
    Ok(ctx.created("Payout requested", PayoutView::from(&payout)))
}

async fn cancel_payout(
    State(state): State<AppState>,
    ctx: RequestContext,
    InstructorUser(instructor): InstructorUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<PayoutView>>> {
    let payout = state
        .finance
        .cancel_payout(instructor, PayoutId::from_uuid(id))
        .await?;
    Ok(ctx.ok("Payout cancelled", PayoutView::from(&payout)))
}

async fn export_payouts(
    State(state): State<AppState>,
    InstructorUser(instructor): InstructorUser,
) -> ApiResult<Response> {
    let csv = state.finance.export_payouts_csv(instructor).await?;
    Ok(csv_attachment("payouts.csv", csv))
}

async fn request_otp(
    State(state): State<AppState>,
    ctx: RequestContext,
    InstructorUser(instructor): InstructorUser,
) -> ApiResult<Json<ApiResponse<OtpSent>>> {
    state.finance.request_payment_details_otp(instructor).await?;
    Ok(ctx.ok("Verification code sent", OtpSent { sent: true }))
}

async fn update_payment_details(
    State(state): State<AppState>,
    ctx: RequestContext,
    InstructorUser(instructor): InstructorUser,
    Body(body): Body<PaymentDetailsBody>,
) -> ApiResult<Json<ApiResponse<PaymentDetailsResponse>>> {
    let profile = state
        .finance
        .update_payment_details(instructor, &body.method, body.details, &body.otp)
        .await?;
    Ok(ctx.ok(
        "Payment details updated",
        PaymentDetailsResponse {
            configured: profile.has_payment_details(),
            method: profile.payout_method,
            updated_at: profile.updated_at,
        },
    ))
}
