//! Instructor earnings, dashboard and report routes.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
    routing::get,
};
use edumart_core::earnings::EarningStatus;
use edumart_core::metrics::DateRange;
use edumart_shared::Cached;
use edumart_shared::types::{Currency, PageResponse};
use serde::{Deserialize, Serialize};

use super::{ListQuery, RangeParams};
use crate::AppState;
use crate::extract::Params;
use crate::middleware::InstructorUser;
use crate::response::{ApiResponse, ApiResult, RequestContext};
use crate::views::{
    BalanceView, DashboardView, EarningView, OverviewView, SeriesPointView, parse_currency,
    parse_filter, series_view,
};

/// Creates the instructor earnings routes (auth applied by the caller).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/instructor/earnings", get(detailed_earnings))
        .route("/instructor/earnings/overview", get(earnings_overview))
        .route("/instructor/earnings/balance", get(balance))
        .route("/instructor/earnings/timeseries", get(timeseries))
        .route("/instructor/earnings/export", get(export_earnings))
        .route("/instructor/tax-documents/{year}", get(tax_document))
        .route("/instructor/dashboard", get(dashboard))
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Filters for the earnings list.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EarningsQuery {
    /// Page number.
    pub page: Option<u32>,
    /// Page size.
    pub per_page: Option<u32>,
    /// PENDING, PAID or CANCELLED.
    pub status: Option<String>,
    /// Currency code.
    pub currency: Option<String>,
    /// Calendar year.
    pub year: Option<i32>,
    /// Custom range start.
    pub start_date: Option<chrono::NaiveDate>,
    /// Custom range end.
    pub end_date: Option<chrono::NaiveDate>,
}

/// `?currency=`
#[derive(Debug, Default, Deserialize)]
pub struct CurrencyQuery {
    /// Currency code, default INR.
    pub currency: Option<String>,
}

/// `?format=json|csv`
#[derive(Debug, Default, Deserialize)]
pub struct FormatQuery {
    /// Output format, default json.
    pub format: Option<String>,
}

/// A time series with the range it covers.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesResponse {
    /// Covered dates.
    pub range: DateRange,
    /// Bucket size.
    pub granularity: String,
    /// Currency.
    pub currency: Currency,
    /// Buckets, oldest first.
    pub series: Vec<SeriesPointView>,
}

// ============================================================================
// Helper Functions
// ============================================================================

/// A CSV attachment.
pub(crate) fn csv_attachment(filename: &str, body: String) -> Response {
    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        body,
    )
        .into_response()
}

// ============================================================================
// Handlers
// ============================================================================

async fn earnings_overview(
    State(state): State<AppState>,
    ctx: RequestContext,
    InstructorUser(instructor): InstructorUser,
) -> ApiResult<Json<ApiResponse<Vec<OverviewView>>>> {
    let Cached { value, hit } = state.finance.earnings_overview(instructor).await?;
    let data = value.iter().map(OverviewView::from).collect();
    Ok(ctx.cached("Earnings overview retrieved", Cached { value: data, hit }))
}

async fn detailed_earnings(
    State(state): State<AppState>,
    ctx: RequestContext,
    InstructorUser(instructor): InstructorUser,
    Params(query): Params<EarningsQuery>,
) -> ApiResult<Json<ApiResponse<PageResponse<EarningView>>>> {
    let page = ListQuery {
        page: query.page,
        per_page: query.per_page,
        status: None,
    }
    .page_request();
    let status = parse_filter(query.status.as_deref(), EarningStatus::parse, "status")?;
    let currency = query
        .currency
        .as_deref()
        .map(|c| parse_currency(Some(c)))
        .transpose()?;
    let range = RangeParams {
        year: query.year,
        start_date: query.start_date,
        end_date: query.end_date,
        ..RangeParams::default()
    }
    .range();

    let Cached { value, hit } = state
        .finance
        .detailed_earnings(instructor, &page, status, currency, &range)
        .await?;
    let data = value.map(|m| EarningView::from(&m));
    Ok(ctx.cached("Earnings retrieved", Cached { value: data, hit }))
}

async fn balance(
    State(state): State<AppState>,
    ctx: RequestContext,
    InstructorUser(instructor): InstructorUser,
    Params(query): Params<CurrencyQuery>,
) -> ApiResult<Json<ApiResponse<BalanceView>>> {
    let currency = parse_currency(query.currency.as_deref())?;
    let balance = state.finance.balance(instructor, currency).await?;
    Ok(ctx.ok("Balance retrieved", BalanceView::from(&balance)))
}

async fn timeseries(
    State(state): State<AppState>,
    ctx: RequestContext,
    InstructorUser(instructor): InstructorUser,
    Params(params): Params<RangeParams>,
) -> ApiResult<Json<ApiResponse<SeriesResponse>>> {
    let currency = parse_currency(params.currency.as_deref())?;
    let granularity = params.granularity()?;
    let (range, points) = state
        .finance
        .earnings_timeseries(instructor, currency, granularity, &params.range())
        .await?;
    Ok(ctx.ok(
        "Earnings time series retrieved",
        SeriesResponse {
            range,
            granularity: granularity.to_string(),
            currency,
            series: series_view(&points, currency),
        },
    ))
}

async fn export_earnings(
    State(state): State<AppState>,
    InstructorUser(instructor): InstructorUser,
    Params(params): Params<RangeParams>,
) -> ApiResult<Response> {
    let csv = state
        .finance
        .export_earnings_csv(instructor, &params.range())
        .await?;
    Ok(csv_attachment("earnings.csv", csv))
}

async fn tax_document(
    State(state): State<AppState>,
    ctx: RequestContext,
    InstructorUser(instructor): InstructorUser,
    Path(year): Path<i32>,
    Params(query): Params<FormatQuery>,
) -> ApiResult<Response> {
    match query.format.as_deref().map(str::to_lowercase).as_deref() {
        None | Some("json") => {
            let document = state.finance.tax_document(instructor, year).await?;
            Ok(ctx.cached("Tax document generated", document).into_response())
        }
        Some("csv") => {
            let csv = state.finance.tax_document_csv(instructor, year).await?;
            Ok(csv_attachment(&format!("tax-document-{year}.csv"), csv.value))
        }
        Some(other) => Err(edumart_shared::AppError::Validation(format!(
            "Invalid format: {other}, expected json or csv"
        ))
        .into()),
    }
}

async fn dashboard(
    State(state): State<AppState>,
    ctx: RequestContext,
    InstructorUser(instructor): InstructorUser,
) -> ApiResult<Json<ApiResponse<DashboardView>>> {
    let Cached { value, hit } = state.finance.financial_dashboard(instructor).await?;
    Ok(ctx.cached(
        "Financial dashboard retrieved",
        Cached {
            value: DashboardView::from(&value),
            hit,
        },
    ))
}
