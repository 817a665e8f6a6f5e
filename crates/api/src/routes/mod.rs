//! API route definitions.

use axum::{Router, middleware};
use chrono::NaiveDate;
use edumart_core::metrics::{Granularity, RangeQuery};
use edumart_shared::types::PageRequest;
use edumart_shared::AppError;
use serde::Deserialize;

use crate::{AppState, middleware::auth::auth_middleware};

pub mod admin;
pub mod earnings;
pub mod health;
pub mod notifications;
pub mod payouts;

/// Creates the API router; everything except health requires a bearer token.
#[allow(clippy::needless_pass_by_value)]
pub fn api_routes_with_state(state: AppState) -> Router<AppState> {
    let protected_routes = Router::new()
        .merge(earnings::routes())
        .merge(payouts::routes())
        .merge(admin::routes())
        .merge(notifications::routes())
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new().merge(health::routes()).merge(protected_routes)
}

// ============================================================================
// Shared query parameters
// ============================================================================

/// `?page=&perPage=&status=`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    /// Page number, 1-based.
    pub page: Option<u32>,
    /// Page size.
    pub per_page: Option<u32>,
    /// Status filter.
    pub status: Option<String>,
}

impl ListQuery {
    /// The page request with defaults applied.
    #[must_use]
    pub fn page_request(&self) -> PageRequest {
        let defaults = PageRequest::default();
        PageRequest {
            page: self.page.unwrap_or(defaults.page),
            per_page: self.per_page.unwrap_or(defaults.per_page),
        }
        .normalized()
    }
}

/// `?year=` or `?startDate=&endDate=`, plus currency and bucket size.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeParams {
    /// Calendar year.
    pub year: Option<i32>,
    /// Custom range start.
    pub start_date: Option<NaiveDate>,
    /// Custom range end.
    pub end_date: Option<NaiveDate>,
    /// ISO currency code, default INR.
    pub currency: Option<String>,
    /// `daily`, `weekly` or `monthly`.
    pub granularity: Option<String>,
}

impl RangeParams {
    /// The date part.
    #[must_use]
    pub const fn range(&self) -> RangeQuery {
        RangeQuery {
            year: self.year,
            start_date: self.start_date,
            end_date: self.end_date,
        }
    }

    /// Bucket size, daily unless given.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an unknown granularity.
    pub fn granularity(&self) -> Result<Granularity, AppError> {
        Ok(Granularity::parse(self.granularity.as_deref().unwrap_or("daily"))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_query_defaults_and_clamps() {
        let page = ListQuery::default().page_request();
        assert_eq!(page.page, 1);
        assert_eq!(page.per_page, 20);

        let page = ListQuery {
            page: Some(0),
            per_page: Some(10_000),
            status: None,
        }
        .page_request();
        assert_eq!(page.page, 1);
        assert_eq!(page.per_page, edumart_shared::types::pagination::MAX_PER_PAGE);
    }

    #[test]
    fn test_range_params_granularity() {
        assert_eq!(RangeParams::default().granularity().unwrap(), Granularity::Daily);
        let params = RangeParams {
            granularity: Some("hourly".to_string()),
            ..RangeParams::default()
        };
        assert_eq!(params.granularity().unwrap_err().error_code(), "VALIDATION_ERROR");
    }
}
