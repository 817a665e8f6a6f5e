//! Response envelope shared by every endpoint.
//!
//! ```json
//! { "success": true, "message": "...", "data": {...},
//!   "meta": { "executionTime": "4ms", "timestamp": "...", "cached": true, "requestId": "..." } }
//! ```
//!
//! Errors use the same shape with `success: false`, a stable `code` and no
//! `data`. Server errors never carry their internal detail.

use std::convert::Infallible;
use std::time::Instant;

use axum::Json;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{HeaderValue, StatusCode, header::RETRY_AFTER};
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use edumart_shared::{AppError, Cached};
use serde::Serialize;
use serde_json::Value;

/// Per-request timing and correlation data, set by `request_context`.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Value of the `x-request-id` header.
    pub request_id: Option<String>,
    /// When the request entered the app.
    pub started: Instant,
}

impl RequestContext {
    /// A context starting now, without a request id.
    #[must_use]
    pub fn now() -> Self {
        Self {
            request_id: None,
            started: Instant::now(),
        }
    }

    fn meta(&self, cached: Option<bool>) -> Meta {
        Meta {
            execution_time: format!("{}ms", self.started.elapsed().as_millis()),
            timestamp: Utc::now(),
            cached,
            request_id: self.request_id.clone(),
        }
    }

    /// A successful response.
    pub fn ok<T: Serialize>(&self, message: impl Into<String>, data: T) -> Json<ApiResponse<T>> {
        Json(ApiResponse::success(message.into(), data, self.meta(None)))
    }

    /// A successful response from a read-through cache lookup.
    pub fn cached<T: Serialize>(&self, message: impl Into<String>, data: Cached<T>) -> Json<ApiResponse<T>> {
        Json(ApiResponse::success(message.into(), data.value, self.meta(Some(data.hit))))
    }

    /// A 201 response.
    pub fn created<T: Serialize>(
        &self,
        message: impl Into<String>,
        data: T,
    ) -> (StatusCode, Json<ApiResponse<T>>) {
        (StatusCode::CREATED, self.ok(message, data))
    }
}

impl<S: Send + Sync> FromRequestParts<S> for RequestContext {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<Self>()
            .cloned()
            .unwrap_or_else(Self::now))
    }
}

/// Response metadata.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Meta {
    /// Time spent in the app, e.g. `12ms`.
    pub execution_time: String,
    /// When the response was produced.
    pub timestamp: DateTime<Utc>,
    /// Whether the data came from cache.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cached: Option<bool>,
    /// Correlation id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

/// The envelope.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    /// False for errors.
    pub success: bool,
    /// Human-readable summary.
    pub message: String,
    /// Payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Field-level error details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Value>,
    /// Stable error code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<&'static str>,
    /// Seconds to wait before retrying, for rate-limited requests.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
    /// Metadata.
    pub meta: Meta,
}

impl<T> ApiResponse<T> {
    fn success(message: String, data: T, meta: Meta) -> Self {
        Self {
            success: true,
            message,
            data: Some(data),
            errors: None,
            code: None,
            retry_after: None,
            meta,
        }
    }
}

/// What an error response needs, kept on the response so the request
/// context middleware can re-render it with timing and request id.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    /// HTTP status.
    pub status: StatusCode,
    /// Stable error code.
    pub code: &'static str,
    /// Client-safe message.
    pub message: String,
    /// Seconds until a rate-limit window resets.
    pub retry_after: Option<u64>,
    /// Full error text, logged for server errors and never returned.
    pub detail: String,
}

impl ErrorReport {
    /// Builds the report for an application error.
    #[must_use]
    pub fn from_error(err: &AppError) -> Self {
        Self {
            status: StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            code: err.error_code(),
            message: err.public_message(),
            retry_after: match err {
                AppError::RateLimited { retry_after_secs } => Some(*retry_after_secs),
                _ => None,
            },
            detail: err.to_string(),
        }
    }

    /// Renders the error envelope.
    #[must_use]
    pub fn render(&self, context: &RequestContext) -> Response {
        let body: ApiResponse<()> = ApiResponse {
            success: false,
            message: self.message.clone(),
            data: None,
            errors: None,
            code: Some(self.code),
            retry_after: self.retry_after,
            meta: context.meta(None),
        };
        let mut response = (self.status, Json(body)).into_response();
        if let Some(secs) = self.retry_after {
            response
                .headers_mut()
                .insert(RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}

/// Handler error: any `AppError` rendered as an envelope.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl<E: Into<AppError>> From<E> for ApiError {
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let report = ErrorReport::from_error(&self.0);
        let mut response = report.render(&RequestContext::now());
        response.extensions_mut().insert(report);
        response
    }
}

/// Handler result.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_json(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_success_envelope() {
        let ctx = RequestContext {
            request_id: Some("req-1".to_string()),
            started: Instant::now(),
        };
        let response = ctx
            .cached("Loaded", Cached { value: vec![1, 2], hit: true })
            .into_response();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["data"], serde_json::json!([1, 2]));
        assert_eq!(body["meta"]["cached"], true);
        assert_eq!(body["meta"]["requestId"], "req-1");
        assert!(body["meta"]["executionTime"].as_str().unwrap().ends_with("ms"));
        assert!(body.get("code").is_none());
    }

    #[tokio::test]
    async fn test_rate_limited_sets_retry_after() {
        let response = ApiError(AppError::RateLimited { retry_after_secs: 42 }).into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[RETRY_AFTER], "42");
        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["code"], "RATE_LIMIT_EXCEEDED");
        assert_eq!(body["retryAfter"], 42);
    }

    #[tokio::test]
    async fn test_server_error_hides_detail() {
        let response = ApiError(AppError::Database("connection refused".to_string())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let report = response.extensions().get::<ErrorReport>().cloned().unwrap();
        assert!(report.detail.contains("connection refused"));
        let body = body_json(response).await;
        assert_eq!(body["code"], "INTERNAL_SERVER_ERROR");
        assert_eq!(body["message"], "An unexpected error occurred");
    }
}
