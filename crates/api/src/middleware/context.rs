//! Request timing, correlation ids and error rendering.

use std::time::Instant;

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;

use crate::response::{ErrorReport, RequestContext};

/// Records when the request started and which id it carries, then renders
/// any error response with that context. Server errors are logged here with
/// their full detail and the request id.
pub async fn request_context(mut request: Request, next: Next) -> Response {
    let context = RequestContext {
        request_id: request
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        started: Instant::now(),
    };
    request.extensions_mut().insert(context.clone());
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let response = next.run(request).await;

    let Some(report) = response.extensions().get::<ErrorReport>().cloned() else {
        return response;
    };
    if report.status.is_server_error() {
        tracing::error!(
            request_id = context.request_id.as_deref().unwrap_or("-"),
            %method,
            path,
            code = report.code,
            error = %report.detail,
            "request failed"
        );
    }
    report.render(&context)
}
