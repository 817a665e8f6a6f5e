//! Body and query extractors that reject with the standard error envelope.

use axum::extract::{FromRequest, FromRequestParts, Query, Request};
use axum::http::request::Parts;
use axum::Json;
use edumart_shared::AppError;
use serde::de::DeserializeOwned;

use crate::response::ApiError;

/// JSON body; malformed input is a `VALIDATION_ERROR`.
#[derive(Debug)]
pub struct Body<T>(pub T);

impl<S, T> FromRequest<S> for Body<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        Json::<T>::from_request(req, state)
            .await
            .map(|Json(value)| Self(value))
            .map_err(|rejection| ApiError(AppError::Validation(rejection.body_text())))
    }
}

/// Query string; malformed input is a `VALIDATION_ERROR`.
#[derive(Debug)]
pub struct Params<T>(pub T);

impl<S, T> FromRequestParts<S> for Params<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Query::<T>::from_request_parts(parts, state)
            .await
            .map(|Query(value)| Self(value))
            .map_err(|rejection| ApiError(AppError::Validation(rejection.body_text())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body as HttpBody;
    use axum::http::Request as HttpRequest;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Filter {
        per_page: Option<u32>,
    }

    #[tokio::test]
    async fn test_bad_query_is_validation_error() {
        let (mut parts, ()) = HttpRequest::builder()
            .uri("/x?perPage=many")
            .body(())
            .unwrap()
            .into_parts();
        let err = Params::<Filter>::from_request_parts(&mut parts, &()).await.unwrap_err();
        assert_eq!(err.0.error_code(), "VALIDATION_ERROR");

        let (mut parts, ()) = HttpRequest::builder()
            .uri("/x?perPage=5")
            .body(())
            .unwrap()
            .into_parts();
        let Params(filter) = Params::<Filter>::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(filter.per_page, Some(5));
    }

    #[tokio::test]
    async fn test_bad_json_is_validation_error() {
        let request = HttpRequest::builder()
            .header("content-type", "application/json")
            .body(HttpBody::from("{not json"))
            .unwrap();
        let err = Body::<serde_json::Value>::from_request(request, &()).await.unwrap_err();
        assert_eq!(err.0.error_code(), "VALIDATION_ERROR");
    }
}
