//! Authentication middleware and role extractors.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use edumart_shared::auth::{Claims, Role};
use edumart_shared::jwt::JwtError;
use edumart_shared::types::UserId;
use edumart_shared::AppError;

use crate::AppState;
use crate::response::ApiError;

/// Extracts the bearer token from the Authorization header.
fn extract_bearer_token(header: &str) -> Option<&str> {
    header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
}

/// Validates the bearer token and stores its claims in request extensions.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let auth_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let Some(token) = auth_header.and_then(extract_bearer_token) else {
        return ApiError(AppError::Unauthorized(
            "Authorization header with Bearer token is required".to_string(),
        ))
        .into_response();
    };

    match state.jwt.validate_token(token) {
        Ok(claims) => {
            request.extensions_mut().insert(claims);
            next.run(request).await
        }
        Err(JwtError::Expired) => {
            ApiError(AppError::Unauthorized("Token has expired".to_string())).into_response()
        }
        Err(_) => ApiError(AppError::Unauthorized("Invalid or malformed token".to_string()))
            .into_response(),
    }
}

fn claims(parts: &Parts) -> Result<Claims, ApiError> {
    parts
        .extensions
        .get::<Claims>()
        .cloned()
        .ok_or_else(|| ApiError(AppError::Unauthorized("Authentication required".to_string())))
}

fn require(parts: &Parts, role: Role) -> Result<UserId, ApiError> {
    let claims = claims(parts)?;
    if claims.role == role {
        Ok(claims.user_id())
    } else {
        Err(ApiError(AppError::Forbidden(format!(
            "This endpoint requires the {role} role"
        ))))
    }
}

/// Any authenticated user.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Claims);

impl<S: Send + Sync> FromRequestParts<S> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        claims(parts).map(AuthUser)
    }
}

/// An authenticated instructor.
#[derive(Debug, Clone, Copy)]
pub struct InstructorUser(pub UserId);

impl<S: Send + Sync> FromRequestParts<S> for InstructorUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        require(parts, Role::Instructor).map(InstructorUser)
    }
}

/// An authenticated admin.
#[derive(Debug, Clone, Copy)]
pub struct AdminUser(pub UserId);

impl<S: Send + Sync> FromRequestParts<S> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        require(parts, Role::Admin).map(AdminUser)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request as HttpRequest;
    use chrono::{Duration, Utc};

    fn parts_with(claims: Option<Claims>) -> Parts {
        let (mut parts, ()) = HttpRequest::new(()).into_parts();
        if let Some(claims) = claims {
            parts.extensions.insert(claims);
        }
        parts
    }

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(extract_bearer_token("Bearer abc"), Some("abc"));
        assert_eq!(extract_bearer_token("bearer abc"), Some("abc"));
        assert_eq!(extract_bearer_token("Basic abc"), None);
    }

    #[tokio::test]
    async fn test_role_extractors() {
        let id = UserId::new();
        let claims = Claims::new(id, Role::Instructor, Utc::now() + Duration::minutes(5));

        let mut parts = parts_with(Some(claims));
        let InstructorUser(extracted) = InstructorUser::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert_eq!(extracted, id);

        let err = AdminUser::from_request_parts(&mut parts, &()).await.unwrap_err();
        assert_eq!(err.0.error_code(), "FORBIDDEN");

        let mut anonymous = parts_with(None);
        let err = AuthUser::from_request_parts(&mut anonymous, &()).await.unwrap_err();
        assert_eq!(err.0.error_code(), "UNAUTHORIZED");
    }
}
