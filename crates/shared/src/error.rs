//! Application-wide error types.
//!
//! `AppError` is the HTTP-facing union every domain error converts into. Each
//! variant maps to one stable error code and one status code.

use thiserror::Error;

/// Result type alias using `AppError`.
pub type AppResult<T> = Result<T, AppError>;

/// Application error types.
#[derive(Debug, Error)]
pub enum AppError {
    /// Authentication failed.
    #[error("Authentication failed: {0}")]
    Unauthorized(String),

    /// Access denied.
    #[error("Access denied: {0}")]
    Forbidden(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Validation error.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Too many requests inside the rate-limit window.
    #[error("Rate limit exceeded, retry in {retry_after_secs}s")]
    RateLimited {
        /// Seconds until the window resets.
        retry_after_secs: u64,
    },

    /// Requested state transition is not allowed from the current status.
    #[error("Invalid status: {0}")]
    InvalidStatus(String),

    /// Payment is not in a state that permits the operation.
    #[error("Invalid transaction status: {0}")]
    InvalidTransactionStatus(String),

    /// Payout amount exceeds the available balance.
    #[error("Insufficient balance: {0}")]
    InsufficientBalance(String),

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),

    /// External service error.
    #[error("External service error: {0}")]
    ExternalService(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Unauthorized(_) => 401,
            Self::Forbidden(_) => 403,
            Self::NotFound(_) => 404,
            Self::Validation(_)
            | Self::InvalidStatus(_)
            | Self::InvalidTransactionStatus(_)
            | Self::InsufficientBalance(_) => 400,
            Self::RateLimited { .. } => 429,
            Self::Database(_) | Self::ExternalService(_) | Self::Internal(_) => 500,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::RateLimited { .. } => "RATE_LIMIT_EXCEEDED",
            Self::InvalidStatus(_) => "INVALID_STATUS",
            Self::InvalidTransactionStatus(_) => "INVALID_TRANSACTION_STATUS",
            Self::InsufficientBalance(_) => "INSUFFICIENT_BALANCE",
            Self::Database(_) | Self::ExternalService(_) | Self::Internal(_) => {
                "INTERNAL_SERVER_ERROR"
            }
        }
    }

    /// True for errors that must not leak their detail to clients.
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        self.status_code() >= 500
    }

    /// Message safe to return to the client.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::Unauthorized(msg)
            | Self::Forbidden(msg)
            | Self::NotFound(msg)
            | Self::Validation(msg)
            | Self::InvalidStatus(msg)
            | Self::InvalidTransactionStatus(msg)
            | Self::InsufficientBalance(msg) => msg.clone(),
            Self::RateLimited { retry_after_secs } => {
                format!("Too many requests. Try again in {retry_after_secs} seconds")
            }
            Self::Database(_) | Self::ExternalService(_) | Self::Internal(_) => {
                "An unexpected error occurred".to_string()
            }
        }
    }
}
