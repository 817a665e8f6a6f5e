//! Middleware and extractors.

pub mod auth;
pub mod context;

pub use auth::{AdminUser, AuthUser, InstructorUser, auth_middleware};
pub use context::request_context;
