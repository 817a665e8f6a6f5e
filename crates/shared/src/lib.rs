//! Shared types, errors, configuration and infrastructure contracts for Edumart.
//!
//! This crate provides common building blocks used across all other crates:
//! - Money in integer minor units with locale formatting
//! - Typed IDs for type-safe entity references
//! - Pagination types for list endpoints
//! - Application-wide error taxonomy
//! - Configuration management
//! - Cache store (moka, Redis), rate limiter and OTP store
//! - Mailer and notifier contracts

pub mod auth;
pub mod cache;
pub mod config;
pub mod email;
pub mod error;
pub mod jwt;
pub mod notify;
pub mod otp;
pub mod rate_limit;
pub mod types;

pub use cache::{CacheStore, Cached, MokaCacheStore, RedisCacheStore};
pub use config::AppConfig;
pub use error::{AppError, AppResult};
