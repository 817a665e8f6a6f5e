//! Instructor reports.
//!
//! - Earnings and payout CSV exports
//! - Annual tax summary per currency, as JSON or CSV

pub mod csv;
pub mod error;
pub mod service;
pub mod types;


pub use error::ReportError;
pub use service::ReportService;
pub use types::*;
