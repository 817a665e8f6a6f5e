//! Instructor earnings: one commission record per sold enrollment.
//!
//! # Modules
//!
//! - `types` - Earning status and snapshots
//! - `commission` - Platform fee / instructor commission split

pub mod commission;
pub mod types;

pub use commission::CommissionSplit;
pub use types::{EarningSnapshot, EarningStatus};
