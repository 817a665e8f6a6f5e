//! Cache key families, TTLs and the invalidation rules for each write.
//!
//! # Modules
//!
//! - `keys` - Key builders and TTL constants
//! - `invalidation` - Keys and patterns each mutating operation clears

pub mod invalidation;
pub mod keys;

pub use invalidation::CacheInvalidation;
pub use keys::*;
