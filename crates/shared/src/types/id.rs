//! Typed IDs for type-safe entity references.
//!
//! Using typed IDs prevents accidentally passing a `PaymentId` where a `PayoutId` is expected.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Macro to generate typed ID wrappers.
macro_rules! typed_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Creates a new random ID using UUID v7 (time-ordered).
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Creates an ID from an existing UUID.
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the inner UUID.
            #[must_use]
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }
    };
}

typed_id!(UserId, "Unique identifier for a user (student, instructor or admin).");
typed_id!(CourseId, "Unique identifier for a course.");
typed_id!(PaymentId, "Unique identifier for a payment transaction.");
typed_id!(EnrollmentId, "Unique identifier for a course enrollment.");
typed_id!(EarningId, "Unique identifier for an instructor earning.");
typed_id!(PayoutId, "Unique identifier for a payout request.");
typed_id!(NotificationId, "Unique identifier for an in-app notification.");

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_ids_are_unique_and_time_ordered() {
        let first = PayoutId::new();
        let second = PayoutId::new();
        assert_ne!(first, second);
        assert!(first.into_inner() < second.into_inner());
    }

    #[test]
    fn test_display_and_parse_roundtrip() {
        let id = EarningId::new();
        let parsed = EarningId::from_str(&id.to_string()).unwrap();
        assert_eq!(id, parsed);
        assert!(PaymentId::from_str("not-a-uuid").is_err());
    }

    #[test]
    fn test_serde_is_transparent() {
        let id = UserId::new();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{id}\""));
    }
}
