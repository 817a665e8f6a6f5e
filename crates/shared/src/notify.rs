//! In-app notification contract.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::AppError;
use crate::types::{NotificationId, UserId};

/// Notification urgency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Informational.
    Low,
    /// Default.
    #[default]
    Normal,
    /// Needs attention (failed payouts).
    High,
}

impl Priority {
    /// Returns the stored string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Normal => "normal",
            Self::High => "high",
        }
    }

    /// Parses the stored string, falling back to `Normal`.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            "low" => Self::Low,
            "high" => Self::High,
            _ => Self::Normal,
        }
    }
}

/// Notification to persist and push.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewNotification {
    /// Recipient.
    pub user_id: UserId,
    /// Machine-readable type, e.g. `payout_processed`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Short title.
    pub title: String,
    /// Body text.
    pub message: String,
    /// Urgency.
    #[serde(default)]
    pub priority: Priority,
    /// Structured payload for the client.
    #[serde(default)]
    pub data: Value,
    /// Link the client opens on click.
    #[serde(default)]
    pub action_url: Option<String>,
}

/// Event pushed to connected clients after a notification is stored.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationEvent {
    /// Stored notification id.
    pub id: NotificationId,
    /// The notification content.
    #[serde(flatten)]
    pub notification: NewNotification,
}

/// Notification sink.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Persists the notification and publishes it to the recipient.
    async fn create_notification(
        &self,
        notification: NewNotification,
    ) -> Result<NotificationId, AppError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_priority_roundtrip() {
        for p in [Priority::Low, Priority::Normal, Priority::High] {
            assert_eq!(Priority::parse(p.as_str()), p);
        }
        assert_eq!(Priority::parse("urgent"), Priority::Normal);
    }

    #[test]
    fn test_event_flattens_notification() {
        let event = NotificationEvent {
            id: NotificationId::new(),
            notification: NewNotification {
                user_id: UserId::new(),
                kind: "payout_processed".to_string(),
                title: "Payout sent".to_string(),
                message: "Your payout has been sent".to_string(),
                priority: Priority::High,
                data: json!({"payoutId": "x"}),
                action_url: None,
            },
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "payout_processed");
        assert_eq!(value["priority"], "high");
        assert!(value.get("id").is_some());
    }
}
