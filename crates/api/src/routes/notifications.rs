//! In-app notification routes and the live event stream.

use std::convert::Infallible;

use axum::{
    Json, Router,
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, post},
};
use edumart_db::entities::notifications;
use edumart_shared::notify::{NotificationEvent, Priority};
use edumart_shared::types::{NotificationId, PageRequest, PageResponse, UserId};
use edumart_shared::AppError;
use futures::Stream;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::warn;
use uuid::Uuid;

use crate::AppState;
use crate::extract::Params;
use crate::middleware::AuthUser;
use crate::response::{ApiResponse, ApiResult, RequestContext};

/// Creates the notification routes (auth applied by the caller).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/notifications", get(list_notifications))
        .route("/notifications/stream", get(stream))
        .route("/notifications/{id}/read", post(mark_read))
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// `?page=&perPage=&unreadOnly=`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationQuery {
    /// Page number.
    pub page: Option<u32>,
    /// Page size.
    pub per_page: Option<u32>,
    /// Only unread notifications.
    #[serde(default)]
    pub unread_only: bool,
}

/// A stored notification.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationView {
    /// Notification id.
    pub id: Uuid,
    /// Machine-readable type.
    #[serde(rename = "type")]
    pub kind: String,
    /// Short title.
    pub title: String,
    /// Body text.
    pub message: String,
    /// `low`, `normal` or `high`.
    pub priority: &'static str,
    /// Structured payload.
    pub data: Value,
    /// Link the client opens on click.
    pub action_url: Option<String>,
    /// Whether the user has read it.
    pub is_read: bool,
    /// When it was created.
    pub created_at: chrono::DateTime<chrono::FixedOffset>,
}

impl From<&notifications::Model> for NotificationView {
    fn from(m: &notifications::Model) -> Self {
        Self {
            id: m.id,
            kind: m.kind.clone(),
            title: m.title.clone(),
            message: m.message.clone(),
            priority: Priority::from(m.priority.clone()).as_str(),
            data: m.data.clone(),
            action_url: m.action_url.clone(),
            is_read: m.is_read,
            created_at: m.created_at,
        }
    }
}

/// Result of marking a notification read.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkedRead {
    /// The notification.
    pub id: Uuid,
    /// Always true.
    pub is_read: bool,
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Turns a broadcast receiver into the SSE events addressed to `user`.
///
/// Lagging subscribers skip what they missed; the stream ends when the
/// channel closes.
fn user_events(
    receiver: broadcast::Receiver<NotificationEvent>,
    user: UserId,
) -> impl Stream<Item = Result<Event, Infallible>> {
    futures::stream::unfold(receiver, move |mut receiver| async move {
        loop {
            match receiver.recv().await {
                Ok(event) if event.notification.user_id == user => {
                    let sse = Event::default()
                        .event(event.notification.kind.clone())
                        .id(event.id.to_string());
                    let sse = match sse.json_data(&event) {
                        Ok(sse) => sse,
                        Err(err) => {
                            warn!(error = %err, notification_id = %event.id, "notification not serializable");
                            continue;
                        }
                    };
                    return Some((Ok(sse), receiver));
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    warn!(user_id = %user, skipped, "notification stream lagged");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    })
}

// ============================================================================
// Handlers
// ============================================================================

async fn list_notifications(
    State(state): State<AppState>,
    ctx: RequestContext,
    AuthUser(claims): AuthUser,
    Params(query): Params<NotificationQuery>,
) -> ApiResult<Json<ApiResponse<PageResponse<NotificationView>>>> {
    let defaults = PageRequest::default();
    let page = PageRequest {
        page: query.page.unwrap_or(defaults.page),
        per_page: query.per_page.unwrap_or(defaults.per_page),
    };
    let result = state
        .notifications
        .list_for_user(claims.user_id(), &page, query.unread_only)
        .await
        .map_err(AppError::from)?;
    Ok(ctx.ok(
        "Notifications retrieved",
        result.map(|m| NotificationView::from(&m)),
    ))
}

async fn mark_read(
    State(state): State<AppState>,
    ctx: RequestContext,
    AuthUser(claims): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<MarkedRead>>> {
    let updated = state
        .notifications
        .mark_read(claims.user_id(), NotificationId::from_uuid(id))
        .await
        .map_err(AppError::from)?;
    if !updated {
        return Err(AppError::NotFound(format!("Notification {id} not found")).into());
    }
    Ok(ctx.ok("Notification marked as read", MarkedRead { id, is_read: true }))
}

async fn stream(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let user = claims.user_id();
    tracing::debug!(user_id = %user, "notification stream opened");
    Sse::new(user_events(state.notifications.subscribe(), user)).keep_alive(KeepAlive::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use edumart_shared::notify::NewNotification;
    use futures::StreamExt;

    fn event_for(user: UserId, kind: &str) -> NotificationEvent {
        NotificationEvent {
            id: NotificationId::new(),
            notification: NewNotification {
                user_id: user,
                kind: kind.to_string(),
                title: "Payout processed".to_string(),
                message: "Your payout was sent".to_string(),
                priority: Priority::Normal,
                data: Value::Null,
                action_url: None,
            },
        }
    }

    #[tokio::test]
    async fn test_stream_only_yields_own_events() {
        let (sender, receiver) = broadcast::channel(8);
        let me = UserId::new();
        let other = UserId::new();

        sender.send(event_for(other, "new_sale")).unwrap();
        sender.send(event_for(me, "payout_processed")).unwrap();
        drop(sender);

        let events: Vec<_> = user_events(receiver, me).collect().await;
        assert_eq!(events.len(), 1);
    }

    #[tokio::test]
    async fn test_stream_survives_lag() {
        let (sender, receiver) = broadcast::channel(1);
        let me = UserId::new();

        sender.send(event_for(me, "payout_requested")).unwrap();
        sender.send(event_for(me, "payout_processed")).unwrap();
        drop(sender);

        let events: Vec<_> = user_events(receiver, me).collect().await;
        assert_eq!(events.len(), 1);
    }

    #[tokio::test]
    async fn test_stream_ends_when_channel_closes() {
        let (sender, receiver) = broadcast::channel::<NotificationEvent>(4);
        drop(sender);
        let events: Vec<_> = user_events(receiver, UserId::new()).collect().await;
        assert!(events.is_empty());
    }
}
