//! Notifications: persisted rows plus an in-process broadcast channel that
//! connected clients subscribe to.

use async_trait::async_trait;
use edumart_shared::notify::{NewNotification, NotificationEvent, Notifier};
use edumart_shared::types::{NotificationId, PageRequest, PageResponse, UserId};
use edumart_shared::AppError;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use tokio::sync::broadcast;

use super::error::RepositoryError;
use crate::entities::notifications;

/// Buffered events per subscriber before the slowest one starts lagging.
pub const CHANNEL_CAPACITY: usize = 256;

/// Notification repository and `Notifier` implementation.
#[derive(Debug, Clone)]
pub struct NotificationRepository {
    db: DatabaseConnection,
    events: broadcast::Sender<NotificationEvent>,
}

impl NotificationRepository {
    /// Creates a new notification repository with its own channel.
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        let (events, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { db, events }
    }

    /// Subscribes to newly stored notifications.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<NotificationEvent> {
        self.events.subscribe()
    }

    /// Stores a notification and publishes it.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails. Having no subscribers is not an error.
    pub async fn create(
        &self,
        notification: NewNotification,
    ) -> Result<NotificationId, RepositoryError> {
        let id = NotificationId::new();
        notifications::ActiveModel {
            id: Set(id.into_inner()),
            user_id: Set(notification.user_id.into_inner()),
            kind: Set(notification.kind.clone()),
            title: Set(notification.title.clone()),
            message: Set(notification.message.clone()),
            priority: Set(notification.priority.into()),
            data: Set(notification.data.clone()),
            action_url: Set(notification.action_url.clone()),
            is_read: Set(false),
            created_at: Set(chrono::Utc::now().into()),
        }
        .insert(&self.db)
        .await?;

        let receivers = self
            .events
            .send(NotificationEvent { id, notification })
            .unwrap_or(0);
        tracing::debug!(notification_id = %id, receivers, "notification published");
        Ok(id)
    }

    /// Lists a user's notifications, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn list_for_user(
        &self,
        user: UserId,
        page: &PageRequest,
        unread_only: bool,
    ) -> Result<PageResponse<notifications::Model>, RepositoryError> {
        let page = page.normalized();
        let mut query =
            notifications::Entity::find().filter(notifications::Column::UserId.eq(user.into_inner()));
        if unread_only {
            query = query.filter(notifications::Column::IsRead.eq(false));
        }
        let total = query.clone().count(&self.db).await?;
        let rows = query
            .order_by_desc(notifications::Column::CreatedAt)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await?;
        Ok(PageResponse::new(rows, page.page, page.per_page, total))
    }

    /// Marks one of the user's notifications read. Returns false if none matched.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails.
    pub async fn mark_read(&self, user: UserId, id: NotificationId) -> Result<bool, RepositoryError> {
        let result = notifications::Entity::update_many()
            .set(notifications::ActiveModel {
                is_read: Set(true),
                ..Default::default()
            })
            .filter(notifications::Column::Id.eq(id.into_inner()))
            .filter(notifications::Column::UserId.eq(user.into_inner()))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }
}

#[async_trait]
impl Notifier for NotificationRepository {
    async fn create_notification(
        &self,
        notification: NewNotification,
    ) -> Result<NotificationId, AppError> {
        Ok(self.create(notification).await?)
    }
}
