//! Notification service

use std::sync::Arc;

use super::backfill::ProfileLookup;
use crate::data::{
    Direction, DocumentStore, EntityId, Notification, Patch, Query, WriteBatch, collections,
    encode, timestamp,
};
use crate::error::AppError;

/// Fields supplied by the sender
#[derive(Debug, Clone, Default)]
pub struct NewNotification {
    pub receiver_id: String,
    pub notification_type: String,
    pub post_id: Option<String>,
    pub message: Option<String>,
}

/// Notification service
pub struct NotificationService {
    store: Arc<dyn DocumentStore>,
    list_limit: usize,
}

impl NotificationService {
    pub fn new(store: Arc<dyn DocumentStore>, list_limit: usize) -> Self {
        Self { store, list_limit }
    }

    /// Store a notification from `sender_id`; returns its id
    pub async fn add(&self, sender_id: &str, new: NewNotification) -> Result<String, AppError> {
        if new.receiver_id.trim().is_empty() || new.notification_type.trim().is_empty() {
            return Err(AppError::validation("receiverId and type are required"));
        }

        let notification = Notification {
            id: EntityId::new().0,
            sender_id: sender_id.to_string(),
            receiver_id: new.receiver_id,
            notification_type: new.notification_type,
            post_id: new.post_id.filter(|id| !id.is_empty()),
            message: new.message.unwrap_or_default(),
            is_read: false,
            created_at: timestamp::now(),
            sender_name: None,
            sender_avatar: None,
        };

        let mut batch = WriteBatch::new();
        batch.create(
            collections::NOTIFICATIONS,
            &notification.id,
            encode(&notification)?,
        );
        self.store.commit(batch).await?;

        Ok(notification.id)
    }

    /// Newest notifications for `receiver_id`, with sender fields filled in
    pub async fn list(&self, receiver_id: &str) -> Result<Vec<Notification>, AppError> {
        let documents = self
            .store
            .query(
                &Query::collection(collections::NOTIFICATIONS)
                    .where_eq("receiverId", receiver_id)
                    .order_by("createdAt", Direction::Descending)
                    .limit(self.list_limit),
            )
            .await?;

        let mut lookup = ProfileLookup::new(self.store.clone());
        let mut notifications = Vec::with_capacity(documents.len());
        for document in documents {
            let mut notification: Notification = document.decode()?;
            let (name, avatar) = lookup
                .backfill(
                    &notification.sender_id,
                    notification.sender_name.as_deref(),
                    notification.sender_avatar.as_deref(),
                )
                .await?;
            notification.sender_name = Some(name);
            notification.sender_avatar = Some(avatar);
            notifications.push(notification);
        }
        Ok(notifications)
    }

    /// Mark as read; only the receiver may do this
    pub async fn mark_read(&self, notification_id: &str, user_id: &str) -> Result<(), AppError> {
        let notification: Notification = self
            .store
            .get(collections::NOTIFICATIONS, notification_id)
            .await?
            .ok_or_else(|| AppError::not_found("notification not found"))?
            .decode()?;
        if notification.receiver_id != user_id {
            return Err(AppError::forbidden(
                "you cannot modify another user's notification",
            ));
        }

        self.store
            .update(
                collections::NOTIFICATIONS,
                notification_id,
                Patch::new().set("isRead", true),
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{MemoryStore, User};

    async fn setup(limit: usize) -> NotificationService {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let alice = User {
            id: "alice".to_string(),
            username: "alice".to_string(),
            avatar: "https://cdn/alice.png".to_string(),
            ..Default::default()
        };
        store
            .set(collections::USERS, "alice", encode(&alice).unwrap())
            .await
            .unwrap();
        NotificationService::new(store, limit)
    }

    fn follow_from_sender(receiver: &str) -> NewNotification {
        NewNotification {
            receiver_id: receiver.to_string(),
            notification_type: "follow".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn list_backfills_sender_and_respects_limit() {
        let service = setup(2).await;
        for _ in 0..3 {
            service.add("alice", follow_from_sender("bob")).await.unwrap();
        }
        service.add("ghost", follow_from_sender("bob")).await.unwrap();
        service.add("alice", follow_from_sender("carol")).await.unwrap();

        let listed = service.list("bob").await.unwrap();
        assert_eq!(listed.len(), 2);
        for notification in &listed {
            assert_eq!(notification.receiver_id, "bob");
            assert!(notification.sender_name.is_some());
            assert!(!notification.is_read);
        }
    }

    #[tokio::test]
    async fn sender_fields_resolve_per_sender() {
        let service = setup(50).await;
        service.add("alice", follow_from_sender("bob")).await.unwrap();

        let listed = service.list("bob").await.unwrap();
        assert_eq!(listed[0].sender_name.as_deref(), Some("alice"));
        assert_eq!(listed[0].sender_avatar.as_deref(), Some("https://cdn/alice.png"));
    }

    #[tokio::test]
    async fn add_requires_receiver_and_type() {
        let service = setup(50).await;
        assert!(matches!(
            service.add("alice", NewNotification::default()).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn only_receiver_marks_read() {
        let service = setup(50).await;
        let id = service.add("alice", follow_from_sender("bob")).await.unwrap();

        assert!(matches!(
            service.mark_read(&id, "alice").await,
            Err(AppError::Forbidden(_))
        ));
        service.mark_read(&id, "bob").await.unwrap();
        assert!(service.list("bob").await.unwrap()[0].is_read);

        assert!(matches!(
            service.mark_read("missing", "bob").await,
            Err(AppError::NotFound(_))
        ));
    }
}
