use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;
use validator::Validate;

use crate::error::{Error, Result};
use crate::models::notification::{NewNotification, Notification};
use crate::store::Store;
use crate::utils::time::MonotonicClock;

/// Outcome of fanning a batch of notifications out to their recipients.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CascadeReport {
    pub attempted: usize,
    pub delivered: Vec<Uuid>,
    pub failures: Vec<DeliveryFailure>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeliveryFailure {
    pub user_id: String,
    pub reason: String,
}

impl CascadeReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn warnings(&self) -> Vec<String> {
        self.failures
            .iter()
            .map(|f| format!("notification for {} was not delivered: {}", f.user_id, f.reason))
            .collect()
    }

    /// Turns a report with failures into `PartialCascadeFailure`.
    pub fn into_result(self) -> Result<Vec<Uuid>> {
        if self.failures.is_empty() {
            Ok(self.delivered)
        } else {
            Err(Error::PartialCascadeFailure {
                failed: self.failures.len(),
                attempted: self.attempted,
            })
        }
    }
}

#[derive(Clone)]
pub struct NotificationService {
    store: Arc<dyn Store>,
    clock: Arc<MonotonicClock>,
}

impl NotificationService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            clock: Arc::new(MonotonicClock::new()),
        }
    }

    /// Stores a new unread notification. `created_at` comes from this
    /// dispatcher's clock so feed order matches creation order.
    pub async fn create(&self, command: NewNotification) -> Result<Notification> {
        command.validate()?;

        let notification = Notification {
            id: Uuid::new_v4(),
            user_id: command.user_id,
            title: command.title,
            message: command.message,
            notification_type: command.notification_type,
            read: false,
            link: command.link,
            created_at: self.clock.now(),
            expires_at: command.expires_at,
        };
        self.store.insert_notification(&notification).await?;
        Ok(notification)
    }

    /// Dispatches every command even when some of them fail.
    pub async fn fan_out(&self, commands: Vec<NewNotification>) -> CascadeReport {
        let mut report = CascadeReport {
            attempted: commands.len(),
            ..CascadeReport::default()
        };

        for command in commands {
            let user_id = command.user_id.clone();
            match self.create(command).await {
                Ok(notification) => report.delivered.push(notification.id),
                Err(e) => {
                    tracing::warn!(user_id = %user_id, error = %e, "Notification insert failed");
                    report.failures.push(DeliveryFailure {
                        user_id,
                        reason: e.to_string(),
                    });
                }
            }
        }

        report
    }

    pub async fn list(&self, user_id: &str) -> Result<Vec<Notification>> {
        self.store.list_notifications(user_id).await
    }

    pub async fn unread_count(&self, user_id: &str) -> Result<i64> {
        self.store.count_unread_notifications(user_id).await
    }

    pub async fn mark_as_read(&self, id: Uuid, caller_id: &str) -> Result<()> {
        self.owned_by(id, caller_id).await?;
        self.store.mark_notification_read(id).await?;
        Ok(())
    }

    pub async fn mark_all_as_read(&self, user_id: &str) -> Result<u64> {
        self.store.mark_all_notifications_read(user_id).await
    }

    pub async fn delete(&self, id: Uuid, caller_id: &str) -> Result<()> {
        self.owned_by(id, caller_id).await?;
        self.store.delete_notification(id).await?;
        Ok(())
    }

    pub async fn delete_all(&self, user_id: &str) -> Result<u64> {
        self.store.delete_notifications_for_user(user_id).await
    }

    async fn owned_by(&self, id: Uuid, caller_id: &str) -> Result<Notification> {
        let notification = self
            .store
            .get_notification(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Notification {} not found", id)))?;
        if notification.user_id != caller_id {
            return Err(Error::Unauthorized(
                "Notifications can only be changed by their recipient".to_string(),
            ));
        }
        Ok(notification)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::notification::NotificationType;
    use crate::store::InMemoryStore;

    fn command(user_id: &str, title: &str) -> NewNotification {
        NewNotification::new(user_id, NotificationType::System, title, "body")
    }

    #[tokio::test]
    async fn feed_is_newest_first_and_counts_unread() {
        let service = NotificationService::new(Arc::new(InMemoryStore::new()));
        let first = service.create(command("alice", "first")).await.unwrap();
        let second = service.create(command("alice", "second")).await.unwrap();
        service.create(command("bob", "other")).await.unwrap();

        assert!(!first.read);
        assert!(second.created_at > first.created_at);

        let feed = service.list("alice").await.unwrap();
        let titles: Vec<&str> = feed.iter().map(|n| n.title.as_str()).collect();
        assert_eq!(titles, vec!["second", "first"]);
        assert_eq!(service.unread_count("alice").await.unwrap(), 2);

        service.mark_as_read(first.id, "alice").await.unwrap();
        assert_eq!(service.unread_count("alice").await.unwrap(), 1);
        assert_eq!(service.mark_all_as_read("alice").await.unwrap(), 1);
        assert_eq!(service.unread_count("alice").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn blank_fields_are_rejected() {
        let service = NotificationService::new(Arc::new(InMemoryStore::new()));
        let err = service.create(command("alice", "")).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        let err = service.create(command("", "title")).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn only_recipient_may_delete() {
        let service = NotificationService::new(Arc::new(InMemoryStore::new()));
        let n = service.create(command("alice", "hello")).await.unwrap();

        let err = service.delete(n.id, "mallory").await.unwrap_err();
        assert!(matches!(err, Error::Unauthorized(_)));

        service.delete(n.id, "alice").await.unwrap();
        assert!(service.list("alice").await.unwrap().is_empty());

        let err = service.mark_as_read(n.id, "alice").await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn fan_out_continues_past_failed_inserts() {
        let store = Arc::new(InMemoryStore::new());
        store.reject_notifications_for("bob").await;
        let service = NotificationService::new(store);

        let report = service
            .fan_out(vec![
                command("alice", "a"),
                command("bob", "b"),
                command("carol", "c"),
            ])
            .await;

        assert_eq!(report.attempted, 3);
        assert_eq!(report.delivered.len(), 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].user_id, "bob");
        assert_eq!(service.list("carol").await.unwrap().len(), 1);
        assert!(matches!(
            report.into_result(),
            Err(Error::PartialCascadeFailure {
                failed: 1,
                attempted: 3
            })
        ));
    }
}
