//! In-memory implementation of NotificationRepository.

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::billing::Notification;
use crate::domain::foundation::{AccountId, DomainError};
use crate::ports::NotificationRepository;

/// Append-only notification log held in process memory.
#[derive(Debug, Default)]
pub struct InMemoryNotificationRepository {
    notifications: RwLock<Vec<Notification>>,
}

impl InMemoryNotificationRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every stored notification in insertion order.
    pub async fn all(&self) -> Vec<Notification> {
        self.notifications.read().await.clone()
    }
}

#[async_trait]
impl NotificationRepository for InMemoryNotificationRepository {
    async fn append(&self, notification: &Notification) -> Result<(), DomainError> {
        self.notifications.write().await.push(notification.clone());
        Ok(())
    }

    async fn list_for_account(
        &self,
        account_id: &AccountId,
        limit: u32,
    ) -> Result<Vec<Notification>, DomainError> {
        let notifications = self.notifications.read().await;
        // reverse insertion order breaks ties between equal timestamps
        let mut matching: Vec<(usize, &Notification)> = notifications
            .iter()
            .enumerate()
            .filter(|(_, n)| &n.account_id == account_id)
            .collect();
        matching.sort_by(|(ia, a), (ib, b)| {
            b.created_at
                .as_datetime()
                .cmp(a.created_at.as_datetime())
                .then(ib.cmp(ia))
        });
        Ok(matching
            .into_iter()
            .take(limit as usize)
            .map(|(_, n)| n.clone())
            .collect())
    }
}
