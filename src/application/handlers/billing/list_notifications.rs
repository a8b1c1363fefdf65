//! ListNotificationsHandler - Query handler for the caller's newest notifications.

use std::sync::Arc;

use crate::domain::billing::{BillingError, Notification};
use crate::domain::foundation::AccountId;
use crate::ports::NotificationRepository;

pub const DEFAULT_NOTIFICATION_LIMIT: u32 = 20;
pub const MAX_NOTIFICATION_LIMIT: u32 = 100;

#[derive(Debug, Clone)]
pub struct ListNotificationsQuery {
    pub account_id: AccountId,
    pub limit: Option<u32>,
}

pub type ListNotificationsResult = Vec<Notification>;

pub struct ListNotificationsHandler {
    notifications: Arc<dyn NotificationRepository>,
}

impl ListNotificationsHandler {
    pub fn new(notifications: Arc<dyn NotificationRepository>) -> Self {
        Self { notifications }
    }

    pub async fn handle(
        &self,
        query: ListNotificationsQuery,
    ) -> Result<ListNotificationsResult, BillingError> {
        let limit = effective_limit(query.limit);
        Ok(self
            .notifications
            .list_for_account(&query.account_id, limit)
            .await?)
    }
}

/// Zero or absent means the default; larger values are capped.
fn effective_limit(requested: Option<u32>) -> u32 {
    match requested {
        None | Some(0) => DEFAULT_NOTIFICATION_LIMIT,
        Some(n) => n.min(MAX_NOTIFICATION_LIMIT),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryNotificationRepository;

    #[test]
    fn limit_defaults_and_caps() {
        assert_eq!(effective_limit(None), 20);
        assert_eq!(effective_limit(Some(0)), 20);
        assert_eq!(effective_limit(Some(5)), 5);
        assert_eq!(effective_limit(Some(1_000)), 100);
    }

    #[tokio::test]
    async fn returns_newest_notifications() {
        let repo = Arc::new(InMemoryNotificationRepository::new());
        let id = AccountId::new("uid-1").unwrap();
        for amount in [100, 200, 300] {
            repo.append(&Notification::payment_succeeded(id.clone(), amount, "usd"))
                .await
                .unwrap();
        }
        let handler = ListNotificationsHandler::new(repo);

        let listed = handler
            .handle(ListNotificationsQuery {
                account_id: id,
                limit: Some(2),
            })
            .await
            .unwrap();

        assert_eq!(listed.len(), 2);
        assert!(listed[0].message.contains("$3.00"));
    }
}
