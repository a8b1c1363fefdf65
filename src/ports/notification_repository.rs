//! Notification repository port.
//!
//! Notifications are append-only from the billing side.

use crate::domain::billing::Notification;
use crate::domain::foundation::{AccountId, DomainError};
use async_trait::async_trait;

#[async_trait]
pub trait NotificationRepository: Send + Sync {
    /// Append a notification record.
    async fn append(&self, notification: &Notification) -> Result<(), DomainError>;

    /// List an account's notifications, newest first, at most `limit` entries.
    async fn list_for_account(
        &self,
        account_id: &AccountId,
        limit: u32,
    ) -> Result<Vec<Notification>, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notification_repository_is_object_safe() {
        fn _accepts_dyn(_repo: &dyn NotificationRepository) {}
    }
}
