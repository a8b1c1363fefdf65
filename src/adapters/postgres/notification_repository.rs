//! PostgreSQL implementation of NotificationRepository.

use crate::domain::billing::{Notification, NotificationKind};
use crate::domain::foundation::{AccountId, DomainError, ErrorCode, NotificationId, Timestamp};
use crate::ports::NotificationRepository;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

pub struct PostgresNotificationRepository {
    pool: PgPool,
}

impl PostgresNotificationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct NotificationRow {
    id: Uuid,
    account_id: String,
    title: String,
    message: String,
    kind: String,
    read: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<NotificationRow> for Notification {
    type Error = DomainError;

    fn try_from(row: NotificationRow) -> Result<Self, Self::Error> {
        let kind = NotificationKind::parse(&row.kind).ok_or_else(|| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Invalid notification type: {}", row.kind),
            )
        })?;

        Ok(Notification {
            id: NotificationId::from_uuid(row.id),
            account_id: AccountId::new(row.account_id)
                .map_err(|e| DomainError::database(format!("Invalid account id: {}", e)))?,
            title: row.title,
            message: row.message,
            kind,
            read: row.read,
            created_at: Timestamp::from_datetime(row.created_at),
        })
    }
}

#[async_trait]
impl NotificationRepository for PostgresNotificationRepository {
    async fn append(&self, notification: &Notification) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO notifications (id, account_id, title, message, kind, read, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(notification.id.as_uuid())
        .bind(notification.account_id.as_str())
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(notification.kind.as_str())
        .bind(notification.read)
        .bind(notification.created_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to append notification: {}", e)))?;

        Ok(())
    }

    async fn list_for_account(
        &self,
        account_id: &AccountId,
        limit: u32,
    ) -> Result<Vec<Notification>, DomainError> {
        let rows: Vec<NotificationRow> = sqlx::query_as(
            r#"
            SELECT id, account_id, title, message, kind, read, created_at
            FROM notifications
            WHERE account_id = $1
            ORDER BY created_at DESC, seq DESC
            LIMIT $2
            "#,
        )
        .bind(account_id.as_str())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to list notifications: {}", e)))?;

        rows.into_iter().map(Notification::try_from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(kind: &str) -> NotificationRow {
        NotificationRow {
            id: Uuid::new_v4(),
            account_id: "uid-1".to_string(),
            title: "Payment received".to_string(),
            message: "We received your payment of $49.00. Thank you!".to_string(),
            kind: kind.to_string(),
            read: false,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn row_converts_to_notification() {
        let n = Notification::try_from(row("payment_succeeded")).unwrap();
        assert_eq!(n.kind, NotificationKind::PaymentSucceeded);
        assert!(!n.read);
    }

    #[test]
    fn unknown_kind_is_rejected() {
        assert!(Notification::try_from(row("marketing")).is_err());
    }
}
