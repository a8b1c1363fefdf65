//! PostgreSQL implementation of SessionRequestRepository.

use crate::domain::billing::{SessionRequest, SessionRequestKind, SessionRequestStatus};
use crate::domain::foundation::{AccountId, DomainError, ErrorCode, SessionRequestId, Timestamp};
use crate::ports::SessionRequestRepository;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

pub struct PostgresSessionRequestRepository {
    pool: PgPool,
}

impl PostgresSessionRequestRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SessionRequestRow {
    id: Uuid,
    account_id: String,
    kind: String,
    price_id: Option<String>,
    status: String,
    session_id: Option<String>,
    url: Option<String>,
    error: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<SessionRequestRow> for SessionRequest {
    type Error = DomainError;

    fn try_from(row: SessionRequestRow) -> Result<Self, Self::Error> {
        let kind = SessionRequestKind::parse(&row.kind).ok_or_else(|| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Invalid session request kind: {}", row.kind),
            )
        })?;
        let status = SessionRequestStatus::parse(&row.status).ok_or_else(|| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Invalid session request status: {}", row.status),
            )
        })?;

        Ok(SessionRequest {
            id: SessionRequestId::from_uuid(row.id),
            account_id: AccountId::new(row.account_id)
                .map_err(|e| DomainError::database(format!("Invalid account id: {}", e)))?,
            kind,
            price_id: row.price_id,
            status,
            session_id: row.session_id,
            url: row.url,
            error: row.error,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

#[async_trait]
impl SessionRequestRepository for PostgresSessionRequestRepository {
    async fn save(&self, request: &SessionRequest) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO session_requests (
                id, account_id, kind, price_id, status, session_id, url, error, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(request.id.as_uuid())
        .bind(request.account_id.as_str())
        .bind(request.kind.as_str())
        .bind(&request.price_id)
        .bind(request.status.as_str())
        .bind(&request.session_id)
        .bind(&request.url)
        .bind(&request.error)
        .bind(request.created_at.as_datetime())
        .bind(request.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to save session request: {}", e)))?;

        Ok(())
    }

    async fn update(&self, request: &SessionRequest) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE session_requests SET
                status = $2,
                session_id = $3,
                url = $4,
                error = $5,
                updated_at = $6
            WHERE id = $1
            "#,
        )
        .bind(request.id.as_uuid())
        .bind(request.status.as_str())
        .bind(&request.session_id)
        .bind(&request.url)
        .bind(&request.error)
        .bind(request.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to update session request: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::SessionRequestNotFound,
                format!("Session request not found: {}", request.id),
            ));
        }

        Ok(())
    }

    async fn find_by_id(
        &self,
        id: &SessionRequestId,
    ) -> Result<Option<SessionRequest>, DomainError> {
        let row: Option<SessionRequestRow> = sqlx::query_as(
            r#"
            SELECT id, account_id, kind, price_id, status, session_id, url, error,
                   created_at, updated_at
            FROM session_requests
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to find session request: {}", e)))?;

        row.map(SessionRequest::try_from).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(status: &str) -> SessionRequestRow {
        let now = Utc::now();
        SessionRequestRow {
            id: Uuid::new_v4(),
            account_id: "uid-1".to_string(),
            kind: "checkout".to_string(),
            price_id: Some("price_pro".to_string()),
            status: status.to_string(),
            session_id: None,
            url: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn row_converts_to_request() {
        let request = SessionRequest::try_from(row("pending")).unwrap();
        assert_eq!(request.kind, SessionRequestKind::Checkout);
        assert!(request.is_pending());
    }

    #[test]
    fn unknown_status_is_rejected() {
        assert!(SessionRequest::try_from(row("queued")).is_err());
    }
}
