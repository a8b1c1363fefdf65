//! In-memory implementation of SessionRequestRepository.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::billing::SessionRequest;
use crate::domain::foundation::{DomainError, ErrorCode, SessionRequestId};
use crate::ports::SessionRequestRepository;

#[derive(Debug, Default)]
pub struct InMemorySessionRequestRepository {
    requests: RwLock<HashMap<SessionRequestId, SessionRequest>>,
}

impl InMemorySessionRequestRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionRequestRepository for InMemorySessionRequestRepository {
    async fn save(&self, request: &SessionRequest) -> Result<(), DomainError> {
        self.requests
            .write()
            .await
            .insert(request.id, request.clone());
        Ok(())
    }

    async fn update(&self, request: &SessionRequest) -> Result<(), DomainError> {
        let mut requests = self.requests.write().await;
        match requests.get_mut(&request.id) {
            Some(stored) => {
                *stored = request.clone();
                Ok(())
            }
            None => Err(DomainError::new(
                ErrorCode::SessionRequestNotFound,
                format!("Session request not found: {}", request.id),
            )),
        }
    }

    async fn find_by_id(
        &self,
        id: &SessionRequestId,
    ) -> Result<Option<SessionRequest>, DomainError> {
        Ok(self.requests.read().await.get(id).cloned())
    }
}
