//! Session request repository port.

use crate::domain::billing::SessionRequest;
use crate::domain::foundation::{DomainError, SessionRequestId};
use async_trait::async_trait;

/// Repository port for checkout/portal session requests.
#[async_trait]
pub trait SessionRequestRepository: Send + Sync {
    /// Save a new request.
    async fn save(&self, request: &SessionRequest) -> Result<(), DomainError>;

    /// Update an existing request in place.
    ///
    /// # Errors
    ///
    /// - `SessionRequestNotFound` if the request doesn't exist
    /// - `DatabaseError` on persistence failure
    async fn update(&self, request: &SessionRequest) -> Result<(), DomainError>;

    /// Find a request by ID.
    async fn find_by_id(&self, id: &SessionRequestId)
        -> Result<Option<SessionRequest>, DomainError>;
}
