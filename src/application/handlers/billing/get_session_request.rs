//! GetSessionRequestHandler - Query handler for one of the caller's session requests.

use std::sync::Arc;

use crate::domain::billing::{BillingError, SessionRequest};
use crate::domain::foundation::{AccountId, SessionRequestId};
use crate::ports::SessionRequestRepository;

#[derive(Debug, Clone)]
pub struct GetSessionRequestQuery {
    pub account_id: AccountId,
    pub request_id: SessionRequestId,
}

pub type GetSessionRequestResult = SessionRequest;

/// Returns a request only to the account that created it. Requests owned by
/// other accounts are reported as not found.
pub struct GetSessionRequestHandler {
    requests: Arc<dyn SessionRequestRepository>,
}

impl GetSessionRequestHandler {
    pub fn new(requests: Arc<dyn SessionRequestRepository>) -> Self {
        Self { requests }
    }

    pub async fn handle(
        &self,
        query: GetSessionRequestQuery,
    ) -> Result<GetSessionRequestResult, BillingError> {
        self.requests
            .find_by_id(&query.request_id)
            .await?
            .filter(|request| request.account_id == query.account_id)
            .ok_or(BillingError::SessionRequestNotFound(query.request_id))
    }
}
