//! CreateSessionRequestHandler - Command handler that records and processes a
//! checkout or portal request.

use std::sync::Arc;

use crate::domain::billing::{BillingError, SessionRequest, SessionRequestKind};
use crate::domain::foundation::AccountId;
use crate::ports::SessionRequestRepository;

use super::process_session_request::{ProcessSessionRequestCommand, ProcessSessionRequestHandler};

#[derive(Debug, Clone)]
pub struct CreateSessionRequestCommand {
    pub account_id: AccountId,
    pub email: Option<String>,
    pub display_name: Option<String>,
    /// `checkout` or `portal`.
    pub kind: Option<String>,
    pub price_id: Option<String>,
}

pub type CreateSessionRequestResult = SessionRequest;

pub struct CreateSessionRequestHandler {
    requests: Arc<dyn SessionRequestRepository>,
    processor: Arc<ProcessSessionRequestHandler>,
}

impl CreateSessionRequestHandler {
    pub fn new(
        requests: Arc<dyn SessionRequestRepository>,
        processor: Arc<ProcessSessionRequestHandler>,
    ) -> Self {
        Self {
            requests,
            processor,
        }
    }

    pub async fn handle(
        &self,
        cmd: CreateSessionRequestCommand,
    ) -> Result<CreateSessionRequestResult, BillingError> {
        let kind = cmd
            .kind
            .as_deref()
            .and_then(SessionRequestKind::parse)
            .ok_or_else(|| BillingError::validation("kind", "Kind must be 'checkout' or 'portal'"))?;

        let request = match kind {
            SessionRequestKind::Checkout => {
                let price_id = cmd
                    .price_id
                    .as_deref()
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .ok_or_else(|| BillingError::validation("priceId", "Price ID is required"))?;
                SessionRequest::checkout(cmd.account_id, price_id)
            }
            SessionRequestKind::Portal => SessionRequest::portal(cmd.account_id),
        };

        self.requests.save(&request).await?;

        tracing::debug!(
            request_id = %request.id,
            account_id = %request.account_id,
            kind = kind.as_str(),
            "Session request recorded"
        );

        self.processor
            .handle(ProcessSessionRequestCommand {
                request_id: request.id,
                email: cmd.email,
                display_name: cmd.display_name,
            })
            .await
    }
}
