//! ProcessSessionRequestHandler - One-shot consumer that fills in a session request.

use std::sync::Arc;

use crate::domain::billing::{BillingError, SessionRequest, SessionRequestKind};
use crate::domain::foundation::SessionRequestId;
use crate::ports::SessionRequestRepository;

use super::create_checkout_session::{CreateCheckoutSessionCommand, CreateCheckoutSessionHandler};
use super::create_portal_session::{CreatePortalSessionCommand, CreatePortalSessionHandler};

#[derive(Debug, Clone)]
pub struct ProcessSessionRequestCommand {
    pub request_id: SessionRequestId,
    /// Caller identity details passed through to customer creation.
    pub email: Option<String>,
    pub display_name: Option<String>,
}

pub type ProcessSessionRequestResult = SessionRequest;

/// Runs the checkout or portal flow for a pending request and records the
/// outcome on it.
///
/// A failed flow is not an error here: the message is stored on the request
/// and the request is returned in the `failed` state.
pub struct ProcessSessionRequestHandler {
    requests: Arc<dyn SessionRequestRepository>,
    checkout: Arc<CreateCheckoutSessionHandler>,
    portal: Arc<CreatePortalSessionHandler>,
}

impl ProcessSessionRequestHandler {
    pub fn new(
        requests: Arc<dyn SessionRequestRepository>,
        checkout: Arc<CreateCheckoutSessionHandler>,
        portal: Arc<CreatePortalSessionHandler>,
    ) -> Self {
        Self {
            requests,
            checkout,
            portal,
        }
    }

    pub async fn handle(
        &self,
        cmd: ProcessSessionRequestCommand,
    ) -> Result<ProcessSessionRequestResult, BillingError> {
        let mut request = self
            .requests
            .find_by_id(&cmd.request_id)
            .await?
            .ok_or(BillingError::SessionRequestNotFound(cmd.request_id))?;

        if !request.is_pending() {
            return Err(BillingError::failed_precondition(format!(
                "Session request {} is already {}",
                request.id,
                request.status.as_str()
            )));
        }

        let outcome = match request.kind {
            SessionRequestKind::Checkout => self
                .checkout
                .handle(CreateCheckoutSessionCommand {
                    account_id: request.account_id.clone(),
                    email: cmd.email,
                    display_name: cmd.display_name,
                    price_id: request.price_id.clone(),
                })
                .await
                .map(|r| (r.session_id, r.url)),
            SessionRequestKind::Portal => self
                .portal
                .handle(CreatePortalSessionCommand {
                    account_id: request.account_id.clone(),
                })
                .await
                .map(|r| (r.session_id, r.url)),
        };

        match outcome {
            Ok((session_id, url)) => request.complete(session_id, url)?,
            Err(err) => {
                tracing::warn!(
                    request_id = %request.id,
                    account_id = %request.account_id,
                    kind = request.kind.as_str(),
                    error = %err,
                    "Session request failed"
                );
                request.fail(err.to_string())?;
            }
        }

        self.requests.update(&request).await?;

        Ok(request)
    }
}
