//! CreatePortalSessionHandler - Command handler for opening the billing portal.

use std::sync::Arc;

use crate::domain::billing::BillingError;
use crate::domain::foundation::AccountId;
use crate::ports::{AccountRepository, PaymentProvider};

use super::redirects::RedirectUrls;

#[derive(Debug, Clone)]
pub struct CreatePortalSessionCommand {
    pub account_id: AccountId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatePortalSessionResult {
    pub session_id: String,
    pub url: String,
}

/// Handler for opening the hosted billing portal.
///
/// The portal is only available once checkout has created a customer.
pub struct CreatePortalSessionHandler {
    accounts: Arc<dyn AccountRepository>,
    payment_provider: Arc<dyn PaymentProvider>,
    redirects: RedirectUrls,
}

impl CreatePortalSessionHandler {
    pub fn new(
        accounts: Arc<dyn AccountRepository>,
        payment_provider: Arc<dyn PaymentProvider>,
        redirects: RedirectUrls,
    ) -> Self {
        Self {
            accounts,
            payment_provider,
            redirects,
        }
    }

    pub async fn handle(
        &self,
        cmd: CreatePortalSessionCommand,
    ) -> Result<CreatePortalSessionResult, BillingError> {
        let account = self
            .accounts
            .find_by_id(&cmd.account_id)
            .await?
            .ok_or_else(|| BillingError::account_not_found(cmd.account_id.clone()))?;

        let customer_id = account.stripe_customer_id.as_deref().ok_or_else(|| {
            BillingError::failed_precondition("No billing account found. Subscribe to a plan first.")
        })?;

        let session = self
            .payment_provider
            .create_portal_session(customer_id, &self.redirects.portal_return())
            .await?;

        tracing::info!(account_id = %account.id, customer_id, "Portal session created");

        Ok(CreatePortalSessionResult {
            session_id: session.id,
            url: session.url,
        })
    }
}
