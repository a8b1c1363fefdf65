//! Resolves the partner account a billing event belongs to.
//!
//! Precedence:
//! 1. The account ID the service embedded in the provider object's metadata
//! 2. The customer's email, from the event itself or fetched from the provider
//!
//! An embedded ID that matches no account falls through to the email step.

use std::sync::Arc;

use crate::domain::billing::{Account, BillingError};
use crate::domain::foundation::AccountId;
use crate::ports::{AccountRepository, PaymentProvider};

/// What a webhook event tells us about its owner.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountHint {
    pub account_id: Option<String>,
    pub customer_id: Option<String>,
    pub email: Option<String>,
}

impl AccountHint {
    fn describe(&self) -> String {
        let mut parts = Vec::new();
        if let Some(id) = &self.account_id {
            parts.push(format!("account_id={}", id));
        }
        if let Some(customer) = &self.customer_id {
            parts.push(format!("customer={}", customer));
        }
        if let Some(email) = &self.email {
            parts.push(format!("email={}", email));
        }
        if parts.is_empty() {
            "an event with no account details".to_string()
        } else {
            parts.join(", ")
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

pub struct AccountResolver {
    accounts: Arc<dyn AccountRepository>,
    payment_provider: Arc<dyn PaymentProvider>,
}

impl AccountResolver {
    pub fn new(
        accounts: Arc<dyn AccountRepository>,
        payment_provider: Arc<dyn PaymentProvider>,
    ) -> Self {
        Self {
            accounts,
            payment_provider,
        }
    }

    /// # Errors
    ///
    /// - `AccountNotResolved` when neither step finds an account
    /// - `PaymentProvider` when the customer lookup fails
    /// - `Infrastructure` on repository failure
    pub async fn resolve(&self, hint: &AccountHint) -> Result<Account, BillingError> {
        if let Some(account) = self.by_embedded_id(hint).await? {
            return Ok(account);
        }

        if let Some(email) = self.customer_email(hint).await? {
            if let Some(account) = self.accounts.find_by_email(&email).await? {
                tracing::debug!(account_id = %account.id, "Account resolved by email");
                return Ok(account);
            }
        }

        tracing::warn!(hint = %hint.describe(), "No account matches billing event");
        Err(BillingError::account_not_resolved(hint.describe()))
    }

    async fn by_embedded_id(&self, hint: &AccountHint) -> Result<Option<Account>, BillingError> {
        let Some(raw) = non_blank(hint.account_id.as_deref()) else {
            return Ok(None);
        };
        let Ok(id) = AccountId::new(raw) else {
            return Ok(None);
        };

        let account = self.accounts.find_by_id(&id).await?;
        if account.is_none() {
            tracing::warn!(account_id = %id, "Embedded account ID not found, trying email");
        }
        Ok(account)
    }

    async fn customer_email(&self, hint: &AccountHint) -> Result<Option<String>, BillingError> {
        if let Some(email) = non_blank(hint.email.as_deref()) {
            return Ok(Some(email.to_string()));
        }

        let Some(customer_id) = non_blank(hint.customer_id.as_deref()) else {
            return Ok(None);
        };

        let customer = self.payment_provider.get_customer(customer_id).await?;
        Ok(customer
            .and_then(|c| c.email)
            .filter(|e| !e.trim().is_empty()))
    }
}
