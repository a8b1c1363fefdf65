//! DetachPaymentMethodHandler - Command handler for removing a saved card.

use std::sync::Arc;

use crate::domain::billing::BillingError;
use crate::domain::foundation::AccountId;
use crate::ports::{AccountRepository, PaymentProvider};

const PAYMENT_METHOD_PREFIX: &str = "pm_";

#[derive(Debug, Clone)]
pub struct DetachPaymentMethodCommand {
    pub account_id: AccountId,
    pub payment_method_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetachPaymentMethodResult {
    pub payment_method_id: String,
}

/// Detaches one of the caller's payment methods at the provider.
///
/// The method must be saved on the caller's own customer. Anything else is
/// reported as not found, so callers learn nothing about other customers' cards.
///
/// Local state is untouched; the cached summary on the account only changes
/// when the provider reports it through a webhook.
pub struct DetachPaymentMethodHandler {
    accounts: Arc<dyn AccountRepository>,
    payment_provider: Arc<dyn PaymentProvider>,
}

impl DetachPaymentMethodHandler {
    pub fn new(
        accounts: Arc<dyn AccountRepository>,
        payment_provider: Arc<dyn PaymentProvider>,
    ) -> Self {
        Self {
            accounts,
            payment_provider,
        }
    }

    pub async fn handle(
        &self,
        cmd: DetachPaymentMethodCommand,
    ) -> Result<DetachPaymentMethodResult, BillingError> {
        let payment_method_id = cmd
            .payment_method_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                BillingError::validation("paymentMethodId", "Payment method ID is required")
            })?;

        if !is_payment_method_id(payment_method_id) {
            return Err(BillingError::validation(
                "paymentMethodId",
                "Payment method ID is malformed",
            ));
        }

        let account = self
            .accounts
            .find_by_id(&cmd.account_id)
            .await?
            .ok_or_else(|| BillingError::account_not_found(cmd.account_id.clone()))?;

        let Some(customer_id) = account.stripe_customer_id.as_deref() else {
            return Err(BillingError::payment_method_not_found(payment_method_id));
        };

        let owned = self
            .payment_provider
            .list_payment_methods(customer_id)
            .await?
            .iter()
            .any(|method| method.id == payment_method_id);

        if !owned {
            tracing::warn!(
                account_id = %cmd.account_id,
                customer_id = %customer_id,
                payment_method_id = %payment_method_id,
                "Detach requested for a payment method the caller does not own"
            );
            return Err(BillingError::payment_method_not_found(payment_method_id));
        }

        let detached = self
            .payment_provider
            .detach_payment_method(payment_method_id)
            .await?;

        tracing::info!(
            account_id = %cmd.account_id,
            payment_method_id = %detached.id,
            "Payment method detached"
        );

        Ok(DetachPaymentMethodResult {
            payment_method_id: detached.id,
        })
    }
}

/// Provider payment method IDs are `pm_` followed by ASCII letters, digits
/// and underscores.
fn is_payment_method_id(id: &str) -> bool {
    id.strip_prefix(PAYMENT_METHOD_PREFIX).is_some_and(|rest| {
        !rest.is_empty() && rest.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
    })
}
