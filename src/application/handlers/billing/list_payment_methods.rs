//! ListPaymentMethodsHandler - Query handler for the caller's saved cards.

use std::sync::Arc;

use crate::domain::billing::BillingError;
use crate::domain::foundation::AccountId;
use crate::ports::{AccountRepository, PaymentMethod, PaymentProvider};

#[derive(Debug, Clone)]
pub struct ListPaymentMethodsQuery {
    pub account_id: AccountId,
}

pub type ListPaymentMethodsResult = Vec<PaymentMethod>;

/// Lists payment methods stored with the provider.
///
/// An account that never went through checkout has no customer and simply
/// has no methods.
pub struct ListPaymentMethodsHandler {
    accounts: Arc<dyn AccountRepository>,
    payment_provider: Arc<dyn PaymentProvider>,
}

impl ListPaymentMethodsHandler {
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
        query: ListPaymentMethodsQuery,
    ) -> Result<ListPaymentMethodsResult, BillingError> {
        let account = self
            .accounts
            .find_by_id(&query.account_id)
            .await?
            .ok_or_else(|| BillingError::account_not_found(query.account_id.clone()))?;

        match account.stripe_customer_id.as_deref() {
            Some(customer_id) => Ok(self.payment_provider.list_payment_methods(customer_id).await?),
            None => Ok(Vec::new()),
        }
    }
}
