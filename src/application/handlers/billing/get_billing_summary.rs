//! GetBillingSummaryHandler - Query handler for the caller's plan and billing state.

use std::sync::Arc;

use crate::domain::billing::{BillingDetails, BillingError, SubscriptionPlan};
use crate::domain::foundation::AccountId;
use crate::ports::AccountRepository;

#[derive(Debug, Clone)]
pub struct GetBillingSummaryQuery {
    pub account_id: AccountId,
}

/// Plan, quota and billing fields of an account.
#[derive(Debug, Clone, PartialEq)]
pub struct GetBillingSummaryResult {
    pub subscription: SubscriptionPlan,
    pub max_leads: u32,
    pub billing: BillingDetails,
    pub has_payment_customer: bool,
}

pub struct GetBillingSummaryHandler {
    accounts: Arc<dyn AccountRepository>,
}

impl GetBillingSummaryHandler {
    pub fn new(accounts: Arc<dyn AccountRepository>) -> Self {
        Self { accounts }
    }

    pub async fn handle(
        &self,
        query: GetBillingSummaryQuery,
    ) -> Result<GetBillingSummaryResult, BillingError> {
        let account = self
            .accounts
            .find_by_id(&query.account_id)
            .await?
            .ok_or_else(|| BillingError::account_not_found(query.account_id.clone()))?;

        Ok(GetBillingSummaryResult {
            subscription: account.subscription,
            max_leads: account.max_leads,
            has_payment_customer: account.has_customer(),
            billing: account.billing,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryAccountRepository;
    use crate::domain::billing::{Account, PlanCatalog};

    #[tokio::test]
    async fn returns_account_billing_state() {
        let id = AccountId::new("uid-1").unwrap();
        let mut account = Account::new(id.clone(), None, &PlanCatalog::new());
        account.set_stripe_customer_id("cus_1");
        let handler = GetBillingSummaryHandler::new(Arc::new(
            InMemoryAccountRepository::with_accounts([account]),
        ));

        let summary = handler
            .handle(GetBillingSummaryQuery { account_id: id })
            .await
            .unwrap();

        assert_eq!(summary.subscription, SubscriptionPlan::Basic);
        assert_eq!(summary.max_leads, 25);
        assert!(summary.has_payment_customer);
    }

    #[tokio::test]
    async fn absent_account_is_not_found() {
        let handler = GetBillingSummaryHandler::new(Arc::new(InMemoryAccountRepository::new()));

        let err = handler
            .handle(GetBillingSummaryQuery {
                account_id: AccountId::new("ghost").unwrap(),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, BillingError::AccountNotFound(_)));
    }
}
