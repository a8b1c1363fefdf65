//! CreateCheckoutSessionHandler - Command handler for starting a subscription checkout.

use std::sync::Arc;

use crate::domain::billing::{Account, BillingError, PlanCatalog};
use crate::domain::foundation::AccountId;
use crate::ports::{AccountRepository, CreateCheckoutRequest, CreateCustomerRequest, PaymentProvider};

use super::redirects::RedirectUrls;

/// Command to create a hosted checkout session for a plan price.
#[derive(Debug, Clone)]
pub struct CreateCheckoutSessionCommand {
    pub account_id: AccountId,
    /// Email from the caller's token, used if the account has none.
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub price_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateCheckoutSessionResult {
    pub session_id: String,
    pub url: String,
}

/// Handler for starting a subscription checkout.
///
/// Creates the provider customer on first use and stores its ID on the
/// account, so later checkouts and portal sessions reuse it.
pub struct CreateCheckoutSessionHandler {
    accounts: Arc<dyn AccountRepository>,
    payment_provider: Arc<dyn PaymentProvider>,
    catalog: Arc<PlanCatalog>,
    redirects: RedirectUrls,
}

impl CreateCheckoutSessionHandler {
    pub fn new(
        accounts: Arc<dyn AccountRepository>,
        payment_provider: Arc<dyn PaymentProvider>,
        catalog: Arc<PlanCatalog>,
        redirects: RedirectUrls,
    ) -> Self {
        Self {
            accounts,
            payment_provider,
            catalog,
            redirects,
        }
    }

    pub async fn handle(
        &self,
        cmd: CreateCheckoutSessionCommand,
    ) -> Result<CreateCheckoutSessionResult, BillingError> {
        // 1. Validate the requested price
        let price_id = cmd
            .price_id
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .ok_or_else(|| BillingError::validation("priceId", "Price ID is required"))?
            .to_string();

        if !self.catalog.is_known_price(&price_id) {
            return Err(BillingError::validation(
                "priceId",
                format!("Unknown price: {}", price_id),
            ));
        }

        // 2. Load the caller's account
        let account = self
            .accounts
            .find_by_id(&cmd.account_id)
            .await?
            .ok_or_else(|| BillingError::account_not_found(cmd.account_id.clone()))?;

        // 3. Read or create the customer reference
        let customer_id = self
            .ensure_customer(&account, cmd.email, cmd.display_name)
            .await?;

        // 4. Create the hosted session
        let session = self
            .payment_provider
            .create_checkout_session(CreateCheckoutRequest {
                account_id: account.id.clone(),
                customer_id: customer_id.clone(),
                price_id: price_id.clone(),
                success_url: self.redirects.checkout_success(),
                cancel_url: self.redirects.checkout_canceled(),
            })
            .await?;

        tracing::info!(
            account_id = %account.id,
            customer_id = %customer_id,
            price_id = %price_id,
            session_id = %session.id,
            "Checkout session created"
        );

        Ok(CreateCheckoutSessionResult {
            session_id: session.id,
            url: session.url,
        })
    }

    async fn ensure_customer(
        &self,
        account: &Account,
        token_email: Option<String>,
        display_name: Option<String>,
    ) -> Result<String, BillingError> {
        if let Some(existing) = &account.stripe_customer_id {
            return Ok(existing.clone());
        }

        let customer = self
            .payment_provider
            .create_customer(CreateCustomerRequest {
                account_id: account.id.clone(),
                email: account.email.clone().or(token_email),
                name: display_name,
                idempotency_key: Some(format!("customer-{}", account.id)),
            })
            .await?;

        self.accounts
            .set_stripe_customer_id(&account.id, &customer.id)
            .await?;

        tracing::info!(
            account_id = %account.id,
            customer_id = %customer.id,
            "Payment customer created"
        );

        Ok(customer.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryAccountRepository;
    use crate::adapters::stripe::MockPaymentProvider;
    use crate::domain::billing::SubscriptionPlan;
    use crate::ports::PaymentError;

    // ════════════════════════════════════════════════════════════════════════════
    // Test Helpers
    // ════════════════════════════════════════════════════════════════════════════

    fn catalog() -> Arc<PlanCatalog> {
        Arc::new(
            PlanCatalog::new()
                .with_price("price_basic", SubscriptionPlan::Basic)
                .with_price("price_pro", SubscriptionPlan::Pro),
        )
    }

    fn account_id() -> AccountId {
        AccountId::new("uid-1").unwrap()
    }

    fn setup(account: Option<Account>) -> (
        CreateCheckoutSessionHandler,
        Arc<InMemoryAccountRepository>,
        MockPaymentProvider,
    ) {
        let repo = Arc::new(InMemoryAccountRepository::with_accounts(account));
        let provider = MockPaymentProvider::new();
        let handler = CreateCheckoutSessionHandler::new(
            repo.clone(),
            Arc::new(provider.clone()),
            catalog(),
            RedirectUrls::new("https://partners.example.com"),
        );
        (handler, repo, provider)
    }

    fn new_account() -> Account {
        Account::new(account_id(), Some("dana@example.com".to_string()), &catalog())
    }

    fn cmd(price_id: Option<&str>) -> CreateCheckoutSessionCommand {
        CreateCheckoutSessionCommand {
            account_id: account_id(),
            email: None,
            display_name: Some("Dana".to_string()),
            price_id: price_id.map(String::from),
        }
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Success Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn creates_customer_once_and_persists_it() {
        let (handler, repo, provider) = setup(Some(new_account()));

        let result = handler.handle(cmd(Some("price_pro"))).await.unwrap();

        assert!(result.url.starts_with("https://checkout.stripe.com/"));
        assert_eq!(provider.call_count("create_customer"), 1);
        let stored = repo.find_by_id(&account_id()).await.unwrap().unwrap();
        let customer_id = stored.stripe_customer_id.unwrap();

        let requests = provider.customer_requests();
        assert_eq!(requests[0].idempotency_key.as_deref(), Some("customer-uid-1"));
        assert_eq!(requests[0].email.as_deref(), Some("dana@example.com"));
        assert_eq!(provider.checkout_requests()[0].customer_id, customer_id);
    }

    #[tokio::test]
    async fn repeated_checkout_reuses_customer() {
        let (handler, repo, provider) = setup(Some(new_account()));

        handler.handle(cmd(Some("price_pro"))).await.unwrap();
        handler.handle(cmd(Some("price_basic"))).await.unwrap();

        assert_eq!(provider.call_count("create_customer"), 1);
        assert_eq!(provider.call_count("create_checkout_session"), 2);
        let stored = repo.find_by_id(&account_id()).await.unwrap().unwrap();
        assert!(stored.has_customer());
    }

    #[tokio::test]
    async fn existing_customer_is_used_without_creation() {
        let mut account = new_account();
        account.set_stripe_customer_id("cus_existing");
        let (handler, _repo, provider) = setup(Some(account));

        handler.handle(cmd(Some("price_pro"))).await.unwrap();

        assert!(!provider.was_called("create_customer"));
        assert_eq!(provider.checkout_requests()[0].customer_id, "cus_existing");
    }

    #[tokio::test]
    async fn passes_billing_redirect_urls() {
        let (handler, _repo, provider) = setup(Some(new_account()));

        handler.handle(cmd(Some("price_pro"))).await.unwrap();

        let request = &provider.checkout_requests()[0];
        assert_eq!(
            request.success_url,
            "https://partners.example.com/billing?checkout=success&session_id={CHECKOUT_SESSION_ID}"
        );
        assert_eq!(
            request.cancel_url,
            "https://partners.example.com/billing?checkout=canceled"
        );
        assert_eq!(request.price_id, "price_pro");
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Error Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn missing_price_is_validation_error() {
        let (handler, _repo, provider) = setup(Some(new_account()));

        for price in [None, Some(""), Some("   ")] {
            let err = handler.handle(cmd(price)).await.unwrap_err();
            assert!(matches!(err, BillingError::ValidationFailed { ref field, .. } if field == "priceId"));
        }
        assert!(provider.calls().is_empty());
    }

    #[tokio::test]
    async fn unknown_price_is_validation_error() {
        let (handler, _repo, _provider) = setup(Some(new_account()));

        let err = handler.handle(cmd(Some("price_gold"))).await.unwrap_err();

        assert!(matches!(err, BillingError::ValidationFailed { .. }));
    }

    #[tokio::test]
    async fn absent_account_is_not_found() {
        let (handler, _repo, provider) = setup(None);

        let err = handler.handle(cmd(Some("price_pro"))).await.unwrap_err();

        assert_eq!(err, BillingError::AccountNotFound(account_id()));
        assert!(!provider.was_called("create_customer"));
    }

    #[tokio::test]
    async fn provider_failure_does_not_store_customer() {
        let (handler, repo, provider) = setup(Some(new_account()));
        provider.set_method_error("create_customer", PaymentError::network("timeout"));

        let err = handler.handle(cmd(Some("price_pro"))).await.unwrap_err();

        assert!(matches!(err, BillingError::PaymentProvider(_)));
        let stored = repo.find_by_id(&account_id()).await.unwrap().unwrap();
        assert!(!stored.has_customer());
    }
}
