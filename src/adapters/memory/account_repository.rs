//! In-memory implementation of AccountRepository.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::billing::{Account, PaymentMethodSummary, SubscriptionChange};
use crate::domain::foundation::{AccountId, DomainError, ErrorCode};
use crate::ports::AccountRepository;

/// Account store held in process memory.
///
/// Used by tests and by development runs without a database.
#[derive(Debug, Default)]
pub struct InMemoryAccountRepository {
    accounts: RwLock<HashMap<AccountId, Account>>,
}

impl InMemoryAccountRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the store with the given accounts.
    pub fn with_accounts(accounts: impl IntoIterator<Item = Account>) -> Self {
        let map = accounts
            .into_iter()
            .map(|account| (account.id.clone(), account))
            .collect();
        Self {
            accounts: RwLock::new(map),
        }
    }

    /// Number of stored accounts.
    pub async fn len(&self) -> usize {
        self.accounts.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.accounts.read().await.is_empty()
    }

    async fn modify<F>(&self, id: &AccountId, apply: F) -> Result<(), DomainError>
    where
        F: FnOnce(&mut Account) + Send,
    {
        let mut accounts = self.accounts.write().await;
        let account = accounts.get_mut(id).ok_or_else(|| not_found(id))?;
        apply(account);
        Ok(())
    }
}

fn not_found(id: &AccountId) -> DomainError {
    DomainError::new(ErrorCode::AccountNotFound, format!("Account not found: {}", id))
        .with_detail("account_id", id.as_str())
}

#[async_trait]
impl AccountRepository for InMemoryAccountRepository {
    async fn find_by_id(&self, id: &AccountId) -> Result<Option<Account>, DomainError> {
        Ok(self.accounts.read().await.get(id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, DomainError> {
        let accounts = self.accounts.read().await;
        let mut matches: Vec<&Account> = accounts
            .values()
            .filter(|account| account.email_matches(email))
            .collect();
        // oldest first so repeated lookups agree
        matches.sort_by_key(|account| *account.created_at.as_datetime());
        Ok(matches.first().map(|account| (*account).clone()))
    }

    async fn save(&self, account: &Account) -> Result<(), DomainError> {
        self.accounts
            .write()
            .await
            .insert(account.id.clone(), account.clone());
        Ok(())
    }

    async fn set_stripe_customer_id(
        &self,
        id: &AccountId,
        customer_id: &str,
    ) -> Result<(), DomainError> {
        self.modify(id, |account| account.set_stripe_customer_id(customer_id))
            .await
    }

    async fn apply_subscription_change(
        &self,
        id: &AccountId,
        change: &SubscriptionChange,
    ) -> Result<(), DomainError> {
        self.modify(id, |account| account.apply_subscription_change(change))
            .await
    }

    async fn set_payment_method(
        &self,
        id: &AccountId,
        summary: &PaymentMethodSummary,
    ) -> Result<(), DomainError> {
        self.modify(id, |account| account.set_payment_method(summary.clone()))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::billing::{PlanCatalog, SubscriptionPlan};

    fn catalog() -> PlanCatalog {
        PlanCatalog::new().with_price("price_pro", SubscriptionPlan::Pro)
    }

    fn account(id: &str, email: &str) -> Account {
        Account::new(
            AccountId::new(id).unwrap(),
            Some(email.to_string()),
            &catalog(),
        )
    }

    #[tokio::test]
    async fn save_then_find_by_id() {
        let repo = InMemoryAccountRepository::new();
        let account = account("uid-1", "a@example.com");

        repo.save(&account).await.unwrap();

        assert_eq!(repo.find_by_id(&account.id).await.unwrap(), Some(account));
    }

    #[tokio::test]
    async fn find_by_email_ignores_case() {
        let repo = InMemoryAccountRepository::with_accounts([account("uid-1", "Dana@Example.com")]);

        let found = repo.find_by_email("dana@example.com").await.unwrap();

        assert_eq!(found.map(|a| a.id.to_string()), Some("uid-1".to_string()));
        assert!(repo.find_by_email("other@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn updates_on_missing_account_report_not_found() {
        let repo = InMemoryAccountRepository::new();
        let id = AccountId::new("ghost").unwrap();

        let err = repo.set_stripe_customer_id(&id, "cus_1").await.unwrap_err();

        assert_eq!(err.code, ErrorCode::AccountNotFound);
        assert_eq!(err.details.get("account_id").map(String::as_str), Some("ghost"));
    }

    #[tokio::test]
    async fn subscription_change_is_applied() {
        let account = account("uid-1", "a@example.com");
        let repo = InMemoryAccountRepository::with_accounts([account.clone()]);

        repo.apply_subscription_change(
            &account.id,
            &SubscriptionChange::active(
                SubscriptionPlan::Pro,
                "active",
                Some("price_pro".to_string()),
                "sub_1",
                None,
                Some(4900),
            ),
        )
        .await
        .unwrap();

        let stored = repo.find_by_id(&account.id).await.unwrap().unwrap();
        assert_eq!(stored.subscription, SubscriptionPlan::Pro);
        assert_eq!(stored.max_leads, 100);
    }
}
