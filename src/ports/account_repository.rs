//! Account repository port.
//!
//! Defines the contract for reading and updating partner account records.
//!
//! # Design
//!
//! - **Targeted writes**: Each billing concern overwrites only its own fields
//! - **Last write wins**: No versioning; concurrent writers simply overwrite
//! - **No creation from billing**: Billing flows never create accounts; `save`
//!   exists for provisioning and tests

use crate::domain::billing::{Account, PaymentMethodSummary, SubscriptionChange};
use crate::domain::foundation::{AccountId, DomainError};
use async_trait::async_trait;

/// Repository port for partner account records.
#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// Find an account by its ID.
    ///
    /// Returns `None` if not found.
    async fn find_by_id(&self, id: &AccountId) -> Result<Option<Account>, DomainError>;

    /// Find an account by email, ignoring case.
    ///
    /// Returns the first match if several accounts share an address.
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, DomainError>;

    /// Insert or replace a whole account record.
    async fn save(&self, account: &Account) -> Result<(), DomainError>;

    /// Record the external customer reference.
    ///
    /// # Errors
    ///
    /// - `AccountNotFound` if the account doesn't exist
    /// - `DatabaseError` on persistence failure
    async fn set_stripe_customer_id(
        &self,
        id: &AccountId,
        customer_id: &str,
    ) -> Result<(), DomainError>;

    /// Overwrite plan, quota and subscription billing fields.
    ///
    /// Leaves the cached payment method untouched.
    ///
    /// # Errors
    ///
    /// - `AccountNotFound` if the account doesn't exist
    /// - `DatabaseError` on persistence failure
    async fn apply_subscription_change(
        &self,
        id: &AccountId,
        change: &SubscriptionChange,
    ) -> Result<(), DomainError>;

    /// Overwrite the cached payment method summary.
    ///
    /// # Errors
    ///
    /// - `AccountNotFound` if the account doesn't exist
    /// - `DatabaseError` on persistence failure
    async fn set_payment_method(
        &self,
        id: &AccountId,
        summary: &PaymentMethodSummary,
    ) -> Result<(), DomainError>;
}
