//! Partner account record.
//!
//! One record per partner, keyed by the identity subject ID. Only the billing
//! handlers mutate it, and every mutation is a plain field overwrite.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{AccountId, Timestamp};

use super::plan::{PlanCatalog, SubscriptionPlan};

/// Billing status written when a subscription is deleted.
pub const CANCELED_STATUS: &str = "canceled";

/// Partner account holding subscription and billing state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: AccountId,
    pub email: Option<String>,
    /// External customer reference, created lazily on first checkout.
    pub stripe_customer_id: Option<String>,
    /// Current plan, stored under its display name.
    pub subscription: SubscriptionPlan,
    pub max_leads: u32,
    pub billing: BillingDetails,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Billing sub-record of an account.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingDetails {
    pub status: Option<String>,
    pub stripe_price_id: Option<String>,
    pub stripe_subscription_id: Option<String>,
    pub next_billing_date: Option<Timestamp>,
    /// Recurring amount in minor currency units.
    pub amount: Option<i64>,
    pub payment_method: Option<PaymentMethodSummary>,
}

/// Last known default payment method, refreshed only by webhook events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentMethodSummary {
    #[serde(rename = "type")]
    pub method_type: String,
    pub last4: Option<String>,
    pub brand: Option<String>,
    pub exp_month: Option<u32>,
    pub exp_year: Option<u32>,
}

/// Overwrite applied to an account when its subscription changes.
///
/// Carries every field a subscription event owns; the payment method summary
/// is left alone.
#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionChange {
    pub plan: SubscriptionPlan,
    pub max_leads: u32,
    pub status: String,
    pub stripe_price_id: Option<String>,
    pub stripe_subscription_id: Option<String>,
    pub next_billing_date: Option<Timestamp>,
    pub amount: Option<i64>,
}

impl SubscriptionChange {
    /// Change for an active (created or updated) subscription.
    pub fn active(
        plan: SubscriptionPlan,
        status: impl Into<String>,
        stripe_price_id: Option<String>,
        stripe_subscription_id: impl Into<String>,
        next_billing_date: Option<Timestamp>,
        amount: Option<i64>,
    ) -> Self {
        Self {
            plan,
            max_leads: plan.lead_quota(),
            status: status.into(),
            stripe_price_id,
            stripe_subscription_id: Some(stripe_subscription_id.into()),
            next_billing_date,
            amount,
        }
    }

    /// Change that returns an account to the default plan and clears the
    /// subscription identifiers.
    pub fn canceled(catalog: &PlanCatalog) -> Self {
        Self {
            plan: catalog.default_plan(),
            max_leads: catalog.default_quota(),
            status: CANCELED_STATUS.to_string(),
            stripe_price_id: None,
            stripe_subscription_id: None,
            next_billing_date: None,
            amount: None,
        }
    }
}

impl Account {
    /// Creates an account on the default plan with no billing history.
    pub fn new(id: AccountId, email: Option<String>, catalog: &PlanCatalog) -> Self {
        let now = Timestamp::now();
        Self {
            id,
            email,
            stripe_customer_id: None,
            subscription: catalog.default_plan(),
            max_leads: catalog.default_quota(),
            billing: BillingDetails::default(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns true once the external customer reference exists.
    pub fn has_customer(&self) -> bool {
        self.stripe_customer_id.is_some()
    }

    /// Records the external customer reference.
    pub fn set_stripe_customer_id(&mut self, customer_id: impl Into<String>) {
        self.stripe_customer_id = Some(customer_id.into());
        self.updated_at = Timestamp::now();
    }

    /// Overwrites plan, quota and subscription billing fields.
    pub fn apply_subscription_change(&mut self, change: &SubscriptionChange) {
        self.subscription = change.plan;
        self.max_leads = change.max_leads;
        self.billing.status = Some(change.status.clone());
        self.billing.stripe_price_id = change.stripe_price_id.clone();
        self.billing.stripe_subscription_id = change.stripe_subscription_id.clone();
        self.billing.next_billing_date = change.next_billing_date;
        self.billing.amount = change.amount;
        self.updated_at = Timestamp::now();
    }

    /// Overwrites the cached payment method summary.
    pub fn set_payment_method(&mut self, summary: PaymentMethodSummary) {
        self.billing.payment_method = Some(summary);
        self.updated_at = Timestamp::now();
    }

    /// Case-insensitive email comparison used for account resolution.
    pub fn email_matches(&self, email: &str) -> bool {
        self.email
            .as_deref()
            .is_some_and(|own| own.trim().eq_ignore_ascii_case(email.trim()))
    }
}
