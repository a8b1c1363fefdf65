//! Payment provider port for external payment processing.
//!
//! Defines the contract for the payment gateway (Stripe in production).
//! Implementations handle customer management, hosted checkout and portal
//! sessions, saved payment methods and webhook verification.
//!
//! # Design
//!
//! - **Gateway agnostic**: Interface works with any payment provider
//! - **Hosted pages**: Checkout and plan management happen on provider pages
//! - **Idempotent**: Customer creation carries an idempotency key

use crate::domain::billing::BillingError;
use crate::domain::foundation::{AccountId, DomainError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Port for payment provider integrations.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Create a customer in the payment system.
    ///
    /// Returns the provider's customer ID for future reference.
    async fn create_customer(&self, request: CreateCustomerRequest)
        -> Result<Customer, PaymentError>;

    /// Get customer by provider ID. Deleted customers are reported as absent.
    async fn get_customer(&self, customer_id: &str) -> Result<Option<Customer>, PaymentError>;

    /// Create a subscription checkout session.
    ///
    /// Returns a URL for the customer to complete payment.
    async fn create_checkout_session(
        &self,
        request: CreateCheckoutRequest,
    ) -> Result<CheckoutSession, PaymentError>;

    /// Create a billing portal session for subscription management.
    async fn create_portal_session(
        &self,
        customer_id: &str,
        return_url: &str,
    ) -> Result<PortalSession, PaymentError>;

    /// List the card payment methods saved for a customer.
    async fn list_payment_methods(
        &self,
        customer_id: &str,
    ) -> Result<Vec<PaymentMethod>, PaymentError>;

    /// Detach a payment method from whichever customer holds it.
    async fn detach_payment_method(
        &self,
        payment_method_id: &str,
    ) -> Result<PaymentMethod, PaymentError>;

    /// Verify a webhook signature and parse the event.
    ///
    /// Returns the parsed event if valid, error if signature invalid.
    async fn verify_webhook(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> Result<WebhookEvent, PaymentError>;
}

/// Request to create a customer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCustomerRequest {
    /// Internal account ID (stored as metadata).
    pub account_id: AccountId,

    /// Customer email address.
    pub email: Option<String>,

    /// Customer name (optional).
    pub name: Option<String>,

    /// Idempotency key for safe retries.
    pub idempotency_key: Option<String>,
}

/// Customer in the payment system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    /// Provider's customer ID.
    pub id: String,

    pub email: Option<String>,

    pub name: Option<String>,

    /// When the customer was created (provider timestamp).
    pub created_at: i64,
}

/// Request to create a checkout session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCheckoutRequest {
    /// Internal account ID, echoed back on subscription events.
    pub account_id: AccountId,

    /// Provider's customer ID.
    pub customer_id: String,

    /// Price to subscribe to.
    pub price_id: String,

    /// URL to redirect after successful checkout.
    pub success_url: String,

    /// URL to redirect after canceled checkout.
    pub cancel_url: String,
}

/// Checkout session for payment completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckoutSession {
    /// Provider's session ID.
    pub id: String,

    /// URL for customer to complete checkout.
    pub url: String,

    /// When the session expires (Unix timestamp).
    pub expires_at: i64,
}

/// Portal session for subscription management.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortalSession {
    pub id: String,
    pub url: String,
}

/// A saved payment method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentMethod {
    pub id: String,

    /// Method type, e.g. `card`.
    pub method_type: String,

    pub card: Option<CardDetails>,

    /// When the method was created (Unix timestamp).
    pub created: i64,
}

/// Card details of a payment method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardDetails {
    pub brand: String,
    pub last4: String,
    pub exp_month: u32,
    pub exp_year: u32,
}

/// Webhook event from payment provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEvent {
    /// Event ID from provider.
    pub id: String,

    pub event_type: WebhookEventType,

    /// Event payload (provider-specific).
    pub data: WebhookEventData,

    /// When the event occurred (Unix timestamp).
    pub created_at: i64,

    /// False for test-mode events.
    pub livemode: bool,
}

/// Types of webhook events we handle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookEventType {
    SubscriptionCreated,
    SubscriptionUpdated,
    SubscriptionDeleted,

    /// Payment method attached to a customer.
    PaymentMethodAttached,

    /// Payment method details changed, including automatic card updates.
    PaymentMethodUpdated,

    InvoicePaymentSucceeded,
    InvoicePaymentFailed,

    /// Unknown event type.
    Unknown(String),
}

impl WebhookEventType {
    /// Maps a provider event type string.
    pub fn from_provider(event_type: &str) -> Self {
        match event_type {
            "customer.subscription.created" => WebhookEventType::SubscriptionCreated,
            "customer.subscription.updated" => WebhookEventType::SubscriptionUpdated,
            "customer.subscription.deleted" => WebhookEventType::SubscriptionDeleted,
            "payment_method.attached" => WebhookEventType::PaymentMethodAttached,
            "payment_method.updated" | "payment_method.automatically_updated" => {
                WebhookEventType::PaymentMethodUpdated
            }
            "invoice.payment_succeeded" => WebhookEventType::InvoicePaymentSucceeded,
            "invoice.payment_failed" => WebhookEventType::InvoicePaymentFailed,
            other => WebhookEventType::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            WebhookEventType::SubscriptionCreated => "customer.subscription.created",
            WebhookEventType::SubscriptionUpdated => "customer.subscription.updated",
            WebhookEventType::SubscriptionDeleted => "customer.subscription.deleted",
            WebhookEventType::PaymentMethodAttached => "payment_method.attached",
            WebhookEventType::PaymentMethodUpdated => "payment_method.updated",
            WebhookEventType::InvoicePaymentSucceeded => "invoice.payment_succeeded",
            WebhookEventType::InvoicePaymentFailed => "invoice.payment_failed",
            WebhookEventType::Unknown(s) => s.as_str(),
        }
    }
}

/// Webhook event payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WebhookEventData {
    /// Subscription data.
    #[serde(rename = "subscription")]
    Subscription {
        subscription_id: String,
        customer_id: String,
        status: String,
        price_id: Option<String>,
        /// Unit amount of the subscribed price in minor units.
        amount: Option<i64>,
        currency: Option<String>,
        current_period_end: Option<i64>,
        account_id: Option<String>,
    },

    /// Payment method data.
    #[serde(rename = "payment_method")]
    PaymentMethod {
        payment_method_id: String,
        customer_id: Option<String>,
        method_type: String,
        card: Option<CardDetails>,
        account_id: Option<String>,
    },

    /// Invoice data.
    #[serde(rename = "invoice")]
    Invoice {
        invoice_id: String,
        customer_id: String,
        customer_email: Option<String>,
        subscription_id: Option<String>,
        amount_paid: i64,
        amount_due: i64,
        currency: String,
        account_id: Option<String>,
    },

    /// Raw/unknown event data.
    #[serde(rename = "raw")]
    Raw { json: String },
}

/// Errors from payment provider operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentError {
    /// Error code for categorization.
    pub code: PaymentErrorCode,

    /// Human-readable message.
    pub message: String,

    /// Provider's error code (if available).
    pub provider_code: Option<String>,

    /// Whether the operation can be retried.
    pub retryable: bool,
}

impl PaymentError {
    pub fn new(code: PaymentErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            provider_code: None,
            retryable: code.is_retryable(),
        }
    }

    pub fn with_provider_code(mut self, code: impl Into<String>) -> Self {
        self.provider_code = Some(code.into());
        self
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::NetworkError, message)
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::AuthenticationError, message)
    }

    pub fn not_found(resource: &str) -> Self {
        Self::new(PaymentErrorCode::NotFound, format!("{} not found", resource))
    }

    pub fn invalid_webhook(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::InvalidWebhook, message)
    }

    pub fn malformed_webhook(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::MalformedWebhook, message)
    }

    pub fn provider(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::ProviderError, message)
    }
}

impl std::fmt::Display for PaymentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for PaymentError {}

impl From<PaymentError> for DomainError {
    fn from(err: PaymentError) -> Self {
        use crate::domain::foundation::ErrorCode;

        let code = match err.code {
            PaymentErrorCode::NotFound => ErrorCode::NotFound,
            PaymentErrorCode::InvalidWebhook => ErrorCode::InvalidWebhookSignature,
            PaymentErrorCode::MalformedWebhook => ErrorCode::ValidationFailed,
            _ => ErrorCode::ExternalServiceError,
        };

        DomainError::new(code, err.message)
    }
}

impl From<PaymentError> for BillingError {
    fn from(err: PaymentError) -> Self {
        match err.code {
            PaymentErrorCode::InvalidWebhook => BillingError::InvalidWebhookSignature,
            PaymentErrorCode::MalformedWebhook => BillingError::validation("payload", err.message),
            _ => BillingError::PaymentProvider(err.to_string()),
        }
    }
}

/// Payment error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentErrorCode {
    NetworkError,
    AuthenticationError,
    /// Request rejected by the provider as malformed.
    InvalidRequest,
    NotFound,
    RateLimitExceeded,
    /// Webhook signature missing, wrong or stale, or the event was refused.
    InvalidWebhook,
    /// Correctly signed webhook whose payload does not parse.
    MalformedWebhook,
    ProviderError,
    Unknown,
}

impl PaymentErrorCode {
    /// Check if this error type is typically retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PaymentErrorCode::NetworkError | PaymentErrorCode::RateLimitExceeded
        )
    }
}

impl std::fmt::Display for PaymentErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PaymentErrorCode::NetworkError => "network_error",
            PaymentErrorCode::AuthenticationError => "authentication_error",
            PaymentErrorCode::InvalidRequest => "invalid_request",
            PaymentErrorCode::NotFound => "not_found",
            PaymentErrorCode::RateLimitExceeded => "rate_limit_exceeded",
            PaymentErrorCode::InvalidWebhook => "invalid_webhook",
            PaymentErrorCode::MalformedWebhook => "malformed_webhook",
            PaymentErrorCode::ProviderError => "provider_error",
            PaymentErrorCode::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::ErrorCode;

    #[test]
    fn payment_provider_is_object_safe() {
        fn _accepts_dyn(_provider: &dyn PaymentProvider) {}
    }

    #[test]
    fn maps_provider_event_types() {
        assert_eq!(
            WebhookEventType::from_provider("customer.subscription.created"),
            WebhookEventType::SubscriptionCreated
        );
        assert_eq!(
            WebhookEventType::from_provider("payment_method.automatically_updated"),
            WebhookEventType::PaymentMethodUpdated
        );
        assert_eq!(
            WebhookEventType::from_provider("invoice.payment_failed"),
            WebhookEventType::InvoicePaymentFailed
        );
        assert_eq!(
            WebhookEventType::from_provider("charge.refunded"),
            WebhookEventType::Unknown("charge.refunded".to_string())
        );
    }

    #[test]
    fn payment_error_retryable() {
        assert!(PaymentErrorCode::NetworkError.is_retryable());
        assert!(PaymentErrorCode::RateLimitExceeded.is_retryable());

        assert!(!PaymentErrorCode::InvalidRequest.is_retryable());
        assert!(!PaymentErrorCode::NotFound.is_retryable());
        assert!(PaymentError::network("timeout").retryable);
    }

    #[test]
    fn payment_error_display() {
        let err = PaymentError::provider("No such price");
        assert_eq!(err.to_string(), "provider_error: No such price");
    }

    #[test]
    fn invalid_webhook_converts_to_signature_error() {
        let err: BillingError = PaymentError::invalid_webhook("bad signature").into();
        assert_eq!(err, BillingError::InvalidWebhookSignature);

        let domain: DomainError = PaymentError::invalid_webhook("bad signature").into();
        assert_eq!(domain.code, ErrorCode::InvalidWebhookSignature);
    }

    #[test]
    fn malformed_webhook_converts_to_validation_error() {
        let err: BillingError = PaymentError::malformed_webhook("Invalid invoice").into();
        assert_eq!(err, BillingError::validation("payload", "Invalid invoice"));

        let domain: DomainError = PaymentError::malformed_webhook("Invalid invoice").into();
        assert_eq!(domain.code, ErrorCode::ValidationFailed);
    }

    #[test]
    fn other_errors_convert_to_provider_error() {
        let err: BillingError = PaymentError::network("connection reset").into();
        assert!(matches!(err, BillingError::PaymentProvider(ref m) if m.contains("connection reset")));
    }
}
