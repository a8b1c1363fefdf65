//! Stripe payment provider adapter.
//!
//! Implements the `PaymentProvider` trait for Stripe API integration.
//! Handles customers, checkout and billing portal sessions, saved payment
//! methods, and webhook verification.
//!
//! # Security
//!
//! - HMAC-SHA256 signature verification with constant-time comparison
//! - Timestamp validation (5-minute window) for replay attack prevention
//! - Secrets handled via `secrecy::SecretString`
//!
//! # Configuration
//!
//! ```ignore
//! let config = StripeConfig::new(api_key, webhook_secret);
//! let adapter = StripePaymentAdapter::new(config);
//! ```

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::config::PaymentConfig;
use crate::ports::{
    CheckoutSession, CreateCheckoutRequest, CreateCustomerRequest, Customer, PaymentError,
    PaymentErrorCode, PaymentMethod, PaymentProvider, PortalSession, WebhookEvent,
    WebhookEventData, WebhookEventType,
};

use super::webhook_types::{
    SignatureHeader, StripeCheckoutSession, StripeCustomer, StripeErrorResponse, StripeInvoice,
    StripeList, StripePaymentMethod, StripePortalSession, StripeSubscription, StripeWebhookEvent,
    ACCOUNT_ID_METADATA_KEY,
};

type HmacSha256 = Hmac<Sha256>;

/// Maximum age for webhook events (5 minutes).
const MAX_TIMESTAMP_AGE_SECS: i64 = 300;

/// Clock skew tolerance for future timestamps (60 seconds).
const MAX_FUTURE_TOLERANCE_SECS: i64 = 60;

const DEFAULT_API_BASE_URL: &str = "https://api.stripe.com";

/// Largest page size the list endpoints accept.
const LIST_PAGE_LIMIT: &str = "100";

/// Stripe API configuration.
#[derive(Clone)]
pub struct StripeConfig {
    /// Stripe secret API key (sk_live_... or sk_test_...).
    api_key: SecretString,

    /// Webhook signing secret (whsec_...).
    webhook_secret: SecretString,

    /// Base URL for Stripe API (default: https://api.stripe.com).
    api_base_url: String,

    /// Whether to reject test-mode events.
    require_livemode: bool,
}

impl StripeConfig {
    /// Create a new Stripe configuration.
    pub fn new(api_key: impl Into<String>, webhook_secret: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::new(api_key.into()),
            webhook_secret: SecretString::new(webhook_secret.into()),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            require_livemode: false,
        }
    }

    /// Build from the payment section of the application config.
    pub fn from_payment_config(config: &PaymentConfig) -> Self {
        let mut stripe = Self::new(
            config.stripe_api_key.clone(),
            config.stripe_webhook_secret.clone(),
        )
        .with_require_livemode(config.require_livemode);
        if let Some(url) = config.stripe_api_base_url.as_deref().filter(|u| !u.is_empty()) {
            stripe = stripe.with_base_url(url);
        }
        stripe
    }

    /// Set a custom API base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Reject test-mode webhook events.
    pub fn with_require_livemode(mut self, require: bool) -> Self {
        self.require_livemode = require;
        self
    }
}

/// Stripe payment provider adapter.
pub struct StripePaymentAdapter {
    config: StripeConfig,
    http_client: reqwest::Client,
}

impl StripePaymentAdapter {
    /// Create a new Stripe adapter with the given configuration.
    pub fn new(config: StripeConfig) -> Self {
        Self {
            config,
            http_client: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_base_url, path)
    }

    /// POST a form-encoded request and parse the JSON response.
    async fn post_form<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
        idempotency_key: Option<&str>,
    ) -> Result<T, PaymentError> {
        let mut request = self
            .http_client
            .post(self.url(path))
            .basic_auth(self.config.api_key.expose_secret(), Option::<&str>::None)
            .form(params);

        if let Some(key) = idempotency_key {
            request = request.header("Idempotency-Key", key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| PaymentError::network(e.to_string()))?;

        Self::parse_response(path, response).await
    }

    /// GET a resource and parse the JSON response.
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, PaymentError> {
        let response = self
            .http_client
            .get(self.url(path))
            .basic_auth(self.config.api_key.expose_secret(), Option::<&str>::None)
            .query(query)
            .send()
            .await
            .map_err(|e| PaymentError::network(e.to_string()))?;

        Self::parse_response(path, response).await
    }

    async fn parse_response<T: DeserializeOwned>(
        path: &str,
        response: reqwest::Response,
    ) -> Result<T, PaymentError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let err = error_from_body(status, &body);
            tracing::error!(
                path = %path,
                status = status.as_u16(),
                code = %err.code,
                error = %err.message,
                "Stripe API call failed"
            );
            return Err(err);
        }

        response.json().await.map_err(|e| {
            PaymentError::new(
                PaymentErrorCode::ProviderError,
                format!("Failed to parse Stripe response: {}", e),
            )
        })
    }

    /// Verify webhook signature using HMAC-SHA256 against the current clock.
    fn verify_signature(&self, payload: &[u8], header: &SignatureHeader) -> Result<(), PaymentError> {
        self.verify_signature_at(payload, header, chrono::Utc::now().timestamp())
    }

    /// Verify webhook signature as of `now` (Unix seconds).
    ///
    /// Accepts the payload if any `v1` entry matches.
    pub fn verify_signature_at(
        &self,
        payload: &[u8],
        header: &SignatureHeader,
        now: i64,
    ) -> Result<(), PaymentError> {
        let age = now - header.timestamp;

        if age > MAX_TIMESTAMP_AGE_SECS {
            tracing::warn!(
                event_timestamp = header.timestamp,
                current_time = now,
                age_secs = age,
                "Webhook event too old - possible replay attack"
            );
            return Err(PaymentError::invalid_webhook(format!(
                "Event too old ({} seconds)",
                age
            )));
        }

        if age < -MAX_FUTURE_TOLERANCE_SECS {
            tracing::warn!(
                event_timestamp = header.timestamp,
                current_time = now,
                "Webhook event from future - clock skew or manipulation"
            );
            return Err(PaymentError::invalid_webhook("Event timestamp in future"));
        }

        let mut mac =
            HmacSha256::new_from_slice(self.config.webhook_secret.expose_secret().as_bytes())
                .map_err(|e| PaymentError::invalid_webhook(format!("Invalid signing key: {}", e)))?;
        mac.update(header.timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        let expected = mac.finalize().into_bytes();
        let expected_bytes: &[u8] = expected.as_slice();

        let matched = header
            .v1_signatures
            .iter()
            .any(|provided| expected_bytes.ct_eq(provided.as_slice()).unwrap_u8() == 1);

        if !matched {
            tracing::warn!("Invalid webhook signature");
            return Err(PaymentError::invalid_webhook("Invalid signature"));
        }

        Ok(())
    }

    /// Parse a Stripe event and convert to port types.
    fn parse_event(&self, payload: &[u8]) -> Result<WebhookEvent, PaymentError> {
        let stripe_event: StripeWebhookEvent = serde_json::from_slice(payload).map_err(|e| {
            tracing::warn!(error = %e, "Failed to parse webhook payload");
            PaymentError::malformed_webhook(format!("Invalid JSON: {}", e))
        })?;

        if self.config.require_livemode && !stripe_event.livemode {
            tracing::warn!(
                event_id = %stripe_event.id,
                "Rejected test mode event"
            );
            return Err(PaymentError::invalid_webhook(
                "Test mode events are not accepted",
            ));
        }

        let event_type = WebhookEventType::from_provider(&stripe_event.event_type);
        let data = extract_event_data(&event_type, &stripe_event)?;

        Ok(WebhookEvent {
            id: stripe_event.id,
            event_type,
            data,
            created_at: stripe_event.created,
            livemode: stripe_event.livemode,
        })
    }
}

/// Extract event data from a Stripe event into port format.
fn extract_event_data(
    event_type: &WebhookEventType,
    event: &StripeWebhookEvent,
) -> Result<WebhookEventData, PaymentError> {
    match event_type {
        WebhookEventType::SubscriptionCreated
        | WebhookEventType::SubscriptionUpdated
        | WebhookEventType::SubscriptionDeleted => {
            let sub: StripeSubscription = object_as(event, "subscription")?;
            let price = sub.primary_item().map(|item| &item.price);

            Ok(WebhookEventData::Subscription {
                price_id: price.map(|p| p.id.clone()),
                amount: price.and_then(|p| p.unit_amount),
                currency: price.map(|p| p.currency.clone()),
                current_period_end: sub.period_end(),
                account_id: sub.account_id(),
                subscription_id: sub.id,
                customer_id: sub.customer,
                status: sub.status,
            })
        }

        WebhookEventType::PaymentMethodAttached | WebhookEventType::PaymentMethodUpdated => {
            let pm: StripePaymentMethod = object_as(event, "payment method")?;

            Ok(WebhookEventData::PaymentMethod {
                account_id: pm.account_id(),
                payment_method_id: pm.id,
                customer_id: pm.customer,
                method_type: pm.method_type,
                card: pm.card.map(Into::into),
            })
        }

        WebhookEventType::InvoicePaymentSucceeded | WebhookEventType::InvoicePaymentFailed => {
            let invoice: StripeInvoice = object_as(event, "invoice")?;

            Ok(WebhookEventData::Invoice {
                account_id: invoice.account_id(),
                invoice_id: invoice.id,
                customer_id: invoice.customer,
                customer_email: invoice.customer_email,
                subscription_id: invoice.subscription,
                amount_paid: invoice.amount_paid,
                amount_due: invoice.amount_due,
                currency: invoice.currency,
            })
        }

        WebhookEventType::Unknown(_) => Ok(WebhookEventData::Raw {
            json: event.data.object.to_string(),
        }),
    }
}

fn object_as<T: DeserializeOwned>(
    event: &StripeWebhookEvent,
    what: &str,
) -> Result<T, PaymentError> {
    serde_json::from_value(event.data.object.clone())
        .map_err(|e| PaymentError::malformed_webhook(format!("Invalid {}: {}", what, e)))
}

/// Map a failed Stripe response to a payment error.
fn error_from_body(status: reqwest::StatusCode, body: &str) -> PaymentError {
    let parsed = serde_json::from_str::<StripeErrorResponse>(body).ok();
    let message = parsed
        .as_ref()
        .and_then(|r| r.error.message.clone())
        .unwrap_or_else(|| format!("Stripe API error ({})", status.as_u16()));

    let code = match status.as_u16() {
        400 | 402 => PaymentErrorCode::InvalidRequest,
        401 | 403 => PaymentErrorCode::AuthenticationError,
        404 => PaymentErrorCode::NotFound,
        429 => PaymentErrorCode::RateLimitExceeded,
        500..=599 => PaymentErrorCode::NetworkError,
        _ => PaymentErrorCode::ProviderError,
    };

    let err = PaymentError::new(code, message);
    match parsed.and_then(|r| r.error.code) {
        Some(provider_code) => err.with_provider_code(provider_code),
        None => err,
    }
}

/// Checks an ID before it becomes a URL path segment.
///
/// Stripe object IDs are ASCII letters, digits and underscores. Anything else
/// could step out of the intended resource path.
fn object_id<'a>(kind: &str, id: &'a str) -> Result<&'a str, PaymentError> {
    if !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Ok(id)
    } else {
        Err(PaymentError::new(
            PaymentErrorCode::InvalidRequest,
            format!("Malformed {} ID", kind),
        ))
    }
}

fn to_payment_method(pm: StripePaymentMethod) -> PaymentMethod {
    PaymentMethod {
        id: pm.id,
        method_type: pm.method_type,
        card: pm.card.map(Into::into),
        created: pm.created,
    }
}

#[async_trait]
impl PaymentProvider for StripePaymentAdapter {
    async fn create_customer(
        &self,
        request: CreateCustomerRequest,
    ) -> Result<Customer, PaymentError> {
        let metadata_key = format!("metadata[{}]", ACCOUNT_ID_METADATA_KEY);
        let mut params = vec![(metadata_key.as_str(), request.account_id.to_string())];
        if let Some(email) = &request.email {
            params.push(("email", email.clone()));
        }
        if let Some(name) = &request.name {
            params.push(("name", name.clone()));
        }

        let customer: StripeCustomer = self
            .post_form("/v1/customers", &params, request.idempotency_key.as_deref())
            .await?;

        tracing::info!(
            account_id = %request.account_id,
            customer_id = %customer.id,
            "Created Stripe customer"
        );

        Ok(Customer {
            id: customer.id,
            email: customer.email.or(request.email),
            name: customer.name.or(request.name),
            created_at: customer.created,
        })
    }

    async fn get_customer(&self, customer_id: &str) -> Result<Option<Customer>, PaymentError> {
        let path = format!("/v1/customers/{}", object_id("customer", customer_id)?);
        let customer: StripeCustomer = match self.get_json(&path, &[]).await {
            Ok(customer) => customer,
            Err(e) if e.code == PaymentErrorCode::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };

        if customer.deleted {
            return Ok(None);
        }

        Ok(Some(Customer {
            id: customer.id,
            email: customer.email,
            name: customer.name,
            created_at: customer.created,
        }))
    }

    async fn create_checkout_session(
        &self,
        request: CreateCheckoutRequest,
    ) -> Result<CheckoutSession, PaymentError> {
        let account_id = request.account_id.to_string();
        let metadata_key = format!("metadata[{}]", ACCOUNT_ID_METADATA_KEY);
        let sub_metadata_key = format!("subscription_data[metadata][{}]", ACCOUNT_ID_METADATA_KEY);

        let params = vec![
            ("mode", "subscription".to_string()),
            ("customer", request.customer_id.clone()),
            ("line_items[0][price]", request.price_id.clone()),
            ("line_items[0][quantity]", "1".to_string()),
            ("success_url", request.success_url),
            ("cancel_url", request.cancel_url),
            ("client_reference_id", account_id.clone()),
            (metadata_key.as_str(), account_id.clone()),
            (sub_metadata_key.as_str(), account_id),
        ];

        let session: StripeCheckoutSession =
            self.post_form("/v1/checkout/sessions", &params, None).await?;

        let url = session.url.ok_or_else(|| {
            PaymentError::provider(format!("Checkout session {} has no URL", session.id))
        })?;

        Ok(CheckoutSession {
            id: session.id,
            url,
            expires_at: session.expires_at,
        })
    }

    async fn create_portal_session(
        &self,
        customer_id: &str,
        return_url: &str,
    ) -> Result<PortalSession, PaymentError> {
        let params = [
            ("customer", customer_id.to_string()),
            ("return_url", return_url.to_string()),
        ];

        let portal: StripePortalSession = self
            .post_form("/v1/billing_portal/sessions", &params, None)
            .await?;

        Ok(PortalSession {
            id: portal.id,
            url: portal.url,
        })
    }

    async fn list_payment_methods(
        &self,
        customer_id: &str,
    ) -> Result<Vec<PaymentMethod>, PaymentError> {
        let mut methods = Vec::new();
        let mut starting_after: Option<String> = None;

        loop {
            let mut query = vec![
                ("customer", customer_id),
                ("type", "card"),
                ("limit", LIST_PAGE_LIMIT),
            ];
            if let Some(after) = starting_after.as_deref() {
                query.push(("starting_after", after));
            }

            let page: StripeList<StripePaymentMethod> =
                self.get_json("/v1/payment_methods", &query).await?;
            let last_id = page.data.last().map(|pm| pm.id.clone());
            methods.extend(page.data.into_iter().map(to_payment_method));

            match last_id {
                Some(id) if page.has_more => starting_after = Some(id),
                _ => break,
            }
        }

        Ok(methods)
    }

    async fn detach_payment_method(
        &self,
        payment_method_id: &str,
    ) -> Result<PaymentMethod, PaymentError> {
        let path = format!(
            "/v1/payment_methods/{}/detach",
            object_id("payment method", payment_method_id)?
        );
        let pm: StripePaymentMethod = self.post_form(&path, &[], None).await?;
        Ok(to_payment_method(pm))
    }

    async fn verify_webhook(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> Result<WebhookEvent, PaymentError> {
        let header = SignatureHeader::parse(signature).map_err(|e| {
            tracing::warn!(error = %e, "Failed to parse Stripe-Signature header");
            PaymentError::invalid_webhook(e.to_string())
        })?;

        self.verify_signature(payload, &header)?;

        let event = self.parse_event(payload)?;

        tracing::info!(
            event_id = %event.id,
            event_type = %event.event_type.as_str(),
            "Webhook signature verified"
        );

        Ok(event)
    }
}
