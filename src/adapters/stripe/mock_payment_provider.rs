//! Mock payment provider for testing.
//!
//! Provides a configurable mock implementation of `PaymentProvider` for unit
//! and integration tests. Supports:
//! - Pre-configured responses
//! - Error injection
//! - Call tracking
//! - Webhook event simulation

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use crate::ports::{
    CardDetails, CheckoutSession, CreateCheckoutRequest, CreateCustomerRequest, Customer,
    PaymentError, PaymentMethod, PaymentProvider, PortalSession, WebhookEvent, WebhookEventData,
    WebhookEventType,
};

/// Mock payment provider for testing.
///
/// # Example
///
/// ```ignore
/// let mock = MockPaymentProvider::new();
/// mock.set_method_error("create_portal_session", PaymentError::network("down"));
///
/// let result = mock.create_portal_session("cus_1", "https://app/billing").await;
/// assert!(result.is_err());
/// assert_eq!(mock.call_count("create_portal_session"), 1);
/// ```
#[derive(Default, Clone)]
pub struct MockPaymentProvider {
    inner: Arc<Mutex<MockState>>,
}

#[derive(Default)]
struct MockState {
    /// Known customers by ID.
    customers: HashMap<String, Customer>,

    /// Saved payment methods by customer ID.
    payment_methods: HashMap<String, Vec<PaymentMethod>>,

    /// Sequence for generated IDs.
    sequence: u32,

    next_checkout: Option<CheckoutSession>,

    next_portal: Option<PortalSession>,

    /// Event returned by `verify_webhook`.
    webhook_event: Option<WebhookEvent>,

    /// Error to return on next call (consumed).
    next_error: Option<PaymentError>,

    /// Specific errors by method name.
    method_errors: HashMap<String, PaymentError>,

    customer_requests: Vec<CreateCustomerRequest>,

    checkout_requests: Vec<CreateCheckoutRequest>,

    /// Track method calls for assertions.
    call_log: Vec<MethodCall>,

    reject_webhooks: bool,
}

impl MockState {
    fn next_id(&mut self, prefix: &str) -> String {
        self.sequence += 1;
        format!("{}_mock_{}", prefix, self.sequence)
    }
}

/// Recorded method call for assertions.
#[derive(Debug, Clone)]
pub struct MethodCall {
    pub method: String,
    pub args: Vec<String>,
}

impl MockPaymentProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock that fails all webhook verifications.
    pub fn rejecting_webhooks() -> Self {
        let mock = Self::new();
        mock.state().reject_webhooks = true;
        mock
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Configuration Methods
    // ════════════════════════════════════════════════════════════════════════════

    /// Add a customer to the "database".
    pub fn add_customer(&self, customer: Customer) {
        let id = customer.id.clone();
        self.state().customers.insert(id, customer);
    }

    /// Attach a saved payment method to a customer.
    pub fn add_payment_method(&self, customer_id: &str, method: PaymentMethod) {
        self.state()
            .payment_methods
            .entry(customer_id.to_string())
            .or_default()
            .push(method);
    }

    /// Set the checkout session to return.
    pub fn set_checkout_session(&self, session: CheckoutSession) {
        self.state().next_checkout = Some(session);
    }

    /// Set the portal session to return.
    pub fn set_portal_session(&self, session: PortalSession) {
        self.state().next_portal = Some(session);
    }

    /// Set the event returned on webhook verification.
    pub fn set_webhook_event(&self, event: WebhookEvent) {
        self.state().webhook_event = Some(event);
    }

    /// Set an error to return on the next call to any method.
    pub fn set_error(&self, error: PaymentError) {
        self.state().next_error = Some(error);
    }

    /// Set an error for a specific method.
    pub fn set_method_error(&self, method: &str, error: PaymentError) {
        self.state().method_errors.insert(method.to_string(), error);
    }

    pub fn clear_errors(&self) {
        let mut state = self.state();
        state.next_error = None;
        state.method_errors.clear();
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Call Tracking
    // ════════════════════════════════════════════════════════════════════════════

    /// Get all recorded method calls.
    pub fn calls(&self) -> Vec<MethodCall> {
        self.state().call_log.clone()
    }

    /// Check if a method was called.
    pub fn was_called(&self, method: &str) -> bool {
        self.state().call_log.iter().any(|c| c.method == method)
    }

    /// Get count of calls to a method.
    pub fn call_count(&self, method: &str) -> usize {
        self.state()
            .call_log
            .iter()
            .filter(|c| c.method == method)
            .count()
    }

    /// Customer creation requests received, in order.
    pub fn customer_requests(&self) -> Vec<CreateCustomerRequest> {
        self.state().customer_requests.clone()
    }

    /// Checkout creation requests received, in order.
    pub fn checkout_requests(&self) -> Vec<CreateCheckoutRequest> {
        self.state().checkout_requests.clone()
    }

    pub fn clear_calls(&self) {
        self.state().call_log.clear();
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Internal Helpers
    // ════════════════════════════════════════════════════════════════════════════

    fn record_call(&self, method: &str, args: Vec<String>) {
        self.state().call_log.push(MethodCall {
            method: method.to_string(),
            args,
        });
    }

    fn check_error(&self, method: &str) -> Result<(), PaymentError> {
        let mut state = self.state();

        if let Some(error) = state.method_errors.get(method) {
            return Err(error.clone());
        }

        if let Some(error) = state.next_error.take() {
            return Err(error);
        }

        Ok(())
    }
}

#[async_trait]
impl PaymentProvider for MockPaymentProvider {
    async fn create_customer(
        &self,
        request: CreateCustomerRequest,
    ) -> Result<Customer, PaymentError> {
        self.record_call(
            "create_customer",
            vec![
                request.account_id.to_string(),
                request.idempotency_key.clone().unwrap_or_default(),
            ],
        );
        self.check_error("create_customer")?;

        let mut state = self.state();
        state.customer_requests.push(request.clone());

        let customer = Customer {
            id: state.next_id("cus"),
            email: request.email,
            name: request.name,
            created_at: chrono::Utc::now().timestamp(),
        };
        state.customers.insert(customer.id.clone(), customer.clone());

        Ok(customer)
    }

    async fn get_customer(&self, customer_id: &str) -> Result<Option<Customer>, PaymentError> {
        self.record_call("get_customer", vec![customer_id.to_string()]);
        self.check_error("get_customer")?;

        Ok(self.state().customers.get(customer_id).cloned())
    }

    async fn create_checkout_session(
        &self,
        request: CreateCheckoutRequest,
    ) -> Result<CheckoutSession, PaymentError> {
        self.record_call(
            "create_checkout_session",
            vec![
                request.account_id.to_string(),
                request.customer_id.clone(),
                request.price_id.clone(),
            ],
        );
        self.check_error("create_checkout_session")?;

        let mut state = self.state();
        state.checkout_requests.push(request);

        let session = match state.next_checkout.take() {
            Some(session) => session,
            None => {
                let id = state.next_id("cs");
                CheckoutSession {
                    url: format!("https://checkout.stripe.com/c/pay/{}", id),
                    id,
                    expires_at: chrono::Utc::now().timestamp() + 24 * 60 * 60,
                }
            }
        };

        Ok(session)
    }

    async fn create_portal_session(
        &self,
        customer_id: &str,
        return_url: &str,
    ) -> Result<PortalSession, PaymentError> {
        self.record_call(
            "create_portal_session",
            vec![customer_id.to_string(), return_url.to_string()],
        );
        self.check_error("create_portal_session")?;

        let mut state = self.state();
        let session = match state.next_portal.take() {
            Some(session) => session,
            None => {
                let id = state.next_id("bps");
                PortalSession {
                    url: format!("https://billing.stripe.com/p/session/{}", id),
                    id,
                }
            }
        };

        Ok(session)
    }

    async fn list_payment_methods(
        &self,
        customer_id: &str,
    ) -> Result<Vec<PaymentMethod>, PaymentError> {
        self.record_call("list_payment_methods", vec![customer_id.to_string()]);
        self.check_error("list_payment_methods")?;

        Ok(self
            .state()
            .payment_methods
            .get(customer_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn detach_payment_method(
        &self,
        payment_method_id: &str,
    ) -> Result<PaymentMethod, PaymentError> {
        self.record_call("detach_payment_method", vec![payment_method_id.to_string()]);
        self.check_error("detach_payment_method")?;

        let mut state = self.state();
        for methods in state.payment_methods.values_mut() {
            if let Some(pos) = methods.iter().position(|m| m.id == payment_method_id) {
                return Ok(methods.remove(pos));
            }
        }

        Err(PaymentError::not_found("Payment method"))
    }

    async fn verify_webhook(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> Result<WebhookEvent, PaymentError> {
        self.record_call(
            "verify_webhook",
            vec![
                String::from_utf8_lossy(payload).chars().take(50).collect(),
                signature.chars().take(20).collect(),
            ],
        );
        self.check_error("verify_webhook")?;

        let state = self.state();
        if state.reject_webhooks {
            return Err(PaymentError::invalid_webhook("Verification disabled"));
        }

        if let Some(event) = &state.webhook_event {
            return Ok(event.clone());
        }

        let parsed: serde_json::Value = serde_json::from_slice(payload)
            .map_err(|e| PaymentError::malformed_webhook(e.to_string()))?;

        Ok(WebhookEvent {
            id: parsed["id"].as_str().unwrap_or("evt_mock").to_string(),
            event_type: WebhookEventType::from_provider(parsed["type"].as_str().unwrap_or("unknown")),
            data: WebhookEventData::Raw {
                json: String::from_utf8_lossy(payload).to_string(),
            },
            created_at: parsed["created"]
                .as_i64()
                .unwrap_or_else(|| chrono::Utc::now().timestamp()),
            livemode: false,
        })
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Test Helpers
// ════════════════════════════════════════════════════════════════════════════════

impl MockPaymentProvider {
    /// A saved Visa card.
    pub fn card(id: &str, last4: &str) -> PaymentMethod {
        PaymentMethod {
            id: id.to_string(),
            method_type: "card".to_string(),
            card: Some(CardDetails {
                brand: "visa".to_string(),
                last4: last4.to_string(),
                exp_month: 12,
                exp_year: 2030,
            }),
            created: chrono::Utc::now().timestamp(),
        }
    }

    /// A subscription event for the given price.
    pub fn subscription_event(
        event_type: WebhookEventType,
        customer_id: &str,
        price_id: &str,
        account_id: Option<&str>,
    ) -> WebhookEvent {
        WebhookEvent {
            id: format!("evt_sub_{}", uuid::Uuid::new_v4()),
            event_type,
            data: WebhookEventData::Subscription {
                subscription_id: "sub_mock".to_string(),
                customer_id: customer_id.to_string(),
                status: "active".to_string(),
                price_id: Some(price_id.to_string()),
                amount: Some(4900),
                currency: Some("usd".to_string()),
                current_period_end: Some(chrono::Utc::now().timestamp() + 30 * 24 * 60 * 60),
                account_id: account_id.map(String::from),
            },
            created_at: chrono::Utc::now().timestamp(),
            livemode: false,
        }
    }

    /// An invoice event with the same amount paid and due.
    pub fn invoice_event(
        event_type: WebhookEventType,
        customer_id: &str,
        customer_email: Option<&str>,
        amount: i64,
    ) -> WebhookEvent {
        let paid = if event_type == WebhookEventType::InvoicePaymentSucceeded {
            amount
        } else {
            0
        };
        WebhookEvent {
            id: format!("evt_inv_{}", uuid::Uuid::new_v4()),
            event_type,
            data: WebhookEventData::Invoice {
                invoice_id: format!("in_{}", uuid::Uuid::new_v4()),
                customer_id: customer_id.to_string(),
                customer_email: customer_email.map(String::from),
                subscription_id: Some("sub_mock".to_string()),
                amount_paid: paid,
                amount_due: amount,
                currency: "usd".to_string(),
                account_id: None,
            },
            created_at: chrono::Utc::now().timestamp(),
            livemode: false,
        }
    }
}
