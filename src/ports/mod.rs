//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Persistence Ports
//!
//! - `AccountRepository` - Partner account records
//! - `NotificationRepository` - Append-only partner notifications
//! - `SessionRequestRepository` - Checkout/portal session requests
//!
//! ## External Service Ports
//!
//! - `PaymentProvider` - Payment gateway (customers, sessions, webhooks)
//! - `SessionValidator` - Bearer token validation

mod account_repository;
mod notification_repository;
mod payment_provider;
mod session_request_repository;
mod session_validator;

pub use account_repository::AccountRepository;
pub use notification_repository::NotificationRepository;
pub use payment_provider::{
    CardDetails, CheckoutSession, CreateCheckoutRequest, CreateCustomerRequest, Customer,
    PaymentError, PaymentErrorCode, PaymentMethod, PaymentProvider, PortalSession, WebhookEvent,
    WebhookEventData, WebhookEventType,
};
pub use session_request_repository::SessionRequestRepository;
pub use session_validator::SessionValidator;
