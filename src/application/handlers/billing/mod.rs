//! Billing handlers.
//!
//! Command and query handlers for partner billing:
//!
//! ## Commands
//! - Creating checkout and portal sessions
//! - Creating and processing session requests
//! - Detaching payment methods
//! - Processing provider webhooks
//!
//! ## Queries
//! - Billing summary
//! - Payment methods on file
//! - Notifications
//! - Session request status

mod account_resolver;
mod create_checkout_session;
mod create_portal_session;
mod create_session_request;
mod detach_payment_method;
mod get_billing_summary;
mod get_session_request;
mod handle_billing_webhook;
mod list_notifications;
mod list_payment_methods;
mod process_session_request;
mod redirects;

pub use account_resolver::{AccountHint, AccountResolver};
pub use redirects::{RedirectUrls, CHECKOUT_SESSION_PLACEHOLDER};

// Commands
pub use create_checkout_session::{
    CreateCheckoutSessionCommand, CreateCheckoutSessionHandler, CreateCheckoutSessionResult,
};
pub use create_portal_session::{
    CreatePortalSessionCommand, CreatePortalSessionHandler, CreatePortalSessionResult,
};
pub use create_session_request::{
    CreateSessionRequestCommand, CreateSessionRequestHandler, CreateSessionRequestResult,
};
pub use detach_payment_method::{
    DetachPaymentMethodCommand, DetachPaymentMethodHandler, DetachPaymentMethodResult,
};
pub use handle_billing_webhook::{
    HandleBillingWebhookCommand, HandleBillingWebhookHandler, HandleBillingWebhookResult,
};
pub use process_session_request::{
    ProcessSessionRequestCommand, ProcessSessionRequestHandler, ProcessSessionRequestResult,
};

// Queries
pub use get_billing_summary::{
    GetBillingSummaryHandler, GetBillingSummaryQuery, GetBillingSummaryResult,
};
pub use get_session_request::{
    GetSessionRequestHandler, GetSessionRequestQuery, GetSessionRequestResult,
};
pub use list_notifications::{
    ListNotificationsHandler, ListNotificationsQuery, ListNotificationsResult,
    DEFAULT_NOTIFICATION_LIMIT, MAX_NOTIFICATION_LIMIT,
};
pub use list_payment_methods::{
    ListPaymentMethodsHandler, ListPaymentMethodsQuery, ListPaymentMethodsResult,
};
