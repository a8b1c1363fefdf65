//! HTTP adapter for billing endpoints.
//!
//! Exposes the billing handlers via REST API:
//! - `POST /api/billing/checkout-session` - Start a hosted checkout
//! - `POST /api/billing/portal-session` - Open the billing portal
//! - `GET /api/billing/payment-methods` - List stored payment methods
//! - `POST /api/billing/payment-methods/detach` - Detach a payment method
//! - `GET /api/billing/account` - Billing summary for the caller
//! - `GET /api/billing/notifications` - Newest notifications
//! - `POST /api/billing/session-requests` - Create and process a session request
//! - `GET /api/billing/session-requests/:id` - Fetch a session request
//! - `POST /api/webhooks/stripe` - Handle Stripe webhooks
//! - `GET /health` - Liveness

pub mod dto;
pub mod handlers;
pub mod routes;

pub use handlers::{ApiError, BillingAppState, STRIPE_SIGNATURE_HEADER};
pub use routes::{billing_router, billing_routes, webhook_routes};
