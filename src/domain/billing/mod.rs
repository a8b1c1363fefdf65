//! Billing domain - partner accounts, plans, notifications and session requests.

mod account;
mod errors;
mod notification;
mod plan;
mod session_request;

pub use account::{
    Account, BillingDetails, PaymentMethodSummary, SubscriptionChange, CANCELED_STATUS,
};
pub use errors::BillingError;
pub use notification::{format_amount, Notification, NotificationKind};
pub use plan::{PlanCatalog, SubscriptionPlan};
pub use session_request::{
    SessionRequest, SessionRequestKind, SessionRequestStatus,
};
