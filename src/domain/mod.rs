//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (IDs, timestamps, auth, errors)
//! - `billing` - Partner accounts, subscription plans, notifications and
//!   checkout/portal session requests

pub mod billing;
pub mod foundation;
