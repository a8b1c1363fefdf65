//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `auth` - Firebase ID token validation (and a mock)
//! - `http` - Axum routers, handlers and middleware
//! - `memory` - In-memory repositories for tests and local development
//! - `postgres` - PostgreSQL repositories
//! - `stripe` - Stripe REST adapter (and a mock)

pub mod auth;
pub mod http;
pub mod memory;
pub mod postgres;
pub mod stripe;
