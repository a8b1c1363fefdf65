//! PostgreSQL adapters - Database implementations for repository ports.
//!
//! - `PostgresAccountRepository` - Partner accounts with flattened billing columns
//! - `PostgresNotificationRepository` - Append-only notification log
//! - `PostgresSessionRequestRepository` - Checkout and portal session requests
//!
//! Schema lives in `migrations/` and is applied at startup by `sqlx::migrate!`.

mod account_repository;
mod notification_repository;
mod session_request_repository;

pub use account_repository::PostgresAccountRepository;
pub use notification_repository::PostgresNotificationRepository;
pub use session_request_repository::PostgresSessionRequestRepository;
