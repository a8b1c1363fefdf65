//! In-memory repository adapters.
//!
//! Back the handler and HTTP tests, and serve as the stores for local runs
//! started without a database URL. Data does not survive a restart.

mod account_repository;
mod notification_repository;
mod session_request_repository;

pub use account_repository::InMemoryAccountRepository;
pub use notification_repository::InMemoryNotificationRepository;
pub use session_request_repository::InMemorySessionRequestRepository;
