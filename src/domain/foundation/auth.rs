//! Authentication types for the domain layer.
//!
//! These types represent the caller identity extracted from a verified bearer
//! token. They carry no identity-provider dependencies; the `SessionValidator`
//! port populates them.

use super::AccountId;
use thiserror::Error;

/// Caller identity extracted from a validated ID token.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    /// Subject identifier, which is also the account record key.
    pub id: AccountId,

    /// Email address from the token claims, if the provider supplied one.
    pub email: Option<String>,

    /// Display name if available.
    pub display_name: Option<String>,

    /// Whether the identity provider verified the email.
    pub email_verified: bool,
}

impl AuthenticatedUser {
    /// Creates a new authenticated user.
    pub fn new(
        id: AccountId,
        email: Option<String>,
        display_name: Option<String>,
        email_verified: bool,
    ) -> Self {
        Self {
            id,
            email,
            display_name,
            email_verified,
        }
    }
}

/// Authentication errors that can occur during token validation.
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    /// No bearer credential was supplied.
    #[error("Missing bearer token")]
    MissingToken,

    /// The token is malformed or has an invalid signature.
    #[error("Invalid or expired token")]
    InvalidToken,

    /// The token has expired.
    #[error("Token expired")]
    TokenExpired,

    /// The identity provider could not be reached.
    #[error("Auth service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl AuthError {
    /// Creates a service unavailable error with a message.
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::ServiceUnavailable(message.into())
    }

    /// Returns true if this is a transient error that may succeed on retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, AuthError::ServiceUnavailable(_))
    }
}
