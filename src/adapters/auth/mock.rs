//! Mock session validator for tests.
//!
//! Maps fixed bearer tokens to partner identities so handlers and routes can
//! be exercised without a Firebase project.
//!
//! ```ignore
//! use partner_billing::adapters::auth::MockSessionValidator;
//!
//! let validator = MockSessionValidator::new().with_test_user("valid-token", "partner-1");
//! let user = validator.validate("valid-token").await?;
//! assert_eq!(user.id.as_str(), "partner-1");
//! ```

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use crate::domain::foundation::{AccountId, AuthError, AuthenticatedUser};
use crate::ports::SessionValidator;

/// Token table backed validator. Unknown tokens return `InvalidToken`.
#[derive(Debug, Default)]
pub struct MockSessionValidator {
    tokens: RwLock<HashMap<String, AuthenticatedUser>>,
    force_error: RwLock<Option<AuthError>>,
}

impl MockSessionValidator {
    /// Creates a new empty mock validator.
    pub fn new() -> Self {
        Self::default()
    }

    fn tokens(&self) -> RwLockReadGuard<'_, HashMap<String, AuthenticatedUser>> {
        self.tokens.read().unwrap_or_else(|e| e.into_inner())
    }

    fn tokens_mut(&self) -> RwLockWriteGuard<'_, HashMap<String, AuthenticatedUser>> {
        self.tokens.write().unwrap_or_else(|e| e.into_inner())
    }

    fn set_forced(&self, error: Option<AuthError>) {
        *self.force_error.write().unwrap_or_else(|e| e.into_inner()) = error;
    }

    /// Adds a valid token that maps to a user.
    pub fn with_user(self, token: impl Into<String>, user: AuthenticatedUser) -> Self {
        self.add_token(token, user);
        self
    }

    /// Adds a token for a user with the given account ID and a derived email.
    ///
    /// A blank account ID is ignored, leaving the token invalid.
    pub fn with_test_user(self, token: impl Into<String>, account_id: impl Into<String>) -> Self {
        let account_id = account_id.into();
        match AccountId::new(&account_id) {
            Ok(id) => {
                let user = AuthenticatedUser::new(
                    id,
                    Some(format!("{}@partners.example.com", account_id)),
                    Some(format!("Partner {}", account_id)),
                    true,
                );
                self.with_user(token, user)
            }
            Err(_) => self,
        }
    }

    /// Forces all validations to return the specified error.
    pub fn with_error(self, error: AuthError) -> Self {
        self.set_forced(Some(error));
        self
    }

    /// Clears the forced error and returns to normal operation.
    pub fn clear_error(&self) {
        self.set_forced(None);
    }

    /// Registers a new valid token at runtime.
    pub fn add_token(&self, token: impl Into<String>, user: AuthenticatedUser) {
        self.tokens_mut().insert(token.into(), user);
    }

    /// Removes a token, making it invalid.
    pub fn remove_token(&self, token: &str) {
        self.tokens_mut().remove(token);
    }

    /// Returns the number of registered valid tokens.
    pub fn token_count(&self) -> usize {
        self.tokens().len()
    }
}

#[async_trait]
impl SessionValidator for MockSessionValidator {
    async fn validate(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        let forced = self
            .force_error
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        if let Some(error) = forced {
            return Err(error);
        }

        self.tokens()
            .get(token)
            .cloned()
            .ok_or(AuthError::InvalidToken)
    }
}
