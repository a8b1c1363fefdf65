//! Billing-specific error types.
//!
//! # HTTP Status Mapping
//!
//! | Error | HTTP Status |
//! |-------|-------------|
//! | ValidationFailed | 400 |
//! | FailedPrecondition | 400 |
//! | InvalidWebhookSignature | 400 |
//! | AccountNotFound | 404 |
//! | AccountNotResolved | 404 |
//! | SessionRequestNotFound | 404 |
//! | PaymentMethodNotFound | 404 |
//! | PaymentProvider | 500 |
//! | Infrastructure | 500 |

use thiserror::Error;

use crate::domain::foundation::{AccountId, DomainError, ErrorCode, SessionRequestId};

/// Errors surfaced by billing handlers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BillingError {
    /// A required input is missing or malformed.
    #[error("Validation failed for '{field}': {message}")]
    ValidationFailed { field: String, message: String },

    /// No account record exists for the caller.
    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),

    /// A webhook event could not be matched to any account.
    #[error("No account matches {0}")]
    AccountNotResolved(String),

    #[error("Session request not found: {0}")]
    SessionRequestNotFound(SessionRequestId),

    /// The payment method is not saved on the caller's customer.
    #[error("Payment method not found: {0}")]
    PaymentMethodNotFound(String),

    /// The action requires state the account does not have.
    #[error("{0}")]
    FailedPrecondition(String),

    #[error("Invalid webhook signature")]
    InvalidWebhookSignature,

    /// The payment provider rejected or failed the call.
    #[error("Payment provider error: {0}")]
    PaymentProvider(String),

    #[error("Error: {0}")]
    Infrastructure(String),
}

impl BillingError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        BillingError::ValidationFailed {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn account_not_found(id: AccountId) -> Self {
        BillingError::AccountNotFound(id)
    }

    pub fn account_not_resolved(description: impl Into<String>) -> Self {
        BillingError::AccountNotResolved(description.into())
    }

    pub fn payment_method_not_found(id: impl Into<String>) -> Self {
        BillingError::PaymentMethodNotFound(id.into())
    }

    pub fn failed_precondition(message: impl Into<String>) -> Self {
        BillingError::FailedPrecondition(message.into())
    }

    pub fn invalid_webhook_signature() -> Self {
        BillingError::InvalidWebhookSignature
    }

    pub fn payment_provider(message: impl Into<String>) -> Self {
        BillingError::PaymentProvider(message.into())
    }

    pub fn infrastructure(message: impl Into<String>) -> Self {
        BillingError::Infrastructure(message.into())
    }

    /// Returns the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            BillingError::ValidationFailed { .. } => ErrorCode::ValidationFailed,
            BillingError::AccountNotFound(_) | BillingError::AccountNotResolved(_) => {
                ErrorCode::AccountNotFound
            }
            BillingError::SessionRequestNotFound(_) => ErrorCode::SessionRequestNotFound,
            BillingError::PaymentMethodNotFound(_) => ErrorCode::NotFound,
            BillingError::FailedPrecondition(_) => ErrorCode::FailedPrecondition,
            BillingError::InvalidWebhookSignature => ErrorCode::InvalidWebhookSignature,
            BillingError::PaymentProvider(_) => ErrorCode::ExternalServiceError,
            BillingError::Infrastructure(_) => ErrorCode::InternalError,
        }
    }

    /// Returns true if the caller may succeed by retrying later.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            BillingError::Infrastructure(_)
                | BillingError::PaymentProvider(_)
                | BillingError::AccountNotResolved(_)
        )
    }
}

impl From<DomainError> for BillingError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::ValidationFailed => BillingError::ValidationFailed {
                field: err.details.get("field").cloned().unwrap_or_default(),
                message: err.message,
            },
            ErrorCode::AccountNotFound => match err
                .details
                .get("account_id")
                .and_then(|id| AccountId::new(id.as_str()).ok())
            {
                Some(id) => BillingError::AccountNotFound(id),
                None => BillingError::AccountNotResolved(err.message),
            },
            ErrorCode::FailedPrecondition => BillingError::FailedPrecondition(err.message),
            ErrorCode::ExternalServiceError | ErrorCode::PaymentRequired => {
                BillingError::PaymentProvider(err.message)
            }
            _ => BillingError::Infrastructure(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_match_variants() {
        assert_eq!(
            BillingError::validation("priceId", "required").code(),
            ErrorCode::ValidationFailed
        );
        assert_eq!(
            BillingError::account_not_resolved("cus_1").code(),
            ErrorCode::AccountNotFound
        );
        assert_eq!(
            BillingError::failed_precondition("no customer").code(),
            ErrorCode::FailedPrecondition
        );
        assert_eq!(
            BillingError::invalid_webhook_signature().code(),
            ErrorCode::InvalidWebhookSignature
        );
        assert_eq!(
            BillingError::payment_method_not_found("pm_1").code(),
            ErrorCode::NotFound
        );
    }

    #[test]
    fn display_messages() {
        let err = BillingError::validation("priceId", "is required");
        assert_eq!(err.to_string(), "Validation failed for 'priceId': is required");

        let err = BillingError::account_not_found(AccountId::new("uid-9").unwrap());
        assert_eq!(err.to_string(), "Account not found: uid-9");
    }

    #[test]
    fn unresolved_account_is_retryable_for_webhooks() {
        assert!(BillingError::account_not_resolved("customer cus_1").is_retryable());
        assert!(!BillingError::invalid_webhook_signature().is_retryable());
        assert!(!BillingError::validation("f", "m").is_retryable());
    }

    #[test]
    fn domain_account_not_found_keeps_id() {
        let domain = DomainError::new(ErrorCode::AccountNotFound, "Account not found")
            .with_detail("account_id", "uid-5");
        let err: BillingError = domain.into();
        assert_eq!(err, BillingError::AccountNotFound(AccountId::new("uid-5").unwrap()));
    }

    #[test]
    fn domain_database_error_becomes_infrastructure() {
        let err: BillingError = DomainError::database("pool timed out").into();
        assert!(matches!(err, BillingError::Infrastructure(ref m) if m.contains("pool timed out")));
    }

    #[test]
    fn domain_validation_keeps_field() {
        let err: BillingError = DomainError::validation("email", "bad").into();
        assert_eq!(err, BillingError::validation("email", "bad"));
    }
}
