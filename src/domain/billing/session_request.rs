//! Ephemeral checkout and portal session requests.
//!
//! A request is created `pending`, then filled in exactly once with either the
//! created session or the error that prevented it.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{AccountId, SessionRequestId, Timestamp};

use super::errors::BillingError;

/// Which hosted page the request asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionRequestKind {
    Checkout,
    Portal,
}

impl SessionRequestKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionRequestKind::Checkout => "checkout",
            SessionRequestKind::Portal => "portal",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "checkout" => Some(SessionRequestKind::Checkout),
            "portal" => Some(SessionRequestKind::Portal),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionRequestStatus {
    Pending,
    Completed,
    Failed,
}

impl SessionRequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionRequestStatus::Pending => "pending",
            SessionRequestStatus::Completed => "completed",
            SessionRequestStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(SessionRequestStatus::Pending),
            "completed" => Some(SessionRequestStatus::Completed),
            "failed" => Some(SessionRequestStatus::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, SessionRequestStatus::Pending)
    }
}

/// A request for a hosted checkout or portal page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRequest {
    pub id: SessionRequestId,
    pub account_id: AccountId,
    pub kind: SessionRequestKind,
    pub price_id: Option<String>,
    pub status: SessionRequestStatus,
    pub session_id: Option<String>,
    pub url: Option<String>,
    pub error: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl SessionRequest {
    fn pending(account_id: AccountId, kind: SessionRequestKind, price_id: Option<String>) -> Self {
        let now = Timestamp::now();
        Self {
            id: SessionRequestId::new(),
            account_id,
            kind,
            price_id,
            status: SessionRequestStatus::Pending,
            session_id: None,
            url: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// New pending checkout request for the given price.
    pub fn checkout(account_id: AccountId, price_id: impl Into<String>) -> Self {
        Self::pending(account_id, SessionRequestKind::Checkout, Some(price_id.into()))
    }

    /// New pending portal request.
    pub fn portal(account_id: AccountId) -> Self {
        Self::pending(account_id, SessionRequestKind::Portal, None)
    }

    pub fn is_pending(&self) -> bool {
        self.status == SessionRequestStatus::Pending
    }

    /// Records the created session.
    ///
    /// # Errors
    ///
    /// Returns `FailedPrecondition` if the request was already filled in.
    pub fn complete(
        &mut self,
        session_id: impl Into<String>,
        url: impl Into<String>,
    ) -> Result<(), BillingError> {
        self.ensure_pending()?;
        self.status = SessionRequestStatus::Completed;
        self.session_id = Some(session_id.into());
        self.url = Some(url.into());
        self.updated_at = Timestamp::now();
        Ok(())
    }

    /// Records the error that prevented the session.
    ///
    /// # Errors
    ///
    /// Returns `FailedPrecondition` if the request was already filled in.
    pub fn fail(&mut self, error: impl Into<String>) -> Result<(), BillingError> {
        self.ensure_pending()?;
        self.status = SessionRequestStatus::Failed;
        self.error = Some(error.into());
        self.updated_at = Timestamp::now();
        Ok(())
    }

    fn ensure_pending(&self) -> Result<(), BillingError> {
        if self.status.is_terminal() {
            return Err(BillingError::failed_precondition(format!(
                "Session request {} is already {}",
                self.id,
                self.status.as_str()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account_id() -> AccountId {
        AccountId::new("uid-1").unwrap()
    }

    #[test]
    fn checkout_request_starts_pending_with_price() {
        let req = SessionRequest::checkout(account_id(), "price_pro");
        assert!(req.is_pending());
        assert_eq!(req.kind, SessionRequestKind::Checkout);
        assert_eq!(req.price_id.as_deref(), Some("price_pro"));
        assert!(req.session_id.is_none());
    }

    #[test]
    fn portal_request_has_no_price() {
        let req = SessionRequest::portal(account_id());
        assert_eq!(req.kind, SessionRequestKind::Portal);
        assert!(req.price_id.is_none());
    }

    #[test]
    fn complete_fills_session_fields() {
        let mut req = SessionRequest::checkout(account_id(), "price_pro");
        req.complete("cs_123", "https://checkout.example/cs_123").unwrap();

        assert_eq!(req.status, SessionRequestStatus::Completed);
        assert_eq!(req.session_id.as_deref(), Some("cs_123"));
        assert_eq!(req.url.as_deref(), Some("https://checkout.example/cs_123"));
        assert!(req.error.is_none());
    }

    #[test]
    fn fail_records_error() {
        let mut req = SessionRequest::portal(account_id());
        req.fail("no customer").unwrap();

        assert_eq!(req.status, SessionRequestStatus::Failed);
        assert_eq!(req.error.as_deref(), Some("no customer"));
    }

    #[test]
    fn second_transition_is_rejected() {
        let mut req = SessionRequest::portal(account_id());
        req.complete("bps_1", "https://portal.example").unwrap();

        let err = req.fail("late failure").unwrap_err();
        assert!(matches!(err, BillingError::FailedPrecondition(_)));
        assert_eq!(req.status, SessionRequestStatus::Completed);
        assert!(req.error.is_none());

        assert!(req.complete("bps_2", "https://other").is_err());
        assert_eq!(req.session_id.as_deref(), Some("bps_1"));
    }

    #[test]
    fn kind_parse_ignores_case() {
        assert_eq!(SessionRequestKind::parse("Checkout"), Some(SessionRequestKind::Checkout));
        assert_eq!(SessionRequestKind::parse("portal"), Some(SessionRequestKind::Portal));
        assert_eq!(SessionRequestKind::parse("refund"), None);
    }

    #[test]
    fn serializes_camel_case() {
        let req = SessionRequest::checkout(account_id(), "price_basic");
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["kind"], "checkout");
        assert_eq!(json["status"], "pending");
        assert_eq!(json["priceId"], "price_basic");
        assert_eq!(json["accountId"], "uid-1");
    }
}
