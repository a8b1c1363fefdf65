//! HTTP DTOs (Data Transfer Objects) for billing endpoints.
//!
//! Request bodies default every field so a missing key reaches the handler
//! as `None` and is reported as a validation failure there.

use serde::{Deserialize, Serialize};

use crate::application::handlers::billing::{
    CreateCheckoutSessionResult, CreatePortalSessionResult, GetBillingSummaryResult,
};
use crate::domain::billing::{
    BillingDetails, Notification, SessionRequest, SubscriptionPlan,
};
use crate::ports::PaymentMethod;

// ════════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Body of `POST /api/billing/checkout-session`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CheckoutSessionRequest {
    pub price_id: Option<String>,
}

/// Body of `POST /api/billing/payment-methods/detach`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DetachPaymentMethodRequest {
    pub payment_method_id: Option<String>,
}

/// Body of `POST /api/billing/session-requests`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CreateSessionRequestRequest {
    /// `checkout` or `portal`.
    pub kind: Option<String>,
    pub price_id: Option<String>,
}

/// Query string of `GET /api/billing/notifications`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NotificationsParams {
    pub limit: Option<u32>,
}

// ════════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSessionResponse {
    pub session_id: String,
    pub url: String,
}

impl From<CreateCheckoutSessionResult> for CheckoutSessionResponse {
    fn from(result: CreateCheckoutSessionResult) -> Self {
        Self {
            session_id: result.session_id,
            url: result.url,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PortalSessionResponse {
    pub url: String,
}

impl From<CreatePortalSessionResult> for PortalSessionResponse {
    fn from(result: CreatePortalSessionResult) -> Self {
        Self { url: result.url }
    }
}

/// One stored payment method.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentMethodResponse {
    pub id: String,
    #[serde(rename = "type")]
    pub method_type: String,
    pub brand: Option<String>,
    pub last4: Option<String>,
    pub exp_month: Option<u32>,
    pub exp_year: Option<u32>,
}

impl From<PaymentMethod> for PaymentMethodResponse {
    fn from(pm: PaymentMethod) -> Self {
        let card = pm.card;
        Self {
            id: pm.id,
            method_type: pm.method_type,
            brand: card.as_ref().map(|c| c.brand.clone()),
            last4: card.as_ref().map(|c| c.last4.clone()),
            exp_month: card.as_ref().map(|c| c.exp_month),
            exp_year: card.as_ref().map(|c| c.exp_year),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentMethodsResponse {
    pub payment_methods: Vec<PaymentMethodResponse>,
}

impl From<Vec<PaymentMethod>> for PaymentMethodsResponse {
    fn from(methods: Vec<PaymentMethod>) -> Self {
        Self {
            payment_methods: methods.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Billing state of the caller's account.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingSummaryResponse {
    pub subscription: SubscriptionPlan,
    pub max_leads: u32,
    pub billing: BillingDetails,
    pub has_payment_customer: bool,
}

impl From<GetBillingSummaryResult> for BillingSummaryResponse {
    fn from(result: GetBillingSummaryResult) -> Self {
        Self {
            subscription: result.subscription,
            max_leads: result.max_leads,
            billing: result.billing,
            has_payment_customer: result.has_payment_customer,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationResponse {
    pub id: String,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub read: bool,
    /// ISO 8601.
    pub created_at: String,
}

impl From<Notification> for NotificationResponse {
    fn from(n: Notification) -> Self {
        Self {
            id: n.id.to_string(),
            title: n.title,
            message: n.message,
            kind: n.kind.as_str().to_string(),
            read: n.read,
            created_at: n.created_at.as_datetime().to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NotificationsResponse {
    pub notifications: Vec<NotificationResponse>,
}

impl From<Vec<Notification>> for NotificationsResponse {
    fn from(notifications: Vec<Notification>) -> Self {
        Self {
            notifications: notifications.into_iter().map(Into::into).collect(),
        }
    }
}

/// Session request record as returned to its owner.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRequestResponse {
    pub id: String,
    pub kind: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<SessionRequest> for SessionRequestResponse {
    fn from(r: SessionRequest) -> Self {
        Self {
            id: r.id.to_string(),
            kind: r.kind.as_str().to_string(),
            status: r.status.as_str().to_string(),
            price_id: r.price_id,
            session_id: r.session_id,
            url: r.url,
            error: r.error,
            created_at: r.created_at.as_datetime().to_rfc3339(),
            updated_at: r.updated_at.as_datetime().to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WebhookAckResponse {
    pub received: bool,
}

/// Error body shared by every endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Human-readable message.
    pub error: String,
    /// SCREAMING_SNAKE error code.
    pub code: String,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: code.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::CardDetails;

    #[test]
    fn checkout_request_tolerates_missing_price() {
        let request: CheckoutSessionRequest = serde_json::from_str("{}").unwrap();
        assert!(request.price_id.is_none());

        let request: CheckoutSessionRequest =
            serde_json::from_str(r#"{"priceId":"price_pro"}"#).unwrap();
        assert_eq!(request.price_id.as_deref(), Some("price_pro"));
    }

    #[test]
    fn payment_method_response_flattens_card() {
        let response = PaymentMethodResponse::from(PaymentMethod {
            id: "pm_1".to_string(),
            method_type: "card".to_string(),
            card: Some(CardDetails {
                brand: "visa".to_string(),
                last4: "4242".to_string(),
                exp_month: 12,
                exp_year: 2030,
            }),
            created: 0,
        });

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["type"], "card");
        assert_eq!(json["last4"], "4242");
        assert_eq!(json["expMonth"], 12);
        assert_eq!(json["expYear"], 2030);
    }

    #[test]
    fn payment_method_without_card_has_null_details() {
        let json = serde_json::to_value(PaymentMethodResponse::from(PaymentMethod {
            id: "pm_2".to_string(),
            method_type: "us_bank_account".to_string(),
            card: None,
            created: 0,
        }))
        .unwrap();

        assert!(json["brand"].is_null());
        assert!(json["last4"].is_null());
    }

    #[test]
    fn error_response_shape() {
        let json = serde_json::to_value(ErrorResponse::new("VALIDATION_FAILED", "bad")).unwrap();
        assert_eq!(json, serde_json::json!({"error": "bad", "code": "VALIDATION_FAILED"}));
    }
}
