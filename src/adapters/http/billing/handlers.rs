//! HTTP handlers for billing endpoints.
//!
//! These handlers connect Axum routes to application layer command/query handlers.

use std::str::FromStr;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Json, Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;

use crate::adapters::http::middleware::RequireAuth;
use crate::application::handlers::billing::{
    CreateCheckoutSessionCommand, CreateCheckoutSessionHandler, CreatePortalSessionCommand,
    CreatePortalSessionHandler, CreateSessionRequestCommand, CreateSessionRequestHandler,
    DetachPaymentMethodCommand, DetachPaymentMethodHandler, GetBillingSummaryHandler,
    GetBillingSummaryQuery, GetSessionRequestHandler, GetSessionRequestQuery,
    HandleBillingWebhookCommand, HandleBillingWebhookHandler, ListNotificationsHandler,
    ListNotificationsQuery, ListPaymentMethodsHandler, ListPaymentMethodsQuery,
    ProcessSessionRequestHandler, RedirectUrls,
};
use crate::domain::billing::{BillingError, PlanCatalog};
use crate::domain::foundation::{DomainError, SessionRequestId};
use crate::ports::{
    AccountRepository, NotificationRepository, PaymentProvider, SessionRequestRepository,
};

use super::dto::{
    BillingSummaryResponse, CheckoutSessionRequest, CheckoutSessionResponse,
    CreateSessionRequestRequest, DetachPaymentMethodRequest, ErrorResponse, NotificationsParams,
    NotificationsResponse, PaymentMethodsResponse, PortalSessionResponse, SessionRequestResponse,
    SuccessResponse, WebhookAckResponse,
};

/// Header carrying the webhook signature.
pub const STRIPE_SIGNATURE_HEADER: &str = "Stripe-Signature";

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared state for billing routes.
///
/// Cloned per request; every dependency is behind an `Arc`.
#[derive(Clone)]
pub struct BillingAppState {
    pub account_repository: Arc<dyn AccountRepository>,
    pub notification_repository: Arc<dyn NotificationRepository>,
    pub session_request_repository: Arc<dyn SessionRequestRepository>,
    pub payment_provider: Arc<dyn PaymentProvider>,
    pub plan_catalog: Arc<PlanCatalog>,
    pub redirects: RedirectUrls,
}

impl BillingAppState {
    /// Create handlers on demand from the shared state.
    pub fn checkout_session_handler(&self) -> CreateCheckoutSessionHandler {
        CreateCheckoutSessionHandler::new(
            self.account_repository.clone(),
            self.payment_provider.clone(),
            self.plan_catalog.clone(),
            self.redirects.clone(),
        )
    }

    pub fn portal_session_handler(&self) -> CreatePortalSessionHandler {
        CreatePortalSessionHandler::new(
            self.account_repository.clone(),
            self.payment_provider.clone(),
            self.redirects.clone(),
        )
    }

    pub fn list_payment_methods_handler(&self) -> ListPaymentMethodsHandler {
        ListPaymentMethodsHandler::new(
            self.account_repository.clone(),
            self.payment_provider.clone(),
        )
    }

    pub fn detach_payment_method_handler(&self) -> DetachPaymentMethodHandler {
        DetachPaymentMethodHandler::new(
            self.account_repository.clone(),
            self.payment_provider.clone(),
        )
    }

    pub fn billing_summary_handler(&self) -> GetBillingSummaryHandler {
        GetBillingSummaryHandler::new(self.account_repository.clone())
    }

    pub fn list_notifications_handler(&self) -> ListNotificationsHandler {
        ListNotificationsHandler::new(self.notification_repository.clone())
    }

    pub fn process_session_request_handler(&self) -> ProcessSessionRequestHandler {
        ProcessSessionRequestHandler::new(
            self.session_request_repository.clone(),
            Arc::new(self.checkout_session_handler()),
            Arc::new(self.portal_session_handler()),
        )
    }

    pub fn create_session_request_handler(&self) -> CreateSessionRequestHandler {
        CreateSessionRequestHandler::new(
            self.session_request_repository.clone(),
            Arc::new(self.process_session_request_handler()),
        )
    }

    pub fn get_session_request_handler(&self) -> GetSessionRequestHandler {
        GetSessionRequestHandler::new(self.session_request_repository.clone())
    }

    pub fn webhook_handler(&self) -> HandleBillingWebhookHandler {
        HandleBillingWebhookHandler::new(
            self.account_repository.clone(),
            self.notification_repository.clone(),
            self.payment_provider.clone(),
            self.plan_catalog.clone(),
        )
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Command Handlers (POST endpoints)
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/billing/checkout-session
pub async fn create_checkout_session(
    State(state): State<BillingAppState>,
    RequireAuth(user): RequireAuth,
    body: Option<Json<CheckoutSessionRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let request = body.map(|Json(b)| b).unwrap_or_default();
    let cmd = CreateCheckoutSessionCommand {
        account_id: user.id,
        email: user.email,
        display_name: user.display_name,
        price_id: request.price_id,
    };

    let result = state.checkout_session_handler().handle(cmd).await?;

    Ok(Json(CheckoutSessionResponse::from(result)))
}

/// POST /api/billing/portal-session
pub async fn create_portal_session(
    State(state): State<BillingAppState>,
    RequireAuth(user): RequireAuth,
) -> Result<impl IntoResponse, ApiError> {
    let cmd = CreatePortalSessionCommand {
        account_id: user.id,
    };

    let result = state.portal_session_handler().handle(cmd).await?;

    Ok(Json(PortalSessionResponse::from(result)))
}

/// POST /api/billing/payment-methods/detach
pub async fn detach_payment_method(
    State(state): State<BillingAppState>,
    RequireAuth(user): RequireAuth,
    body: Option<Json<DetachPaymentMethodRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let request = body.map(|Json(b)| b).unwrap_or_default();
    let cmd = DetachPaymentMethodCommand {
        account_id: user.id,
        payment_method_id: request.payment_method_id,
    };

    state.detach_payment_method_handler().handle(cmd).await?;

    Ok(Json(SuccessResponse { success: true }))
}

/// POST /api/billing/session-requests
///
/// Answers 201 with the processed record, including records that failed.
pub async fn create_session_request(
    State(state): State<BillingAppState>,
    RequireAuth(user): RequireAuth,
    body: Option<Json<CreateSessionRequestRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let request = body.map(|Json(b)| b).unwrap_or_default();
    let cmd = CreateSessionRequestCommand {
        account_id: user.id,
        email: user.email,
        display_name: user.display_name,
        kind: request.kind,
        price_id: request.price_id,
    };

    let record = state.create_session_request_handler().handle(cmd).await?;

    Ok((StatusCode::CREATED, Json(SessionRequestResponse::from(record))))
}

/// POST /api/webhooks/stripe
pub async fn handle_stripe_webhook(
    State(state): State<BillingAppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let signature = headers
        .get(STRIPE_SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            BillingError::validation(STRIPE_SIGNATURE_HEADER, "Missing Stripe-Signature header")
        })?;

    let cmd = HandleBillingWebhookCommand {
        payload: body.to_vec(),
        signature: signature.to_string(),
    };

    state.webhook_handler().handle(cmd).await?;

    Ok(Json(WebhookAckResponse { received: true }))
}

// ════════════════════════════════════════════════════════════════════════════════
// Query Handlers (GET endpoints)
// ════════════════════════════════════════════════════════════════════════════════

/// GET /api/billing/payment-methods
pub async fn list_payment_methods(
    State(state): State<BillingAppState>,
    RequireAuth(user): RequireAuth,
) -> Result<impl IntoResponse, ApiError> {
    let query = ListPaymentMethodsQuery {
        account_id: user.id,
    };

    let methods = state.list_payment_methods_handler().handle(query).await?;

    Ok(Json(PaymentMethodsResponse::from(methods)))
}

/// GET /api/billing/account
pub async fn get_billing_summary(
    State(state): State<BillingAppState>,
    RequireAuth(user): RequireAuth,
) -> Result<impl IntoResponse, ApiError> {
    let query = GetBillingSummaryQuery {
        account_id: user.id,
    };

    let result = state.billing_summary_handler().handle(query).await?;

    Ok(Json(BillingSummaryResponse::from(result)))
}

/// GET /api/billing/notifications?limit=
pub async fn list_notifications(
    State(state): State<BillingAppState>,
    RequireAuth(user): RequireAuth,
    params: Option<Query<NotificationsParams>>,
) -> Result<impl IntoResponse, ApiError> {
    let params = params.map(|Query(p)| p).unwrap_or_default();
    let query = ListNotificationsQuery {
        account_id: user.id,
        limit: params.limit,
    };

    let notifications = state.list_notifications_handler().handle(query).await?;

    Ok(Json(NotificationsResponse::from(notifications)))
}

/// GET /api/billing/session-requests/:id
pub async fn get_session_request(
    State(state): State<BillingAppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let request_id = SessionRequestId::from_str(&id)
        .map_err(|_| BillingError::validation("id", "Invalid session request id"))?;
    let query = GetSessionRequestQuery {
        account_id: user.id,
        request_id,
    };

    let record = state.get_session_request_handler().handle(query).await?;

    Ok(Json(SessionRequestResponse::from(record)))
}

/// GET /health
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error type that converts billing errors to HTTP responses.
#[derive(Debug)]
pub struct ApiError(pub BillingError);

impl From<BillingError> for ApiError {
    fn from(err: BillingError) -> Self {
        Self(err)
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        Self(BillingError::from(err))
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            BillingError::ValidationFailed { .. }
            | BillingError::FailedPrecondition(_)
            | BillingError::InvalidWebhookSignature => StatusCode::BAD_REQUEST,
            BillingError::AccountNotFound(_)
            | BillingError::AccountNotResolved(_)
            | BillingError::SessionRequestNotFound(_)
            | BillingError::PaymentMethodNotFound(_) => StatusCode::NOT_FOUND,
            BillingError::PaymentProvider(_) | BillingError::Infrastructure(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.0, code = %self.0.code(), "Request failed");
        } else {
            tracing::debug!(error = %self.0, code = %self.0.code(), "Request rejected");
        }

        let body = ErrorResponse::new(self.0.code().to_string(), self.0.to_string());
        (status, Json(body)).into_response()
    }
}
