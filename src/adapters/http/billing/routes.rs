//! Axum router configuration for billing endpoints.

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::adapters::http::middleware::{auth_middleware, AuthState};

use super::handlers::{
    create_checkout_session, create_portal_session, create_session_request,
    detach_payment_method, get_billing_summary, get_session_request, handle_stripe_webhook,
    health, list_notifications, list_payment_methods, BillingAppState,
};

/// Partner billing routes, mounted at `/api/billing`.
///
/// Every route needs an authenticated caller.
pub fn billing_routes() -> Router<BillingAppState> {
    Router::new()
        .route("/checkout-session", post(create_checkout_session))
        .route("/portal-session", post(create_portal_session))
        .route("/payment-methods", get(list_payment_methods))
        .route("/payment-methods/detach", post(detach_payment_method))
        .route("/account", get(get_billing_summary))
        .route("/notifications", get(list_notifications))
        .route("/session-requests", post(create_session_request))
        .route("/session-requests/:id", get(get_session_request))
}

/// Provider webhook routes, mounted at `/api/webhooks`.
///
/// No user authentication; deliveries are verified by signature.
pub fn webhook_routes() -> Router<BillingAppState> {
    Router::new().route("/stripe", post(handle_stripe_webhook))
}

/// The complete service router.
///
/// Auth runs as a route layer on the billing routes only, so the webhook and
/// health endpoints never see it.
pub fn billing_router(state: BillingAppState, validator: AuthState) -> Router {
    let protected = billing_routes()
        .route_layer(middleware::from_fn_with_state(validator, auth_middleware));

    Router::new()
        .nest("/api/billing", protected)
        .nest("/api/webhooks", webhook_routes())
        .route("/health", get(health))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use crate::adapters::auth::MockSessionValidator;
    use crate::adapters::memory::{
        InMemoryAccountRepository, InMemoryNotificationRepository,
        InMemorySessionRequestRepository,
    };
    use crate::adapters::stripe::MockPaymentProvider;
    use crate::application::handlers::billing::RedirectUrls;
    use crate::domain::billing::{Account, PlanCatalog, SubscriptionPlan};
    use crate::domain::foundation::AccountId;
    use crate::ports::{AccountRepository, WebhookEventType};

    // ════════════════════════════════════════════════════════════════════════════
    // Test Fixture
    // ════════════════════════════════════════════════════════════════════════════

    struct TestApp {
        router: Router,
        accounts: Arc<InMemoryAccountRepository>,
        provider: MockPaymentProvider,
    }

    fn catalog() -> Arc<PlanCatalog> {
        Arc::new(
            PlanCatalog::new()
                .with_price("price_basic", SubscriptionPlan::Basic)
                .with_price("price_pro", SubscriptionPlan::Pro)
                .with_price("price_ent", SubscriptionPlan::Enterprise),
        )
    }

    fn test_app() -> TestApp {
        let account = Account::new(
            AccountId::new("uid-1").unwrap(),
            Some("dana@example.com".to_string()),
            &catalog(),
        );
        let accounts = Arc::new(InMemoryAccountRepository::with_accounts([account]));
        let provider = MockPaymentProvider::new();
        let state = BillingAppState {
            account_repository: accounts.clone(),
            notification_repository: Arc::new(InMemoryNotificationRepository::new()),
            session_request_repository: Arc::new(InMemorySessionRequestRepository::new()),
            payment_provider: Arc::new(provider.clone()),
            plan_catalog: catalog(),
            redirects: RedirectUrls::new("https://partners.example.com"),
        };
        let validator = MockSessionValidator::new().with_test_user("token-1", "uid-1");

        TestApp {
            router: billing_router(state, Arc::new(validator)),
            accounts,
            provider,
        }
    }

    fn authed(method: &str, uri: &str, body: Option<&str>) -> Request<Body> {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("Authorization", "Bearer token-1");
        match body {
            Some(json) => builder
                .header("Content-Type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Route Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn health_needs_no_auth() {
        let app = test_app();

        let response = app
            .router
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn billing_routes_require_auth() {
        let app = test_app();

        let response = app
            .router
            .oneshot(
                Request::get("/api/billing/account")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(response).await["code"], "UNAUTHENTICATED");
    }

    #[tokio::test]
    async fn checkout_session_returns_id_and_url() {
        let app = test_app();

        let response = app
            .router
            .oneshot(authed(
                "POST",
                "/api/billing/checkout-session",
                Some(r#"{"priceId":"price_pro"}"#),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert!(json["sessionId"].as_str().is_some());
        assert!(json["url"]
            .as_str()
            .unwrap()
            .starts_with("https://checkout.stripe.com/"));
        assert_eq!(app.provider.call_count("create_customer"), 1);
    }

    #[tokio::test]
    async fn checkout_without_price_is_400() {
        let app = test_app();

        let response = app
            .router
            .oneshot(authed("POST", "/api/billing/checkout-session", Some("{}")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["code"], "VALIDATION_FAILED");
    }

    #[tokio::test]
    async fn portal_without_customer_is_400() {
        let app = test_app();

        let response = app
            .router
            .oneshot(authed("POST", "/api/billing/portal-session", None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["code"], "FAILED_PRECONDITION");
    }

    #[tokio::test]
    async fn payment_methods_empty_without_customer() {
        let app = test_app();

        let response = app
            .router
            .oneshot(authed("GET", "/api/billing/payment-methods", None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            json_body(response).await,
            serde_json::json!({"paymentMethods": []})
        );
    }

    #[tokio::test]
    async fn detach_without_id_is_400_and_with_id_succeeds() {
        let app = test_app();
        app.accounts
            .set_stripe_customer_id(&AccountId::new("uid-1").unwrap(), "cus_1")
            .await
            .unwrap();
        app.provider
            .add_payment_method("cus_1", MockPaymentProvider::card("pm_1", "4242"));

        let missing = app
            .router
            .clone()
            .oneshot(authed(
                "POST",
                "/api/billing/payment-methods/detach",
                Some("{}"),
            ))
            .await
            .unwrap();
        assert_eq!(missing.status(), StatusCode::BAD_REQUEST);

        let ok = app
            .router
            .oneshot(authed(
                "POST",
                "/api/billing/payment-methods/detach",
                Some(r#"{"paymentMethodId":"pm_1"}"#),
            ))
            .await
            .unwrap();
        assert_eq!(ok.status(), StatusCode::OK);
        assert_eq!(json_body(ok).await, serde_json::json!({"success": true}));
    }

    #[tokio::test]
    async fn detach_with_path_segments_is_400() {
        let app = test_app();

        let response = app
            .router
            .oneshot(authed(
                "POST",
                "/api/billing/payment-methods/detach",
                Some(r#"{"paymentMethodId":"../invoices/x/pay#"}"#),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["code"], "VALIDATION_FAILED");
        assert!(app.provider.calls().is_empty());
    }

    #[tokio::test]
    async fn detach_of_another_customers_method_is_404() {
        let app = test_app();
        app.accounts
            .set_stripe_customer_id(&AccountId::new("uid-1").unwrap(), "cus_1")
            .await
            .unwrap();
        app.provider
            .add_payment_method("cus_other", MockPaymentProvider::card("pm_other", "1881"));

        let response = app
            .router
            .oneshot(authed(
                "POST",
                "/api/billing/payment-methods/detach",
                Some(r#"{"paymentMethodId":"pm_other"}"#),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_body(response).await["code"], "NOT_FOUND");
        assert_eq!(app.provider.call_count("detach_payment_method"), 0);
    }

    #[tokio::test]
    async fn billing_summary_reports_default_plan() {
        let app = test_app();

        let response = app
            .router
            .oneshot(authed("GET", "/api/billing/account", None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["subscription"], "Basic");
        assert_eq!(json["maxLeads"], 25);
        assert_eq!(json["hasPaymentCustomer"], false);
    }

    #[tokio::test]
    async fn session_request_round_trip() {
        let app = test_app();

        let created = app
            .router
            .clone()
            .oneshot(authed(
                "POST",
                "/api/billing/session-requests",
                Some(r#"{"kind":"checkout","priceId":"price_pro"}"#),
            ))
            .await
            .unwrap();
        assert_eq!(created.status(), StatusCode::CREATED);
        let created = json_body(created).await;
        assert_eq!(created["status"], "completed");
        let id = created["id"].as_str().unwrap().to_string();

        let fetched = app
            .router
            .oneshot(authed(
                "GET",
                &format!("/api/billing/session-requests/{}", id),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(fetched.status(), StatusCode::OK);
        assert_eq!(json_body(fetched).await["url"], created["url"]);
    }

    #[tokio::test]
    async fn webhook_without_signature_is_400() {
        let app = test_app();

        let response = app
            .router
            .oneshot(
                Request::post("/api/webhooks/stripe")
                    .body(Body::from("{}"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn webhook_applies_subscription() {
        let app = test_app();
        app.provider
            .set_webhook_event(MockPaymentProvider::subscription_event(
                WebhookEventType::SubscriptionCreated,
                "cus_1",
                "price_pro",
                Some("uid-1"),
            ));

        let response = app
            .router
            .oneshot(
                Request::post("/api/webhooks/stripe")
                    .header("Stripe-Signature", "t=1,v1=abc")
                    .body(Body::from("{}"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, serde_json::json!({"received": true}));
        let account = app
            .accounts
            .find_by_id(&AccountId::new("uid-1").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(account.subscription, SubscriptionPlan::Pro);
    }
}
