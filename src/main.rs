//! Partner billing service.
//!
//! Loads configuration, wires adapters into the billing router and serves it
//! until Ctrl-C or SIGTERM.

use std::sync::Arc;

use axum::http::HeaderValue;
use axum::Router;
use sqlx::postgres::PgPoolOptions;
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use partner_billing::adapters::auth::{FirebaseConfig, FirebaseSessionValidator};
use partner_billing::adapters::http::{billing_router, AuthState, BillingAppState};
use partner_billing::adapters::memory::{
    InMemoryAccountRepository, InMemoryNotificationRepository, InMemorySessionRequestRepository,
};
use partner_billing::adapters::postgres::{
    PostgresAccountRepository, PostgresNotificationRepository, PostgresSessionRequestRepository,
};
use partner_billing::adapters::stripe::{StripeConfig, StripePaymentAdapter};
use partner_billing::application::RedirectUrls;
use partner_billing::config::{AppConfig, DatabaseConfig, ServerConfig};
use partner_billing::ports::{AccountRepository, NotificationRepository, SessionRequestRepository};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load()?;
    config.validate()?;

    init_tracing(&config.server);
    tracing::info!(
        environment = ?config.server.environment,
        port = config.server.port,
        "Starting partner billing"
    );

    let (accounts, notifications, requests) = build_repositories(&config.database).await?;

    let catalog = config.payment.plan_catalog();
    if catalog.is_empty() {
        tracing::warn!("No plan price IDs configured; checkout will reject every price");
    }

    let state = BillingAppState {
        account_repository: accounts,
        notification_repository: notifications,
        session_request_repository: requests,
        payment_provider: Arc::new(StripePaymentAdapter::new(
            StripeConfig::from_payment_config(&config.payment),
        )),
        plan_catalog: Arc::new(catalog),
        redirects: RedirectUrls::new(config.payment.base_url()),
    };
    let validator: AuthState = Arc::new(FirebaseSessionValidator::new(
        FirebaseConfig::from_auth_config(&config.auth),
    ));

    let app = build_app(billing_router(state, validator), &config.server);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(address = %addr, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

fn init_tracing(server: &ServerConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&server.log_level));
    let registry = tracing_subscriber::registry().with(filter);

    if server.is_production() {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer().pretty()).init();
    }
}

type Repositories = (
    Arc<dyn AccountRepository>,
    Arc<dyn NotificationRepository>,
    Arc<dyn SessionRequestRepository>,
);

async fn build_repositories(database: &DatabaseConfig) -> anyhow::Result<Repositories> {
    if !database.is_configured() {
        tracing::warn!("No database URL configured; using in-memory stores");
        let accounts: Arc<dyn AccountRepository> = Arc::new(InMemoryAccountRepository::new());
        let notifications: Arc<dyn NotificationRepository> =
            Arc::new(InMemoryNotificationRepository::new());
        let requests: Arc<dyn SessionRequestRepository> =
            Arc::new(InMemorySessionRequestRepository::new());
        return Ok((accounts, notifications, requests));
    }

    let pool = PgPoolOptions::new()
        .min_connections(database.min_connections)
        .max_connections(database.max_connections)
        .acquire_timeout(database.acquire_timeout())
        .idle_timeout(database.idle_timeout())
        .max_lifetime(database.max_lifetime())
        .connect(&database.url)
        .await?;
    tracing::info!(max_connections = database.max_connections, "Database pool created");

    if database.run_migrations {
        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("Database migrations applied");
    }

    let accounts: Arc<dyn AccountRepository> =
        Arc::new(PostgresAccountRepository::new(pool.clone()));
    let notifications: Arc<dyn NotificationRepository> =
        Arc::new(PostgresNotificationRepository::new(pool.clone()));
    let requests: Arc<dyn SessionRequestRepository> =
        Arc::new(PostgresSessionRequestRepository::new(pool));
    Ok((accounts, notifications, requests))
}

fn build_app(router: Router, server: &ServerConfig) -> Router {
    // Outermost first.
    let middleware = ServiceBuilder::new()
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_layer(server))
        .layer(TimeoutLayer::new(server.request_timeout()));

    router.layer(middleware)
}

fn cors_layer(server: &ServerConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = server
        .cors_origins_list()
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(origins)
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl-C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => tracing::error!(error = %e, "Failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
