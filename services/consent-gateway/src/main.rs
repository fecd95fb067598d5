//! Consent Gateway
//!
//! Single-binary Rust service that:
//! 1. Relays a caller's bearer token to a protected downstream API
//! 2. Detects consent-required rejections and answers with a PKCE login link
//! 3. Receives the identity provider's redirect and shows a status page

mod callback;
mod config;
mod error;
mod metrics;
mod pages;
mod step_up;

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use axum::Router;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::get;
use consent_auth::{AuthorizeEndpoint, CALLBACK_PATH, PendingConsents};
use downstream::{Downstream, HttpDownstream};
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, error, info, info_span, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::callback::CallbackParams;
use crate::config::Config;
use crate::step_up::StepUp;

/// Maximum time to wait for in-flight requests after a shutdown signal.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Shared application state accessible from all handlers
#[derive(Clone)]
struct AppState {
    step_up: Arc<StepUp>,
    downstream: Arc<dyn Downstream>,
    pending: Arc<PendingConsents>,
    prometheus: PrometheusHandle,
    started_at: Instant,
}

/// Build the axum router with all routes and shared state.
fn build_router(state: AppState, max_connections: usize) -> Router {
    Router::new()
        .route("/profile", get(profile_handler).post(profile_handler))
        .route(CALLBACK_PATH, get(callback_handler))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .layer(tower::limit::ConcurrencyLimitLayer::new(max_connections))
        .with_state(state)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and LOG_LEVEL / RUST_LOG support
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("starting consent-gateway");

    let prometheus = metrics::install_recorder();

    // CLI: simple --config flag parsing
    let args: Vec<String> = std::env::args().collect();
    let cli_config_path = args
        .iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str());

    let config_path = Config::resolve_path(cli_config_path);
    info!(path = %config_path.display(), "loading configuration");

    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    let endpoint = AuthorizeEndpoint::new(
        &config.azure_ad.authority,
        &config.azure_ad.tenant_id,
        &config.azure_ad.client_id,
        &config.azure_ad.scopes,
    )
    .context("invalid app registration")?;

    info!(
        listen_addr = %config.server.listen_addr,
        downstream_url = %config.downstream.url,
        tenant_id = endpoint.tenant_id(),
        client_id = endpoint.client_id(),
        scope = endpoint.scope(),
        "configuration loaded"
    );

    let pending = Arc::new(PendingConsents::with_limit(
        Duration::from_secs(config.consent.pending_ttl_secs),
        config.consent.max_pending,
    ));
    let downstream: Arc<dyn Downstream> = Arc::new(HttpDownstream::new(
        reqwest::Client::new(),
        config.downstream.url.clone(),
        Duration::from_secs(config.downstream.timeout_secs),
    ));

    let state = AppState {
        step_up: Arc::new(StepUp::new(
            endpoint,
            pending.clone(),
            config.server.public_base_url.clone(),
        )),
        downstream,
        pending,
        prometheus,
        started_at: Instant::now(),
    };

    let app = build_router(state, config.server.max_connections);

    let listen_addr = config.server.listen_addr;
    let listener = TcpListener::bind(listen_addr)
        .await
        .with_context(|| format!("failed to bind to {listen_addr}"))?;
    info!(addr = %listen_addr, "accepting requests");

    // The drain timeout starts when the shutdown signal fires, not when the
    // server starts.
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    let server_handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
    });

    shutdown_signal().await;
    let _ = shutdown_tx.send(());

    match tokio::time::timeout(DRAIN_TIMEOUT, server_handle).await {
        Ok(Ok(Ok(()))) => info!("all in-flight requests drained"),
        Ok(Ok(Err(e))) => error!(error = %e, "server error during shutdown"),
        Ok(Err(e)) => error!(error = %e, "server task panicked"),
        Err(_) => warn!(
            drain_timeout_secs = DRAIN_TIMEOUT.as_secs(),
            "drain timeout exceeded, forcing shutdown"
        ),
    }

    info!("shutdown complete");
    Ok(())
}

/// Inbound invocation endpoint: runs step-up orchestration and answers with its JSON body.
///
/// The cancellation token fires when this handler's future is dropped, which
/// is how a client disconnect reaches the in-flight downstream call.
async fn profile_handler(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    let request_id = format!("req_{}", uuid::Uuid::new_v4().as_simple());
    let cancel = CancellationToken::new();
    let _cancel_on_drop = cancel.clone().drop_guard();

    let result = state
        .step_up
        .handle(&headers, state.downstream.as_ref(), &cancel)
        .instrument(info_span!("step_up", request_id = %request_id))
        .await;

    let outcome = step_up::outcome(&result);
    metrics::record_step_up(outcome);
    info!(request_id = %request_id, outcome, "step-up request finished");

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json")],
        step_up::render(&result),
    )
}

/// Identity provider redirect target; always 200 with an HTML page.
///
/// A query string that does not deserialize (for example a repeated key) is
/// treated as carrying neither code nor error.
async fn callback_handler(
    State(state): State<AppState>,
    query: Result<Query<CallbackParams>, QueryRejection>,
) -> impl IntoResponse {
    let params = match query {
        Ok(Query(params)) => params,
        Err(rejection) => {
            warn!(error = %rejection.body_text(), "unreadable callback query string");
            CallbackParams::default()
        }
    };
    let html = callback::handle(&state.pending, &params).await;
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
        html,
    )
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let body = serde_json::json!({
        "status": "healthy",
        "uptime_seconds": state.started_at.elapsed().as_secs(),
        "pending_consents": state.pending.len().await,
    });
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json")],
        body.to_string(),
    )
}

/// Prometheus metrics in text exposition format.
async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(
            header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        state.prometheus.render(),
    )
}

/// Wait for SIGTERM or SIGINT for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
