//! Router, health probes, and metrics endpoint
//!
//! - `/healthz` - Liveness: Is the process alive?
//! - `/readyz` - Readiness: Is the service ready to take requests?
//! - `/metrics` - Prometheus metrics in text format
//! - `/v1/...` - Engine API, see `api.rs`

use super::api::{self, AppState};
use super::shutdown::ShutdownSignal;
use axum::{
    extract::State,
    http::{header::CONTENT_TYPE, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

/// Shared state for readiness tracking
///
/// The service sets this to ready once the backend and store are built.
#[derive(Debug, Clone)]
pub struct ReadinessState {
    ready: Arc<std::sync::atomic::AtomicBool>,
}

impl ReadinessState {
    /// Create a new readiness state (initially not ready)
    pub fn new() -> Self {
        Self {
            ready: Arc::new(std::sync::atomic::AtomicBool::new(false)),
        }
    }

    pub fn set_ready(&self) {
        self.ready.store(true, std::sync::atomic::Ordering::SeqCst);
    }

    /// Mark as not ready, e.g. during shutdown
    ///
    /// The readiness probe then returns 503 so load balancers stop routing here.
    pub fn set_not_ready(&self) {
        self.ready.store(false, std::sync::atomic::Ordering::SeqCst);
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(std::sync::atomic::Ordering::SeqCst)
    }
}

impl Default for ReadinessState {
    fn default() -> Self {
        Self::new()
    }
}

/// Liveness probe handler
///
/// Always returns 200 OK - if this responds, the process is alive.
async fn healthz() -> StatusCode {
    StatusCode::OK
}

/// Readiness probe handler
///
/// Returns 200 OK if ready, 503 Service Unavailable if not.
async fn readyz(State(state): State<AppState>) -> StatusCode {
    if state.readiness.is_ready() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// Prometheus metrics handler
async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    match state.metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [(CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to encode metrics: {}", e),
        )
            .into_response(),
    }
}

/// Build the router for the engine API, probes and metrics
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(self::metrics))
        .route("/v1/plan", post(api::handle_plan))
        .route("/v1/plan/effect", post(api::handle_plan_for_effect))
        .route("/v1/analyze", post(api::handle_analyze))
        .route("/v1/analyze/samples", post(api::handle_analyze_samples))
        .route(
            "/v1/experiments/{name}",
            get(api::handle_get_experiment).put(api::handle_put_experiment),
        )
        .route(
            "/v1/experiments/{name}/plan",
            post(api::handle_plan_experiment),
        )
        .route(
            "/v1/experiments/{name}/analyze",
            post(api::handle_analyze_experiment),
        )
        .with_state(state)
}

/// Run the service on the specified port until the shutdown signal fires
///
/// In-flight requests are drained before this returns.
///
/// # Arguments
/// * `port` - The port to listen on
/// * `state` - Backend, store, metrics and readiness shared by all routes
/// * `shutdown` - Signal that stops accepting new connections
pub async fn run_server(
    port: u16,
    state: AppState,
    mut shutdown: ShutdownSignal,
) -> Result<(), std::io::Error> {
    let backend = state.backend.name();
    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    // Log after successful bind - server is actually listening
    info!(port = %port, backend = backend, "splitlab server listening (HTTP)");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.wait().await })
        .await
}
