//! HTTP service for the statistical engine
//!
//! Serves the engine API, health probes and Prometheus metrics, with
//! graceful shutdown on SIGTERM/SIGINT.

pub mod api;
pub mod config;
mod health;
pub mod metrics;
pub mod shutdown;

pub use api::AppState;
pub use config::{BackendKind, ServiceConfig};
pub use health::{build_router, run_server, ReadinessState};
pub use metrics::{create_metrics, Metrics, SharedMetrics};
pub use shutdown::{shutdown_channel, wait_for_signal, ShutdownController, ShutdownSignal};

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[path = "health_test.rs"]
mod health_tests;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[path = "api_test.rs"]
mod api_tests;

#[cfg(test)]
#[path = "shutdown_test.rs"]
mod shutdown_tests;
