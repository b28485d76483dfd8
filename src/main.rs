use splitlab::server::{
    create_metrics, run_server, shutdown_channel, wait_for_signal, AppState, ReadinessState,
    ServiceConfig,
};
use splitlab::store::clock::SystemClock;
use splitlab::store::InMemoryExperimentStore;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// How long in-flight requests get to finish after a termination signal
const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("Starting splitlab analysis service");

    let config = ServiceConfig::from_env();
    info!(port = config.port, backend = ?config.backend, "Configuration loaded");

    let (shutdown_controller, shutdown_signal) = shutdown_channel();
    let readiness = ReadinessState::new();

    let metrics = match create_metrics() {
        Ok(m) => m,
        Err(e) => {
            error!(error = %e, "Failed to create metrics registry");
            return Err(e.into());
        }
    };
    info!("Prometheus metrics registry initialized");

    let backend = config.build_backend();
    let store = Arc::new(InMemoryExperimentStore::new(Arc::new(SystemClock)));
    let state = AppState::new(backend, store, metrics, readiness.clone());

    let port = config.port;
    let mut server_handle =
        tokio::spawn(async move { run_server(port, state, shutdown_signal).await });

    readiness.set_ready();
    info!("Service ready");

    tokio::select! {
        result = &mut server_handle => {
            // Server exited on its own: bind failure or task panic
            match result {
                Ok(Ok(())) => info!("Server stopped"),
                Ok(Err(e)) => {
                    error!(error = %e, "Server failed");
                    return Err(e.into());
                }
                Err(e) => {
                    error!(error = %e, "Server task aborted");
                    return Err(e.into());
                }
            }
            return Ok(());
        }
        signal = wait_for_signal() => {
            info!(signal = signal, "Initiating graceful shutdown");
            // Mark not ready so load balancers stop sending traffic during shutdown
            readiness.set_not_ready();
        }
    }

    shutdown_controller.shutdown();

    info!("Draining in-flight requests...");
    match tokio::time::timeout(DRAIN_TIMEOUT, &mut server_handle).await {
        Ok(Ok(Ok(()))) => {}
        Ok(Ok(Err(e))) => warn!(error = %e, "Server returned an error during shutdown"),
        Ok(Err(e)) => warn!(error = %e, "Server task failed during shutdown"),
        Err(_) => {
            warn!(timeout = ?DRAIN_TIMEOUT, "Drain timed out, aborting server");
            server_handle.abort();
        }
    }

    info!("splitlab service shut down gracefully");
    Ok(())
}

#[cfg(test)]
#[path = "main_test.rs"]
mod tests;
