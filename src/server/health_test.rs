//! Tests for health endpoints

use super::*;
use crate::engine::LocalBackend;
use crate::store::clock::SystemClock;
use crate::store::InMemoryExperimentStore;
use std::sync::Arc;
use std::time::Duration;

fn test_state(readiness: ReadinessState) -> AppState {
    AppState::new(
        Arc::new(LocalBackend),
        Arc::new(InMemoryExperimentStore::new(Arc::new(SystemClock))),
        create_metrics().expect("metrics registry"),
        readiness,
    )
}

/// Start the server on `port` and return the controller that stops it
fn spawn_server(port: u16, readiness: ReadinessState) -> ShutdownController {
    let (controller, signal) = shutdown_channel();
    let state = test_state(readiness);
    tokio::spawn(async move { run_server(port, state, signal).await });
    controller
}

/// Wait for server to be ready with retry logic
///
/// Retries connection up to max_retries times with exponential backoff.
/// More reliable than fixed sleep for test environments.
pub(super) async fn wait_for_server(port: u16, max_retries: u32) -> reqwest::Client {
    let client = reqwest::Client::new();
    let mut delay = Duration::from_millis(10);

    for attempt in 1..=max_retries {
        match client
            .get(format!("http://127.0.0.1:{}/healthz", port))
            .timeout(Duration::from_millis(100))
            .send()
            .await
        {
            Ok(_) => return client,
            Err(_) if attempt < max_retries => {
                tokio::time::sleep(delay).await;
                delay = std::cmp::min(delay * 2, Duration::from_millis(200));
            }
            Err(e) => panic!("Server not ready after {} attempts: {}", max_retries, e),
        }
    }
    client
}

#[tokio::test]
async fn test_healthz_returns_200() {
    let port = 18080;
    let shutdown = spawn_server(port, ReadinessState::new());
    let client = wait_for_server(port, 10).await;

    let response = client
        .get(format!("http://127.0.0.1:{}/healthz", port))
        .timeout(Duration::from_secs(5))
        .send()
        .await
        .expect("Failed to connect to server");

    assert_eq!(response.status(), 200, "Liveness probe should return 200");

    shutdown.shutdown();
}

#[tokio::test]
async fn test_readyz_returns_503_when_not_ready() {
    let readiness = ReadinessState::new();
    assert!(!readiness.is_ready(), "Should start as not ready");

    let port = 18081;
    let shutdown = spawn_server(port, readiness);
    let client = wait_for_server(port, 10).await;

    let response = client
        .get(format!("http://127.0.0.1:{}/readyz", port))
        .timeout(Duration::from_secs(5))
        .send()
        .await
        .expect("Failed to connect to server");

    assert_eq!(
        response.status(),
        503,
        "Readiness probe should return 503 when not ready"
    );

    shutdown.shutdown();
}

#[tokio::test]
async fn test_readyz_follows_readiness_state() {
    let readiness = ReadinessState::new();
    readiness.set_ready();

    let port = 18082;
    let shutdown = spawn_server(port, readiness.clone());
    let client = wait_for_server(port, 10).await;
    let url = format!("http://127.0.0.1:{}/readyz", port);

    let response = client.get(&url).send().await.expect("readyz");
    assert_eq!(response.status(), 200);

    readiness.set_not_ready();
    let response = client.get(&url).send().await.expect("readyz");
    assert_eq!(response.status(), 503);

    shutdown.shutdown();
}

#[tokio::test]
async fn test_metrics_endpoint_exposes_counters() {
    let port = 18083;
    let shutdown = spawn_server(port, ReadinessState::new());
    let client = wait_for_server(port, 10).await;

    client
        .post(format!("http://127.0.0.1:{}/v1/plan", port))
        .json(&serde_json::json!({
            "control_rate": 0.1,
            "variant_rate": 0.12,
            "traffic_per_day": 1000
        }))
        .send()
        .await
        .expect("plan");

    let body = client
        .get(format!("http://127.0.0.1:{}/metrics", port))
        .send()
        .await
        .expect("metrics")
        .text()
        .await
        .expect("metrics body");

    assert!(body.contains("splitlab_requests_total{endpoint=\"/v1/plan\"} 1"));

    shutdown.shutdown();
}

#[tokio::test]
async fn test_server_stops_on_shutdown_signal() {
    let port = 18084;
    let (controller, signal) = shutdown_channel();
    let handle = tokio::spawn(run_server(port, test_state(ReadinessState::new()), signal));
    wait_for_server(port, 10).await;

    controller.shutdown();

    let result = tokio::time::timeout(Duration::from_secs(5), handle).await;
    assert!(matches!(result, Ok(Ok(Ok(())))));
}

#[test]
fn test_readiness_state_transitions() {
    let state = ReadinessState::new();
    assert!(!state.is_ready());

    state.set_ready();
    assert!(state.is_ready());

    // Clone should share state
    let cloned = state.clone();
    cloned.set_not_ready();
    assert!(!state.is_ready());
}
