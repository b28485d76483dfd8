//! Computation backends
//!
//! Follows a trait-based pattern:
//! - `ComputationBackend` trait for abstraction
//! - `LocalBackend` runs the engine in-process
//! - `RemoteBackend` calls a splitlab service over HTTP/JSON
//! - `MockBackend` for testing
//!
//! The backend is chosen once at startup and injected; callers never know which
//! one they hold.

use super::error::AnalysisError;
use crate::model::{
    AnalysisReport, AnalyzeRequest, EffectPlanRequest, ErrorBody, PlanRequest, PlanningEstimate,
    SampleAnalysisRequest,
};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackendError {
    /// The engine rejected the input; same meaning locally and remotely
    #[error(transparent)]
    Engine(#[from] AnalysisError),

    #[error("Computation service unreachable: {0}")]
    Unreachable(String),

    #[error("Computation service returned invalid response: {0}")]
    InvalidResponse(String),

    #[error("Computation call timed out after {0:?}")]
    Timeout(Duration),
}

impl BackendError {
    /// Stable identifier; engine errors keep their own kind
    pub fn kind(&self) -> &'static str {
        match self {
            BackendError::Engine(e) => e.kind(),
            BackendError::Unreachable(_) => "backend_unreachable",
            BackendError::InvalidResponse(_) => "backend_invalid_response",
            BackendError::Timeout(_) => "backend_timeout",
        }
    }
}

/// Entry points of the statistical engine
///
/// Production code picks `LocalBackend` or `RemoteBackend` at startup.
/// Tests use `MockBackend` which counts calls and can be made to fail.
#[async_trait]
pub trait ComputationBackend: Send + Sync {
    /// Sample size and duration for a planned experiment
    async fn plan(&self, request: &PlanRequest) -> Result<PlanningEstimate, BackendError>;

    /// Sample size and duration for a comparison of means, from Cohen's d
    async fn plan_for_effect(
        &self,
        request: &EffectPlanRequest,
    ) -> Result<PlanningEstimate, BackendError>;

    /// Full post-hoc pipeline over a table
    async fn analyze(&self, request: &AnalyzeRequest) -> Result<AnalysisReport, BackendError>;

    /// Direct comparison of two raw samples
    async fn analyze_samples(
        &self,
        request: &SampleAnalysisRequest,
    ) -> Result<AnalysisReport, BackendError>;

    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Downcast support for testing
    fn as_any(&self) -> &dyn std::any::Any;
}

/// In-process engine
pub struct LocalBackend;

#[async_trait]
impl ComputationBackend for LocalBackend {
    async fn plan(&self, request: &PlanRequest) -> Result<PlanningEstimate, BackendError> {
        Ok(super::planner::plan(request)?)
    }

    async fn plan_for_effect(
        &self,
        request: &EffectPlanRequest,
    ) -> Result<PlanningEstimate, BackendError> {
        Ok(super::planner::plan_for_effect(request)?)
    }

    async fn analyze(&self, request: &AnalyzeRequest) -> Result<AnalysisReport, BackendError> {
        Ok(super::analyze_table(request)?)
    }

    async fn analyze_samples(
        &self,
        request: &SampleAnalysisRequest,
    ) -> Result<AnalysisReport, BackendError> {
        Ok(super::analyze_samples(request)?)
    }

    fn name(&self) -> &'static str {
        "local"
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

/// HTTP client for a remote splitlab service
///
/// Each entry point maps 1:1 to a JSON POST. Engine errors come back as
/// HTTP 422 with an `ErrorBody` and are rebuilt into `AnalysisError`.
pub struct RemoteBackend {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl RemoteBackend {
    pub fn new(base_url: String, timeout: Duration) -> Self {
        let client = match reqwest::Client::builder().timeout(timeout).build() {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to build backend HTTP client, using default");
                reqwest::Client::new()
            }
        };
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post<Req, Resp>(&self, path: &str, body: &Req) -> Result<Resp, BackendError>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned + Send,
    {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    BackendError::Timeout(self.timeout)
                } else {
                    BackendError::Unreachable(e.to_string())
                }
            })?;

        let status = response.status();
        if status == StatusCode::UNPROCESSABLE_ENTITY {
            let body: ErrorBody = response
                .json()
                .await
                .map_err(|e| BackendError::InvalidResponse(e.to_string()))?;
            return match AnalysisError::from_wire(&body.kind, &body.message) {
                Some(engine_error) => Err(BackendError::Engine(engine_error)),
                None => Err(BackendError::InvalidResponse(format!(
                    "unknown error kind '{}': {}",
                    body.kind, body.message
                ))),
            };
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::InvalidResponse(format!(
                "HTTP {}: {}",
                status,
                body.chars().take(200).collect::<String>()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| BackendError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl ComputationBackend for RemoteBackend {
    async fn plan(&self, request: &PlanRequest) -> Result<PlanningEstimate, BackendError> {
        self.post("/v1/plan", request).await
    }

    async fn plan_for_effect(
        &self,
        request: &EffectPlanRequest,
    ) -> Result<PlanningEstimate, BackendError> {
        self.post("/v1/plan/effect", request).await
    }

    async fn analyze(&self, request: &AnalyzeRequest) -> Result<AnalysisReport, BackendError> {
        self.post("/v1/analyze", request).await
    }

    async fn analyze_samples(
        &self,
        request: &SampleAnalysisRequest,
    ) -> Result<AnalysisReport, BackendError> {
        self.post("/v1/analyze/samples", request).await
    }

    fn name(&self) -> &'static str {
        "remote"
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

/// Mock backend for testing
///
/// Delegates to the local engine unless a failure is configured.
#[cfg(test)]
pub struct MockBackend {
    pub failure: std::sync::Mutex<Option<String>>,
    pub call_count: std::sync::atomic::AtomicU32,
}

#[cfg(test)]
impl MockBackend {
    pub fn new() -> Self {
        Self {
            failure: std::sync::Mutex::new(None),
            call_count: std::sync::atomic::AtomicU32::new(0),
        }
    }

    pub fn new_failing(error_msg: &str) -> Self {
        Self {
            failure: std::sync::Mutex::new(Some(error_msg.to_string())),
            call_count: std::sync::atomic::AtomicU32::new(0),
        }
    }

    pub fn calls(&self) -> u32 {
        self.call_count.load(std::sync::atomic::Ordering::Relaxed)
    }

    fn record_call(&self) -> Result<(), BackendError> {
        self.call_count
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        let guard = self
            .failure
            .lock()
            .map_err(|_| BackendError::Unreachable("lock poisoned".into()))?;
        match &*guard {
            Some(msg) => Err(BackendError::Unreachable(msg.clone())),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
#[async_trait]
impl ComputationBackend for MockBackend {
    async fn plan(&self, request: &PlanRequest) -> Result<PlanningEstimate, BackendError> {
        self.record_call()?;
        LocalBackend.plan(request).await
    }

    async fn plan_for_effect(
        &self,
        request: &EffectPlanRequest,
    ) -> Result<PlanningEstimate, BackendError> {
        self.record_call()?;
        LocalBackend.plan_for_effect(request).await
    }

    async fn analyze(&self, request: &AnalyzeRequest) -> Result<AnalysisReport, BackendError> {
        self.record_call()?;
        LocalBackend.analyze(request).await
    }

    async fn analyze_samples(
        &self,
        request: &SampleAnalysisRequest,
    ) -> Result<AnalysisReport, BackendError> {
        self.record_call()?;
        LocalBackend.analyze_samples(request).await
    }

    fn name(&self) -> &'static str {
        "mock"
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::model::TailType;

    fn plan_request(variant_rate: f64) -> PlanRequest {
        PlanRequest {
            control_rate: 0.10,
            variant_rate,
            traffic_per_day: 1000,
            alpha: 0.05,
            power: 0.8,
            tail_type: TailType::TwoTailed,
        }
    }

    #[tokio::test]
    async fn test_local_backend_plans() {
        let estimate = LocalBackend.plan(&plan_request(0.12)).await.unwrap();
        assert_eq!(estimate.required_sample_size_per_group, 3842);
    }

    #[tokio::test]
    async fn test_local_backend_wraps_engine_errors() {
        let err = LocalBackend.plan(&plan_request(0.10)).await.unwrap_err();

        assert!(matches!(
            err,
            BackendError::Engine(AnalysisError::ZeroEffectSize)
        ));
        assert_eq!(err.kind(), "zero_effect_size");
    }

    #[tokio::test]
    async fn test_mock_backend_tracks_call_count() {
        let backend = MockBackend::new();

        let _ = backend.plan(&plan_request(0.12)).await;
        let _ = backend.plan(&plan_request(0.12)).await;

        assert_eq!(backend.calls(), 2);
    }

    #[tokio::test]
    async fn test_mock_backend_error() {
        let backend = MockBackend::new_failing("connection refused");

        let err = backend.plan(&plan_request(0.12)).await.unwrap_err();

        assert_eq!(err.kind(), "backend_unreachable");
        assert!(err.to_string().contains("connection refused"));
    }

    #[tokio::test]
    async fn test_remote_backend_unreachable() {
        // Nothing listens on port 9 locally
        let backend = RemoteBackend::new(
            "http://127.0.0.1:9/".to_string(),
            Duration::from_secs(2),
        );
        assert_eq!(backend.base_url(), "http://127.0.0.1:9");

        let err = backend.plan(&plan_request(0.12)).await.unwrap_err();
        assert!(matches!(
            err,
            BackendError::Unreachable(_) | BackendError::Timeout(_)
        ));
    }

    #[test]
    fn test_backends_downcast() {
        let backend: std::sync::Arc<dyn ComputationBackend> = std::sync::Arc::new(LocalBackend);
        assert!(backend.as_any().is::<LocalBackend>());
        assert_eq!(backend.name(), "local");
    }
}
