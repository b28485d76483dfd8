//! JSON API over the computation backend
//!
//! ## Endpoints
//! - POST /v1/plan - Sample size and duration
//! - POST /v1/plan/effect - Sample size and duration from Cohen's d
//! - POST /v1/analyze - Full pipeline over a table
//! - POST /v1/analyze/samples - Two raw samples
//! - PUT /v1/experiments/{name} - Create or replace a named experiment
//! - GET /v1/experiments/{name} - Fetch a named experiment
//! - POST /v1/experiments/{name}/plan - Plan with the saved rates and traffic
//! - POST /v1/experiments/{name}/analyze - Analyze a table with the saved config
//!
//! Engine errors map to 422 with an `ErrorBody`, so a `RemoteBackend` pointed
//! at this service reproduces the local error exactly.

use super::health::ReadinessState;
use super::metrics::SharedMetrics;
use crate::engine::{AnalysisError, BackendError, ComputationBackend};
use crate::model::validation::validate_test_config;
use crate::model::{
    AnalysisReport, AnalyzeRequest, DataTable, EffectPlanRequest, ErrorBody, PlanRequest,
    PlanningEstimate, SampleAnalysisRequest,
};
use crate::store::{ExperimentConfig, ExperimentRecord, ExperimentStore, StoreError};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Shared state for every route
#[derive(Clone)]
pub struct AppState {
    pub backend: Arc<dyn ComputationBackend>,
    pub store: Arc<dyn ExperimentStore>,
    pub metrics: SharedMetrics,
    pub readiness: ReadinessState,
}

impl AppState {
    pub fn new(
        backend: Arc<dyn ComputationBackend>,
        store: Arc<dyn ExperimentStore>,
        metrics: SharedMetrics,
        readiness: ReadinessState,
    ) -> Self {
        Self {
            backend,
            store,
            metrics,
            readiness,
        }
    }
}

#[derive(Debug)]
pub enum ApiError {
    Backend(BackendError),
    Store(StoreError),
}

impl ApiError {
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Backend(e) => e.kind(),
            ApiError::Store(StoreError::NotFound(_)) => "experiment_not_found",
            ApiError::Store(StoreError::Unavailable(_)) => "store_unavailable",
            ApiError::Store(StoreError::Conflict(_)) => "experiment_conflict",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::Backend(BackendError::Engine(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Backend(BackendError::Timeout(_)) => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Backend(_) => StatusCode::BAD_GATEWAY,
            ApiError::Store(StoreError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Store(StoreError::Unavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Store(StoreError::Conflict(_)) => StatusCode::CONFLICT,
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::Backend(e) => write!(f, "{}", e),
            ApiError::Store(e) => write!(f, "{}", e),
        }
    }
}

impl From<BackendError> for ApiError {
    fn from(e: BackendError) -> Self {
        ApiError::Backend(e)
    }
}

impl From<AnalysisError> for ApiError {
    fn from(e: AnalysisError) -> Self {
        ApiError::Backend(BackendError::Engine(e))
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        ApiError::Store(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            kind: self.kind().to_string(),
            message: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}

/// Record request metrics and log failures for one handler invocation
fn finish<T>(
    state: &AppState,
    endpoint: &str,
    started: Instant,
    result: Result<T, ApiError>,
) -> Result<Json<T>, ApiError> {
    state
        .metrics
        .record_request(endpoint, started.elapsed().as_secs_f64());
    match result {
        Ok(value) => Ok(Json(value)),
        Err(e) => {
            state.metrics.record_error(e.kind());
            warn!(endpoint = endpoint, kind = e.kind(), error = %e, "Request failed");
            Err(e)
        }
    }
}

fn observe_report(state: &AppState, report: &AnalysisReport) {
    state.metrics.record_analysis(report.result.data_type);
    info!(
        control = %report.control,
        treatment = %report.treatment,
        method = report.result.details.method.as_str(),
        p_value = report.result.p_value,
        winner = %report.winner,
        "Analysis completed"
    );
}

pub async fn handle_plan(
    State(state): State<AppState>,
    Json(request): Json<PlanRequest>,
) -> Result<Json<PlanningEstimate>, ApiError> {
    let started = Instant::now();
    let result = state.backend.plan(&request).await.map_err(ApiError::from);
    finish(&state, "/v1/plan", started, result)
}

pub async fn handle_plan_for_effect(
    State(state): State<AppState>,
    Json(request): Json<EffectPlanRequest>,
) -> Result<Json<PlanningEstimate>, ApiError> {
    let started = Instant::now();
    let result = state
        .backend
        .plan_for_effect(&request)
        .await
        .map_err(ApiError::from);
    finish(&state, "/v1/plan/effect", started, result)
}

pub async fn handle_analyze(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeRequest>,
) -> Result<Json<AnalysisReport>, ApiError> {
    let started = Instant::now();
    let result = state.backend.analyze(&request).await.map_err(ApiError::from);
    if let Ok(report) = &result {
        observe_report(&state, report);
    }
    finish(&state, "/v1/analyze", started, result)
}

pub async fn handle_analyze_samples(
    State(state): State<AppState>,
    Json(request): Json<SampleAnalysisRequest>,
) -> Result<Json<AnalysisReport>, ApiError> {
    let started = Instant::now();
    let result = state
        .backend
        .analyze_samples(&request)
        .await
        .map_err(ApiError::from);
    if let Ok(report) = &result {
        observe_report(&state, report);
    }
    finish(&state, "/v1/analyze/samples", started, result)
}

async fn put_experiment(
    state: &AppState,
    name: &str,
    config: ExperimentConfig,
) -> Result<ExperimentRecord, ApiError> {
    validate_test_config(&config.test_config).map_err(AnalysisError::InvalidParameter)?;
    Ok(state.store.put(name, config).await?)
}

pub async fn handle_put_experiment(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(config): Json<ExperimentConfig>,
) -> Result<Json<ExperimentRecord>, ApiError> {
    let started = Instant::now();
    let result = put_experiment(&state, &name, config).await;
    finish(&state, "/v1/experiments/{name}", started, result)
}

pub async fn handle_get_experiment(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<ExperimentRecord>, ApiError> {
    let started = Instant::now();
    let result = state.store.get(&name).await.map_err(ApiError::from);
    finish(&state, "/v1/experiments/{name}", started, result)
}

async fn plan_experiment(state: &AppState, name: &str) -> Result<PlanningEstimate, ApiError> {
    let record = state.store.get(name).await?;
    let request = record.config.plan_request().ok_or_else(|| {
        AnalysisError::InvalidParameter(format!(
            "experiment '{}' needs control_rate, variant_rate and traffic_per_day to plan",
            name
        ))
    })?;
    Ok(state.backend.plan(&request).await?)
}

pub async fn handle_plan_experiment(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<PlanningEstimate>, ApiError> {
    let started = Instant::now();
    let result = plan_experiment(&state, &name).await;
    finish(&state, "/v1/experiments/{name}/plan", started, result)
}

async fn analyze_experiment(
    state: &AppState,
    name: &str,
    table: DataTable,
) -> Result<AnalysisReport, ApiError> {
    let record = state.store.get(name).await?;
    let request = AnalyzeRequest {
        table,
        variant_column_index: record.config.variant_column_index,
        outcome_column_index: record.config.outcome_column_index,
        config: record.config.test_config.clone(),
    };

    let report = state.backend.analyze(&request).await?;
    observe_report(state, &report);
    state
        .store
        .record_report(name, &record.config, report.clone())
        .await?;

    info!(experiment = %name, "Cached report on experiment");
    Ok(report)
}

pub async fn handle_analyze_experiment(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(table): Json<DataTable>,
) -> Result<Json<AnalysisReport>, ApiError> {
    let started = Instant::now();
    let result = analyze_experiment(&state, &name, table).await;
    finish(&state, "/v1/experiments/{name}/analyze", started, result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_engine_errors_are_unprocessable() {
        let err = ApiError::from(AnalysisError::InsufficientGroups(1));
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.kind(), "insufficient_groups");
        assert_eq!(err.to_string(), "Need at least 2 variants for comparison, found 1");
    }

    #[test]
    fn test_error_status_mapping() {
        assert_eq!(
            ApiError::from(StoreError::NotFound("x".into())).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(StoreError::Conflict("x".into())).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(BackendError::Timeout(Duration::from_secs(1))).status(),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            ApiError::from(BackendError::Unreachable("down".into())).status(),
            StatusCode::BAD_GATEWAY
        );
    }
}
