//! Statistical analysis engine
//!
//! Planning is standalone. Post-hoc analysis runs
//! aggregate -> classify -> dispatch -> assemble and is a pure function of its
//! inputs, so it can be re-run whenever alpha, power or confidence change.

pub mod aggregate;
pub mod backend;
pub mod classify;
pub mod dispatch;
pub mod error;
pub mod planner;
pub mod probability;
pub mod report;

pub use aggregate::{aggregate_table, Aggregation};
pub use backend::{BackendError, ComputationBackend, LocalBackend, RemoteBackend};
pub use error::AnalysisError;
pub use planner::{plan, plan_for_effect};

use crate::model::validation::validate_test_config;
use crate::model::{AnalysisReport, AnalyzeRequest, SampleAnalysisRequest, VariantAggregate};
use tracing::warn;

/// Group names used when two raw samples are compared directly
pub const GROUP_A: &str = "Group A";
pub const GROUP_B: &str = "Group B";

fn run_pipeline(
    aggregation: &Aggregation,
    config: &crate::model::TestConfig,
) -> Result<AnalysisReport, AnalysisError> {
    let control = aggregation.control();
    let treatment = aggregation.treatment();

    let data_type = dispatch::classify_aggregates(control, treatment);
    let result = dispatch::run_test(control, treatment, data_type, config).map_err(|e| {
        warn!(
            control = %control.name,
            treatment = %treatment.name,
            data_type = data_type.as_str(),
            error = %e,
            "Hypothesis test rejected input"
        );
        e
    })?;

    Ok(report::assemble(aggregation, result, config))
}

/// Analyze an experiment table end to end
///
/// # Errors
/// * `InvalidParameter` - config probabilities outside (0, 1)
/// * `InvalidColumn` - column mapping outside the table
/// * `InsufficientGroups`, `EmptyControlGroup` - from aggregation
/// * `DegenerateSample` - the selected test cannot be computed
pub fn analyze_table(request: &AnalyzeRequest) -> Result<AnalysisReport, AnalysisError> {
    validate_test_config(&request.config).map_err(AnalysisError::InvalidParameter)?;

    let aggregation = aggregate_table(
        &request.table,
        request.variant_column_index,
        request.outcome_column_index,
    )?;

    run_pipeline(&aggregation, &request.config)
}

/// Compare two raw samples; group A is treated as the control
pub fn analyze_samples(request: &SampleAnalysisRequest) -> Result<AnalysisReport, AnalysisError> {
    validate_test_config(&request.config).map_err(AnalysisError::InvalidParameter)?;

    if request.group_a.is_empty() {
        return Err(AnalysisError::EmptyControlGroup(GROUP_A.to_string()));
    }
    if request.group_b.is_empty() {
        return Err(AnalysisError::InsufficientGroups(1));
    }
    if request.group_a.iter().chain(&request.group_b).any(|v| !v.is_finite()) {
        return Err(AnalysisError::InvalidParameter(
            "samples must contain only finite values".to_string(),
        ));
    }

    let aggregation = Aggregation {
        variants: vec![
            VariantAggregate::from_values(GROUP_A, request.group_a.clone()),
            VariantAggregate::from_values(GROUP_B, request.group_b.clone()),
        ],
        control: 0,
        treatment: 1,
        dropped_cells: 0,
    };

    run_pipeline(&aggregation, &request.config)
}
