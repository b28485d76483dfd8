//! Value types exchanged with the engine
//!
//! Everything here is plain data: serde-serializable for the remote API and
//! persistence, with JSON Schema derives for the wire types.

pub mod experiment;
pub mod requests;
pub mod table;
pub mod validation;

pub use experiment::{
    AnalysisReport, ConfidenceInterval, DataType, Decision, DescriptiveStatistics,
    Interpretation, Outcome, PlanningEstimate, TailType, TestConfig, TestDetails, TestMethod,
    TestResult, VariantAggregate, VariantSummary, Winner, NO_SIGNIFICANT_DIFFERENCE,
};
pub use requests::{
    AnalyzeRequest, EffectPlanRequest, ErrorBody, PlanRequest, SampleAnalysisRequest,
};
pub use table::{Cell, DataTable};
