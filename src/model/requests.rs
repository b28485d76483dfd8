//! Request and response payloads for the remote computation API
//!
//! Each payload mirrors one engine entry point, with snake_case keys.

use super::experiment::{TailType, TestConfig};
use super::table::DataTable;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

fn default_alpha() -> f64 {
    0.05
}

fn default_power() -> f64 {
    0.8
}

/// Inputs for sample-size planning
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
pub struct PlanRequest {
    /// Baseline conversion rate, in (0, 1)
    pub control_rate: f64,

    /// Expected conversion rate of the variant, in (0, 1)
    pub variant_rate: f64,

    /// Visitors entering the experiment per day, split across both groups
    pub traffic_per_day: i64,

    #[serde(default = "default_alpha")]
    pub alpha: f64,

    #[serde(default = "default_power")]
    pub power: f64,

    #[serde(default)]
    pub tail_type: TailType,
}

impl PlanRequest {
    /// Config view of the planning parameters (confidence level left at its default)
    pub fn test_config(&self) -> TestConfig {
        TestConfig {
            alpha: self.alpha,
            power: self.power,
            tail_type: self.tail_type,
            ..TestConfig::default()
        }
    }
}

/// Inputs for planning a comparison of means from a standardized effect
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
pub struct EffectPlanRequest {
    /// Expected Cohen's d; the sign is ignored
    pub effect_size: f64,

    /// Visitors entering the experiment per day, split across both groups
    pub traffic_per_day: i64,

    #[serde(default = "default_alpha")]
    pub alpha: f64,

    #[serde(default = "default_power")]
    pub power: f64,

    #[serde(default)]
    pub tail_type: TailType,
}

impl EffectPlanRequest {
    pub fn test_config(&self) -> TestConfig {
        TestConfig {
            alpha: self.alpha,
            power: self.power,
            tail_type: self.tail_type,
            ..TestConfig::default()
        }
    }
}

/// Inputs for the post-hoc analysis pipeline
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
pub struct AnalyzeRequest {
    pub table: DataTable,
    pub variant_column_index: usize,
    pub outcome_column_index: usize,

    #[serde(default)]
    pub config: TestConfig,
}

/// Two raw samples compared directly, bypassing aggregation
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
pub struct SampleAnalysisRequest {
    pub group_a: Vec<f64>,
    pub group_b: Vec<f64>,

    #[serde(default)]
    pub config: TestConfig,
}

/// Body returned with a failed engine call
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
pub struct ErrorBody {
    /// Stable error kind, e.g. "insufficient_groups"
    pub kind: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn test_plan_request_defaults() {
        let request: PlanRequest = serde_json::from_str(
            r#"{"control_rate": 0.1, "variant_rate": 0.12, "traffic_per_day": 1000}"#,
        )
        .unwrap();

        assert_eq!(request.alpha, 0.05);
        assert_eq!(request.power, 0.8);
        assert_eq!(request.tail_type, TailType::TwoTailed);
    }

    #[test]
    fn test_plan_request_tail_type_wire_name() {
        let request: PlanRequest = serde_json::from_str(
            r#"{"control_rate": 0.1, "variant_rate": 0.12, "traffic_per_day": 1000, "tail_type": "one-tailed"}"#,
        )
        .unwrap();

        assert_eq!(request.tail_type, TailType::OneTailed);
        assert_eq!(request.test_config().tail_type, TailType::OneTailed);
    }

    #[test]
    fn test_effect_plan_request_defaults() {
        let request: EffectPlanRequest =
            serde_json::from_str(r#"{"effect_size": 0.5, "traffic_per_day": 40}"#).unwrap();

        assert_eq!(request.test_config(), TestConfig::default());
    }

    #[test]
    fn test_analyze_request_partial_config_keeps_defaults() {
        let request: AnalyzeRequest = serde_json::from_str(
            r#"{
                "table": {"header": ["variant", "converted"], "rows": [["Control", "Yes"]]},
                "variant_column_index": 0,
                "outcome_column_index": 1,
                "config": {"alpha": 0.01}
            }"#,
        )
        .unwrap();

        assert_eq!(request.config.alpha, 0.01);
        assert_eq!(request.config.power, 0.8);
        assert_eq!(request.config.confidence_level, 0.95);
    }
}
