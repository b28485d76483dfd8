use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Sentinel reported when the comparison is not significant
pub const NO_SIGNIFICANT_DIFFERENCE: &str = "No significant difference";

/// Directionality of the alternative hypothesis
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, JsonSchema)]
pub enum TailType {
    #[serde(rename = "one-tailed")]
    OneTailed,
    #[default]
    #[serde(rename = "two-tailed")]
    TwoTailed,
}

/// Statistical parameters for planning and analysis
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
#[serde(default)]
pub struct TestConfig {
    /// Significance level, e.g. 0.05
    pub alpha: f64,

    /// Probability of detecting a true effect (1 - beta)
    pub power: f64,

    pub tail_type: TailType,

    /// Confidence level for reported intervals, e.g. 0.95
    pub confidence_level: f64,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            alpha: 0.05,
            power: 0.8,
            tail_type: TailType::TwoTailed,
            confidence_level: 0.95,
        }
    }
}

/// Shape of an outcome sample, which decides the hypothesis test
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Continuous,
    Binary,
    Categorical,
}

impl DataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Continuous => "continuous",
            DataType::Binary => "binary",
            DataType::Categorical => "categorical",
        }
    }
}

/// Hypothesis test that produced a result
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, JsonSchema)]
pub enum TestMethod {
    #[serde(rename = "z-test")]
    TwoProportionZTest,
    #[serde(rename = "t-test")]
    WelchTTest,
    #[serde(rename = "chi-squared")]
    ChiSquaredIndependence,
}

impl TestMethod {
    /// Human-readable method name shown in reports
    pub fn display_name(&self) -> &'static str {
        match self {
            TestMethod::TwoProportionZTest => "Two-Proportion Z-Test",
            TestMethod::WelchTTest => "Welch's Two-Sample t-Test",
            TestMethod::ChiSquaredIndependence => "Chi-Squared Test of Independence",
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Reject,
    FailToReject,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, JsonSchema)]
pub struct ConfidenceInterval {
    pub lower: f64,
    pub upper: f64,
}

/// Fixed hypothesis pair and assumption checklist for a test
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
pub struct TestDetails {
    pub method: String,
    pub null_hypothesis: String,
    pub alternative_hypothesis: String,
    pub assumptions: Vec<String>,
}

/// Outcome of one pairwise hypothesis test
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
pub struct TestResult {
    pub data_type: DataType,
    pub test_method: TestMethod,

    /// z, t or chi-squared statistic depending on the method
    pub statistic: f64,

    /// Always within [0, 1]
    pub p_value: f64,

    pub confidence_interval: ConfidenceInterval,

    /// Proportion difference, Cohen's d or Cramer's V
    pub effect_size: f64,

    pub is_significant: bool,
    pub decision: Decision,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub degrees_of_freedom: Option<f64>,

    pub details: TestDetails,
}

/// Observations collected for one variant
///
/// Exactly one representation is populated, depending on the aggregation path.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Binary path: number of converting visitors
    Conversions { conversion_count: u64 },
    /// Continuous path: raw numeric outcomes
    Values { values: Vec<f64> },
}

/// One record per variant, produced by the aggregator
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
pub struct VariantAggregate {
    pub name: String,
    pub visitor_count: u64,
    pub outcome: Outcome,
}

impl VariantAggregate {
    pub fn from_conversions(name: impl Into<String>, visitors: u64, conversions: u64) -> Self {
        Self {
            name: name.into(),
            visitor_count: visitors,
            outcome: Outcome::Conversions {
                conversion_count: conversions,
            },
        }
    }

    pub fn from_values(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            visitor_count: values.len() as u64,
            outcome: Outcome::Values { values },
        }
    }

    /// Number of successes; nonzero values count as conversions on the values path
    pub fn conversions(&self) -> u64 {
        match &self.outcome {
            Outcome::Conversions { conversion_count } => *conversion_count,
            Outcome::Values { values } => values.iter().filter(|v| **v != 0.0).count() as u64,
        }
    }

    /// Observations as a sample; conversions expand to ones and zeros
    pub fn sample(&self) -> Vec<f64> {
        match &self.outcome {
            Outcome::Conversions { conversion_count } => {
                let converted = (*conversion_count).min(self.visitor_count) as usize;
                let mut sample = vec![1.0; converted];
                sample.resize(self.visitor_count as usize, 0.0);
                sample
            }
            Outcome::Values { values } => values.clone(),
        }
    }

    /// Conversion rate on the binary path, mean on the values path
    pub fn primary_metric(&self) -> f64 {
        match &self.outcome {
            Outcome::Conversions { conversion_count } => {
                if self.visitor_count == 0 {
                    0.0
                } else {
                    *conversion_count as f64 / self.visitor_count as f64
                }
            }
            Outcome::Values { values } => {
                if values.is_empty() {
                    0.0
                } else {
                    values.iter().sum::<f64>() / values.len() as f64
                }
            }
        }
    }
}

/// Sample size and run length needed to detect an expected effect
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, JsonSchema)]
pub struct PlanningEstimate {
    pub required_sample_size_per_group: u64,
    pub estimated_duration_days: u64,
}

/// Descriptive statistics for a values-path variant
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
pub struct DescriptiveStatistics {
    pub count: u64,
    pub mean: f64,
    pub standard_deviation: f64,
    pub min: f64,
    pub max: f64,
    pub median: f64,
}

/// Per-variant data for presentation
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
pub struct VariantSummary {
    pub name: String,
    pub is_control: bool,
    pub visitors: u64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversions: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversion_rate: Option<f64>,

    /// Interval for the variant's own conversion rate, clamped to [0, 1]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence_interval: Option<ConfidenceInterval>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub statistics: Option<DescriptiveStatistics>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
pub struct Interpretation {
    pub decision: Decision,
    pub plain_language: String,
    pub recommendation: String,
}

/// Declared winner of a comparison
///
/// Serialized as the variant name, or as [`NO_SIGNIFICANT_DIFFERENCE`].
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(into = "String", from = "String")]
pub enum Winner {
    Variant(String),
    NoSignificantDifference,
}

impl std::fmt::Display for Winner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Winner::Variant(name) => write!(f, "{}", name),
            Winner::NoSignificantDifference => write!(f, "{}", NO_SIGNIFICANT_DIFFERENCE),
        }
    }
}

impl From<Winner> for String {
    fn from(winner: Winner) -> Self {
        winner.to_string()
    }
}

impl From<String> for Winner {
    fn from(value: String) -> Self {
        if value == NO_SIGNIFICANT_DIFFERENCE {
            Winner::NoSignificantDifference
        } else {
            Winner::Variant(value)
        }
    }
}

/// Everything presentation needs for one control-vs-treatment comparison
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
pub struct AnalysisReport {
    pub variants: Vec<VariantSummary>,
    pub control: String,
    pub treatment: String,
    pub result: TestResult,
    pub interpretation: Interpretation,

    #[schemars(with = "String")]
    pub winner: Winner,

    /// Relative lift of treatment over control in percent (binary path only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uplift_percent: Option<f64>,
}
