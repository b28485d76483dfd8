//! Result assembly: turns a test result into a presentable report

use super::aggregate::Aggregation;
use super::dispatch::{mean, sample_variance};
use super::probability::critical_value;
use crate::model::{
    AnalysisReport, ConfidenceInterval, DataType, Decision, DescriptiveStatistics,
    Interpretation, Outcome, TestConfig, TestResult, VariantAggregate, VariantSummary, Winner,
};

const FAIL_TO_REJECT_ADVICE: &str =
    "Fail to reject the null hypothesis. Consider increasing sample size or the effect may not be meaningful.";

/// Conversion rate; nonzero values count as conversions on the values path
fn conversion_rate(variant: &VariantAggregate) -> f64 {
    if variant.visitor_count == 0 {
        return 0.0;
    }
    variant.conversions() as f64 / variant.visitor_count as f64
}

/// Metric compared when declaring a winner
fn comparison_metric(variant: &VariantAggregate, data_type: DataType) -> f64 {
    match data_type {
        DataType::Binary => conversion_rate(variant),
        DataType::Continuous | DataType::Categorical => variant.primary_metric(),
    }
}

/// Winner of a comparison
///
/// Only a significant result has a winner. Ties go to the control.
/// Binary data compares conversion rates. Categorical data compares the mean of
/// the numeric category codes, standing in for a rate.
pub fn declare_winner(
    control: &VariantAggregate,
    treatment: &VariantAggregate,
    result: &TestResult,
) -> Winner {
    if !result.is_significant {
        return Winner::NoSignificantDifference;
    }
    let control_metric = comparison_metric(control, result.data_type);
    let treatment_metric = comparison_metric(treatment, result.data_type);
    if treatment_metric > control_metric {
        Winner::Variant(treatment.name.clone())
    } else {
        Winner::Variant(control.name.clone())
    }
}

/// Relative lift of treatment over control in percent; 0 when control never converts
pub fn uplift_percent(control_rate: f64, treatment_rate: f64) -> f64 {
    if control_rate == 0.0 {
        return 0.0;
    }
    (treatment_rate - control_rate) / control_rate * 100.0
}

/// Wald interval for a single proportion, clamped to [0, 1]
pub fn proportion_interval(conversions: u64, visitors: u64, confidence_level: f64) -> ConfidenceInterval {
    if visitors == 0 {
        return ConfidenceInterval {
            lower: 0.0,
            upper: 0.0,
        };
    }
    let n = visitors as f64;
    let p = conversions as f64 / n;
    let margin = critical_value(confidence_level) * (p * (1.0 - p) / n).sqrt();
    ConfidenceInterval {
        lower: (p - margin).clamp(0.0, 1.0),
        upper: (p + margin).clamp(0.0, 1.0),
    }
}

/// Count, mean, sample standard deviation, range and median of a sample
pub fn describe(values: &[f64]) -> DescriptiveStatistics {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let median = match sorted.len() {
        0 => 0.0,
        n if n % 2 == 1 => sorted[n / 2],
        n => (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0,
    };

    DescriptiveStatistics {
        count: sorted.len() as u64,
        mean: mean(&sorted),
        standard_deviation: sample_variance(&sorted).sqrt(),
        min: sorted.first().copied().unwrap_or(0.0),
        max: sorted.last().copied().unwrap_or(0.0),
        median,
    }
}

fn summarize(variant: &VariantAggregate, is_control: bool, config: &TestConfig) -> VariantSummary {
    match &variant.outcome {
        Outcome::Conversions { conversion_count } => VariantSummary {
            name: variant.name.clone(),
            is_control,
            visitors: variant.visitor_count,
            conversions: Some(*conversion_count),
            conversion_rate: Some(conversion_rate(variant)),
            confidence_interval: Some(proportion_interval(
                *conversion_count,
                variant.visitor_count,
                config.confidence_level,
            )),
            statistics: None,
        },
        Outcome::Values { values } => VariantSummary {
            name: variant.name.clone(),
            is_control,
            visitors: variant.visitor_count,
            conversions: None,
            conversion_rate: None,
            confidence_interval: None,
            statistics: Some(describe(values)),
        },
    }
}

fn percent(rate: f64) -> String {
    format!("{:.1}%", rate * 100.0)
}

fn interpret(
    control: &VariantAggregate,
    treatment: &VariantAggregate,
    result: &TestResult,
    winner: &Winner,
) -> Interpretation {
    let p = result.p_value;
    let significant = result.is_significant;

    let plain_language = match result.data_type {
        DataType::Binary => {
            let (rate_c, rate_t) = (conversion_rate(control), conversion_rate(treatment));
            if significant {
                format!(
                    "There is a statistically significant difference in conversion rates (p = {:.4}). \
                     {} ({}) differs significantly from {} ({}). Winner: {}.",
                    p,
                    treatment.name,
                    percent(rate_t),
                    control.name,
                    percent(rate_c),
                    winner
                )
            } else {
                format!(
                    "There is no statistically significant difference in conversion rates (p = {:.4}). \
                     The difference between {} ({}) and {} ({}) could be due to random variation.",
                    p,
                    control.name,
                    percent(rate_c),
                    treatment.name,
                    percent(rate_t)
                )
            }
        }
        DataType::Continuous => {
            let (mean_c, mean_t) = (control.primary_metric(), treatment.primary_metric());
            if significant {
                let direction = if mean_t > mean_c {
                    "is significantly higher than"
                } else {
                    "is significantly lower than"
                };
                format!(
                    "There is a statistically significant difference in means (p = {:.4}). \
                     {} mean ({:.2}) {} {} mean ({:.2}). Winner: {}.",
                    p, treatment.name, mean_t, direction, control.name, mean_c, winner
                )
            } else {
                format!(
                    "There is no statistically significant difference in means (p = {:.4}). \
                     The difference between {} mean ({:.2}) and {} mean ({:.2}) could be due to random variation.",
                    p, control.name, mean_c, treatment.name, mean_t
                )
            }
        }
        DataType::Categorical => {
            if significant {
                format!(
                    "There is a statistically significant association between variant and outcome (p = {:.4}). \
                     The distribution differs significantly between {} and {}.",
                    p, control.name, treatment.name
                )
            } else {
                format!(
                    "There is no statistically significant association between variant and outcome (p = {:.4}). \
                     The distributions of {} and {} are similar.",
                    p, control.name, treatment.name
                )
            }
        }
    };

    let recommendation = match (significant, result.data_type) {
        (true, DataType::Categorical) => format!(
            "Reject the null hypothesis. There is a significant association between variant and outcome; {} leads.",
            winner
        ),
        (true, _) => format!(
            "Reject the null hypothesis. {} has a statistically significant advantage.",
            winner
        ),
        (false, DataType::Categorical) => {
            "Fail to reject the null hypothesis. No significant association detected.".to_string()
        }
        (false, _) => FAIL_TO_REJECT_ADVICE.to_string(),
    };

    Interpretation {
        decision: if significant {
            Decision::Reject
        } else {
            Decision::FailToReject
        },
        plain_language,
        recommendation,
    }
}

/// Build the report for the aggregation's control/treatment comparison
///
/// Summaries cover every variant in the aggregation; the test result must come
/// from its control and treatment pair.
pub fn assemble(aggregation: &Aggregation, result: TestResult, config: &TestConfig) -> AnalysisReport {
    let control = aggregation.control();
    let treatment = aggregation.treatment();

    let winner = declare_winner(control, treatment, &result);
    let interpretation = interpret(control, treatment, &result, &winner);

    let uplift = match result.data_type {
        DataType::Binary => Some(uplift_percent(
            conversion_rate(control),
            conversion_rate(treatment),
        )),
        DataType::Continuous | DataType::Categorical => None,
    };

    let variants = aggregation
        .variants
        .iter()
        .enumerate()
        .map(|(i, variant)| summarize(variant, i == aggregation.control, config))
        .collect();

    AnalysisReport {
        variants,
        control: control.name.clone(),
        treatment: treatment.name.clone(),
        result,
        interpretation,
        winner,
        uplift_percent: uplift,
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::engine::dispatch::two_proportion_z_test;
    use crate::model::{TestDetails, TestMethod, NO_SIGNIFICANT_DIFFERENCE};

    fn pair(control: VariantAggregate, treatment: VariantAggregate) -> Aggregation {
        Aggregation {
            variants: vec![control, treatment],
            control: 0,
            treatment: 1,
            dropped_cells: 0,
        }
    }

    fn significant_result(data_type: DataType) -> TestResult {
        TestResult {
            data_type,
            test_method: TestMethod::WelchTTest,
            statistic: 3.0,
            p_value: 0.001,
            confidence_interval: ConfidenceInterval {
                lower: 0.5,
                upper: 1.5,
            },
            effect_size: 0.8,
            is_significant: true,
            decision: Decision::Reject,
            degrees_of_freedom: Some(10.0),
            details: TestDetails {
                method: "Welch's Two-Sample t-Test".to_string(),
                null_hypothesis: String::new(),
                alternative_hypothesis: String::new(),
                assumptions: vec![],
            },
        }
    }

    #[test]
    fn test_not_significant_reports_sentinel() {
        let config = TestConfig::default();
        let aggregation = pair(
            VariantAggregate::from_conversions("Control", 1000, 100),
            VariantAggregate::from_conversions("Test", 1000, 120),
        );
        let result = two_proportion_z_test(100, 1000, 120, 1000, &config).unwrap();

        let report = assemble(&aggregation, result, &config);

        assert_eq!(report.winner, Winner::NoSignificantDifference);
        assert_eq!(report.interpretation.decision, Decision::FailToReject);
        assert_eq!(report.interpretation.recommendation, FAIL_TO_REJECT_ADVICE);
        assert!(report.interpretation.plain_language.contains("10.0%"));
        assert!(report.interpretation.plain_language.contains("12.0%"));
        assert!((report.uplift_percent.unwrap() - 20.0).abs() < 1e-9);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["winner"], NO_SIGNIFICANT_DIFFERENCE);
    }

    #[test]
    fn test_significant_binary_winner() {
        let config = TestConfig::default();
        let aggregation = pair(
            VariantAggregate::from_conversions("Control", 1000, 100),
            VariantAggregate::from_conversions("Test", 1000, 150),
        );
        let result = two_proportion_z_test(100, 1000, 150, 1000, &config).unwrap();

        let report = assemble(&aggregation, result, &config);

        assert_eq!(report.winner, Winner::Variant("Test".to_string()));
        assert_eq!(report.control, "Control");
        assert_eq!(report.treatment, "Test");
        assert!(report.interpretation.recommendation.starts_with("Reject"));
        assert!(report.interpretation.recommendation.contains("Test"));
    }

    #[test]
    fn test_significant_continuous_winner_by_mean() {
        let aggregation = pair(
            VariantAggregate::from_values("Control", vec![10.0, 12.0, 11.0]),
            VariantAggregate::from_values("Test", vec![4.0, 5.0, 6.0]),
        );

        let report = assemble(
            &aggregation,
            significant_result(DataType::Continuous),
            &TestConfig::default(),
        );

        assert_eq!(report.winner, Winner::Variant("Control".to_string()));
        assert!(report
            .interpretation
            .plain_language
            .contains("is significantly lower than"));
        assert_eq!(report.uplift_percent, None);
    }

    #[test]
    fn test_categorical_winner_by_mean_code() {
        let control = VariantAggregate::from_values("Control", vec![1.0, 1.0, 2.0, 1.0]);
        let treatment = VariantAggregate::from_values("Test", vec![3.0, 3.0, 2.0, 3.0]);

        let winner = declare_winner(&control, &treatment, &significant_result(DataType::Categorical));

        assert_eq!(winner, Winner::Variant("Test".to_string()));
    }

    #[test]
    fn test_ties_go_to_control() {
        let aggregation = pair(
            VariantAggregate::from_values("Control", vec![1.0, 3.0]),
            VariantAggregate::from_values("Test", vec![2.0, 2.0]),
        );

        let report = assemble(
            &aggregation,
            significant_result(DataType::Continuous),
            &TestConfig::default(),
        );

        assert_eq!(report.winner, Winner::Variant("Control".to_string()));
    }

    #[test]
    fn test_variant_summaries() {
        let aggregation = pair(
            VariantAggregate::from_values("Control", vec![9.0, 1.0, 4.0, 2.0]),
            VariantAggregate::from_values("Test", vec![3.0, 5.0, 7.0]),
        );

        let report = assemble(
            &aggregation,
            significant_result(DataType::Continuous),
            &TestConfig::default(),
        );

        let control = &report.variants[0];
        assert!(control.is_control);
        assert_eq!(control.visitors, 4);
        let stats = control.statistics.as_ref().unwrap();
        assert_eq!(stats.count, 4);
        assert_eq!(stats.mean, 4.0);
        assert_eq!(stats.median, 3.0);
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 9.0);
        assert!((stats.standard_deviation - (38.0f64 / 3.0).sqrt()).abs() < 1e-12);

        let treatment = &report.variants[1];
        assert!(!treatment.is_control);
        assert_eq!(treatment.statistics.as_ref().unwrap().median, 5.0);
        assert!(treatment.conversion_rate.is_none());
    }

    #[test]
    fn test_proportion_interval_is_clamped() {
        let ci = proportion_interval(1, 2, 0.95);
        assert_eq!(ci.lower, 0.0);
        assert_eq!(ci.upper, 1.0);

        let ci = proportion_interval(0, 50, 0.95);
        assert_eq!((ci.lower, ci.upper), (0.0, 0.0));

        let ci = proportion_interval(100, 1000, 0.95);
        assert!((ci.lower - 0.0814).abs() < 1e-3);
        assert!((ci.upper - 0.1186).abs() < 1e-3);
    }

    #[test]
    fn test_uplift_with_zero_control_rate() {
        assert_eq!(uplift_percent(0.0, 0.3), 0.0);
        assert!((uplift_percent(0.2, 0.1) - (-50.0)).abs() < 1e-9);
    }
}
