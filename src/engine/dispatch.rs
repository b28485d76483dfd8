//! Hypothesis test dispatch
//!
//! Selects one of three tests from the classified data type:
//! - Binary: two-proportion z-test
//! - Continuous: Welch two-sample t-test
//! - Categorical: chi-squared test of independence
//!
//! Group 1 is always the control, group 2 the treatment.

use super::classify::{classify, combine};
use super::error::AnalysisError;
use super::probability::{critical_value, ln_factorial, normal_cdf, student_t_cdf};
use crate::model::{
    ConfidenceInterval, DataType, Decision, Outcome, TailType, TestConfig, TestDetails,
    TestMethod, TestResult, VariantAggregate,
};
use tracing::debug;

/// Arithmetic mean; 0 for an empty slice
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample variance with denominator n - 1; 0 for fewer than two values
pub fn sample_variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64
}

fn decision(is_significant: bool) -> Decision {
    if is_significant {
        Decision::Reject
    } else {
        Decision::FailToReject
    }
}

fn details(
    method: TestMethod,
    null_hypothesis: &str,
    alternative_hypothesis: &str,
    assumptions: &[&str],
) -> TestDetails {
    TestDetails {
        method: method.display_name().to_string(),
        null_hypothesis: null_hypothesis.to_string(),
        alternative_hypothesis: alternative_hypothesis.to_string(),
        assumptions: assumptions.iter().map(|a| a.to_string()).collect(),
    }
}

/// Classify a control/treatment pair
///
/// Conversion counts are binary by construction; value samples are classified
/// and the more restrictive type wins.
pub fn classify_aggregates(control: &VariantAggregate, treatment: &VariantAggregate) -> DataType {
    let classify_one = |aggregate: &VariantAggregate| match &aggregate.outcome {
        Outcome::Conversions { .. } => DataType::Binary,
        Outcome::Values { values } => classify(values),
    };
    combine(classify_one(control), classify_one(treatment))
}

/// Run the test matching `data_type` on a control/treatment pair
pub fn run_test(
    control: &VariantAggregate,
    treatment: &VariantAggregate,
    data_type: DataType,
    config: &TestConfig,
) -> Result<TestResult, AnalysisError> {
    let result = match data_type {
        DataType::Binary => two_proportion_z_test(
            control.conversions(),
            control.visitor_count,
            treatment.conversions(),
            treatment.visitor_count,
            config,
        ),
        DataType::Continuous => welch_t_test(&control.sample(), &treatment.sample(), config),
        DataType::Categorical => chi_squared_test(&control.sample(), &treatment.sample(), config),
    }?;

    debug!(
        control = %control.name,
        treatment = %treatment.name,
        method = ?result.test_method,
        statistic = result.statistic,
        p_value = result.p_value,
        significant = result.is_significant,
        "Hypothesis test completed"
    );

    Ok(result)
}

/// Two-proportion z-test on conversion counts
///
/// Uses the pooled proportion for the standard error under H0 and the unpooled
/// standard error for the confidence interval of `p2 - p1`.
///
/// # Arguments
/// * `x1`, `n1` - Control conversions and visitors
/// * `x2`, `n2` - Treatment conversions and visitors
///
/// # Errors
/// `DegenerateSample` when a group is empty, conversions exceed visitors, or
/// the pooled standard error is zero (every outcome identical).
pub fn two_proportion_z_test(
    x1: u64,
    n1: u64,
    x2: u64,
    n2: u64,
    config: &TestConfig,
) -> Result<TestResult, AnalysisError> {
    if n1 == 0 || n2 == 0 {
        return Err(AnalysisError::DegenerateSample(
            "both groups need at least one visitor".to_string(),
        ));
    }
    if x1 > n1 || x2 > n2 {
        return Err(AnalysisError::DegenerateSample(
            "conversions exceed visitors".to_string(),
        ));
    }

    let (x1, n1, x2, n2) = (x1 as f64, n1 as f64, x2 as f64, n2 as f64);
    let p1 = x1 / n1;
    let p2 = x2 / n2;
    let p_pool = (x1 + x2) / (n1 + n2);

    let se = (p_pool * (1.0 - p_pool) * (1.0 / n1 + 1.0 / n2)).sqrt();
    if se == 0.0 || !se.is_finite() {
        return Err(AnalysisError::DegenerateSample(
            "pooled standard error is zero; every outcome is identical".to_string(),
        ));
    }

    let z = (p2 - p1) / se;
    let p_value = match config.tail_type {
        TailType::TwoTailed => 2.0 * (1.0 - normal_cdf(z.abs())),
        TailType::OneTailed => 1.0 - normal_cdf(z),
    }
    .clamp(0.0, 1.0);

    let diff = p2 - p1;
    let se_diff = (p1 * (1.0 - p1) / n1 + p2 * (1.0 - p2) / n2).sqrt();
    let margin = critical_value(config.confidence_level) * se_diff;

    let is_significant = p_value < config.alpha;
    let alternative = match config.tail_type {
        TailType::TwoTailed => {
            "There is a difference in proportions between the control and treatment groups"
        }
        TailType::OneTailed => {
            "The treatment proportion is greater than the control proportion"
        }
    };

    Ok(TestResult {
        data_type: DataType::Binary,
        test_method: TestMethod::TwoProportionZTest,
        statistic: z,
        p_value,
        confidence_interval: ConfidenceInterval {
            lower: diff - margin,
            upper: diff + margin,
        },
        effect_size: diff,
        is_significant,
        decision: decision(is_significant),
        degrees_of_freedom: None,
        details: details(
            TestMethod::TwoProportionZTest,
            "There is no difference in proportions between the control and treatment groups",
            alternative,
            &[
                "Binary outcomes (0/1)",
                "Independent observations",
                "Large sample size (np ≥ 5 and n(1-p) ≥ 5)",
            ],
        ),
    })
}

/// Welch two-sample t-test on raw values
///
/// The statistic is `(mean1 - mean2) / SE` with Welch-Satterthwaite degrees of
/// freedom. The p-value is always two-tailed and relies on the coarse
/// [`student_t_cdf`] approximation.
///
/// # Errors
/// `DegenerateSample` when a group has fewer than two values or both groups have
/// zero variance.
pub fn welch_t_test(
    a: &[f64],
    b: &[f64],
    config: &TestConfig,
) -> Result<TestResult, AnalysisError> {
    if a.len() < 2 || b.len() < 2 {
        return Err(AnalysisError::DegenerateSample(format!(
            "t-test needs at least 2 values per group, got {} and {}",
            a.len(),
            b.len()
        )));
    }

    let (n1, n2) = (a.len() as f64, b.len() as f64);
    let (mean1, mean2) = (mean(a), mean(b));
    let (var1, var2) = (sample_variance(a), sample_variance(b));

    let se = (var1 / n1 + var2 / n2).sqrt();
    if se == 0.0 || !se.is_finite() {
        return Err(AnalysisError::DegenerateSample(
            "standard error is zero; both groups have no variance".to_string(),
        ));
    }

    let t = (mean1 - mean2) / se;
    let df = (var1 / n1 + var2 / n2).powi(2)
        / ((var1 / n1).powi(2) / (n1 - 1.0) + (var2 / n2).powi(2) / (n2 - 1.0));
    let p_value = (2.0 * (1.0 - student_t_cdf(t.abs(), df))).clamp(0.0, 1.0);

    let pooled_sd = (((n1 - 1.0) * var1 + (n2 - 1.0) * var2) / (n1 + n2 - 2.0)).sqrt();
    if pooled_sd == 0.0 || !pooled_sd.is_finite() {
        return Err(AnalysisError::DegenerateSample(
            "pooled standard deviation is zero".to_string(),
        ));
    }
    let cohens_d = (mean1 - mean2) / pooled_sd;

    let diff = mean1 - mean2;
    let margin = critical_value(config.confidence_level) * se;
    let is_significant = p_value < config.alpha;

    Ok(TestResult {
        data_type: DataType::Continuous,
        test_method: TestMethod::WelchTTest,
        statistic: t,
        p_value,
        confidence_interval: ConfidenceInterval {
            lower: diff - margin,
            upper: diff + margin,
        },
        effect_size: cohens_d,
        is_significant,
        decision: decision(is_significant),
        degrees_of_freedom: Some(df),
        details: details(
            TestMethod::WelchTTest,
            "There is no difference in means between the control and treatment groups",
            "There is a difference in means between the control and treatment groups",
            &[
                "Data is normally distributed",
                "Observations are independent",
                "Equal or unequal variances (Welch correction applied)",
            ],
        ),
    })
}

/// Distinct values of both samples, sorted ascending
fn categories(a: &[f64], b: &[f64]) -> Vec<f64> {
    let mut distinct: Vec<f64> = a.iter().chain(b).copied().collect();
    distinct.sort_by(f64::total_cmp);
    distinct.dedup();
    distinct
}

fn count_per_category(sample: &[f64], categories: &[f64]) -> Vec<f64> {
    let mut counts = vec![0.0; categories.len()];
    for value in sample {
        if let Ok(i) = categories.binary_search_by(|c| c.total_cmp(value)) {
            counts[i] += 1.0;
        }
    }
    counts
}

/// Chi-squared p-value approximation
///
/// `e^(-χ²/2)·(χ²/2)^(df/2) / (df/2)!`, capped at 1.
/// This is not the regularized incomplete gamma function and is only loosely
/// valid for small df. A statistic of exactly zero reports 1: the observed
/// table matches expectation.
///
/// Evaluated in log space with [`ln_factorial`] so hundreds of categories do
/// not overflow. NaN inputs come back as NaN.
pub fn chi_squared_p_value(chi_squared: f64, df: f64) -> f64 {
    if chi_squared <= 0.0 {
        return 1.0;
    }
    let half = chi_squared / 2.0;
    let ln_p = -half + (df / 2.0) * half.ln() - ln_factorial(df / 2.0);
    ln_p.exp().clamp(0.0, 1.0)
}

/// Chi-squared test of independence between group membership and category
///
/// Builds a categories x 2 contingency table over the union of distinct values.
/// Effect size is Cramér's V, `sqrt(χ²/N)` for two columns.
///
/// # Errors
/// `DegenerateSample` when a group is empty, fewer than two categories exist,
/// or the p-value cannot be computed.
pub fn chi_squared_test(
    a: &[f64],
    b: &[f64],
    config: &TestConfig,
) -> Result<TestResult, AnalysisError> {
    if a.is_empty() || b.is_empty() {
        return Err(AnalysisError::DegenerateSample(
            "chi-squared test needs observations in both groups".to_string(),
        ));
    }

    let categories = categories(a, b);
    if categories.len() < 2 {
        return Err(AnalysisError::DegenerateSample(
            "chi-squared test needs at least two distinct categories".to_string(),
        ));
    }

    let observed_a = count_per_category(a, &categories);
    let observed_b = count_per_category(b, &categories);
    let (total_a, total_b) = (a.len() as f64, b.len() as f64);
    let total = total_a + total_b;

    let mut chi_squared = 0.0;
    for (oa, ob) in observed_a.iter().zip(&observed_b) {
        let row_total = oa + ob;
        for (observed, column_total) in [(oa, total_a), (ob, total_b)] {
            let expected = row_total * column_total / total;
            if expected > 0.0 {
                chi_squared += (observed - expected).powi(2) / expected;
            }
        }
    }

    let df = (categories.len() - 1) as f64;
    let p_value = chi_squared_p_value(chi_squared, df);
    if !p_value.is_finite() {
        return Err(AnalysisError::DegenerateSample(format!(
            "chi-squared p-value is not finite (statistic {}, df {})",
            chi_squared, df
        )));
    }
    let cramers_v = (chi_squared / total).sqrt();
    let is_significant = p_value < config.alpha;

    Ok(TestResult {
        data_type: DataType::Categorical,
        test_method: TestMethod::ChiSquaredIndependence,
        statistic: chi_squared,
        p_value,
        // Rough bound on V; no sampling distribution is derived for it
        confidence_interval: ConfidenceInterval {
            lower: 0.0,
            upper: cramers_v * 2.0,
        },
        effect_size: cramers_v,
        is_significant,
        decision: decision(is_significant),
        degrees_of_freedom: Some(df),
        details: details(
            TestMethod::ChiSquaredIndependence,
            "There is no association between group membership and the categorical variable",
            "There is an association between group membership and the categorical variable",
            &[
                "Independent observations",
                "Expected frequencies ≥ 5 in each cell",
                "Categorical data",
            ],
        ),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[path = "dispatch_test.rs"]
mod tests;
