//! Sample-size and run-length planning
//!
//! Used during experiment design, before any data exists.

use super::error::AnalysisError;
use super::probability::normal_inverse_cdf;
use crate::model::validation::{validate_plan_request, validate_test_config};
use crate::model::{EffectPlanRequest, PlanRequest, PlanningEstimate, TailType, TestConfig};
use tracing::debug;

/// Critical value for alpha, respecting the tail type
fn z_alpha(config: &TestConfig) -> f64 {
    match config.tail_type {
        TailType::TwoTailed => normal_inverse_cdf(1.0 - config.alpha / 2.0),
        TailType::OneTailed => normal_inverse_cdf(1.0 - config.alpha),
    }
}

/// Required visitors per group for a two-proportion comparison
///
/// `⌈(zα·√(2p̄(1-p̄)) + zβ·√(p1(1-p1) + p2(1-p2)))² / (p2-p1)²⌉` with `p̄ = (p1+p2)/2`.
///
/// # Arguments
/// * `p1` - Control conversion rate
/// * `p2` - Expected variant conversion rate
/// * `config` - alpha, power and tail type (confidence level unused)
///
/// # Errors
/// `ZeroEffectSize` when the rates are equal.
pub fn required_sample_size(p1: f64, p2: f64, config: &TestConfig) -> Result<u64, AnalysisError> {
    if p1 == p2 {
        return Err(AnalysisError::ZeroEffectSize);
    }

    let z_alpha = z_alpha(config);
    let z_beta = normal_inverse_cdf(config.power);
    let pooled = (p1 + p2) / 2.0;

    let numerator = (z_alpha * (2.0 * pooled * (1.0 - pooled)).sqrt()
        + z_beta * (p1 * (1.0 - p1) + p2 * (1.0 - p2)).sqrt())
    .powi(2);
    let effect = (p2 - p1).powi(2);

    let size = (numerator / effect).ceil();
    if !size.is_finite() || size < 0.0 {
        return Err(AnalysisError::DegenerateSample(format!(
            "sample size is not finite for rates {} and {}",
            p1, p2
        )));
    }
    Ok(size as u64)
}

/// Required observations per group for a standardized mean difference
///
/// `⌈2·((zα + zβ) / d)²⌉` where `d` is Cohen's d.
///
/// # Errors
/// `ZeroEffectSize` when `d` is zero.
pub fn required_sample_size_for_effect(
    effect_size: f64,
    config: &TestConfig,
) -> Result<u64, AnalysisError> {
    if effect_size == 0.0 {
        return Err(AnalysisError::ZeroEffectSize);
    }
    if !effect_size.is_finite() {
        return Err(AnalysisError::InvalidParameter(format!(
            "effect size must be finite, got {}",
            effect_size
        )));
    }
    validate_test_config(config).map_err(AnalysisError::InvalidParameter)?;

    let z = z_alpha(config) + normal_inverse_cdf(config.power);
    Ok((2.0 * (z / effect_size).powi(2)).ceil() as u64)
}

/// Days needed to collect `sample_size` visitors in each of two groups
///
/// # Errors
/// `InvalidTraffic` when `traffic_per_day` is not positive.
pub fn estimated_duration_days(
    sample_size: u64,
    traffic_per_day: i64,
) -> Result<u64, AnalysisError> {
    if traffic_per_day <= 0 {
        return Err(AnalysisError::InvalidTraffic(traffic_per_day));
    }
    // Factor 2: traffic is split across control and variant
    let days = (2.0 * sample_size as f64 / traffic_per_day as f64).ceil();
    Ok(days as u64)
}

/// Plan an experiment: per-group sample size and estimated run length
pub fn plan(request: &PlanRequest) -> Result<PlanningEstimate, AnalysisError> {
    validate_plan_request(request).map_err(AnalysisError::InvalidParameter)?;

    let required = required_sample_size(
        request.control_rate,
        request.variant_rate,
        &request.test_config(),
    )?;
    let days = estimated_duration_days(required, request.traffic_per_day)?;

    debug!(
        control_rate = request.control_rate,
        variant_rate = request.variant_rate,
        required_per_group = required,
        days,
        "Computed planning estimate"
    );

    Ok(PlanningEstimate {
        required_sample_size_per_group: required,
        estimated_duration_days: days,
    })
}

/// Plan a comparison of means from an expected Cohen's d
pub fn plan_for_effect(request: &EffectPlanRequest) -> Result<PlanningEstimate, AnalysisError> {
    let required = required_sample_size_for_effect(request.effect_size, &request.test_config())?;
    let days = estimated_duration_days(required, request.traffic_per_day)?;

    debug!(
        effect_size = request.effect_size,
        required_per_group = required,
        days,
        "Computed effect-size planning estimate"
    );

    Ok(PlanningEstimate {
        required_sample_size_per_group: required,
        estimated_duration_days: days,
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    fn request(control_rate: f64, variant_rate: f64, traffic_per_day: i64) -> PlanRequest {
        PlanRequest {
            control_rate,
            variant_rate,
            traffic_per_day,
            alpha: 0.05,
            power: 0.8,
            tail_type: TailType::TwoTailed,
        }
    }

    #[test]
    fn test_plan_reference_scenario() {
        let estimate = plan(&request(0.10, 0.12, 1000)).unwrap();

        assert_eq!(estimate.required_sample_size_per_group, 3842);
        assert_eq!(estimate.estimated_duration_days, 8);
    }

    #[test]
    fn test_one_tailed_needs_fewer_samples() {
        let config = TestConfig {
            tail_type: TailType::OneTailed,
            ..TestConfig::default()
        };

        let one_tailed = required_sample_size(0.10, 0.12, &config).unwrap();
        let two_tailed = required_sample_size(0.10, 0.12, &TestConfig::default()).unwrap();

        assert_eq!(one_tailed, 3026);
        assert!(one_tailed < two_tailed);
    }

    #[test]
    fn test_sample_size_symmetric_in_direction() {
        let config = TestConfig::default();
        let up = required_sample_size(0.10, 0.12, &config).unwrap();
        let down = required_sample_size(0.12, 0.10, &config).unwrap();
        assert_eq!(up, down);
    }

    #[test]
    fn test_sample_size_monotonic_in_power() {
        let mut previous = 0;
        for power in [0.5, 0.6, 0.7, 0.8, 0.9, 0.95, 0.99] {
            let config = TestConfig {
                power,
                ..TestConfig::default()
            };
            let size = required_sample_size(0.10, 0.12, &config).unwrap();
            assert!(size >= previous, "power={} size={} previous={}", power, size, previous);
            previous = size;
        }
    }

    #[test]
    fn test_sample_size_monotonic_in_alpha() {
        let mut previous = 0;
        for alpha in [0.2, 0.1, 0.05, 0.01, 0.001] {
            let config = TestConfig {
                alpha,
                ..TestConfig::default()
            };
            let size = required_sample_size(0.10, 0.12, &config).unwrap();
            assert!(size >= previous, "alpha={} size={} previous={}", alpha, size, previous);
            previous = size;
        }
    }

    #[test]
    fn test_identical_rates_is_zero_effect() {
        let err = plan(&request(0.1, 0.1, 1000)).unwrap_err();
        assert_eq!(err, AnalysisError::ZeroEffectSize);
    }

    #[test]
    fn test_non_positive_traffic_rejected() {
        assert_eq!(
            plan(&request(0.1, 0.12, 0)).unwrap_err(),
            AnalysisError::InvalidTraffic(0)
        );
        assert_eq!(
            estimated_duration_days(100, -3).unwrap_err(),
            AnalysisError::InvalidTraffic(-3)
        );
    }

    #[test]
    fn test_duration_rounds_up() {
        assert_eq!(estimated_duration_days(8637, 1000).unwrap(), 18);
        assert_eq!(estimated_duration_days(500, 1000).unwrap(), 1);
        assert_eq!(estimated_duration_days(0, 1000).unwrap(), 0);
    }

    #[test]
    fn test_out_of_range_rate_is_invalid_parameter() {
        let err = plan(&request(1.5, 0.12, 1000)).unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidParameter(_)));
    }

    #[test]
    fn test_sample_size_for_medium_effect() {
        // (1.9604 + 0.8415)² · 2 / 0.25 ≈ 62.8
        let size = required_sample_size_for_effect(0.5, &TestConfig::default()).unwrap();
        assert_eq!(size, 63);

        assert_eq!(
            required_sample_size_for_effect(0.0, &TestConfig::default()).unwrap_err(),
            AnalysisError::ZeroEffectSize
        );
    }

    #[test]
    fn test_plan_for_effect() {
        let request = EffectPlanRequest {
            effect_size: -0.5,
            traffic_per_day: 40,
            alpha: 0.05,
            power: 0.8,
            tail_type: TailType::TwoTailed,
        };

        let estimate = plan_for_effect(&request).unwrap();
        assert_eq!(estimate.required_sample_size_per_group, 63);
        assert_eq!(estimate.estimated_duration_days, 4);

        let invalid = EffectPlanRequest {
            power: 1.0,
            ..request.clone()
        };
        assert!(matches!(
            plan_for_effect(&invalid).unwrap_err(),
            AnalysisError::InvalidParameter(_)
        ));

        let no_traffic = EffectPlanRequest {
            traffic_per_day: 0,
            ..request
        };
        assert_eq!(
            plan_for_effect(&no_traffic).unwrap_err(),
            AnalysisError::InvalidTraffic(0)
        );
    }
}
