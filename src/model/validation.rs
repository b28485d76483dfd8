use super::experiment::TestConfig;
use super::requests::PlanRequest;

/// Check that a value is a probability strictly inside (0, 1)
fn check_open_unit(field: &str, value: f64) -> Result<(), String> {
    if value.is_finite() && value > 0.0 && value < 1.0 {
        Ok(())
    } else {
        Err(format!("{} must be in (0, 1), got {}", field, value))
    }
}

/// Validate statistical parameters
///
/// # Validation Rules
/// - `alpha`, `power` and `confidence_level` must lie strictly in (0, 1)
///
/// # Returns
/// * `Ok(())` - Validation passed
/// * `Err(String)` - Validation error message
pub fn validate_test_config(config: &TestConfig) -> Result<(), String> {
    check_open_unit("alpha", config.alpha)?;
    check_open_unit("power", config.power)?;
    check_open_unit("confidence_level", config.confidence_level)?;
    Ok(())
}

/// Validate planning inputs
///
/// Rates must be probabilities in (0, 1). Traffic is checked separately by the
/// planner because non-positive traffic has its own error kind.
pub fn validate_plan_request(request: &PlanRequest) -> Result<(), String> {
    check_open_unit("control_rate", request.control_rate)?;
    check_open_unit("variant_rate", request.variant_rate)?;
    check_open_unit("alpha", request.alpha)?;
    check_open_unit("power", request.power)?;
    Ok(())
}
