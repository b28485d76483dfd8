//! Data-type classification of outcome samples

use crate::model::DataType;

/// Maximum number of distinct integer values still treated as categorical
pub const MAX_CATEGORIES: usize = 10;

/// Classify a single sample
///
/// - `Binary` if every value is 0 or 1
/// - `Categorical` if there are at most 10 distinct values and all are integers
/// - `Continuous` otherwise
pub fn classify(sample: &[f64]) -> DataType {
    if sample.iter().all(|v| *v == 0.0 || *v == 1.0) {
        return DataType::Binary;
    }

    let mut distinct: Vec<f64> = Vec::with_capacity(MAX_CATEGORIES + 1);
    for value in sample {
        if value.fract() != 0.0 || !value.is_finite() {
            return DataType::Continuous;
        }
        if !distinct.contains(value) {
            if distinct.len() == MAX_CATEGORIES {
                return DataType::Continuous;
            }
            distinct.push(*value);
        }
    }

    DataType::Categorical
}

/// Classify two samples jointly, keeping the more restrictive type
///
/// Precedence is binary > categorical > continuous: if either side is binary,
/// both are analysed as binary.
pub fn classify_pair(a: &[f64], b: &[f64]) -> DataType {
    combine(classify(a), classify(b))
}

/// Combine two per-sample classifications by precedence
pub fn combine(a: DataType, b: DataType) -> DataType {
    match (a, b) {
        (DataType::Binary, _) | (_, DataType::Binary) => DataType::Binary,
        (DataType::Categorical, _) | (_, DataType::Categorical) => DataType::Categorical,
        _ => DataType::Continuous,
    }
}
