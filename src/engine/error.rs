use thiserror::Error;

/// Failures that abort an engine call
///
/// Malformed cells are not listed here: the aggregator drops them and carries on.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    #[error("Need at least 2 variants for comparison, found {0}")]
    InsufficientGroups(usize),

    #[error("Control group '{0}' has no visitors")]
    EmptyControlGroup(String),

    #[error("Control and variant rates are identical; no sample size can detect a zero effect")]
    ZeroEffectSize,

    #[error("Daily traffic must be positive, got {0}")]
    InvalidTraffic(i64),

    #[error("Degenerate sample: {0}")]
    DegenerateSample(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Column index {index} is outside the table ({width} columns)")]
    InvalidColumn { index: usize, width: usize },
}

impl AnalysisError {
    /// Stable identifier used on the wire and as a metric label
    pub fn kind(&self) -> &'static str {
        match self {
            AnalysisError::InsufficientGroups(_) => "insufficient_groups",
            AnalysisError::EmptyControlGroup(_) => "empty_control_group",
            AnalysisError::ZeroEffectSize => "zero_effect_size",
            AnalysisError::InvalidTraffic(_) => "invalid_traffic",
            AnalysisError::DegenerateSample(_) => "degenerate_sample",
            AnalysisError::InvalidParameter(_) => "invalid_parameter",
            AnalysisError::InvalidColumn { .. } => "invalid_column",
        }
    }

    /// Rebuild an error reported by a remote engine
    ///
    /// Returns None for kinds this engine does not know.
    pub fn from_wire(kind: &str, message: &str) -> Option<Self> {
        let error = match kind {
            "insufficient_groups" => {
                let found = message
                    .rsplit(' ')
                    .next()
                    .and_then(|n| n.parse().ok())
                    .unwrap_or(0);
                AnalysisError::InsufficientGroups(found)
            }
            "empty_control_group" => {
                let name = message.split('\'').nth(1).unwrap_or_default();
                AnalysisError::EmptyControlGroup(name.to_string())
            }
            "zero_effect_size" => AnalysisError::ZeroEffectSize,
            "invalid_traffic" => {
                let traffic = message
                    .rsplit(' ')
                    .next()
                    .and_then(|n| n.parse().ok())
                    .unwrap_or(0);
                AnalysisError::InvalidTraffic(traffic)
            }
            "degenerate_sample" => AnalysisError::DegenerateSample(
                message
                    .strip_prefix("Degenerate sample: ")
                    .unwrap_or(message)
                    .to_string(),
            ),
            "invalid_column" => {
                let words: Vec<&str> = message.split_whitespace().collect();
                let index = words.get(2).and_then(|n| n.parse().ok());
                let width = words
                    .get(7)
                    .and_then(|n| n.trim_start_matches('(').parse().ok());
                match (index, width) {
                    (Some(index), Some(width)) => AnalysisError::InvalidColumn { index, width },
                    _ => AnalysisError::InvalidParameter(message.to_string()),
                }
            }
            "invalid_parameter" => AnalysisError::InvalidParameter(
                message
                    .strip_prefix("Invalid parameter: ")
                    .unwrap_or(message)
                    .to_string(),
            ),
            _ => return None,
        };
        Some(error)
    }
}
