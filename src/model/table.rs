use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A single cell of an ingested table
///
/// Ingestion hands over whatever it parsed: CSV text, spreadsheet numbers or booleans.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
#[serde(untagged)]
pub enum Cell {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl Cell {
    /// Parse the cell as a finite float
    ///
    /// Booleans and nulls never parse. Text is trimmed before parsing.
    pub fn as_f64(&self) -> Option<f64> {
        let value = match self {
            Cell::Number(n) => *n,
            Cell::Text(s) => s.trim().parse::<f64>().ok()?,
            Cell::Null | Cell::Bool(_) => return None,
        };
        value.is_finite().then_some(value)
    }

    /// Whether the cell records a conversion
    ///
    /// Only the exact tokens "Yes", "1", "TRUE", "true", the number 1 and `true` count.
    pub fn is_conversion(&self) -> bool {
        match self {
            Cell::Text(s) => matches!(s.as_str(), "Yes" | "1" | "TRUE" | "true"),
            Cell::Number(n) => *n == 1.0,
            Cell::Bool(b) => *b,
            Cell::Null => false,
        }
    }

    /// Key used to group rows by variant, or None for a missing value
    pub fn group_key(&self) -> Option<String> {
        match self {
            Cell::Null => None,
            Cell::Text(s) => Some(s.clone()),
            Cell::Bool(b) => Some(b.to_string()),
            Cell::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                Some(format!("{}", *n as i64))
            }
            Cell::Number(n) => Some(n.to_string()),
        }
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Number(value)
    }
}

impl From<bool> for Cell {
    fn from(value: bool) -> Self {
        Cell::Bool(value)
    }
}

/// Rectangular table produced by data ingestion
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
pub struct DataTable {
    pub header: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}
