//! Aggregation of raw table rows into per-variant records
//!
//! Two paths, picked by looking at the outcome column once:
//! - Binary: every row is a visitor, conversions are counted from exact tokens
//! - Continuous: triggered when any outcome parses to a number other than 0 or 1;
//!   numeric outcomes are collected per variant and unparseable cells are dropped

use super::error::AnalysisError;
use crate::model::{Cell, DataTable, VariantAggregate};
use std::collections::HashMap;
use tracing::debug;

/// Aggregated variants with the resolved comparison pair
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregation {
    /// Variants in first-encountered order
    pub variants: Vec<VariantAggregate>,

    /// Index of the control group in `variants`
    pub control: usize,

    /// Index of the first non-control group in `variants`
    pub treatment: usize,

    /// Cells skipped because they were missing or unparseable
    pub dropped_cells: usize,
}

impl Aggregation {
    pub fn control(&self) -> &VariantAggregate {
        &self.variants[self.control]
    }

    pub fn treatment(&self) -> &VariantAggregate {
        &self.variants[self.treatment]
    }
}

#[derive(Debug)]
struct GroupBuilder {
    name: String,
    visitors: u64,
    conversions: u64,
    values: Vec<f64>,
}

/// Groups keyed by variant name, preserving first-encountered order
#[derive(Debug, Default)]
struct Groups {
    order: Vec<GroupBuilder>,
    index: HashMap<String, usize>,
}

impl Groups {
    fn entry(&mut self, name: String) -> &mut GroupBuilder {
        let position = match self.index.get(&name) {
            Some(position) => *position,
            None => {
                self.order.push(GroupBuilder {
                    name: name.clone(),
                    visitors: 0,
                    conversions: 0,
                    values: Vec::new(),
                });
                self.index.insert(name, self.order.len() - 1);
                self.order.len() - 1
            }
        };
        &mut self.order[position]
    }
}

/// Whether the outcome column holds continuous values
///
/// True as soon as one cell parses to a finite float outside {0, 1}.
pub fn is_continuous_outcome(rows: &[Vec<Cell>], outcome_column: usize) -> bool {
    rows.iter()
        .filter_map(|row| row.get(outcome_column))
        .filter_map(Cell::as_f64)
        .any(|v| v != 0.0 && v != 1.0)
}

/// Pick the control group among variant names
///
/// First name containing "control" (case-insensitive), else the first name.
pub fn resolve_control<S: AsRef<str>>(names: &[S]) -> Option<usize> {
    if names.is_empty() {
        return None;
    }
    let position = names
        .iter()
        .position(|name| name.as_ref().to_lowercase().contains("control"));
    Some(position.unwrap_or(0))
}

/// Aggregate rows (header excluded) into one record per variant
///
/// # Errors
/// * `InsufficientGroups` - fewer than two variants found
/// * `EmptyControlGroup` - the resolved control group has no visitors
pub fn aggregate(
    rows: &[Vec<Cell>],
    variant_column: usize,
    outcome_column: usize,
) -> Result<Aggregation, AnalysisError> {
    let continuous = is_continuous_outcome(rows, outcome_column);
    let mut groups = Groups::default();
    let mut dropped_cells = 0usize;

    for row in rows {
        let (Some(variant_cell), Some(outcome_cell)) =
            (row.get(variant_column), row.get(outcome_column))
        else {
            dropped_cells += 1;
            continue;
        };
        let Some(name) = variant_cell.group_key() else {
            dropped_cells += 1;
            continue;
        };

        let group = groups.entry(name);
        if continuous {
            match outcome_cell.as_f64() {
                Some(value) => {
                    group.visitors += 1;
                    group.values.push(value);
                }
                None => dropped_cells += 1,
            }
        } else {
            group.visitors += 1;
            if outcome_cell.is_conversion() {
                group.conversions += 1;
            }
        }
    }

    let variants: Vec<VariantAggregate> = groups
        .order
        .into_iter()
        .map(|group| {
            if continuous {
                VariantAggregate::from_values(group.name, group.values)
            } else {
                VariantAggregate::from_conversions(group.name, group.visitors, group.conversions)
            }
        })
        .collect();

    debug!(
        groups = variants.len(),
        continuous,
        dropped_cells,
        "Aggregated experiment rows"
    );

    if variants.len() < 2 {
        return Err(AnalysisError::InsufficientGroups(variants.len()));
    }

    let names: Vec<&str> = variants.iter().map(|v| v.name.as_str()).collect();
    let control = resolve_control(&names).unwrap_or(0);
    let treatment = (0..variants.len())
        .find(|i| *i != control)
        .unwrap_or(control);

    if variants[control].visitor_count == 0 {
        return Err(AnalysisError::EmptyControlGroup(
            variants[control].name.clone(),
        ));
    }

    Ok(Aggregation {
        variants,
        control,
        treatment,
        dropped_cells,
    })
}

/// Aggregate a full table after checking the column mapping against its width
///
/// Width is the header length, or the widest row when the header is empty.
pub fn aggregate_table(
    table: &DataTable,
    variant_column: usize,
    outcome_column: usize,
) -> Result<Aggregation, AnalysisError> {
    let width = if table.header.is_empty() {
        table.rows.iter().map(Vec::len).max().unwrap_or(0)
    } else {
        table.header.len()
    };

    for index in [variant_column, outcome_column] {
        if index >= width {
            return Err(AnalysisError::InvalidColumn { index, width });
        }
    }

    aggregate(&table.rows, variant_column, outcome_column)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[path = "aggregate_test.rs"]
mod tests;
