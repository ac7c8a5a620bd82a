use ndarray::{Array1, ArrayView2, Axis};
use tracing::trace;

use super::ObservationInput;
use crate::parsing::mapping::EncoderMapping;
use crate::registry::ModelEntry;

/// One value per expected column of a model, in the model's column order.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow<'a> {
    columns: &'a [String],
    values: Array1<f64>,
}

impl<'a> FeatureRow<'a> {
    /// A row of zeros over `columns`.
    pub fn zeros(columns: &'a [String]) -> FeatureRow<'a> {
        FeatureRow {
            columns,
            values: Array1::zeros(columns.len()),
        }
    }

    pub fn columns(&self) -> &'a [String] {
        self.columns
    }

    pub fn values(&self) -> &Array1<f64> {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Value of `column`, `None` if the model does not use it.
    pub fn get(&self, column: &str) -> Option<f64> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|idx| self.values[idx])
    }

    /// `(column, value)` pairs in column order.
    pub fn iter(&self) -> impl Iterator<Item = (&'a str, f64)> + '_ {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().copied())
    }

    /// The row as a 1 x n matrix, the shape classifiers predict on.
    pub fn as_matrix(&self) -> ArrayView2<'_, f64> {
        self.values.view().insert_axis(Axis(0))
    }
}

/// Encode `input` into the feature space of `entry`.
///
/// Every expected column starts at 0. Each recognised `(field, value)` pair
/// sets the columns its mapping entry names, as long as the model uses them.
/// Unknown fields, unknown values and non-string values are ignored, and when
/// two pairs set the same column the later one wins.
pub fn encode<'a>(
    input: &ObservationInput,
    mapping: &EncoderMapping,
    entry: &'a ModelEntry,
) -> FeatureRow<'a> {
    let mut row = FeatureRow::zeros(entry.expected_columns());

    for (field, value) in input.categories() {
        let Some(weights) = mapping.lookup(field, value) else {
            trace!(field, "no encoding for value, ignoring");
            continue;
        };

        for (column, weight) in weights {
            if let Some(idx) = entry.column_position(column) {
                row.values[idx] = *weight;
            }
        }
    }

    row
}
