//! Features ⋈ labels.

use super::DataStore;
use super::loaders::out_of_range;
use crate::error::{DatastoreError, Result, StructuralError};
use crate::schema::{DatasetKind, ID_COLUMN, LABEL_COLUMN, WEIGHT_COLUMN};
use crate::table::Table;

/// The joined modelling table and its derived views.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedTable {
    /// Labels joined with features on `name`.
    pub table: Table,
    /// Feature matrix: every column except `name`, `label` and `weight`.
    pub x: Table,
    /// Target vector.
    pub y: Vec<f64>,
    /// Sample weights scaled so the smallest is 1.
    pub weights: Vec<f64>,
}

impl<'s> DataStore<'s> {
    /// Join the loaded labels with the loaded features on `name`.
    ///
    /// Fails when either input is missing, when features carry a reserved
    /// column, or when any labelled row has no matching features.
    pub fn merge(&mut self) -> Result<()> {
        let features = self
            .features
            .as_ref()
            .ok_or_else(|| DatastoreError::not_loaded(DatasetKind::Features))?;
        let labels = self
            .labels
            .as_ref()
            .ok_or_else(|| DatastoreError::not_loaded(DatasetKind::Labels))?;

        if let Some(reserved) = [LABEL_COLUMN, WEIGHT_COLUMN]
            .into_iter()
            .find(|c| features.has_column(c))
        {
            return Err(StructuralError::ReservedColumn {
                dataset: DatasetKind::Features,
                column: reserved.to_string(),
            }
            .into());
        }

        let table = labels.inner_join(features, ID_COLUMN)?;
        if table.row_count() < labels.row_count() {
            return Err(StructuralError::UnmatchedRows {
                expected: labels.row_count(),
                matched: table.row_count(),
            }
            .into());
        }

        let x = table.drop_columns(&[ID_COLUMN, LABEL_COLUMN, WEIGHT_COLUMN]);
        let y: Vec<f64> = column_f64(&table, LABEL_COLUMN);
        let raw_weights = column_f64(&table, WEIGHT_COLUMN);
        let min = raw_weights.iter().copied().fold(f64::INFINITY, f64::min);
        if raw_weights.is_empty() {
            tracing::warn!("merge produced no rows");
        } else if min <= 0.0 || !min.is_finite() {
            return Err(out_of_range(
                DatasetKind::Labels,
                WEIGHT_COLUMN,
                min,
                "must be positive".into(),
            ));
        }
        let weights = raw_weights.iter().map(|w| w / min).collect();

        tracing::info!(
            rows = table.row_count(),
            features = x.column_count(),
            "merged features and labels"
        );
        self.merged = Some(MergedTable {
            table,
            x,
            y,
            weights,
        });
        Ok(())
    }
}

fn column_f64(table: &Table, name: &str) -> Vec<f64> {
    table
        .column(name)
        .into_iter()
        .flatten()
        .map(|v| v.as_f64().unwrap_or(f64::NAN))
        .collect()
}
