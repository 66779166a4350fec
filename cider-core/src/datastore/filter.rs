//! Post-load utilities over every loaded time-indexed dataset.

use super::DataStore;
use crate::error::{DatastoreError, Result};
use crate::schema::{DAY_COLUMN, DatasetKind, schema_for};
use chrono::NaiveDate;
use polars::prelude::{col, lit};

impl<'s> DataStore<'s> {
    /// Keep rows whose `day` lies in `[min, max]`, for every loaded
    /// time-indexed dataset. Rows without a day are dropped.
    pub fn filter_dates(&mut self, min: NaiveDate, max: NaiveDate) -> Result<()> {
        let kinds = self.loaded_time_indexed()?;
        for kind in kinds {
            let Some(slot) = self.time_indexed_slot(kind) else {
                continue;
            };
            let Some(table) = slot.as_ref() else {
                continue;
            };
            if !table.has_column(DAY_COLUMN) {
                continue;
            }
            let in_range = col(DAY_COLUMN)
                .gt_eq(lit(min))
                .and(col(DAY_COLUMN).lt_eq(lit(max)));
            let filtered = table.filter(in_range)?;
            let dropped = table.row_count() - filtered.row_count();
            if dropped > 0 {
                tracing::warn!(dataset = %kind, dropped, %min, %max, "rows outside date range dropped");
            }
            *slot = Some(filtered);
        }
        Ok(())
    }

    /// Keep one row per natural key in every loaded time-indexed dataset.
    /// Rows sharing a key but not a timestamp are distinct records.
    pub fn deduplicate(&mut self) -> Result<()> {
        let kinds = self.loaded_time_indexed()?;
        for kind in kinds {
            let key = schema_for(kind).natural_key;
            let Some(slot) = self.time_indexed_slot(kind) else {
                continue;
            };
            let Some(table) = slot.as_ref() else {
                continue;
            };
            let deduped = table.dedup_by(key)?;
            tracing::debug!(
                dataset = %kind,
                before = table.row_count(),
                after = deduped.row_count(),
                "deduplicated"
            );
            *slot = Some(deduped);
        }
        Ok(())
    }

    fn loaded_time_indexed(&self) -> Result<Vec<DatasetKind>> {
        let kinds: Vec<DatasetKind> = DatasetKind::ALL
            .into_iter()
            .filter(|k| k.is_time_indexed() && self.is_loaded(*k))
            .collect();
        if kinds.is_empty() {
            // Report the first time-indexed kind as the missing prerequisite.
            return Err(DatastoreError::not_loaded(DatasetKind::Cdr));
        }
        Ok(kinds)
    }
}
