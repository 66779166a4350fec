//! Weighted expansions for targeting and fairness tables.

use super::loaders::out_of_range;
use crate::error::Result;
use crate::schema::{DatasetKind, RANDOM_COLUMN, WEIGHT_COLUMN};
use crate::table::{ColumnType, Table, Value};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// A table plus its two weight expansions.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightedTable {
    /// Validated rows with a `random` column and integer weights.
    pub table: Table,
    /// Same rows, every weight set to 1.
    pub unweighted: Table,
    /// Each row repeated `weight` times.
    pub weighted: Table,
}

/// Upper bound on the number of rows a weighted expansion may materialize,
/// checked per row and across the whole table.
pub const MAX_EXPANDED_ROWS: u64 = 50_000_000;

/// Append a seeded `random` column, round weights to integers and build the
/// expansions. `table` must already carry a numeric `weight` column.
pub fn expand(kind: DatasetKind, mut table: Table, seed: u64) -> Result<WeightedTable> {
    let mut rng = StdRng::seed_from_u64(seed);
    let random: Vec<Value> = (0..table.row_count())
        .map(|_| Value::Float(rng.gen_range(0.0..1.0)))
        .collect();
    table.set_column(RANDOM_COLUMN, ColumnType::Float, random)?;

    let mut total: u64 = 0;
    let mut counts = Vec::with_capacity(table.row_count());
    for value in table.column(WEIGHT_COLUMN).into_iter().flatten() {
        let w = value.as_f64().unwrap_or(1.0);
        let count = row_count_for(kind, w)?;
        total = total
            .checked_add(count)
            .filter(|t| *t <= MAX_EXPANDED_ROWS)
            .ok_or_else(|| {
                out_of_range(
                    kind,
                    WEIGHT_COLUMN,
                    w,
                    format!("pushes the weighted expansion past {MAX_EXPANDED_ROWS} rows"),
                )
            })?;
        counts.push(count);
    }

    let rounded = counts.iter().map(|&n| Value::Float(n as f64)).collect();
    table.set_column(WEIGHT_COLUMN, ColumnType::Float, rounded)?;

    let mut unweighted = table.clone();
    unweighted.set_column(
        WEIGHT_COLUMN,
        ColumnType::Float,
        vec![Value::Float(1.0); table.row_count()],
    )?;
    let weighted = table.repeat_rows(&counts)?;
    tracing::debug!(dataset = %kind, expanded_rows = total, "expanded weights");

    Ok(WeightedTable {
        table,
        unweighted,
        weighted,
    })
}

/// Rounded repetition count for one weight.
fn row_count_for(kind: DatasetKind, w: f64) -> Result<u64> {
    if !w.is_finite() || w < 0.0 {
        return Err(out_of_range(
            kind,
            WEIGHT_COLUMN,
            w,
            "must be a non-negative number".into(),
        ));
    }
    let rounded = w.round();
    if rounded > MAX_EXPANDED_ROWS as f64 {
        return Err(out_of_range(
            kind,
            WEIGHT_COLUMN,
            w,
            format!("exceeds the expansion limit of {MAX_EXPANDED_ROWS} rows"),
        ));
    }
    Ok(rounded as u64)
}
