//! In-memory tabular model shared by readers, loaders and the merge engine.
//!
//! A [`Table`] is a polars [`DataFrame`] plus the names of the columns that
//! carry GeoJSON geometries. Loaders inspect and rewrite cells through
//! [`Value`]; projection, filtering, joins, uniqueness and row repetition
//! run on the frame.

use crate::error::{Result, StructuralError};
use crate::geometry::Geometry;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use polars::prelude::{
    AnyValue, Column, DataFrame, DataType, Expr, IdxCa, IdxSize, IntoLazy, JoinArgs, JoinType,
    NamedFrom, NewChunkedArray, PlSmallStr, PolarsError, Series, SortMultipleOptions, TimeUnit,
    UniqueKeepStrategy, col,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::fmt;

/// Temporary column that carries left-side row order through a join.
const ROW_ORDER: &str = "__cider_row_order";

/// Physical column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    String,
    Integer,
    Float,
    Boolean,
    DateTime,
    Date,
    Geometry,
    /// Every value is null.
    Null,
}

impl ColumnType {
    fn from_dtype(dtype: &DataType) -> Self {
        match dtype {
            DataType::Boolean => Self::Boolean,
            DataType::Date => Self::Date,
            DataType::Datetime(_, _) => Self::DateTime,
            DataType::Null => Self::Null,
            dt if dt.is_float() => Self::Float,
            dt if dt.is_integer() => Self::Integer,
            _ => Self::String,
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Boolean => "boolean",
            Self::DateTime => "timestamp",
            Self::Date => "date",
            Self::Geometry => "geometry",
            Self::Null => "null",
        };
        f.write_str(name)
    }
}

/// A single cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Timestamp(NaiveDateTime),
    Date(NaiveDate),
    Geometry(Geometry),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn column_type(&self) -> ColumnType {
        match self {
            Value::Null => ColumnType::Null,
            Value::Str(_) => ColumnType::String,
            Value::Int(_) => ColumnType::Integer,
            Value::Float(_) => ColumnType::Float,
            Value::Bool(_) => ColumnType::Boolean,
            Value::Timestamp(_) => ColumnType::DateTime,
            Value::Date(_) => ColumnType::Date,
            Value::Geometry(_) => ColumnType::Geometry,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric view; integers widen to `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        match self {
            Value::Timestamp(ts) => Some(*ts),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Value::Date(d) => Some(*d),
            Value::Timestamp(ts) => Some(ts.date()),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str(""),
            Value::Str(s) => f.write_str(s),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Timestamp(ts) => write!(f, "{}", ts.format("%Y-%m-%d %H:%M:%S")),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Value::Geometry(g) => f.write_str(&g.to_json_string()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Value::Date(d)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(ts: NaiveDateTime) -> Self {
        Value::Timestamp(ts)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// Infer a column type from its values. Mixed numeric columns widen to
/// float; any other mix is reported as string.
pub fn infer_column_type(values: &[Value]) -> ColumnType {
    let mut inferred = ColumnType::Null;
    for v in values.iter().filter(|v| !v.is_null()) {
        let ty = v.column_type();
        inferred = match (inferred, ty) {
            (ColumnType::Null, t) => t,
            (a, b) if a == b => a,
            (ColumnType::Integer, ColumnType::Float) | (ColumnType::Float, ColumnType::Integer) => {
                ColumnType::Float
            }
            _ => ColumnType::String,
        };
    }
    inferred
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub dtype: ColumnType,
}

impl Field {
    pub fn new(name: impl Into<String>, dtype: ColumnType) -> Self {
        Self {
            name: name.into(),
            dtype,
        }
    }
}

/// An ordered set of named, typed columns backed by a polars frame.
#[derive(Debug, Clone)]
pub struct Table {
    frame: DataFrame,
    geometry: BTreeSet<String>,
}

impl Default for Table {
    fn default() -> Self {
        Self::from_frame(DataFrame::empty())
    }
}

impl PartialEq for Table {
    fn eq(&self, other: &Self) -> bool {
        self.geometry == other.geometry && self.frame.equals_missing(&other.frame)
    }
}

impl Table {
    /// Build a table from a schema and rows, rejecting duplicate names and
    /// ragged rows.
    pub fn new(fields: Vec<Field>, rows: Vec<Vec<Value>>) -> Result<Self> {
        let mut seen = HashSet::new();
        for field in &fields {
            if !seen.insert(field.name.as_str()) {
                return Err(StructuralError::DuplicateColumn {
                    column: field.name.clone(),
                }
                .into());
            }
        }
        if let Some((i, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != fields.len())
        {
            return Err(StructuralError::RaggedRow {
                row: i,
                expected: fields.len(),
                found: row.len(),
            }
            .into());
        }

        let mut columns: Vec<Vec<Value>> = (0..fields.len())
            .map(|_| Vec::with_capacity(rows.len()))
            .collect();
        for row in rows {
            for (column, value) in columns.iter_mut().zip(row) {
                column.push(value);
            }
        }
        Self::from_typed_columns(fields.into_iter().zip(columns))
    }

    /// Build a table from named columns, inferring each column's type.
    ///
    /// ```
    /// use cider_core::table::{Table, Value};
    ///
    /// let table = Table::from_columns(vec![
    ///     ("caller_id", vec![Value::from("A")]),
    ///     ("amount", vec![Value::from(100)]),
    /// ])
    /// .unwrap();
    /// assert_eq!(table.row_count(), 1);
    /// ```
    pub fn from_columns<S, I>(columns: I) -> Result<Self>
    where
        S: Into<String>,
        I: IntoIterator<Item = (S, Vec<Value>)>,
    {
        let columns: Vec<(Field, Vec<Value>)> = columns
            .into_iter()
            .map(|(name, values)| (Field::new(name, infer_column_type(&values)), values))
            .collect();
        let row_count = columns.first().map_or(0, |(_, values)| values.len());
        if let Some((field, values)) = columns.iter().find(|(_, v)| v.len() != row_count) {
            return Err(StructuralError::ColumnLength {
                column: field.name.clone(),
                expected: row_count,
                found: values.len(),
            }
            .into());
        }
        let mut seen = HashSet::new();
        if let Some((field, _)) = columns.iter().find(|(f, _)| !seen.insert(f.name.clone())) {
            return Err(StructuralError::DuplicateColumn {
                column: field.name.clone(),
            }
            .into());
        }
        Self::from_typed_columns(columns)
    }

    fn from_typed_columns(columns: impl IntoIterator<Item = (Field, Vec<Value>)>) -> Result<Self> {
        let mut geometry = BTreeSet::new();
        let mut built = Vec::new();
        for (field, values) in columns {
            if field.dtype == ColumnType::Geometry {
                geometry.insert(field.name.clone());
            }
            built.push(Column::from(build_series(&field.name, field.dtype, &values)?));
        }
        Ok(Self {
            frame: DataFrame::new(built)?,
            geometry,
        })
    }

    /// Wrap a frame produced by a reader. No column is treated as geometry.
    pub fn from_frame(frame: DataFrame) -> Self {
        Self {
            frame,
            geometry: BTreeSet::new(),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn into_frame(self) -> DataFrame {
        self.frame
    }

    pub fn row_count(&self) -> usize {
        self.frame.height()
    }

    pub fn column_count(&self) -> usize {
        self.frame.width()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.frame
            .get_column_names()
            .into_iter()
            .map(PlSmallStr::as_str)
            .collect()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.column_names().iter().position(|c| *c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn dtype(&self, name: &str) -> Option<ColumnType> {
        let column = self.frame.column(name).ok()?;
        if self.geometry.contains(name) {
            return Some(ColumnType::Geometry);
        }
        Some(ColumnType::from_dtype(column.dtype()))
    }

    pub fn fields(&self) -> Vec<Field> {
        self.column_names()
            .into_iter()
            .filter_map(|name| Some(Field::new(name, self.dtype(name)?)))
            .collect()
    }

    /// Values of one column, in row order.
    pub fn column(&self, name: &str) -> Option<impl Iterator<Item = Value> + '_> {
        let series = self.frame.column(name).ok()?.as_materialized_series();
        let geometry = self.geometry.contains(name);
        Some((0..series.len()).map(move |row| cell(series, row, geometry)))
    }

    /// One cell, or `None` when the row or column does not exist.
    pub fn value(&self, row: usize, column: &str) -> Option<Value> {
        self.column(column)?.nth(row)
    }

    /// Materialize every row.
    pub fn rows(&self) -> Vec<Vec<Value>> {
        let columns: Vec<Vec<Value>> = self
            .column_names()
            .into_iter()
            .filter_map(|name| self.column(name).map(Iterator::collect))
            .collect();
        (0..self.row_count())
            .map(|r| columns.iter().map(|c| c[r].clone()).collect())
            .collect()
    }

    /// Rename a column in place. Renaming onto an existing name is rejected.
    pub fn rename_column(&mut self, from: &str, to: &str) -> Result<()> {
        if from == to || !self.has_column(from) {
            return Ok(());
        }
        if self.has_column(to) {
            return Err(StructuralError::DuplicateColumn {
                column: to.to_string(),
            }
            .into());
        }
        self.frame.rename(from, PlSmallStr::from(to))?;
        if self.geometry.remove(from) {
            self.geometry.insert(to.to_string());
        }
        Ok(())
    }

    /// Replace the values of an existing column, or append a new one.
    pub fn set_column(&mut self, name: &str, dtype: ColumnType, values: Vec<Value>) -> Result<()> {
        if self.column_count() > 0 && values.len() != self.row_count() {
            return Err(StructuralError::ColumnLength {
                column: name.to_string(),
                expected: self.row_count(),
                found: values.len(),
            }
            .into());
        }
        let series = build_series(name, dtype, &values)?;
        self.frame.with_column(series)?;
        if dtype == ColumnType::Geometry {
            self.geometry.insert(name.to_string());
        } else {
            self.geometry.remove(name);
        }
        Ok(())
    }

    /// Append a constant column.
    pub fn with_constant(mut self, name: &str, value: Value) -> Result<Self> {
        let dtype = value.column_type();
        let values = vec![value; self.row_count()];
        self.set_column(name, dtype, values)?;
        Ok(self)
    }

    /// Cast a column to float through the frame engine. Returns `false` and
    /// leaves the column untouched when any non-null value fails to convert
    /// or the column holds non-numeric, non-text data.
    pub fn try_cast_float(&mut self, name: &str) -> bool {
        let Ok(column) = self.frame.column(name) else {
            return false;
        };
        let castable = matches!(
            ColumnType::from_dtype(column.dtype()),
            ColumnType::Integer | ColumnType::Float | ColumnType::String | ColumnType::Null
        );
        if !castable || self.geometry.contains(name) {
            return false;
        }
        match column.as_materialized_series().strict_cast(&DataType::Float64) {
            Ok(cast) => self.frame.with_column(cast).is_ok(),
            Err(_) => false,
        }
    }

    /// Project onto the named columns, in the given order.
    pub fn select(&self, names: &[&str]) -> Result<Self> {
        if let Some(missing) = names.iter().find(|name| !self.has_column(name)) {
            return Err(StructuralError::UnknownColumn {
                column: (*missing).to_string(),
            }
            .into());
        }
        Ok(Self {
            frame: self.frame.select(names.iter().copied())?,
            geometry: self.retained_geometry(names.iter().copied()),
        })
    }

    /// Remove the named columns; unknown names are ignored.
    pub fn drop_columns(&self, names: &[&str]) -> Self {
        let present: Vec<&str> = names
            .iter()
            .copied()
            .filter(|name| self.has_column(name))
            .collect();
        let frame = self.frame.drop_many(present);
        let geometry = self.retained_geometry(frame.get_column_names().into_iter().map(PlSmallStr::as_str));
        Self { frame, geometry }
    }

    /// Keep the rows for which `predicate` evaluates to true. Rows where it
    /// evaluates to null are dropped.
    pub fn filter(&self, predicate: Expr) -> Result<Self> {
        Ok(Self {
            frame: self.frame.clone().lazy().filter(predicate).collect()?,
            geometry: self.geometry.clone(),
        })
    }

    /// Drop exact duplicate rows, keeping the first occurrence.
    pub fn distinct(&self) -> Result<Self> {
        Ok(Self {
            frame: self
                .frame
                .unique_stable(None, UniqueKeepStrategy::First, None)?,
            geometry: self.geometry.clone(),
        })
    }

    /// Keep one row per distinct combination of `key` columns; the last row
    /// of each group wins. Key columns the table lacks are ignored.
    pub fn dedup_by(&self, key: &[&str]) -> Result<Self> {
        let subset: Vec<String> = key
            .iter()
            .filter(|name| self.has_column(name))
            .map(|name| (*name).to_string())
            .collect();
        if subset.is_empty() {
            return Ok(self.clone());
        }
        Ok(Self {
            frame: self
                .frame
                .unique_stable(Some(subset.as_slice()), UniqueKeepStrategy::Last, None)?,
            geometry: self.geometry.clone(),
        })
    }

    /// Repeat each row `counts[i]` times; rows without a count are dropped.
    pub fn repeat_rows(&self, counts: &[u64]) -> Result<Self> {
        let mut indices: Vec<IdxSize> = Vec::new();
        for (row, &n) in counts.iter().enumerate().take(self.row_count()) {
            let (Ok(idx), Ok(n)) = (IdxSize::try_from(row), usize::try_from(n)) else {
                return Err(PolarsError::ComputeError(
                    format!("row {row} cannot be repeated {n} times").into(),
                )
                .into());
            };
            indices.extend(std::iter::repeat_n(idx, n));
        }
        let indices = IdxCa::from_vec(PlSmallStr::from(ROW_ORDER), indices);
        Ok(Self {
            frame: self.frame.take(&indices)?,
            geometry: self.geometry.clone(),
        })
    }

    /// Inner join on a key column present in both tables. Columns of
    /// `right` other than the key follow the columns of `self`, and rows
    /// keep the order of `self`. Null keys never match.
    pub fn inner_join(&self, right: &Table, key: &str) -> Result<Self> {
        for table in [self, right] {
            if !table.has_column(key) {
                return Err(StructuralError::UnknownColumn {
                    column: key.to_string(),
                }
                .into());
            }
        }
        let frame = self
            .frame
            .clone()
            .lazy()
            .with_row_index(ROW_ORDER, None)
            .join(
                right.frame.clone().lazy(),
                [col(key)],
                [col(key)],
                JoinArgs::new(JoinType::Inner),
            )
            .sort(
                [ROW_ORDER],
                SortMultipleOptions::default().with_maintain_order(true),
            )
            .collect()?
            .drop(ROW_ORDER)?;
        let mut geometry = self.geometry.clone();
        geometry.extend(right.geometry.iter().filter(|g| *g != key).cloned());
        Ok(Self { frame, geometry })
    }

    fn retained_geometry<'a>(&self, names: impl IntoIterator<Item = &'a str>) -> BTreeSet<String> {
        names
            .into_iter()
            .filter(|name| self.geometry.contains(*name))
            .map(str::to_string)
            .collect()
    }
}

fn epoch_date() -> NaiveDate {
    DateTime::<Utc>::UNIX_EPOCH.date_naive()
}

fn build_series(name: &str, dtype: ColumnType, values: &[Value]) -> Result<Series> {
    let name = PlSmallStr::from(name);
    let series = match dtype {
        ColumnType::Null => Series::new_null(name, values.len()),
        ColumnType::Integer => {
            let ints: Vec<Option<i64>> = values
                .iter()
                .map(|v| match v {
                    Value::Int(i) => Some(*i),
                    _ => None,
                })
                .collect();
            Series::new(name, ints)
        }
        ColumnType::Float => {
            let floats: Vec<Option<f64>> = values.iter().map(Value::as_f64).collect();
            Series::new(name, floats)
        }
        ColumnType::Boolean => {
            let bools: Vec<Option<bool>> = values
                .iter()
                .map(|v| match v {
                    Value::Bool(b) => Some(*b),
                    _ => None,
                })
                .collect();
            Series::new(name, bools)
        }
        ColumnType::DateTime => {
            let millis: Vec<Option<i64>> = values
                .iter()
                .map(|v| v.as_timestamp().map(|ts| ts.and_utc().timestamp_millis()))
                .collect();
            Series::new(name, millis).cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?
        }
        ColumnType::Date => {
            let days: Vec<Option<i32>> = values
                .iter()
                .map(|v| {
                    v.as_date()
                        .and_then(|d| i32::try_from((d - epoch_date()).num_days()).ok())
                })
                .collect();
            Series::new(name, days).cast(&DataType::Date)?
        }
        ColumnType::String | ColumnType::Geometry => {
            let text: Vec<Option<String>> = values
                .iter()
                .map(|v| (!v.is_null()).then(|| v.to_string()))
                .collect();
            Series::new(name, text)
        }
    };
    Ok(series)
}

fn cell(series: &Series, row: usize, geometry: bool) -> Value {
    match series.get(row) {
        Ok(value) => from_any_value(value, geometry),
        Err(_) => Value::Null,
    }
}

fn from_any_value(value: AnyValue<'_>, geometry: bool) -> Value {
    match value {
        AnyValue::Null => Value::Null,
        AnyValue::Boolean(b) => Value::Bool(b),
        AnyValue::String(s) => text_cell(s, geometry),
        AnyValue::StringOwned(s) => text_cell(s.as_str(), geometry),
        AnyValue::Int32(i) => Value::Int(i64::from(i)),
        AnyValue::Int64(i) => Value::Int(i),
        AnyValue::UInt32(i) => Value::Int(i64::from(i)),
        AnyValue::UInt64(i) => i64::try_from(i).map_or(Value::Float(i as f64), Value::Int),
        AnyValue::Float32(f) => Value::Float(f64::from(f)),
        AnyValue::Float64(f) => Value::Float(f),
        AnyValue::Date(days) => epoch_date()
            .checked_add_signed(chrono::Duration::days(i64::from(days)))
            .map_or(Value::Null, Value::Date),
        AnyValue::Datetime(v, unit, _) => datetime_from(v, unit).map_or(Value::Null, Value::Timestamp),
        other => Value::Str(other.to_string()),
    }
}

fn text_cell(text: &str, geometry: bool) -> Value {
    if geometry {
        if let Ok(g) = Geometry::parse(text) {
            return Value::Geometry(g);
        }
    }
    Value::Str(text.to_string())
}

fn datetime_from(value: i64, unit: TimeUnit) -> Option<NaiveDateTime> {
    let dt = match unit {
        TimeUnit::Nanoseconds => Some(DateTime::from_timestamp_nanos(value)),
        TimeUnit::Microseconds => DateTime::from_timestamp_micros(value),
        TimeUnit::Milliseconds => DateTime::from_timestamp_millis(value),
    };
    dt.map(|d| d.naive_utc())
}
