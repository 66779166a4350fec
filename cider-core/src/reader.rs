//! File-reading collaborators injected into the datastore.
//!
//! The datastore never touches the filesystem directly: it asks a
//! [`TableReader`] for delimited files and a [`GeometryReader`] for boundary
//! files. Both live on a [`Session`] that the caller owns and the datastore
//! borrows.

use crate::error::{Result, StructuralError};
use crate::table::{ColumnType, Field, Table, Value, infer_column_type};
use polars::prelude::{LazyCsvReader, LazyFileListReader, LazyFrame};
use std::collections::HashSet;
use std::path::Path;

/// Reads delimited text into a [`Table`].
pub trait TableReader {
    fn read_csv(&self, path: &Path) -> Result<Table>;
}

/// Reads a geometry-bearing file into a [`Table`] with a `geometry` column.
pub trait GeometryReader {
    fn read_geometry(&self, path: &Path) -> Result<Table>;
}

fn unreadable(path: &Path, message: impl ToString) -> crate::error::DatastoreError {
    StructuralError::Unreadable {
        path: path.to_path_buf(),
        message: message.to_string(),
    }
    .into()
}

// ---------------------------------------------------------------------------
// CsvReader
// ---------------------------------------------------------------------------

/// Delimited-text reader backed by the polars lazy CSV scanner.
///
/// By default every column is read as text and left for the schema coercer
/// to cast. With type inference enabled, the scanner samples the leading
/// rows and reads numeric columns as numbers. Empty fields are null.
#[derive(Debug, Clone)]
pub struct CsvReader {
    delimiter: u8,
    infer_types: bool,
}

impl Default for CsvReader {
    fn default() -> Self {
        Self {
            delimiter: b',',
            infer_types: false,
        }
    }
}

impl CsvReader {
    /// Rows sampled for type inference.
    const INFER_SCHEMA_ROWS: usize = 100;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_type_inference(mut self, infer: bool) -> Self {
        self.infer_types = infer;
        self
    }
}

impl TableReader for CsvReader {
    fn read_csv(&self, path: &Path) -> Result<Table> {
        if !path.is_file() {
            return Err(unreadable(path, "no such file"));
        }
        // A schema length of zero reads every column as text.
        let sample = if self.infer_types {
            Self::INFER_SCHEMA_ROWS
        } else {
            0
        };
        let frame = LazyCsvReader::new(path)
            .with_has_header(true)
            .with_separator(self.delimiter)
            .with_infer_schema_length(Some(sample))
            .finish()
            .and_then(LazyFrame::collect)
            .map_err(|e| unreadable(path, e))?;

        let table = Table::from_frame(frame);
        tracing::debug!(
            path = %path.display(),
            rows = table.row_count(),
            columns = table.column_count(),
            "read csv"
        );
        Ok(table)
    }
}

// ---------------------------------------------------------------------------
// GeoJsonReader
// ---------------------------------------------------------------------------

/// Reads a GeoJSON `FeatureCollection`: one row per feature, one column per
/// property key in first-seen order, plus a trailing `geometry` column.
///
/// Geometries are kept as raw GeoJSON text so the coercer reports invalid
/// shapes with dataset context.
#[derive(Debug, Clone, Default)]
pub struct GeoJsonReader;

impl GeometryReader for GeoJsonReader {
    fn read_geometry(&self, path: &Path) -> Result<Table> {
        let content = std::fs::read_to_string(path).map_err(|e| unreadable(path, e))?;
        let doc: serde_json::Value =
            serde_json::from_str(&content).map_err(|e| unreadable(path, e))?;

        let features = match doc.get("features").and_then(|f| f.as_array()) {
            Some(features) => features.clone(),
            None if doc.get("type").and_then(|t| t.as_str()) == Some("Feature") => vec![doc],
            None => return Err(unreadable(path, "expected a GeoJSON FeatureCollection")),
        };

        let mut columns: Vec<String> = Vec::new();
        let mut seen: HashSet<&str> = HashSet::new();
        for feature in &features {
            if let Some(props) = feature.get("properties").and_then(|p| p.as_object()) {
                for key in props.keys() {
                    if key != crate::schema::GEOMETRY_COLUMN && seen.insert(key.as_str()) {
                        columns.push(key.clone());
                    }
                }
            }
        }

        let rows: Vec<Vec<Value>> = features
            .iter()
            .map(|feature| {
                let props = feature.get("properties").and_then(|p| p.as_object());
                let mut row: Vec<Value> = columns
                    .iter()
                    .map(|key| {
                        props
                            .and_then(|p| p.get(key))
                            .map(json_to_value)
                            .unwrap_or(Value::Null)
                    })
                    .collect();
                let geometry = match feature.get("geometry") {
                    None | Some(serde_json::Value::Null) => Value::Null,
                    Some(g) => Value::Str(g.to_string()),
                };
                row.push(geometry);
                row
            })
            .collect();

        let mut fields: Vec<Field> = columns
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let column: Vec<Value> = rows.iter().map(|r| r[i].clone()).collect();
                Field::new(name.clone(), infer_column_type(&column))
            })
            .collect();
        fields.push(Field::new(crate::schema::GEOMETRY_COLUMN, ColumnType::String));

        Table::new(fields, rows)
    }
}

fn json_to_value(value: &serde_json::Value) -> Value {
    match value {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => n
            .as_i64()
            .map(Value::Int)
            .or_else(|| n.as_f64().map(Value::Float))
            .unwrap_or(Value::Null),
        serde_json::Value::String(s) => Value::Str(s.clone()),
        other => Value::Str(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// Handle to the reading collaborators. Owned by the caller; datastores
/// borrow it for their whole lifetime.
pub struct Session {
    tables: Box<dyn TableReader>,
    geometries: Box<dyn GeometryReader>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(CsvReader::default(), GeoJsonReader)
    }
}

impl Session {
    pub fn new(
        tables: impl TableReader + 'static,
        geometries: impl GeometryReader + 'static,
    ) -> Self {
        Self {
            tables: Box::new(tables),
            geometries: Box::new(geometries),
        }
    }

    pub fn read_csv(&self, path: &Path) -> Result<Table> {
        self.tables.read_csv(path)
    }

    pub fn read_geometry(&self, path: &Path) -> Result<Table> {
        self.geometries.read_geometry(path)
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session").finish_non_exhaustive()
    }
}
