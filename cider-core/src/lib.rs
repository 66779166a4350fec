//! # cider-core: dataset admission for Cider
//!
//! Loads telecom and survey datasets (call records, antennas, recharges,
//! mobile data, mobile money, shapefiles, labels, features, survey
//! responses) from files or in-memory tables, validates them against a
//! per-kind schema and normalizes them into uniform [`Table`]s.
//!
//! ```no_run
//! use cider_core::{DataStore, DatasetKind, Session};
//!
//! let session = Session::default();
//! let mut ds = DataStore::new("config.toml", &session)?;
//! ds.load_data([(DatasetKind::Features, None), (DatasetKind::Labels, None)])?;
//! ds.merge()?;
//! # Ok::<(), cider_core::DatastoreError>(())
//! ```

// Foundation
pub mod config;
pub mod error;

// Tabular model
pub mod geometry;
pub mod reader;
pub mod table;

// Validation
pub mod coerce;
pub mod schema;

// Loading
pub mod datastore;

// Re-exports
pub use config::DatastoreConfig;
pub use datastore::{DataStore, MergedTable, ShapefileCollection, WeightedTable};
pub use error::{DatastoreError, ErrorKind, Result};
pub use reader::{CsvReader, GeoJsonReader, GeometryReader, Session, TableReader};
pub use schema::{DatasetKind, SchemaEntry, schema_for};
pub use table::{ColumnType, Table, Value};
