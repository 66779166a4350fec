//! Error types for the Cider datastore.
//!
//! Uses `thiserror` for structured error variants grouped by the kind of
//! contract that was violated: configuration, table structure, type
//! coercion, value domain, geometry validity, and load ordering. Failures
//! raised by the polars frame engine are carried as structural errors.

use crate::schema::DatasetKind;
use polars::prelude::PolarsError;
use std::path::PathBuf;

/// Top-level error type for the datastore.
#[derive(Debug, thiserror::Error)]
pub enum DatastoreError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Structural error: {0}")]
    Structural(#[from] StructuralError),

    #[error("Type coercion error: {0}")]
    Coercion(#[from] CoercionError),

    #[error("Domain violation: {0}")]
    Domain(#[from] DomainError),

    #[error("Geometry error: {0}")]
    Geometry(#[from] GeometryError),

    #[error("{dataset} has not been loaded")]
    NotLoaded { dataset: DatasetKind },

    #[error("Frame error: {0}")]
    Frame(#[from] PolarsError),
}

/// Coarse classification callers can branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Config,
    Structural,
    TypeCoercion,
    DomainViolation,
    Geometry,
    NotLoaded,
}

impl DatastoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) => ErrorKind::Config,
            Self::Structural(_) | Self::Frame(_) => ErrorKind::Structural,
            Self::Coercion(_) => ErrorKind::TypeCoercion,
            Self::Domain(_) => ErrorKind::DomainViolation,
            Self::Geometry(_) => ErrorKind::Geometry,
            Self::NotLoaded { .. } => ErrorKind::NotLoaded,
        }
    }

    pub fn not_loaded(dataset: DatasetKind) -> Self {
        Self::NotLoaded { dataset }
    }
}

/// Errors from configuration loading and path resolution.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Configuration parse error: {message}")]
    Parse { message: String },

    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("No file path configured for {dataset}")]
    MissingPath { dataset: DatasetKind },
}

/// Errors about the shape of a table rather than its values.
#[derive(Debug, thiserror::Error)]
pub enum StructuralError {
    #[error("{dataset}: missing column '{column}'")]
    MissingColumn { dataset: DatasetKind, column: String },

    #[error("Cannot read {path}: {message}")]
    Unreadable { path: PathBuf, message: String },

    #[error("Unknown column '{column}'")]
    UnknownColumn { column: String },

    #[error("Duplicate column '{column}'")]
    DuplicateColumn { column: String },

    #[error("Row {row} has {found} values, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("Column '{column}' has {found} values, expected {expected}")]
    ColumnLength {
        column: String,
        expected: usize,
        found: usize,
    },

    #[error("{dataset}: requires at least {required} feature column(s), found {found}")]
    TooFewColumns {
        dataset: DatasetKind,
        required: usize,
        found: usize,
    },

    #[error("{dataset}: column '{column}' is reserved")]
    ReservedColumn { dataset: DatasetKind, column: String },

    #[error("Join matched {matched} of {expected} labelled rows")]
    UnmatchedRows { expected: usize, matched: usize },

    #[error("Shapefile levels mismatch: expected [{}], found [{}]", .expected.join(", "), .found.join(", "))]
    LevelMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("{dataset}: in-memory input is not supported by this loader")]
    UnsupportedInput { dataset: DatasetKind },
}

/// A value could not be cast to the type its column requires.
#[derive(Debug, thiserror::Error)]
pub enum CoercionError {
    #[error("{dataset}: column '{column}' expected {expected}, got '{value}'")]
    WrongType {
        dataset: DatasetKind,
        column: String,
        expected: String,
        value: String,
    },
}

/// A well-typed value outside the permitted domain.
#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    #[error("{dataset}: column '{column}' has '{value}', allowed: {allowed}")]
    OutOfVocabulary {
        dataset: DatasetKind,
        column: String,
        value: String,
        allowed: String,
    },

    #[error("{dataset}: column '{column}' value {value} {reason}")]
    OutOfRange {
        dataset: DatasetKind,
        column: String,
        value: f64,
        reason: String,
    },
}

/// Errors from geometry parsing and validation.
#[derive(Debug, thiserror::Error)]
pub enum GeometryError {
    #[error("Malformed geometry: {message}")]
    Malformed { message: String },

    #[error("Invalid {geometry_type}: {reason}")]
    Invalid {
        geometry_type: String,
        reason: String,
    },

    #[error("Shapefile level '{level}' has no geometry")]
    Empty { level: String },
}

/// A type alias for results using the top-level `DatastoreError`.
pub type Result<T> = std::result::Result<T, DatastoreError>;
