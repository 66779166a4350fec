//! Datastore configuration.
//!
//! Uses `figment` for layered configuration: defaults -> TOML file ->
//! environment (`CIDER_` prefix, `__` as the nesting separator).
//!
//! ```toml
//! [paths]
//! data_dir = "data"
//!
//! [paths.files]
//! cdr = "cdr.csv"
//! antennas = "antennas.csv"
//!
//! [paths.shapefiles]
//! regions = "regions.geojson"
//!
//! [col_names.cdr]
//! msisdn = "caller_id"
//!
//! [survey]
//! binary = ["bin0"]
//! continuous = ["con0"]
//!
//! [params]
//! seed = 42
//! ```

use crate::error::{ConfigError, Result};
use crate::schema::DatasetKind;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Top-level datastore configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatastoreConfig {
    #[serde(default)]
    pub paths: PathsConfig,
    /// Per-dataset column synonyms: `alias = "canonical"`.
    #[serde(default)]
    pub col_names: BTreeMap<String, BTreeMap<String, String>>,
    #[serde(default)]
    pub survey: SurveyColumns,
    #[serde(default)]
    pub params: ParamsConfig,
}

/// Where dataset files live.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Base directory for relative file paths.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
    /// One file per dataset kind, keyed by the kind's name.
    #[serde(default)]
    pub files: BTreeMap<String, PathBuf>,
    /// One geometry file per geographic level.
    #[serde(default)]
    pub shapefiles: BTreeMap<String, PathBuf>,
}

/// Question columns of the survey dataset, by type.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SurveyColumns {
    #[serde(default)]
    pub binary: Vec<String>,
    #[serde(default)]
    pub continuous: Vec<String>,
    #[serde(default)]
    pub categorical: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamsConfig {
    /// Seed for the reproducible `random` column.
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Minimum number of feature columns besides the identifier.
    #[serde(default = "default_min_feature_columns")]
    pub min_feature_columns: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_max: Option<f64>,
}

fn default_seed() -> u64 {
    42
}

fn default_min_feature_columns() -> usize {
    1
}

impl Default for ParamsConfig {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            min_feature_columns: default_min_feature_columns(),
            label_min: None,
            label_max: None,
        }
    }
}

impl DatastoreConfig {
    /// Load from a TOML file layered over defaults and `CIDER_*` variables.
    pub fn load(path: &Path) -> Result<Self> {
        if path.as_os_str().is_empty() || !path.is_file() {
            return Err(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            }
            .into());
        }

        let config: DatastoreConfig = Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("CIDER_").split("__"))
            .extract()
            .map_err(|e| ConfigError::Parse {
                message: e.to_string(),
            })?;

        let config = config.resolve_relative_to(path.parent());
        config.validate()?;
        tracing::debug!(path = %path.display(), "loaded datastore config");
        Ok(config)
    }

    /// Parse a TOML document without touching the filesystem or environment.
    pub fn from_toml(input: &str) -> Result<Self> {
        let config: DatastoreConfig = toml::from_str(input).map_err(|e| ConfigError::Parse {
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Relative `data_dir` values resolve against the config file's directory.
    fn resolve_relative_to(mut self, base: Option<&Path>) -> Self {
        if let (Some(base), Some(dir)) = (base, self.paths.data_dir.as_ref()) {
            if dir.is_relative() {
                self.paths.data_dir = Some(base.join(dir));
            }
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        for key in self.paths.files.keys().chain(self.col_names.keys()) {
            let kind: DatasetKind = key.parse().map_err(|message| ConfigError::Invalid { message })?;
            if kind == DatasetKind::Shapefiles && self.paths.files.contains_key(key) {
                return Err(ConfigError::Invalid {
                    message: "shapefiles are configured under [paths.shapefiles]".into(),
                }
                .into());
            }
        }

        if let Some(dir) = &self.paths.data_dir {
            if !dir.is_dir() {
                return Err(ConfigError::FileNotFound { path: dir.clone() }.into());
            }
        }

        if let (Some(min), Some(max)) = (self.params.label_min, self.params.label_max) {
            if min > max {
                return Err(ConfigError::Invalid {
                    message: format!("label_min ({min}) exceeds label_max ({max})"),
                }
                .into());
            }
        }

        Ok(())
    }

    fn resolve(&self, file: &Path) -> PathBuf {
        match &self.paths.data_dir {
            Some(dir) if file.is_relative() => dir.join(file),
            _ => file.to_path_buf(),
        }
    }

    /// Resolved file path for a dataset kind.
    pub fn path_for(&self, kind: DatasetKind) -> Result<PathBuf> {
        self.paths
            .files
            .iter()
            .find(|(key, _)| key.parse::<DatasetKind>().ok() == Some(kind))
            .map(|(_, file)| self.resolve(file))
            .ok_or_else(|| ConfigError::MissingPath { dataset: kind }.into())
    }

    /// Resolved geometry file per shapefile level.
    pub fn shapefile_paths(&self) -> BTreeMap<String, PathBuf> {
        self.paths
            .shapefiles
            .iter()
            .map(|(level, file)| (level.clone(), self.resolve(file)))
            .collect()
    }

    /// Configured column synonyms for a dataset kind.
    pub fn synonyms(&self, kind: DatasetKind) -> Option<&BTreeMap<String, String>> {
        self.col_names
            .iter()
            .find(|(key, _)| key.parse::<DatasetKind>().ok() == Some(kind))
            .map(|(_, map)| map)
    }

    /// Builder-style helper for in-code configuration.
    pub fn with_file(mut self, kind: DatasetKind, path: impl Into<PathBuf>) -> Self {
        self.paths.files.insert(kind.as_str().to_string(), path.into());
        self
    }

    pub fn with_shapefile(mut self, level: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.paths.shapefiles.insert(level.into(), path.into());
        self
    }
}
