//! The datastore: one optional slot per dataset kind, filled by loaders.
//!
//! A [`DataStore`] borrows a [`Session`] for its whole lifetime and owns its
//! [`DatastoreConfig`]. Each loader reads (or accepts) a raw table, coerces it
//! against the kind's schema, applies kind-specific checks and derived
//! columns, and only then replaces the slot. A failed load leaves every slot
//! as it was.

mod filter;
mod loaders;
mod merge;
mod weights;

pub use merge::MergedTable;
pub use weights::WeightedTable;

use crate::coerce::{coerce, synonyms_for};
use crate::config::DatastoreConfig;
use crate::error::{Result, StructuralError};
use crate::reader::Session;
use crate::schema::{DatasetKind, schema_for};
use crate::table::Table;
use std::collections::BTreeMap;
use std::path::Path;

/// Geometry-bearing tables keyed by geographic level (e.g. `regions`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShapefileCollection {
    levels: BTreeMap<String, Table>,
}

impl ShapefileCollection {
    pub fn get(&self, level: &str) -> Option<&Table> {
        self.levels.get(level)
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn levels(&self) -> impl Iterator<Item = &str> {
        self.levels.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Table)> {
        self.levels.iter().map(|(k, v)| (k.as_str(), v))
    }
}

type Loader<'s> = fn(&mut DataStore<'s>, Option<Table>) -> Result<()>;

/// Validated datasets for one session.
#[derive(Debug)]
pub struct DataStore<'s> {
    config: DatastoreConfig,
    session: &'s Session,
    pub cdr: Option<Table>,
    pub antennas: Option<Table>,
    pub recharges: Option<Table>,
    pub mobiledata: Option<Table>,
    pub mobilemoney: Option<Table>,
    pub shapefiles: Option<ShapefileCollection>,
    pub home_ground_truth: Option<Table>,
    pub poverty_scores: Option<Table>,
    pub features: Option<Table>,
    pub labels: Option<Table>,
    pub targeting: Option<WeightedTable>,
    pub fairness: Option<WeightedTable>,
    pub survey_data: Option<Table>,
    pub merged: Option<MergedTable>,
}

impl<'s> DataStore<'s> {
    /// Load configuration from `config_path` and create an empty datastore.
    pub fn new(config_path: impl AsRef<Path>, session: &'s Session) -> Result<Self> {
        let config = DatastoreConfig::load(config_path.as_ref())?;
        Ok(Self::with_config(config, session))
    }

    pub fn with_config(config: DatastoreConfig, session: &'s Session) -> Self {
        Self {
            config,
            session,
            cdr: None,
            antennas: None,
            recharges: None,
            mobiledata: None,
            mobilemoney: None,
            shapefiles: None,
            home_ground_truth: None,
            poverty_scores: None,
            features: None,
            labels: None,
            targeting: None,
            fairness: None,
            survey_data: None,
            merged: None,
        }
    }

    pub fn config(&self) -> &DatastoreConfig {
        &self.config
    }

    /// Load each requested kind, with an optional in-memory override.
    /// Kinds not named are left untouched. Stops at the first failure.
    pub fn load_data<I>(&mut self, requested: I) -> Result<()>
    where
        I: IntoIterator<Item = (DatasetKind, Option<Table>)>,
    {
        for (kind, table) in requested {
            let loader = Self::loader_for(kind);
            loader(self, table)?;
        }
        Ok(())
    }

    fn loader_for(kind: DatasetKind) -> Loader<'s> {
        match kind {
            DatasetKind::Cdr => Self::load_cdr,
            DatasetKind::Antennas => Self::load_antennas,
            DatasetKind::Recharges => Self::load_recharges,
            DatasetKind::MobileData => Self::load_mobiledata,
            DatasetKind::MobileMoney => Self::load_mobilemoney,
            DatasetKind::Shapefiles => Self::load_shapefiles_from_table,
            DatasetKind::HomeGroundTruth => Self::load_home_ground_truth,
            DatasetKind::PovertyScores => Self::load_poverty_scores,
            DatasetKind::Features => Self::load_features,
            DatasetKind::Labels => Self::load_labels,
            DatasetKind::Targeting => Self::load_targeting,
            DatasetKind::Fairness => Self::load_fairness,
            DatasetKind::SurveyData => Self::load_survey,
        }
    }

    fn load_shapefiles_from_table(&mut self, table: Option<Table>) -> Result<()> {
        match table {
            None => self.load_shapefiles(None),
            Some(_) => Err(StructuralError::UnsupportedInput {
                dataset: DatasetKind::Shapefiles,
            }
            .into()),
        }
    }

    pub fn is_loaded(&self, kind: DatasetKind) -> bool {
        match kind {
            DatasetKind::Shapefiles => self.shapefiles.is_some(),
            _ => self.table(kind).is_some(),
        }
    }

    /// Every kind whose slot is currently filled.
    pub fn loaded_kinds(&self) -> Vec<DatasetKind> {
        DatasetKind::ALL
            .into_iter()
            .filter(|kind| self.is_loaded(*kind))
            .collect()
    }

    /// The validated table for `kind`. Shapefiles hold several tables and
    /// are reached through [`DataStore::shapefiles`] instead.
    pub fn table(&self, kind: DatasetKind) -> Option<&Table> {
        match kind {
            DatasetKind::Cdr => self.cdr.as_ref(),
            DatasetKind::Antennas => self.antennas.as_ref(),
            DatasetKind::Recharges => self.recharges.as_ref(),
            DatasetKind::MobileData => self.mobiledata.as_ref(),
            DatasetKind::MobileMoney => self.mobilemoney.as_ref(),
            DatasetKind::Shapefiles => None,
            DatasetKind::HomeGroundTruth => self.home_ground_truth.as_ref(),
            DatasetKind::PovertyScores => self.poverty_scores.as_ref(),
            DatasetKind::Features => self.features.as_ref(),
            DatasetKind::Labels => self.labels.as_ref(),
            DatasetKind::Targeting => self.targeting.as_ref().map(|w| &w.table),
            DatasetKind::Fairness => self.fairness.as_ref().map(|w| &w.table),
            DatasetKind::SurveyData => self.survey_data.as_ref(),
        }
    }

    /// Mutable slot of a time-indexed kind.
    fn time_indexed_slot(&mut self, kind: DatasetKind) -> Option<&mut Option<Table>> {
        match kind {
            DatasetKind::Cdr => Some(&mut self.cdr),
            DatasetKind::Recharges => Some(&mut self.recharges),
            DatasetKind::MobileData => Some(&mut self.mobiledata),
            DatasetKind::MobileMoney => Some(&mut self.mobilemoney),
            _ => None,
        }
    }

    /// The caller's table if given, otherwise the configured file.
    fn raw_table(&self, kind: DatasetKind, table: Option<Table>) -> Result<Table> {
        match table {
            Some(table) => Ok(table),
            None => {
                let path = self.config.path_for(kind)?;
                tracing::debug!(dataset = %kind, path = %path.display(), "reading dataset");
                self.session.read_csv(&path)
            }
        }
    }

    /// Run `raw` through the schema coercer for `kind`, honouring configured
    /// column synonyms.
    fn coerce_raw(&self, kind: DatasetKind, raw: &Table) -> Result<Table> {
        let entry = schema_for(kind);
        let synonyms = synonyms_for(entry, self.config.synonyms(kind));
        coerce(raw, entry, &synonyms)
    }
}

fn log_loaded(kind: DatasetKind, table: &Table) {
    tracing::info!(
        dataset = %kind,
        rows = table.row_count(),
        columns = table.column_count(),
        "loaded dataset"
    );
}
