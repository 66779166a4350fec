//! Per-kind loaders.
//!
//! Every loader follows the same shape: raw table (override or configured
//! file) -> schema coercion -> kind-specific checks and derived columns ->
//! replace the slot. Nothing is stored until every check has passed.

use super::weights::{self, WeightedTable};
use super::{DataStore, ShapefileCollection, log_loaded};
use crate::coerce::cast_column;
use crate::error::{
    CoercionError, ConfigError, DomainError, GeometryError, Result, StructuralError,
};
use crate::schema::{
    DAY_COLUMN, DatasetKind, GEOMETRY_COLUMN, ID_COLUMN, LABEL_COLUMN, SemanticType,
    TIMESTAMP_COLUMN, WEIGHT_COLUMN,
};
use crate::table::{ColumnType, Table, Value};
use std::collections::BTreeMap;

impl<'s> DataStore<'s> {
    // -----------------------------------------------------------------------
    // Transactional datasets
    // -----------------------------------------------------------------------

    /// Call detail records. Durations must be non-negative.
    pub fn load_cdr(&mut self, table: Option<Table>) -> Result<()> {
        let cdr = self.load_time_indexed(DatasetKind::Cdr, table)?;
        check_non_negative(&cdr, DatasetKind::Cdr, "duration")?;
        log_loaded(DatasetKind::Cdr, &cdr);
        self.cdr = Some(cdr);
        Ok(())
    }

    pub fn load_recharges(&mut self, table: Option<Table>) -> Result<()> {
        let recharges = self.load_time_indexed(DatasetKind::Recharges, table)?;
        log_loaded(DatasetKind::Recharges, &recharges);
        self.recharges = Some(recharges);
        Ok(())
    }

    pub fn load_mobiledata(&mut self, table: Option<Table>) -> Result<()> {
        let mobiledata = self.load_time_indexed(DatasetKind::MobileData, table)?;
        log_loaded(DatasetKind::MobileData, &mobiledata);
        self.mobiledata = Some(mobiledata);
        Ok(())
    }

    pub fn load_mobilemoney(&mut self, table: Option<Table>) -> Result<()> {
        let mobilemoney = self.load_time_indexed(DatasetKind::MobileMoney, table)?;
        log_loaded(DatasetKind::MobileMoney, &mobilemoney);
        self.mobilemoney = Some(mobilemoney);
        Ok(())
    }

    fn load_time_indexed(&self, kind: DatasetKind, table: Option<Table>) -> Result<Table> {
        let raw = self.raw_table(kind, table)?;
        let mut out = self.coerce_raw(kind, &raw)?;
        add_day_column(&mut out)?;
        Ok(out)
    }

    // -----------------------------------------------------------------------
    // Reference datasets
    // -----------------------------------------------------------------------

    /// Antenna locations. Rows without a location are kept but reported.
    pub fn load_antennas(&mut self, table: Option<Table>) -> Result<()> {
        let raw = self.raw_table(DatasetKind::Antennas, table)?;
        let antennas = self.coerce_raw(DatasetKind::Antennas, &raw)?;

        let missing = count_nulls(&antennas, "latitude") + count_nulls(&antennas, "longitude");
        if missing > 0 {
            tracing::warn!(
                dataset = %DatasetKind::Antennas,
                missing,
                "antennas without a location"
            );
        }

        log_loaded(DatasetKind::Antennas, &antennas);
        self.antennas = Some(antennas);
        Ok(())
    }

    pub fn load_home_ground_truth(&mut self, table: Option<Table>) -> Result<()> {
        let raw = self.raw_table(DatasetKind::HomeGroundTruth, table)?;
        let truth = self.coerce_raw(DatasetKind::HomeGroundTruth, &raw)?;
        log_loaded(DatasetKind::HomeGroundTruth, &truth);
        self.home_ground_truth = Some(truth);
        Ok(())
    }

    pub fn load_poverty_scores(&mut self, table: Option<Table>) -> Result<()> {
        let raw = self.raw_table(DatasetKind::PovertyScores, table)?;
        let scores = self.coerce_raw(DatasetKind::PovertyScores, &raw)?;
        log_loaded(DatasetKind::PovertyScores, &scores);
        self.poverty_scores = Some(scores);
        Ok(())
    }

    /// Load every shapefile level, either from the given tables or from the
    /// configured geometry files.
    ///
    /// When levels are configured, overrides must supply exactly those
    /// levels. Each level needs a `region` and a `geometry` column, at least
    /// one row, and a valid geometry on every row.
    pub fn load_shapefiles(&mut self, tables: Option<BTreeMap<String, Table>>) -> Result<()> {
        let configured = self.config.shapefile_paths();
        let raw = match tables {
            Some(tables) => {
                if !configured.is_empty() && !configured.keys().eq(tables.keys()) {
                    return Err(StructuralError::LevelMismatch {
                        expected: configured.keys().cloned().collect(),
                        found: tables.keys().cloned().collect(),
                    }
                    .into());
                }
                tables
            }
            None if configured.is_empty() => {
                return Err(ConfigError::MissingPath {
                    dataset: DatasetKind::Shapefiles,
                }
                .into());
            }
            None => configured
                .iter()
                .map(|(level, path)| -> Result<(String, Table)> {
                    Ok((level.clone(), self.session.read_geometry(path)?))
                })
                .collect::<Result<BTreeMap<_, _>>>()?,
        };

        let mut levels = BTreeMap::new();
        for (level, table) in raw {
            let shapes = self.coerce_raw(DatasetKind::Shapefiles, &table)?;
            if shapes.row_count() == 0 {
                return Err(GeometryError::Empty { level }.into());
            }
            if count_nulls(&shapes, GEOMETRY_COLUMN) > 0 {
                return Err(GeometryError::Invalid {
                    geometry_type: "feature".into(),
                    reason: format!("level '{level}' has a row without geometry"),
                }
                .into());
            }
            tracing::debug!(%level, rows = shapes.row_count(), "loaded shapefile level");
            levels.insert(level, shapes);
        }

        let collection = ShapefileCollection { levels };
        tracing::info!(
            dataset = %DatasetKind::Shapefiles,
            levels = collection.len(),
            "loaded dataset"
        );
        self.shapefiles = Some(collection);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Modelling datasets
    // -----------------------------------------------------------------------

    /// Feature matrix keyed by `name`. Every other column is cast to numeric.
    pub fn load_features(&mut self, table: Option<Table>) -> Result<()> {
        let raw = self.raw_table(DatasetKind::Features, table)?;
        let mut features = self.coerce_raw(DatasetKind::Features, &raw)?;

        let feature_columns: Vec<String> = features
            .column_names()
            .into_iter()
            .filter(|name| *name != ID_COLUMN)
            .map(str::to_string)
            .collect();
        let required = self.config.params.min_feature_columns;
        if feature_columns.len() < required {
            return Err(StructuralError::TooFewColumns {
                dataset: DatasetKind::Features,
                required,
                found: feature_columns.len(),
            }
            .into());
        }
        for column in &feature_columns {
            cast_column(
                &mut features,
                DatasetKind::Features,
                column,
                SemanticType::Numeric,
            )?;
        }

        log_loaded(DatasetKind::Features, &features);
        self.features = Some(features);
        self.clear_merged(DatasetKind::Features);
        Ok(())
    }

    /// Ground-truth labels. Output columns are exactly `name, label, weight`.
    pub fn load_labels(&mut self, table: Option<Table>) -> Result<()> {
        let raw = self.raw_table(DatasetKind::Labels, table)?;
        let mut labels = self.coerce_raw(DatasetKind::Labels, &raw)?;

        let (min, max) = (self.config.params.label_min, self.config.params.label_max);
        for value in labels.column(LABEL_COLUMN).into_iter().flatten() {
            let Some(label) = value.as_f64() else {
                return Err(CoercionError::WrongType {
                    dataset: DatasetKind::Labels,
                    column: LABEL_COLUMN.into(),
                    expected: SemanticType::Numeric.to_string(),
                    value: value.to_string(),
                }
                .into());
            };
            let reason = if !label.is_finite() {
                Some("is not finite".to_string())
            } else if min.is_some_and(|m| label < m) {
                min.map(|m| format!("is below the minimum {m}"))
            } else if max.is_some_and(|m| label > m) {
                max.map(|m| format!("is above the maximum {m}"))
            } else {
                None
            };
            if let Some(reason) = reason {
                return Err(out_of_range(DatasetKind::Labels, LABEL_COLUMN, label, reason));
            }
        }

        fill_weights(&mut labels, DatasetKind::Labels)?;
        check_positive_weights(&labels, DatasetKind::Labels)?;
        let labels = labels.select(&[ID_COLUMN, LABEL_COLUMN, WEIGHT_COLUMN])?;

        log_loaded(DatasetKind::Labels, &labels);
        self.labels = Some(labels);
        self.clear_merged(DatasetKind::Labels);
        Ok(())
    }

    /// Survey responses. Configured binary questions must be 0 or 1,
    /// continuous ones numeric, categorical ones text. Listed questions the
    /// table does not carry are skipped.
    pub fn load_survey(&mut self, table: Option<Table>) -> Result<()> {
        let raw = self.raw_table(DatasetKind::SurveyData, table)?;
        let mut survey = self.coerce_raw(DatasetKind::SurveyData, &raw)?;

        let columns = &self.config.survey;
        let typed = columns
            .binary
            .iter()
            .map(|c| (c, SemanticType::Numeric))
            .chain(columns.continuous.iter().map(|c| (c, SemanticType::Numeric)))
            .chain(columns.categorical.iter().map(|c| (c, SemanticType::Text)));
        for (column, ty) in typed {
            if survey.has_column(column) {
                cast_column(&mut survey, DatasetKind::SurveyData, column, ty)?;
            }
        }
        for column in columns.binary.iter().filter(|c| survey.has_column(c)) {
            if let Some(bad) = survey
                .column(column)
                .into_iter()
                .flatten()
                .filter_map(|v| v.as_f64())
                .find(|v| *v != 0.0 && *v != 1.0)
            {
                return Err(out_of_range(
                    DatasetKind::SurveyData,
                    column,
                    bad,
                    "must be 0 or 1".into(),
                ));
            }
        }
        fill_weights(&mut survey, DatasetKind::SurveyData)?;
        check_positive_weights(&survey, DatasetKind::SurveyData)?;

        log_loaded(DatasetKind::SurveyData, &survey);
        self.survey_data = Some(survey);
        Ok(())
    }

    pub fn load_targeting(&mut self, table: Option<Table>) -> Result<()> {
        let targeting = self.load_weighted(DatasetKind::Targeting, table)?;
        self.targeting = Some(targeting);
        Ok(())
    }

    pub fn load_fairness(&mut self, table: Option<Table>) -> Result<()> {
        let fairness = self.load_weighted(DatasetKind::Fairness, table)?;
        self.fairness = Some(fairness);
        Ok(())
    }

    fn load_weighted(&self, kind: DatasetKind, table: Option<Table>) -> Result<WeightedTable> {
        let raw = self.raw_table(kind, table)?;
        let mut out = self.coerce_raw(kind, &raw)?;
        fill_weights(&mut out, kind)?;
        let weighted = weights::expand(kind, out, self.config.params.seed)?;
        tracing::info!(
            dataset = %kind,
            rows = weighted.table.row_count(),
            columns = weighted.table.column_count(),
            expanded_rows = weighted.weighted.row_count(),
            "loaded dataset"
        );
        Ok(weighted)
    }

    /// Drop a merge built from inputs that have just been replaced.
    fn clear_merged(&mut self, replaced: DatasetKind) {
        if self.merged.take().is_some() {
            tracing::debug!(dataset = %replaced, "input reloaded, merged table cleared");
        }
    }
}

/// Derive the calendar `day` from `timestamp`.
fn add_day_column(table: &mut Table) -> Result<()> {
    let days: Vec<Value> = table
        .column(TIMESTAMP_COLUMN)
        .into_iter()
        .flatten()
        .map(|v| {
            v.as_timestamp()
                .map_or(Value::Null, |ts| Value::Date(ts.date()))
        })
        .collect();
    tracing::debug!(rows = days.len(), "derived day column");
    table.set_column(DAY_COLUMN, ColumnType::Date, days)
}

/// Add a `weight` column of 1.0 when absent; null weights become 1.0.
fn fill_weights(table: &mut Table, kind: DatasetKind) -> Result<()> {
    let weights: Vec<Value> = match table.column(WEIGHT_COLUMN) {
        Some(values) => values
            .map(|v| if v.is_null() { Value::Float(1.0) } else { v })
            .collect(),
        None => {
            tracing::debug!(dataset = %kind, "defaulting weight to 1");
            vec![Value::Float(1.0); table.row_count()]
        }
    };
    table.set_column(WEIGHT_COLUMN, ColumnType::Float, weights)
}

fn check_non_negative(table: &Table, kind: DatasetKind, column: &str) -> Result<()> {
    match table
        .column(column)
        .into_iter()
        .flatten()
        .filter_map(|v| v.as_f64())
        .find(|v| *v < 0.0)
    {
        Some(bad) => Err(out_of_range(kind, column, bad, "must be non-negative".into())),
        None => Ok(()),
    }
}

/// Every filled weight must be a finite number above zero.
fn check_positive_weights(table: &Table, kind: DatasetKind) -> Result<()> {
    match table
        .column(WEIGHT_COLUMN)
        .into_iter()
        .flatten()
        .map(|v| v.as_f64().unwrap_or(f64::NAN))
        .find(|w| *w <= 0.0 || !w.is_finite())
    {
        Some(bad) => Err(out_of_range(kind, WEIGHT_COLUMN, bad, "must be positive".into())),
        None => Ok(()),
    }
}

fn count_nulls(table: &Table, column: &str) -> usize {
    table
        .column(column)
        .into_iter()
        .flatten()
        .filter(|v| v.is_null())
        .count()
}

pub(super) fn out_of_range(
    dataset: DatasetKind,
    column: &str,
    value: f64,
    reason: String,
) -> crate::error::DatastoreError {
    DomainError::OutOfRange {
        dataset,
        column: column.to_string(),
        value,
        reason,
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatastoreConfig;
    use crate::error::{DatastoreError, ErrorKind};
    use crate::reader::Session;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn store(session: &Session) -> DataStore<'_> {
        DataStore::with_config(DatastoreConfig::default(), session)
    }

    fn cdr(txn_type: &str, duration: i64) -> Table {
        Table::from_columns(vec![
            ("txn_type", vec![Value::from(txn_type)]),
            ("caller_id", vec![Value::from("A")]),
            ("recipient_id", vec![Value::from("B")]),
            ("timestamp", vec![Value::from("2021-09-29 10:15:00")]),
            ("duration", vec![Value::from(duration)]),
            ("international", vec![Value::from("domestic")]),
        ])
        .unwrap()
    }

    #[test]
    fn test_cdr_gets_day_column() {
        let session = Session::default();
        let mut ds = store(&session);
        ds.load_cdr(Some(cdr("text", 60))).unwrap();
        let cdr = ds.cdr.as_ref().unwrap();
        assert_eq!(cdr.row_count(), 1);
        assert_eq!(cdr.column_count(), 7);
        assert_eq!(
            cdr.value(0, DAY_COLUMN),
            Some(Value::Date(NaiveDate::from_ymd_opt(2021, 9, 29).unwrap()))
        );
    }

    #[test]
    fn test_cdr_rejects_unknown_txn_type() {
        let session = Session::default();
        let mut ds = store(&session);
        let err = ds.load_cdr(Some(cdr("text_message", 60))).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DomainViolation);
    }

    #[test]
    fn test_cdr_rejects_negative_duration() {
        let session = Session::default();
        let mut ds = store(&session);
        let err = ds.load_cdr(Some(cdr("call", -5))).unwrap_err();
        assert!(matches!(
            err,
            DatastoreError::Domain(DomainError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_antennas_with_string_coordinates_fail() {
        let session = Session::default();
        let mut ds = store(&session);
        let t = Table::from_columns(vec![
            ("antenna_id", vec![Value::from("1")]),
            ("latitude", vec![Value::from("north")]),
            ("longitude", vec![Value::from(2.5)]),
        ])
        .unwrap();
        let err = ds.load_antennas(Some(t)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TypeCoercion);
    }

    #[test]
    fn test_mobilemoney_rejects_hyphenated_type() {
        let session = Session::default();
        let mut ds = store(&session);
        let t = Table::from_columns(vec![
            ("txn_type", vec![Value::from("cash-in")]),
            ("caller_id", vec![Value::from("A")]),
            ("recipient_id", vec![Value::from("B")]),
            ("timestamp", vec![Value::from("2021-09-29")]),
            ("amount", vec![Value::from(10)]),
        ])
        .unwrap();
        let err = ds.load_mobilemoney(Some(t)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DomainViolation);
    }

    #[test]
    fn test_labels_default_weight_and_projection() {
        let session = Session::default();
        let mut ds = store(&session);
        let t = Table::from_columns(vec![
            ("name", vec![Value::from("A"), Value::from("B")]),
            ("label", vec![Value::from(1), Value::from(2.5)]),
            ("extra", vec![Value::from("x"), Value::from("y")]),
        ])
        .unwrap();
        ds.load_labels(Some(t)).unwrap();
        let labels = ds.labels.as_ref().unwrap();
        assert_eq!(labels.column_names(), vec!["name", "label", "weight"]);
        assert!(labels.column(WEIGHT_COLUMN).unwrap().all(|w| w == Value::Float(1.0)));
    }

    #[test]
    fn test_labels_outside_range_fail() {
        let session = Session::default();
        let mut config = DatastoreConfig::default();
        config.params.label_max = Some(10.0);
        let mut ds = DataStore::with_config(config, &session);
        let t = Table::from_columns(vec![
            ("name", vec![Value::from("A")]),
            ("label", vec![Value::from(11)]),
        ])
        .unwrap();
        let err = ds.load_labels(Some(t)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DomainViolation);
    }

    #[test]
    fn test_labels_null_label_fails() {
        let session = Session::default();
        let mut ds = store(&session);
        let t = Table::from_columns(vec![
            ("name", vec![Value::from("A")]),
            ("label", vec![Value::Null]),
        ])
        .unwrap();
        assert_eq!(
            ds.load_labels(Some(t)).unwrap_err().kind(),
            ErrorKind::TypeCoercion
        );
    }

    #[test]
    fn test_features_need_a_feature_column() {
        let session = Session::default();
        let mut ds = store(&session);
        let t = Table::from_columns(vec![("name", vec![Value::from("A")])]).unwrap();
        let err = ds.load_features(Some(t)).unwrap_err();
        assert!(matches!(
            err,
            DatastoreError::Structural(StructuralError::TooFewColumns { found: 0, .. })
        ));
    }

    #[test]
    fn test_features_cast_to_numeric() {
        let session = Session::default();
        let mut ds = store(&session);
        let t = Table::from_columns(vec![
            ("name", vec![Value::from("A")]),
            ("calls", vec![Value::from("12")]),
        ])
        .unwrap();
        ds.load_features(Some(t)).unwrap();
        assert_eq!(
            ds.features.as_ref().unwrap().dtype("calls"),
            Some(ColumnType::Float)
        );
    }

    #[test]
    fn test_survey_adds_weight() {
        let session = Session::default();
        let mut config = DatastoreConfig::default();
        config.survey.binary = vec!["bin0".into()];
        config.survey.continuous = vec!["con0".into(), "con9".into()];
        let mut ds = DataStore::with_config(config, &session);
        let t = Table::from_columns(vec![
            ("unique_id", vec![Value::from("XYZ")]),
            ("bin0", vec![Value::from(0)]),
            ("con0", vec![Value::from(25)]),
        ])
        .unwrap();
        ds.load_survey(Some(t)).unwrap();
        let survey = ds.survey_data.as_ref().unwrap();
        assert_eq!(survey.row_count(), 1);
        assert_eq!(survey.column_count(), 4);
        assert!(survey.has_column(WEIGHT_COLUMN));
    }

    #[test]
    fn test_survey_weight_must_be_positive() {
        let session = Session::default();
        let mut ds = store(&session);
        for weight in [Value::from(-2.0), Value::from(0), Value::from(f64::NAN)] {
            let t = Table::from_columns(vec![
                ("unique_id", vec![Value::from("XYZ")]),
                ("weight", vec![weight]),
            ])
            .unwrap();
            let err = ds.load_survey(Some(t)).unwrap_err();
            assert!(matches!(
                err,
                DatastoreError::Domain(DomainError::OutOfRange { ref column, .. }) if column == WEIGHT_COLUMN
            ));
        }
        assert!(ds.survey_data.is_none());
    }

    #[test]
    fn test_reloading_inputs_clears_merge() {
        let session = Session::default();
        let mut ds = store(&session);
        let features = Table::from_columns(vec![
            ("name", vec![Value::from("A")]),
            ("calls", vec![Value::from(3)]),
        ])
        .unwrap();
        let labels = Table::from_columns(vec![
            ("name", vec![Value::from("A")]),
            ("label", vec![Value::from(7)]),
        ])
        .unwrap();
        ds.load_features(Some(features.clone())).unwrap();
        ds.load_labels(Some(labels.clone())).unwrap();
        ds.merge().unwrap();
        assert!(ds.merged.is_some());

        ds.load_labels(Some(labels)).unwrap();
        assert!(ds.merged.is_none());

        ds.merge().unwrap();
        ds.load_features(Some(features)).unwrap();
        assert!(ds.merged.is_none());
    }

    #[test]
    fn test_failed_reload_keeps_merge() {
        let session = Session::default();
        let mut ds = store(&session);
        ds.load_features(Some(
            Table::from_columns(vec![
                ("name", vec![Value::from("A")]),
                ("calls", vec![Value::from(3)]),
            ])
            .unwrap(),
        ))
        .unwrap();
        ds.load_labels(Some(
            Table::from_columns(vec![
                ("name", vec![Value::from("A")]),
                ("label", vec![Value::from(7)]),
            ])
            .unwrap(),
        ))
        .unwrap();
        ds.merge().unwrap();

        let bad = Table::from_columns(vec![("name", vec![Value::from("A")])]).unwrap();
        assert!(ds.load_labels(Some(bad)).is_err());
        assert!(ds.merged.is_some());
    }

    #[test]
    fn test_survey_binary_must_be_zero_or_one() {
        let session = Session::default();
        let mut config = DatastoreConfig::default();
        config.survey.binary = vec!["bin0".into()];
        let mut ds = DataStore::with_config(config, &session);
        let t = Table::from_columns(vec![
            ("unique_id", vec![Value::from("XYZ")]),
            ("bin0", vec![Value::from(2)]),
        ])
        .unwrap();
        assert_eq!(
            ds.load_survey(Some(t)).unwrap_err().kind(),
            ErrorKind::DomainViolation
        );
    }

    fn region_table(geometry: &str) -> Table {
        Table::from_columns(vec![
            ("region", vec![Value::from("North")]),
            ("geometry", vec![Value::from(geometry)]),
        ])
        .unwrap()
    }

    #[test]
    fn test_shapefiles_from_tables() {
        let session = Session::default();
        let mut ds = store(&session);
        let mut tables = BTreeMap::new();
        tables.insert(
            "regions".to_string(),
            region_table(r#"{"type":"Point","coordinates":[1.0,2.0]}"#),
        );
        ds.load_shapefiles(Some(tables)).unwrap();
        let shapes = ds.shapefiles.as_ref().unwrap();
        assert_eq!(shapes.len(), 1);
        assert_eq!(
            shapes.get("regions").unwrap().dtype(GEOMETRY_COLUMN),
            Some(ColumnType::Geometry)
        );
    }

    #[test]
    fn test_shapefiles_invalid_geometry() {
        let session = Session::default();
        let mut ds = store(&session);
        let mut tables = BTreeMap::new();
        tables.insert("regions".to_string(), region_table("A"));
        let err = ds.load_shapefiles(Some(tables)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Geometry);
    }

    #[test]
    fn test_shapefiles_region_only_is_missing_column() {
        let session = Session::default();
        let mut ds = store(&session);
        let mut tables = BTreeMap::new();
        tables.insert(
            "regions".to_string(),
            Table::from_columns(vec![("region", vec![Value::from("North")])]).unwrap(),
        );
        let err = ds.load_shapefiles(Some(tables)).unwrap_err();
        assert!(matches!(
            err,
            DatastoreError::Structural(StructuralError::MissingColumn { .. })
        ));
    }

    #[test]
    fn test_shapefiles_level_mismatch() {
        let session = Session::default();
        let config = DatastoreConfig::default()
            .with_shapefile("regions", "/tmp/regions.geojson")
            .with_shapefile("districts", "/tmp/districts.geojson");
        let mut ds = DataStore::with_config(config, &session);
        let mut tables = BTreeMap::new();
        tables.insert(
            "regions".to_string(),
            region_table(r#"{"type":"Point","coordinates":[1.0,2.0]}"#),
        );
        let err = ds.load_shapefiles(Some(tables)).unwrap_err();
        assert!(matches!(
            err,
            DatastoreError::Structural(StructuralError::LevelMismatch { .. })
        ));
    }

    #[test]
    fn test_targeting_expansion() {
        let session = Session::default();
        let mut ds = store(&session);
        let t = Table::from_columns(vec![
            ("unique_id", vec![Value::from("a"), Value::from("b")]),
            ("weight", vec![Value::from(2), Value::from(3)]),
        ])
        .unwrap();
        ds.load_targeting(Some(t)).unwrap();
        let targeting = ds.targeting.as_ref().unwrap();
        assert_eq!(targeting.weighted.row_count(), 5);
        assert_eq!(targeting.unweighted.row_count(), 2);
        assert!(targeting.table.has_column("random"));
    }
}
