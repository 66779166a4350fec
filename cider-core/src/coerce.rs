//! Schema-driven column coercion.
//!
//! [`coerce`] renames aliased columns to their canonical names, checks that
//! every mandatory column is present, and casts each known column to the
//! type its [`SchemaEntry`] requires. Casting fails closed: a value that
//! cannot be represented in the target type is an error, never a silent null.
//! Columns the schema does not mention pass through untouched.

use crate::error::{CoercionError, DomainError, GeometryError, Result, StructuralError};
use crate::geometry::Geometry;
use crate::schema::{DatasetKind, SchemaEntry, SemanticType};
use crate::table::{Table, Value};
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::{BTreeMap, HashMap};

/// Column-name aliases, keyed by alias, valued by canonical name.
pub type SynonymMap = HashMap<String, String>;

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];

/// Merge the built-in synonyms of `entry` with configured overrides.
/// Overrides win when both name the same alias.
pub fn synonyms_for(
    entry: &SchemaEntry,
    overrides: Option<&BTreeMap<String, String>>,
) -> SynonymMap {
    let mut map: SynonymMap = entry
        .synonyms
        .iter()
        .map(|(alias, canonical)| ((*alias).to_string(), (*canonical).to_string()))
        .collect();
    if let Some(overrides) = overrides {
        for (alias, canonical) in overrides {
            if alias != canonical {
                map.insert(alias.clone(), canonical.clone());
            }
        }
    }
    map
}

/// Validate and normalize `table` against `entry`. The input is not modified.
pub fn coerce(table: &Table, entry: &SchemaEntry, synonyms: &SynonymMap) -> Result<Table> {
    let mut out = table.clone();
    apply_synonyms(&mut out, synonyms)?;

    if let Some(missing) = entry.required_columns().find(|c| !out.has_column(c.name)) {
        return Err(StructuralError::MissingColumn {
            dataset: entry.kind,
            column: missing.name.to_string(),
        }
        .into());
    }

    for spec in entry.columns {
        if !out.has_column(spec.name) {
            continue;
        }
        cast_column(&mut out, entry.kind, spec.name, spec.ty)?;
    }
    Ok(out)
}

/// Rename every aliased column whose canonical name is not already taken.
pub fn apply_synonyms(table: &mut Table, synonyms: &SynonymMap) -> Result<()> {
    let aliased: Vec<(String, String)> = table
        .column_names()
        .into_iter()
        .filter_map(|name| {
            synonyms
                .get(name)
                .map(|canonical| (name.to_string(), canonical.clone()))
        })
        .collect();
    for (alias, canonical) in aliased {
        if table.has_column(&canonical) {
            tracing::debug!(%alias, %canonical, "canonical column already present, alias kept");
            continue;
        }
        table.rename_column(&alias, &canonical)?;
        tracing::debug!(%alias, %canonical, "renamed column");
    }
    Ok(())
}

/// Cast one column of `table` in place.
///
/// Numeric columns go through the frame's strict float cast first; only when
/// that fails are values cast one by one, which locates the offending value.
pub fn cast_column(
    table: &mut Table,
    dataset: DatasetKind,
    column: &str,
    ty: SemanticType,
) -> Result<()> {
    if !table.has_column(column) {
        return Err(StructuralError::MissingColumn {
            dataset,
            column: column.to_string(),
        }
        .into());
    }
    if matches!(ty, SemanticType::Numeric) && table.try_cast_float(column) {
        return Ok(());
    }
    let cast = table
        .column(column)
        .into_iter()
        .flatten()
        .map(|v| cast_value(&v, dataset, column, ty))
        .collect::<Result<Vec<_>>>()?;
    table.set_column(column, ty.output_type(), cast)
}

/// Cast a single value to `ty`, reporting the first violation.
pub fn cast_value(
    value: &Value,
    dataset: DatasetKind,
    column: &str,
    ty: SemanticType,
) -> Result<Value> {
    let wrong_type = || CoercionError::WrongType {
        dataset,
        column: column.to_string(),
        expected: ty.to_string(),
        value: value.to_string(),
    };
    if value.is_null() {
        return Ok(Value::Null);
    }
    match ty {
        SemanticType::Text => to_text(value).ok_or_else(|| wrong_type().into()),
        SemanticType::Numeric => to_numeric(value).ok_or_else(|| wrong_type().into()),
        SemanticType::Timestamp => to_timestamp(value).ok_or_else(|| wrong_type().into()),
        SemanticType::Categorical(allowed) => {
            let text = to_text(value).ok_or_else(wrong_type)?;
            match &text {
                Value::Str(s) if !allowed.contains(&s.as_str()) => {
                    Err(DomainError::OutOfVocabulary {
                        dataset,
                        column: column.to_string(),
                        value: s.clone(),
                        allowed: allowed.join(", "),
                    }
                    .into())
                }
                _ => Ok(text),
            }
        }
        SemanticType::Geometry => to_geometry(value).map_err(Into::into),
    }
}

fn to_text(value: &Value) -> Option<Value> {
    match value {
        Value::Null => Some(Value::Null),
        Value::Str(s) => Some(Value::Str(s.clone())),
        Value::Geometry(_) => None,
        other => Some(Value::Str(other.to_string())),
    }
}

fn to_numeric(value: &Value) -> Option<Value> {
    match value {
        Value::Null => Some(Value::Null),
        Value::Float(f) => Some(Value::Float(*f)),
        Value::Int(i) => Some(Value::Float(*i as f64)),
        Value::Str(s) => {
            let s = s.trim();
            if s.is_empty() {
                Some(Value::Null)
            } else {
                s.parse::<f64>().ok().map(Value::Float)
            }
        }
        _ => None,
    }
}

fn to_timestamp(value: &Value) -> Option<Value> {
    match value {
        Value::Null => Some(Value::Null),
        Value::Timestamp(ts) => Some(Value::Timestamp(*ts)),
        Value::Date(d) => d.and_hms_opt(0, 0, 0).map(Value::Timestamp),
        Value::Str(s) if s.trim().is_empty() => Some(Value::Null),
        Value::Str(s) => parse_timestamp(s).map(Value::Timestamp),
        _ => None,
    }
}

fn to_geometry(value: &Value) -> std::result::Result<Value, GeometryError> {
    match value {
        Value::Geometry(g) => {
            g.validate()?;
            Ok(Value::Geometry(g.clone()))
        }
        Value::Str(s) => Geometry::parse(s).map(Value::Geometry),
        other => Err(GeometryError::Malformed {
            message: format!("expected GeoJSON, got {}", other.column_type()),
        }),
    }
}

/// Parse a timestamp in any of the accepted textual forms. Date-only input
/// resolves to midnight.
pub fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim().trim_end_matches('Z');
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{DatastoreError, ErrorKind};
    use crate::schema::schema_for;
    use crate::table::ColumnType;

    fn cdr_row(txn_type: &str, international: &str) -> Table {
        Table::from_columns(vec![
            ("txn_type", vec![Value::from(txn_type)]),
            ("caller_id", vec![Value::from("A")]),
            ("recipient_id", vec![Value::from("B")]),
            ("timestamp", vec![Value::from("2021-01-01")]),
            ("duration", vec![Value::from(60)]),
            ("international", vec![Value::from(international)]),
        ])
        .unwrap()
    }

    fn coerce_kind(table: &Table, kind: DatasetKind) -> Result<Table> {
        let entry = schema_for(kind);
        coerce(table, entry, &synonyms_for(entry, None))
    }

    #[test]
    fn test_coerce_valid_cdr() {
        let out = coerce_kind(&cdr_row("text", "domestic"), DatasetKind::Cdr).unwrap();
        assert_eq!(out.dtype("duration"), Some(ColumnType::Float));
        assert_eq!(out.dtype("timestamp"), Some(ColumnType::DateTime));
        assert_eq!(out.value(0, "duration"), Some(Value::Float(60.0)));
    }

    #[test]
    fn test_coerce_does_not_mutate_input() {
        let input = cdr_row("call", "international");
        let before = input.clone();
        coerce_kind(&input, DatasetKind::Cdr).unwrap();
        assert_eq!(input, before);
    }

    #[test]
    fn test_missing_required_column() {
        let t = Table::from_columns(vec![
            ("antenna_id", vec![Value::from("1")]),
            ("latitude", vec![Value::from("10")]),
        ])
        .unwrap();
        let err = coerce_kind(&t, DatasetKind::Antennas).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Structural);
        assert!(err.to_string().contains("longitude"));
    }

    #[test]
    fn test_out_of_vocabulary() {
        let err = coerce_kind(&cdr_row("text_message", "domestic"), DatasetKind::Cdr).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DomainViolation);

        let err = coerce_kind(&cdr_row("call", "abroad"), DatasetKind::Cdr).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DomainViolation);
    }

    #[test]
    fn test_non_numeric_string_is_wrong_type() {
        let t = Table::from_columns(vec![
            ("antenna_id", vec![Value::from("1")]),
            ("latitude", vec![Value::from("north")]),
            ("longitude", vec![Value::from("25.3")]),
        ])
        .unwrap();
        let err = coerce_kind(&t, DatasetKind::Antennas).unwrap_err();
        assert!(matches!(
            err,
            DatastoreError::Coercion(CoercionError::WrongType { ref column, .. }) if column == "latitude"
        ));
    }

    #[test]
    fn test_unparseable_timestamp() {
        let t = Table::from_columns(vec![
            ("caller_id", vec![Value::from("A")]),
            ("amount", vec![Value::from("100")]),
            ("timestamp", vec![Value::from("yesterday")]),
        ])
        .unwrap();
        let err = coerce_kind(&t, DatasetKind::Recharges).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TypeCoercion);
    }

    #[test]
    fn test_builtin_and_override_synonyms() {
        let t = Table::from_columns(vec![
            ("caller_msisdn", vec![Value::from("A")]),
            ("bytes", vec![Value::from(10)]),
            ("datetime", vec![Value::from("2020-01-01 10:00:00")]),
        ])
        .unwrap();
        let entry = schema_for(DatasetKind::MobileData);
        let overrides = BTreeMap::from([("bytes".to_string(), "volume".to_string())]);
        let out = coerce(&t, entry, &synonyms_for(entry, Some(&overrides))).unwrap();
        assert_eq!(out.column_names(), vec!["caller_id", "volume", "timestamp"]);
    }

    #[test]
    fn test_extra_columns_pass_through() {
        let t = Table::from_columns(vec![
            ("antenna_id", vec![Value::from(1)]),
            ("latitude", vec![Value::from(1.5)]),
            ("longitude", vec![Value::from(2.5)]),
            ("site_name", vec![Value::from("hill")]),
        ])
        .unwrap();
        let out = coerce_kind(&t, DatasetKind::Antennas).unwrap();
        assert_eq!(out.value(0, "antenna_id"), Some(Value::from("1")));
        assert_eq!(out.dtype("site_name"), Some(ColumnType::String));
    }

    #[test]
    fn test_padded_numeric_text_is_cast() {
        let t = Table::from_columns(vec![
            ("caller_id", vec![Value::from("A"), Value::from("B")]),
            ("amount", vec![Value::from(" 12 "), Value::from("")]),
            ("timestamp", vec![Value::from("2020-01-01"), Value::from("2020-01-02")]),
        ])
        .unwrap();
        let out = coerce_kind(&t, DatasetKind::Recharges).unwrap();
        let amounts: Vec<Value> = out.column("amount").unwrap().collect();
        assert_eq!(amounts, vec![Value::Float(12.0), Value::Null]);
    }

    #[test]
    fn test_empty_strings_become_null() {
        let v = cast_value(
            &Value::from("  "),
            DatasetKind::Recharges,
            "amount",
            SemanticType::Numeric,
        )
        .unwrap();
        assert!(v.is_null());
    }

    #[test]
    fn test_geometry_text_is_parsed() {
        let ok = cast_value(
            &Value::from(r#"{"type":"Point","coordinates":[1,2]}"#),
            DatasetKind::Shapefiles,
            "geometry",
            SemanticType::Geometry,
        )
        .unwrap();
        assert!(matches!(ok, Value::Geometry(_)));

        let err = cast_value(
            &Value::from("A"),
            DatasetKind::Shapefiles,
            "geometry",
            SemanticType::Geometry,
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Geometry);
    }

    #[test]
    fn test_parse_timestamp_forms() {
        let midnight = parse_timestamp("2021-01-01").unwrap();
        assert_eq!(midnight.to_string(), "2021-01-01 00:00:00");
        assert!(parse_timestamp("2020-01-02 12:00:01").is_some());
        assert!(parse_timestamp("2020-01-02T12:00:01.250Z").is_some());
        assert!(parse_timestamp("01/02/2020").is_none());
    }
}
