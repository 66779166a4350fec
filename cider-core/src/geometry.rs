//! GeoJSON geometries for shapefile levels.

use crate::error::GeometryError;
use serde::{Deserialize, Serialize};

/// `[x, y]` or `[x, y, z]`.
pub type Position = Vec<f64>;

/// A GeoJSON geometry object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Geometry {
    Point { coordinates: Position },
    MultiPoint { coordinates: Vec<Position> },
    LineString { coordinates: Vec<Position> },
    MultiLineString { coordinates: Vec<Vec<Position>> },
    Polygon { coordinates: Vec<Vec<Position>> },
    MultiPolygon { coordinates: Vec<Vec<Vec<Position>>> },
}

impl Geometry {
    /// Parse GeoJSON text and validate the result.
    pub fn parse(text: &str) -> Result<Self, GeometryError> {
        let value: serde_json::Value =
            serde_json::from_str(text).map_err(|e| GeometryError::Malformed {
                message: format!("'{}': {e}", preview(text)),
            })?;
        Self::from_json(value)
    }

    /// Build from an already-parsed GeoJSON value and validate the result.
    pub fn from_json(value: serde_json::Value) -> Result<Self, GeometryError> {
        let geometry: Geometry =
            serde_json::from_value(value).map_err(|e| GeometryError::Malformed {
                message: e.to_string(),
            })?;
        geometry.validate()?;
        Ok(geometry)
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Point { .. } => "Point",
            Self::MultiPoint { .. } => "MultiPoint",
            Self::LineString { .. } => "LineString",
            Self::MultiLineString { .. } => "MultiLineString",
            Self::Polygon { .. } => "Polygon",
            Self::MultiPolygon { .. } => "MultiPolygon",
        }
    }

    pub fn validate(&self) -> Result<(), GeometryError> {
        let invalid = |reason: String| GeometryError::Invalid {
            geometry_type: self.type_name().to_string(),
            reason,
        };
        match self {
            Self::Point { coordinates } => check_position(coordinates).map_err(invalid),
            Self::MultiPoint { coordinates } => {
                non_empty(coordinates, "no points").map_err(invalid)?;
                coordinates
                    .iter()
                    .try_for_each(|p| check_position(p))
                    .map_err(invalid)
            }
            Self::LineString { coordinates } => check_line(coordinates).map_err(invalid),
            Self::MultiLineString { coordinates } => {
                non_empty(coordinates, "no line strings").map_err(invalid)?;
                coordinates
                    .iter()
                    .try_for_each(|line| check_line(line))
                    .map_err(invalid)
            }
            Self::Polygon { coordinates } => check_polygon(coordinates).map_err(invalid),
            Self::MultiPolygon { coordinates } => {
                non_empty(coordinates, "no polygons").map_err(invalid)?;
                coordinates
                    .iter()
                    .try_for_each(|poly| check_polygon(poly))
                    .map_err(invalid)
            }
        }
    }

    /// GeoJSON text form.
    pub fn to_json_string(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

fn non_empty<T>(items: &[T], what: &str) -> Result<(), String> {
    if items.is_empty() {
        Err(what.to_string())
    } else {
        Ok(())
    }
}

fn check_position(position: &Position) -> Result<(), String> {
    if !(2..=3).contains(&position.len()) {
        return Err(format!(
            "position has {} coordinates, expected 2 or 3",
            position.len()
        ));
    }
    if position.iter().any(|c| !c.is_finite()) {
        return Err("position has a non-finite coordinate".to_string());
    }
    Ok(())
}

fn check_line(line: &[Position]) -> Result<(), String> {
    if line.len() < 2 {
        return Err(format!("line has {} position(s), needs 2", line.len()));
    }
    line.iter().try_for_each(check_position)
}

fn check_polygon(rings: &[Vec<Position>]) -> Result<(), String> {
    non_empty(rings, "polygon has no rings")?;
    for ring in rings {
        if ring.len() < 4 {
            return Err(format!("ring has {} position(s), needs 4", ring.len()));
        }
        ring.iter().try_for_each(check_position)?;
        if ring.first() != ring.last() {
            return Err("ring is not closed".to_string());
        }
    }
    Ok(())
}

fn preview(text: &str) -> String {
    if text.chars().count() > 40 {
        let head: String = text.chars().take(40).collect();
        format!("{head}...")
    } else {
        text.to_string()
    }
}
