//! Typed features assembled from raw table rows.
//!
//! A [`RawFeatureRow`] is one result row of a table query: the geometry text,
//! the SRID that text is in, and every other returned column. The
//! [`FeatureAssembler`] turns rows into [`Feature`]s in the canonical CRS,
//! keeping only real, non-empty table columns as attributes.

mod style;

pub use style::{Rgba, Style};

use std::collections::HashSet;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::Value;
use thiserror::Error;

use crate::geometry::{FeatureGeometry, GeoJsonGeometry, GeometryError, GeometryType};
use crate::reproject::{ReprojectionError, Reprojector, Srid};

/// Column the intersection query returns the GeoJSON geometry under.
pub const GEOMETRY_ALIAS: &str = "geometry";

/// Pipeline columns that never become attributes (besides the geometry column).
const BOOKKEEPING_COLUMNS: [&str; 4] = [GEOMETRY_ALIAS, "table_name", "srid", "drawing_info"];

/// One row of a per-table intersection query.
#[derive(Debug, Clone, PartialEq)]
pub struct RawFeatureRow {
    pub table: String,
    /// SRID the geometry text is expressed in.
    pub srid: Srid,
    pub geometry: Option<String>,
    /// Remaining columns in result order, duplicates removed.
    pub columns: Vec<(String, Value)>,
}

impl RawFeatureRow {
    /// Build from a positional result row.
    ///
    /// The first occurrence of a repeated column name wins; the geometry is
    /// taken from the first column named [`GEOMETRY_ALIAS`].
    pub fn from_result(table: &str, srid: Srid, names: &[String], values: Vec<Value>) -> Self {
        let mut seen = HashSet::new();
        let mut geometry = None;
        let mut columns = Vec::with_capacity(names.len());

        for (name, value) in names.iter().zip(values) {
            if !seen.insert(name.as_str()) {
                continue;
            }
            if name == GEOMETRY_ALIAS {
                geometry = match value {
                    Value::String(text) => Some(text),
                    Value::Null => None,
                    other => Some(other.to_string()),
                };
                continue;
            }
            columns.push((name.clone(), value));
        }

        Self {
            table: table.to_string(),
            srid,
            geometry,
            columns,
        }
    }
}

/// Ordered attribute set of a feature.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attributes(Vec<(String, Value)>);

impl Attributes {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, Value)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Serialize for Attributes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (k, v) in &self.0 {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// A renderable feature in the canonical CRS.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Feature {
    pub geometry: FeatureGeometry,
    pub geometry_type: GeometryType,
    pub source_table: String,
    pub attributes: Attributes,
    pub style: Style,
}

/// Why a row produced no feature.
#[derive(Debug, Error)]
pub enum FeatureError {
    #[error("row has no geometry")]
    MissingGeometry,

    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error(transparent)]
    Reprojection(#[from] ReprojectionError),
}

/// Builds features from rows of one table.
#[derive(Debug, Clone)]
pub struct FeatureAssembler {
    reprojector: Reprojector,
    geometry_column: String,
}

impl FeatureAssembler {
    pub fn new(reprojector: Reprojector, geometry_column: impl Into<String>) -> Self {
        Self {
            reprojector,
            geometry_column: geometry_column.into(),
        }
    }

    pub fn reprojector(&self) -> &Reprojector {
        &self.reprojector
    }

    /// Assemble one row.
    ///
    /// `table_columns` is the table's real column list; attributes outside it,
    /// bookkeeping columns, and null or blank values are dropped.
    pub fn assemble(
        &self,
        row: RawFeatureRow,
        table_columns: &[String],
        style: &Style,
    ) -> Result<Feature, FeatureError> {
        let text = row.geometry.as_deref().ok_or(FeatureError::MissingGeometry)?;
        let decoded = GeoJsonGeometry::parse(text)?.to_geo()?;
        let geometry = self.reprojector.reproject_geo(decoded, row.srid)?;

        let attributes = Attributes(
            row.columns
                .into_iter()
                .filter(|(name, value)| self.keeps(name, table_columns) && !is_blank(value))
                .collect(),
        );

        Ok(Feature {
            geometry_type: geometry.geometry_type(),
            geometry,
            source_table: row.table,
            attributes,
            style: *style,
        })
    }

    /// Assemble every row in order, collecting the ones that failed.
    pub fn assemble_all(
        &self,
        rows: Vec<RawFeatureRow>,
        table_columns: &[String],
        style: &Style,
    ) -> (Vec<Feature>, Vec<FeatureError>) {
        let mut features = Vec::with_capacity(rows.len());
        let mut skipped = Vec::new();
        for row in rows {
            let table = row.table.clone();
            match self.assemble(row, table_columns, style) {
                Ok(feature) => features.push(feature),
                Err(e) => {
                    tracing::warn!(table = %table, error = %e, "skipping geometry");
                    skipped.push(e);
                }
            }
        }
        (features, skipped)
    }

    fn keeps(&self, name: &str, table_columns: &[String]) -> bool {
        name != self.geometry_column
            && !BOOKKEEPING_COLUMNS.contains(&name)
            && table_columns.iter().any(|c| c == name)
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}
