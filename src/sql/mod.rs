//! SQL generation module.
//!
//! Everything geosift sends to the database is built here as a
//! [`BoundQuery`]: SQL text with numbered placeholders plus the argument
//! values. User input (the polygon, SRIDs, schema names) only ever travels
//! as arguments; identifiers are quoted by the [`SqlDialect`].
//!
//! - [`dialect`] - PostGIS and DuckDB spatial rendering rules
//! - [`spatial`] - per-table intersection queries
//! - [`introspect`] - catalog and metadata queries

pub mod dialect;
pub mod introspect;
pub mod spatial;

#[cfg(test)]
pub mod test_utils;

pub use dialect::{Dialect, SqlDialect};
pub use introspect::IntrospectionQueries;
pub use spatial::{QueryBuildError, SpatialQueryBuilder};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How geometries are stored in the geometry column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeometryEncoding {
    /// GeoJSON text (or json), without an embedded SRID.
    #[default]
    GeojsonText,
    /// A native geometry column.
    Native,
}

/// Where source geometries are transformed into the canonical CRS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReprojectionSite {
    /// `ST_Transform` in the query; rows arrive in the canonical CRS.
    #[default]
    Database,
    /// Rows arrive in the table's CRS and are reprojected in-process.
    Client,
}

/// SQL text and its positional arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundQuery {
    pub sql: String,
    pub args: Vec<Value>,
}

impl BoundQuery {
    pub fn new(sql: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            args,
        }
    }
}

impl std::fmt::Display for BoundQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.sql)
    }
}
