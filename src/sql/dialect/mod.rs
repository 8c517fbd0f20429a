//! SQL dialect definitions for spatial databases.
//!
//! This module provides a trait-based abstraction over the spatial SQL
//! differences between the supported engines:
//!
//! - Identifier quoting
//! - Parameter placeholders
//! - How a geometry carries its SRID (PostGIS tags the value, DuckDB spatial
//!   passes CRS strings to `ST_Transform`)
//! - GeoJSON output types
//!
//! # Usage
//!
//! ```ignore
//! use geosift::sql::{Dialect, SqlDialect};
//!
//! let dialect = Dialect::Postgres;
//! let quoted = dialect.quote_identifier("SHAPE");  // "SHAPE"
//! ```
//!
//! # Function Support
//!
//! | Function | PostGIS | DuckDB spatial |
//! |----------|---------|----------------|
//! | ST_GeomFromGeoJSON | ✓ | ✓ |
//! | ST_AsGeoJSON | text | JSON |
//! | ST_SetSRID | ✓ | ❌ (CRS is passed to ST_Transform) |
//! | ST_Transform | (geom, srid) | (geom, from, to, always_xy) |
//! | ST_Intersects | ✓ | ✓ |

mod duckdb;
pub mod helpers;
mod postgres;

pub use duckdb::DuckDb;
pub use postgres::Postgres;

use crate::config::Driver;

/// SQL dialect trait - defines how spatial SQL constructs are rendered.
///
/// Every method returns an SQL fragment. Arguments named `*_expr` are
/// already-rendered SQL expressions, never raw user input.
pub trait SqlDialect: std::fmt::Debug + Send + Sync {
    /// Dialect name for display/logging.
    fn name(&self) -> &'static str;

    // =========================================================================
    // Identifier and Literal Quoting
    // =========================================================================

    /// Quote an identifier (schema, table, column, alias).
    fn quote_identifier(&self, ident: &str) -> String;

    /// Quote a string literal.
    fn quote_string(&self, s: &str) -> String {
        helpers::quote_string_single(s)
    }

    /// Placeholder for the `n`th bound argument, 1-based.
    fn placeholder(&self, n: usize) -> String {
        helpers::placeholder_dollar(n)
    }

    /// Name of the text type used for casts.
    fn text_type(&self) -> &'static str {
        "TEXT"
    }

    // =========================================================================
    // Geometry
    // =========================================================================

    /// Parse GeoJSON text into a geometry.
    fn geometry_from_geojson(&self, text_expr: &str) -> String {
        format!("ST_GeomFromGeoJSON({})", text_expr)
    }

    /// Attach an SRID to a geometry that has none.
    ///
    /// Dialects whose geometries carry no SRID return the input unchanged.
    fn tag_srid(&self, geom_expr: &str, srid_expr: &str) -> String;

    /// Transform a geometry from `from_srid_expr` into the `to` system.
    fn transform(&self, geom_expr: &str, from_srid_expr: &str, to: u32) -> String;

    /// Encode a geometry as GeoJSON text.
    fn geometry_as_geojson(&self, geom_expr: &str) -> String;

    /// Intersection predicate.
    fn intersects(&self, a_expr: &str, b_expr: &str) -> String {
        format!("ST_Intersects({}, {})", a_expr, b_expr)
    }
}

/// Supported SQL dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialect {
    #[default]
    Postgres,
    DuckDb,
}

impl Dialect {
    /// Get the dialect implementation.
    pub fn dialect(&self) -> &'static dyn SqlDialect {
        match self {
            Dialect::Postgres => &Postgres,
            Dialect::DuckDb => &DuckDb,
        }
    }
}

impl From<Driver> for Dialect {
    fn from(driver: Driver) -> Self {
        match driver {
            Driver::Postgres => Dialect::Postgres,
            Driver::DuckDb => Dialect::DuckDb,
        }
    }
}

// Implement SqlDialect for Dialect enum by delegating to concrete types
impl SqlDialect for Dialect {
    fn name(&self) -> &'static str {
        self.dialect().name()
    }

    fn quote_identifier(&self, ident: &str) -> String {
        self.dialect().quote_identifier(ident)
    }

    fn quote_string(&self, s: &str) -> String {
        self.dialect().quote_string(s)
    }

    fn placeholder(&self, n: usize) -> String {
        self.dialect().placeholder(n)
    }

    fn text_type(&self) -> &'static str {
        self.dialect().text_type()
    }

    fn geometry_from_geojson(&self, text_expr: &str) -> String {
        self.dialect().geometry_from_geojson(text_expr)
    }

    fn tag_srid(&self, geom_expr: &str, srid_expr: &str) -> String {
        self.dialect().tag_srid(geom_expr, srid_expr)
    }

    fn transform(&self, geom_expr: &str, from_srid_expr: &str, to: u32) -> String {
        self.dialect().transform(geom_expr, from_srid_expr, to)
    }

    fn geometry_as_geojson(&self, geom_expr: &str) -> String {
        self.dialect().geometry_as_geojson(geom_expr)
    }

    fn intersects(&self, a_expr: &str, b_expr: &str) -> String {
        self.dialect().intersects(a_expr, b_expr)
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
