//! PostgreSQL + PostGIS dialect.
//!
//! PostGIS features:
//! - ANSI identifier quoting (`"`)
//! - `$n` parameters
//! - Geometries carry their SRID (`ST_SetSRID`), so `ST_Transform` only
//!   needs the target
//! - `ST_AsGeoJSON` returns text

use super::helpers;
use super::SqlDialect;

/// PostgreSQL SQL dialect.
#[derive(Debug, Clone, Copy)]
pub struct Postgres;

impl SqlDialect for Postgres {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        helpers::quote_double(ident)
    }

    fn tag_srid(&self, geom_expr: &str, srid_expr: &str) -> String {
        format!("ST_SetSRID({}, {})", geom_expr, srid_expr)
    }

    fn transform(&self, geom_expr: &str, _from_srid_expr: &str, to: u32) -> String {
        format!("ST_Transform({}, {})", geom_expr, to)
    }

    fn geometry_as_geojson(&self, geom_expr: &str) -> String {
        format!("ST_AsGeoJSON({})", geom_expr)
    }
}
