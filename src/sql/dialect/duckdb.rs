//! DuckDB spatial dialect.
//!
//! DuckDB spatial differs from PostGIS:
//! - Geometries have no SRID; `ST_Transform` takes source and target CRS
//!   strings plus an `always_xy` flag
//! - `ST_AsGeoJSON` returns JSON, cast back to VARCHAR
//! - VARCHAR is the text type

use super::helpers;
use super::SqlDialect;

/// DuckDB SQL dialect.
#[derive(Debug, Clone, Copy)]
pub struct DuckDb;

impl SqlDialect for DuckDb {
    fn name(&self) -> &'static str {
        "duckdb"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        helpers::quote_double(ident)
    }

    fn text_type(&self) -> &'static str {
        "VARCHAR"
    }

    fn tag_srid(&self, geom_expr: &str, _srid_expr: &str) -> String {
        geom_expr.to_string()
    }

    fn transform(&self, geom_expr: &str, from_srid_expr: &str, to: u32) -> String {
        format!(
            "ST_Transform({}, CONCAT('EPSG:', {}), {}, true)",
            geom_expr,
            from_srid_expr,
            self.quote_string(&helpers::epsg(to))
        )
    }

    fn geometry_as_geojson(&self, geom_expr: &str) -> String {
        format!("CAST(ST_AsGeoJSON({}) AS VARCHAR)", geom_expr)
    }
}
