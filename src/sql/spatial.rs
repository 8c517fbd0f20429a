//! Per-table spatial intersection queries.

use std::collections::HashSet;

use serde_json::Value;
use thiserror::Error;

use super::{BoundQuery, Dialect, GeometryEncoding, ReprojectionSite, SqlDialect};
use crate::catalog::TableDescriptor;
use crate::feature::GEOMETRY_ALIAS;
use crate::geometry::QueryScope;
use crate::reproject::Srid;

/// Alias of the queried table inside the statement.
const TABLE_ALIAS: &str = "t";

#[derive(Debug, Error, PartialEq)]
pub enum QueryBuildError {
    /// The table was not produced by introspection in this cycle.
    #[error("table {0} is not a discovered geometry table")]
    NotAllowed(String),

    #[error("query polygon is in SRID {found}, expected canonical SRID {expected}")]
    ScopeSrid { found: Srid, expected: Srid },
}

/// Builds intersection queries against an allow-list of introspected tables.
///
/// Argument layout of every query: `$1` = the table's SRID, `$2` = the
/// polygon as GeoJSON text in the canonical CRS.
#[derive(Debug, Clone)]
pub struct SpatialQueryBuilder {
    dialect: Dialect,
    encoding: GeometryEncoding,
    site: ReprojectionSite,
    canonical: Srid,
    allowed: HashSet<TableDescriptor>,
}

impl SpatialQueryBuilder {
    pub fn new(
        dialect: Dialect,
        encoding: GeometryEncoding,
        site: ReprojectionSite,
        canonical: Srid,
        tables: &[TableDescriptor],
    ) -> Self {
        Self {
            dialect,
            encoding,
            site,
            canonical,
            allowed: tables.iter().cloned().collect(),
        }
    }

    pub fn site(&self) -> ReprojectionSite {
        self.site
    }

    /// SRID of the geometry text a query over a `table_srid` table returns.
    pub fn output_srid(&self, table_srid: Srid) -> Srid {
        match self.site {
            ReprojectionSite::Database => self.canonical,
            ReprojectionSite::Client => table_srid,
        }
    }

    /// Select every row of `table` whose geometry intersects `scope`.
    ///
    /// The geometry is returned first, as GeoJSON under the `geometry`
    /// alias, followed by all of the table's own columns.
    pub fn build(
        &self,
        table: &TableDescriptor,
        srid: Srid,
        scope: &QueryScope,
    ) -> Result<BoundQuery, QueryBuildError> {
        if !self.allowed.contains(table) {
            return Err(QueryBuildError::NotAllowed(table.qualified_name()));
        }
        if scope.srid() != self.canonical {
            return Err(QueryBuildError::ScopeSrid {
                found: scope.srid(),
                expected: self.canonical,
            });
        }

        let d = &self.dialect;
        let srid_param = d.placeholder(1);
        let polygon_param = d.placeholder(2);

        let column = format!("{}.{}", TABLE_ALIAS, d.quote_identifier(&table.geometry_column));
        let source = match self.encoding {
            GeometryEncoding::GeojsonText => d.tag_srid(
                &d.geometry_from_geojson(&format!("CAST({} AS {})", column, d.text_type())),
                &srid_param,
            ),
            GeometryEncoding::Native => d.tag_srid(&column, &srid_param),
        };
        let canonical = d.transform(&source, &srid_param, self.canonical);
        let polygon = d.tag_srid(
            &d.geometry_from_geojson(&polygon_param),
            &self.canonical.to_string(),
        );

        let output = match self.site {
            ReprojectionSite::Database => &canonical,
            ReprojectionSite::Client => &source,
        };

        let sql = format!(
            "SELECT {} AS {}, {}.* FROM {}.{} AS {} WHERE {}",
            d.geometry_as_geojson(output),
            d.quote_identifier(GEOMETRY_ALIAS),
            TABLE_ALIAS,
            d.quote_identifier(&table.schema),
            d.quote_identifier(&table.name),
            TABLE_ALIAS,
            d.intersects(&canonical, &polygon),
        );

        tracing::debug!(table = %table.name, sql = %sql, "built intersection query");

        Ok(BoundQuery::new(
            sql,
            vec![Value::from(srid), Value::from(scope.geojson())],
        ))
    }
}
