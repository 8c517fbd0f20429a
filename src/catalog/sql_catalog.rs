//! [`Catalog`] implementation over SQL.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::{Catalog, DiscoveryError, LayerMetadata, TableDescriptor};
use crate::config::DiscoverySettings;
use crate::executor::{QueryExecutor, QueryRows};
use crate::reproject::Srid;
use crate::sql::{Dialect, IntrospectionQueries};

/// Catalog backed by `information_schema` and the layer metadata table.
///
/// # Example
///
/// ```ignore
/// let catalog = SqlCatalog::new(executor, Dialect::Postgres, &settings.discovery);
/// let tables = catalog.geometry_tables().await?;
/// ```
pub struct SqlCatalog {
    executor: Arc<dyn QueryExecutor>,
    queries: IntrospectionQueries,
    schema: String,
    geometry_column: String,
    metadata_table: String,
}

impl SqlCatalog {
    pub fn new(
        executor: Arc<dyn QueryExecutor>,
        dialect: Dialect,
        discovery: &DiscoverySettings,
    ) -> Self {
        Self {
            executor,
            queries: IntrospectionQueries::new(dialect),
            schema: discovery.schema.clone(),
            geometry_column: discovery.geometry_column.clone(),
            metadata_table: discovery.metadata_table.clone(),
        }
    }

    /// Override the schema scanned for tables and metadata.
    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = schema.into();
        self
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }
}

#[async_trait]
impl Catalog for SqlCatalog {
    async fn geometry_tables(&self) -> Result<Vec<TableDescriptor>, DiscoveryError> {
        let query = self
            .queries
            .geometry_tables(&self.schema, &self.geometry_column);
        let rows = self
            .executor
            .execute(&query)
            .await
            .map_err(|source| DiscoveryError::Tables {
                schema: self.schema.clone(),
                source,
            })?;

        let tables: Vec<TableDescriptor> = string_column(&rows, "table_name")?
            .into_iter()
            .map(|name| TableDescriptor::new(&self.schema, name, &self.geometry_column))
            .collect();

        tracing::info!(schema = %self.schema, count = tables.len(), "discovered geometry tables");
        Ok(tables)
    }

    async fn table_columns(&self, table: &TableDescriptor) -> Result<Vec<String>, DiscoveryError> {
        let query = self.queries.table_columns(&table.schema, &table.name);
        let rows = self
            .executor
            .execute(&query)
            .await
            .map_err(|source| DiscoveryError::Columns {
                table: table.qualified_name(),
                source,
            })?;
        string_column(&rows, "column_name")
    }

    async fn layers(&self) -> Result<Vec<LayerMetadata>, DiscoveryError> {
        let query = self.queries.layers(&self.schema, &self.metadata_table);
        let rows = self
            .executor
            .execute(&query)
            .await
            .map_err(|source| DiscoveryError::Metadata {
                table: format!("{}.{}", self.schema, self.metadata_table),
                source,
            })?;

        let name_idx = required_column(&rows, "layer_name")?;
        let srid_idx = required_column(&rows, "srid")?;
        let info_idx = rows.column_index("drawing_info");

        let mut layers = Vec::with_capacity(rows.len());
        for row in &rows.rows {
            let Some(name) = row.get(name_idx).and_then(Value::as_str) else {
                tracing::warn!("skipping layer metadata record without a layer_name");
                continue;
            };
            let srid = row.get(srid_idx).and_then(parse_srid);
            if srid.is_none() {
                tracing::info!(layer = %name, "layer metadata has no usable SRID");
            }
            let drawing_info = info_idx
                .and_then(|i| row.get(i))
                .cloned()
                .unwrap_or(Value::Null);
            layers.push(LayerMetadata::new(name, srid, drawing_info));
        }

        tracing::info!(count = layers.len(), "loaded layer metadata");
        Ok(layers)
    }
}

fn required_column(rows: &QueryRows, name: &str) -> Result<usize, DiscoveryError> {
    rows.column_index(name)
        .ok_or_else(|| DiscoveryError::Malformed(format!("missing column {}", name)))
}

fn string_column(rows: &QueryRows, name: &str) -> Result<Vec<String>, DiscoveryError> {
    let index = required_column(rows, name)?;
    rows.rows
        .iter()
        .map(|row| match row.get(index) {
            Some(Value::String(s)) => Ok(s.clone()),
            other => Err(DiscoveryError::Malformed(format!(
                "{} is not text: {:?}",
                name, other
            ))),
        })
        .collect()
}

/// SRIDs arrive as integers, floats or numeric text depending on the driver.
/// Zero is PostGIS for "unknown".
fn parse_srid(value: &Value) -> Option<Srid> {
    let srid = match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0 && *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    }?;
    Srid::try_from(srid).ok().filter(|s| *s != 0)
}
