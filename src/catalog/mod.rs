//! Schema introspection and layer metadata.
//!
//! A [`Catalog`] answers three questions about the database: which tables
//! carry the geometry column, what columns a table really has, and which
//! layer metadata records exist. [`SqlCatalog`] answers them with
//! `information_schema` and metadata-table queries through a
//! [`QueryExecutor`](crate::executor::QueryExecutor).

mod sql_catalog;

pub use sql_catalog::SqlCatalog;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::feature::Style;
use crate::reproject::Srid;
use crate::worker::WorkerError;

/// A table exposing the geometry column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TableDescriptor {
    pub schema: String,
    pub name: String,
    pub geometry_column: String,
}

impl TableDescriptor {
    pub fn new(
        schema: impl Into<String>,
        name: impl Into<String>,
        geometry_column: impl Into<String>,
    ) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
            geometry_column: geometry_column.into(),
        }
    }

    /// `schema.name`, for messages.
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.schema, self.name)
    }
}

impl std::fmt::Display for TableDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.schema, self.name)
    }
}

/// One record of the layer metadata table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayerMetadata {
    pub layer_name: String,
    /// `None` when the record has no usable SRID.
    pub srid: Option<Srid>,
    #[serde(skip)]
    pub drawing_info: Value,
    pub style: Style,
}

impl LayerMetadata {
    pub fn new(layer_name: impl Into<String>, srid: Option<Srid>, drawing_info: Value) -> Self {
        let style = Style::from_drawing_info(&drawing_info);
        Self {
            layer_name: layer_name.into(),
            srid,
            drawing_info,
            style,
        }
    }
}

/// The catalog or metadata store could not be read.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("could not list geometry tables in schema {schema}: {source}")]
    Tables {
        schema: String,
        #[source]
        source: WorkerError,
    },

    #[error("could not list columns of {table}: {source}")]
    Columns {
        table: String,
        #[source]
        source: WorkerError,
    },

    #[error("could not read layer metadata from {table}: {source}")]
    Metadata {
        table: String,
        #[source]
        source: WorkerError,
    },

    #[error("unexpected catalog result: {0}")]
    Malformed(String),

    #[error("could not fingerprint discovery settings: {0}")]
    Fingerprint(String),
}

/// Read-only view of the database's spatial catalog.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Tables in the configured schema that expose the geometry column, by name.
    async fn geometry_tables(&self) -> Result<Vec<TableDescriptor>, DiscoveryError>;

    /// Real column names of `table` in ordinal order.
    async fn table_columns(&self, table: &TableDescriptor) -> Result<Vec<String>, DiscoveryError>;

    /// Every layer metadata record, in storage order.
    async fn layers(&self) -> Result<Vec<LayerMetadata>, DiscoveryError>;
}
