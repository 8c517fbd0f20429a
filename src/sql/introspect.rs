//! Catalog and metadata queries.

use serde_json::Value;

use super::{BoundQuery, Dialect, SqlDialect};

/// Builds the discovery-phase queries for one dialect.
#[derive(Debug, Clone, Copy)]
pub struct IntrospectionQueries {
    dialect: Dialect,
}

impl IntrospectionQueries {
    pub fn new(dialect: Dialect) -> Self {
        Self { dialect }
    }

    /// Tables in `schema` that have a column named `geometry_column`.
    pub fn geometry_tables(&self, schema: &str, geometry_column: &str) -> BoundQuery {
        let d = &self.dialect;
        BoundQuery::new(
            format!(
                "SELECT DISTINCT table_name FROM information_schema.columns \
                 WHERE table_schema = {} AND column_name = {} ORDER BY table_name",
                d.placeholder(1),
                d.placeholder(2)
            ),
            vec![Value::from(schema), Value::from(geometry_column)],
        )
    }

    /// Column names of one table in ordinal order.
    pub fn table_columns(&self, schema: &str, table: &str) -> BoundQuery {
        let d = &self.dialect;
        BoundQuery::new(
            format!(
                "SELECT column_name FROM information_schema.columns \
                 WHERE table_schema = {} AND table_name = {} ORDER BY ordinal_position",
                d.placeholder(1),
                d.placeholder(2)
            ),
            vec![Value::from(schema), Value::from(table)],
        )
    }

    /// Every record of the layer metadata table.
    pub fn layers(&self, schema: &str, metadata_table: &str) -> BoundQuery {
        let d = &self.dialect;
        BoundQuery::new(
            format!(
                "SELECT layer_name, srid, drawing_info FROM {}.{}",
                d.quote_identifier(schema),
                d.quote_identifier(metadata_table)
            ),
            Vec::new(),
        )
    }
}
