//! In-memory stand-in for the database worker.
//!
//! Answers the three catalog queries and every per-table intersection query
//! from fixed data. It does no spatial filtering: every configured hit of a
//! table is returned, as if it intersected the polygon.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use geosift::catalog::SqlCatalog;
use geosift::config::{DiscoverySettings, QuerySettings};
use geosift::executor::{QueryExecutor, QueryRows};
use geosift::sql::{BoundQuery, Dialect, ReprojectionSite};
use geosift::worker::{WorkerError, WorkerResult};
use geosift::Session;
use serde_json::{json, Value};

pub const SCHEMA: &str = "public";

/// Polygon around downtown Los Angeles.
pub const LA_POLYGON: &str = r#"{
    "type": "Feature",
    "properties": {},
    "geometry": {
        "type": "Polygon",
        "coordinates": [[[-118.30, 33.95], [-118.20, 33.95], [-118.20, 34.10], [-118.30, 34.10], [-118.30, 33.95]]]
    }
}"#;

#[derive(Default)]
struct FakeTable {
    columns: Vec<String>,
    hits: Vec<Vec<Value>>,
    failure: Option<String>,
    delay: Option<Duration>,
}

/// Fake database keyed by table name.
#[derive(Default)]
pub struct FakeDatabase {
    order: Vec<String>,
    tables: HashMap<String, FakeTable>,
    layers: Vec<Vec<Value>>,
    catalog_down: bool,
    executed: Mutex<Vec<BoundQuery>>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl FakeDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// A geometry table with the given real columns.
    pub fn table(mut self, name: &str, columns: &[&str]) -> Self {
        self.order.push(name.to_string());
        self.tables.insert(
            name.to_string(),
            FakeTable {
                columns: columns.iter().map(|c| c.to_string()).collect(),
                ..FakeTable::default()
            },
        );
        self
    }

    /// A row the intersection query returns: GeoJSON text then one value per column.
    pub fn hit(mut self, table: &str, geometry: &str, values: Vec<Value>) -> Self {
        let mut row = vec![Value::from(geometry)];
        row.extend(values);
        self.tables.entry(table.to_string()).or_default().hits.push(row);
        self
    }

    pub fn failing(mut self, table: &str, message: &str) -> Self {
        self.tables.entry(table.to_string()).or_default().failure = Some(message.to_string());
        self
    }

    pub fn slow(mut self, table: &str, delay: Duration) -> Self {
        self.tables.entry(table.to_string()).or_default().delay = Some(delay);
        self
    }

    pub fn layer(mut self, name: &str, srid: Value, drawing_info: Value) -> Self {
        self.layers.push(vec![Value::from(name), srid, drawing_info]);
        self
    }

    /// Make every catalog query fail.
    pub fn catalog_down(mut self) -> Self {
        self.catalog_down = true;
        self
    }

    pub fn executed(&self) -> Vec<BoundQuery> {
        self.executed.lock().unwrap().clone()
    }

    /// Number of queries whose SQL contains `needle`.
    pub fn count(&self, needle: &str) -> usize {
        self.executed
            .lock()
            .unwrap()
            .iter()
            .filter(|q| q.sql.contains(needle))
            .count()
    }

    /// Most table queries that were running at the same time.
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    fn intersection(&self, sql: &str) -> WorkerResult<(&FakeTable, Vec<String>)> {
        let name = self
            .order
            .iter()
            .find(|name| sql.contains(&format!(r#"FROM "{}"."{}""#, SCHEMA, name)))
            .ok_or_else(|| WorkerError::QueryFailed(format!("unexpected query: {}", sql)))?;
        let table = &self.tables[name];
        let mut columns = vec!["geometry".to_string()];
        columns.extend(table.columns.iter().cloned());
        Ok((table, columns))
    }
}

#[async_trait]
impl QueryExecutor for FakeDatabase {
    async fn execute(&self, query: &BoundQuery) -> WorkerResult<QueryRows> {
        self.executed.lock().unwrap().push(query.clone());
        let sql = query.sql.as_str();

        if sql.contains("information_schema") || sql.contains("layer_name") {
            if self.catalog_down {
                return Err(WorkerError::ConnectionFailed("connection refused".into()));
            }
        }

        if sql.starts_with("SELECT DISTINCT table_name") {
            let mut names = self.order.clone();
            names.sort();
            return Ok(QueryRows::new(
                vec!["table_name".into()],
                names.into_iter().map(|n| vec![Value::from(n)]).collect(),
            ));
        }

        if sql.starts_with("SELECT column_name") {
            let table = query.args[1].as_str().unwrap_or_default();
            let columns = self
                .tables
                .get(table)
                .map(|t| t.columns.clone())
                .unwrap_or_default();
            return Ok(QueryRows::new(
                vec!["column_name".into()],
                columns.into_iter().map(|c| vec![Value::from(c)]).collect(),
            ));
        }

        if sql.starts_with("SELECT layer_name") {
            return Ok(QueryRows::new(
                vec!["layer_name".into(), "srid".into(), "drawing_info".into()],
                self.layers.clone(),
            ));
        }

        let (table, columns) = self.intersection(sql)?;
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(running, Ordering::SeqCst);
        if let Some(delay) = table.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        if let Some(message) = &table.failure {
            return Err(WorkerError::QueryFailed(message.clone()));
        }
        Ok(QueryRows::new(columns, table.hits.clone()))
    }
}

/// Red line symbol as stored in the metadata table.
pub fn red_line() -> Value {
    json!({"renderer": {"symbol": {"type": "esriSLS", "color": [255, 0, 0, 255], "width": 2}}})
}

pub fn session(db: Arc<FakeDatabase>, site: ReprojectionSite) -> Session {
    session_with(db, site, QuerySettings::default())
}

pub fn session_with(db: Arc<FakeDatabase>, site: ReprojectionSite, query: QuerySettings) -> Session {
    let discovery = DiscoverySettings::default();
    let catalog = SqlCatalog::new(db.clone(), Dialect::Postgres, &discovery);
    Session::builder(Arc::new(catalog), db, Dialect::Postgres)
        .discovery(discovery)
        .query(QuerySettings {
            reprojection: site,
            ..query
        })
        .build()
}

pub fn polygon() -> Value {
    serde_json::from_str(LA_POLYGON).unwrap()
}
