//! Polygon query sessions.
//!
//! A [`Session`] owns everything that outlives one polygon submission: the
//! discovery cache, the aggregator, the feature assembler, and the current
//! cycle's cancellation token. Each call to [`Session::submit`] runs one
//! cycle:
//!
//! ```text
//! Idle -> PolygonReceived -> Discovering -> Matching
//!      -> QueryingTables { completed, total } -> Assembling -> Ready
//! ```
//!
//! Submitting again while a cycle is querying cancels the older cycle; it
//! returns [`PipelineError::Superseded`] and leaves the published state to
//! the newer one.

use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::watch;

use crate::aggregate::{
    AggregateResult, Aggregator, AggregatorOptions, CycleToken, NoProgress, Progress,
    ProgressSink, Superseded, TableFailure,
};
use crate::cache::{compute_hash, Discovery, DiscoveryCache};
use crate::catalog::{Catalog, DiscoveryError, SqlCatalog};
use crate::config::{DiscoverySettings, QuerySettings, Settings};
use crate::executor::QueryExecutor;
use crate::feature::{Feature, FeatureAssembler};
use crate::geometry::{GeometryError, QueryScope};
use crate::matcher::{BindingGap, LayerMatcher, PositionalMatcher};
use crate::reproject::{CrsRegistry, Reprojector};
use crate::sql::{Dialect, SpatialQueryBuilder};

/// Shown when a cycle succeeds without finding anything.
pub const EMPTY_RESULT_MESSAGE: &str = "No geometries found within the drawn polygon.";

/// Where the current cycle is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PipelineState {
    #[default]
    Idle,
    PolygonReceived,
    Discovering,
    Matching,
    QueryingTables {
        completed: usize,
        total: usize,
    },
    Assembling,
    Ready,
}

/// Errors that fail a whole cycle.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    #[error("invalid polygon: {0}")]
    InvalidPolygon(#[from] GeometryError),

    #[error("superseded by a newer submission")]
    Superseded,
}

impl From<Superseded> for PipelineError {
    fn from(_: Superseded) -> Self {
        Self::Superseded
    }
}

impl PipelineError {
    /// Message for the person who drew the polygon.
    pub fn user_message(&self) -> String {
        match self {
            Self::Discovery(e) => format!("Could not read schema: {}", e),
            Self::InvalidPolygon(e) => format!("The drawn polygon is not usable: {}", e),
            Self::Superseded => "A newer polygon replaced this request.".to_string(),
        }
    }
}

/// Everything one successful cycle produced.
#[derive(Debug, Serialize)]
pub struct CycleReport {
    pub features: Vec<Feature>,
    pub failures: Vec<TableFailure>,
    pub gaps: Vec<BindingGap>,
    pub row_counts: Vec<(String, usize)>,
    /// Rows whose geometry could not be decoded or reprojected.
    pub skipped_geometries: usize,
}

impl CycleReport {
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Summary line distinguishing "nothing here" from partial failure.
    pub fn message(&self) -> String {
        let mut message = if self.features.is_empty() {
            EMPTY_RESULT_MESSAGE.to_string()
        } else {
            let tables = self.row_counts.iter().filter(|(_, n)| *n > 0).count();
            format!(
                "Found {} in {}.",
                counted(self.features.len(), "feature", "features"),
                counted(tables, "table", "tables")
            )
        };
        if !self.failures.is_empty() {
            let names: Vec<&str> = self.failures.iter().map(|f| f.table.as_str()).collect();
            message.push_str(&format!(" Skipped tables: {}.", names.join(", ")));
        }
        message
    }
}

/// Settings that decide what discovery sees; hashed into the cache key.
#[derive(Serialize)]
struct FingerprintInput<'a> {
    dialect: String,
    discovery: &'a DiscoverySettings,
    query: &'a QuerySettings,
}

fn counted(n: usize, one: &str, many: &str) -> String {
    format!("{} {}", n, if n == 1 { one } else { many })
}

/// Configures a [`Session`].
pub struct SessionBuilder {
    catalog: Arc<dyn Catalog>,
    executor: Arc<dyn QueryExecutor>,
    dialect: Dialect,
    discovery: DiscoverySettings,
    query: QuerySettings,
    registry: Arc<CrsRegistry>,
    matcher: Option<Arc<dyn LayerMatcher>>,
}

impl SessionBuilder {
    pub fn discovery(mut self, discovery: DiscoverySettings) -> Self {
        self.discovery = discovery;
        self
    }

    pub fn query(mut self, query: QuerySettings) -> Self {
        self.query = query;
        self
    }

    pub fn registry(mut self, registry: Arc<CrsRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn matcher(mut self, matcher: Arc<dyn LayerMatcher>) -> Self {
        self.matcher = Some(matcher);
        self
    }

    pub fn build(self) -> Session {
        let matcher: Arc<dyn LayerMatcher> = match self.matcher {
            Some(matcher) => matcher,
            None => Arc::new(PositionalMatcher::new(self.discovery.matcher.clone())),
        };
        let canonical = self.query.canonical_srid;

        let aggregator = Aggregator::new(
            self.catalog,
            self.executor,
            matcher,
            self.registry.clone(),
            self.query.reprojection,
            AggregatorOptions::from(&self.query),
        );
        let assembler = FeatureAssembler::new(
            Reprojector::new(self.registry.clone(), canonical),
            self.discovery.geometry_column.clone(),
        );
        let fingerprint = compute_hash(&FingerprintInput {
            dialect: self.dialect.to_string(),
            discovery: &self.discovery,
            query: &self.query,
        })
        .map_err(|e| {
            tracing::warn!(error = %e, "could not fingerprint discovery settings");
            e.to_string()
        });
        let (state, _) = watch::channel(PipelineState::Idle);

        Session {
            aggregator,
            assembler,
            cache: DiscoveryCache::new(self.discovery.cache_ttl()),
            check_lon_lat: self.registry.is_geographic(canonical),
            dialect: self.dialect,
            discovery: self.discovery,
            query: self.query,
            fingerprint,
            state,
            current: Mutex::new(CycleToken::new()),
        }
    }
}

/// Runs polygon submissions against one database schema.
pub struct Session {
    aggregator: Aggregator,
    assembler: FeatureAssembler,
    cache: DiscoveryCache,
    check_lon_lat: bool,
    dialect: Dialect,
    discovery: DiscoverySettings,
    query: QuerySettings,
    /// Cache key, or why it could not be computed.
    fingerprint: Result<String, String>,
    state: watch::Sender<PipelineState>,
    current: Mutex<CycleToken>,
}

impl Session {
    pub fn builder(
        catalog: Arc<dyn Catalog>,
        executor: Arc<dyn QueryExecutor>,
        dialect: Dialect,
    ) -> SessionBuilder {
        SessionBuilder {
            catalog,
            executor,
            dialect,
            discovery: DiscoverySettings::default(),
            query: QuerySettings::default(),
            registry: Arc::new(CrsRegistry::default()),
            matcher: None,
        }
    }

    /// Session over a [`SqlCatalog`] configured from `settings`.
    pub fn from_settings(
        executor: Arc<dyn QueryExecutor>,
        dialect: Dialect,
        settings: &Settings,
    ) -> Self {
        let catalog = SqlCatalog::new(executor.clone(), dialect, &settings.discovery);
        Self::builder(Arc::new(catalog), executor, dialect)
            .discovery(settings.discovery.clone())
            .query(settings.query.clone())
            .build()
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn fingerprint(&self) -> Result<&str, DiscoveryError> {
        self.fingerprint
            .as_deref()
            .map_err(|e| DiscoveryError::Fingerprint(e.clone()))
    }

    /// Subscribe to state changes.
    pub fn state(&self) -> watch::Receiver<PipelineState> {
        self.state.subscribe()
    }

    /// The cached discovery, running it first if needed.
    pub async fn discover(&self) -> Result<Arc<Discovery>, DiscoveryError> {
        let fingerprint = self.fingerprint()?;
        self.cache
            .get_or_discover(fingerprint, || self.aggregator.discover(fingerprint))
            .await
    }

    /// Forget the cached discovery; the next call rediscovers.
    pub async fn refresh(&self) {
        self.cache.invalidate().await;
    }

    /// Parse a polygon from GeoJSON text and run a cycle.
    pub async fn submit_text(&self, text: &str) -> Result<CycleReport, PipelineError> {
        let token = self.begin_cycle();
        let scope = QueryScope::parse(text, self.query.canonical_srid, self.check_lon_lat);
        self.run(scope, &token, &NoProgress).await
    }

    /// Run a cycle for a GeoJSON polygon, bare ring, or Feature.
    pub async fn submit(&self, polygon: &Value) -> Result<CycleReport, PipelineError> {
        self.submit_with_progress(polygon, &NoProgress).await
    }

    pub async fn submit_with_progress(
        &self,
        polygon: &Value,
        progress: &dyn ProgressSink,
    ) -> Result<CycleReport, PipelineError> {
        let token = self.begin_cycle();
        let scope = QueryScope::from_value(polygon, self.query.canonical_srid, self.check_lon_lat);
        self.run(scope, &token, progress).await
    }

    /// Cancel the running cycle, if any, and start tracking a new one.
    fn begin_cycle(&self) -> CycleToken {
        let token = CycleToken::new();
        let previous = std::mem::replace(
            &mut *self.current.lock().unwrap_or_else(PoisonError::into_inner),
            token.clone(),
        );
        if !previous.is_cancelled() {
            previous.cancel();
        }
        token
    }

    fn publish(&self, token: &CycleToken, state: PipelineState) {
        if !token.is_cancelled() {
            self.state.send_replace(state);
        }
    }

    async fn run(
        &self,
        scope: Result<QueryScope, GeometryError>,
        token: &CycleToken,
        progress: &dyn ProgressSink,
    ) -> Result<CycleReport, PipelineError> {
        self.publish(token, PipelineState::PolygonReceived);
        let scope = scope.inspect_err(|e| {
            tracing::warn!(error = %e, "rejected polygon");
            self.publish(token, PipelineState::Idle);
        })?;

        self.publish(token, PipelineState::Discovering);
        let discovery = self.discover().await.inspect_err(|e| {
            tracing::error!(error = %e, "discovery failed");
            self.publish(token, PipelineState::Idle);
        })?;

        self.publish(token, PipelineState::Matching);
        if token.is_cancelled() {
            return Err(PipelineError::Superseded);
        }

        let builder = SpatialQueryBuilder::new(
            self.dialect,
            self.discovery.geometry_encoding,
            self.query.reprojection,
            self.query.canonical_srid,
            &discovery.tables,
        );
        let sink = |p: Progress| {
            self.publish(
                token,
                PipelineState::QueryingTables {
                    completed: p.completed,
                    total: p.total,
                },
            );
            progress.report(p);
        };
        let result = self
            .aggregator
            .query_tables(&discovery, &builder, &scope, &sink, token)
            .await?;

        self.publish(token, PipelineState::Assembling);
        let report = self.assemble(&discovery, result);
        if token.is_cancelled() {
            return Err(PipelineError::Superseded);
        }

        tracing::info!(
            features = report.features.len(),
            failed_tables = report.failures.len(),
            skipped_geometries = report.skipped_geometries,
            "cycle complete"
        );
        self.publish(token, PipelineState::Ready);
        Ok(report)
    }

    fn assemble(&self, discovery: &Discovery, result: AggregateResult) -> CycleReport {
        let mut features = Vec::with_capacity(result.row_count());
        let mut skipped_geometries = 0;

        for table in result.tables {
            let style = discovery
                .bindings
                .iter()
                .find(|b| b.table.name == table.table)
                .map(|b| b.layer.style)
                .unwrap_or_default();
            let columns = discovery.columns_of(&table.table);
            let (assembled, skipped) =
                self.assembler.assemble_all(table.rows, columns, &style);
            features.extend(assembled);
            skipped_geometries += skipped.len();
        }

        CycleReport {
            features,
            failures: result.failures,
            gaps: discovery.gaps.clone(),
            row_counts: result.row_counts,
            skipped_geometries,
        }
    }
}
