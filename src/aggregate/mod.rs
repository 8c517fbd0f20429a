//! Multi-table aggregation.
//!
//! The [`Aggregator`] runs the two halves of a cycle that touch the
//! database:
//!
//! 1. **Discovery**: list geometry tables and layer metadata, bind tables to
//!    layers, and load the real column list of every bound table.
//! 2. **Fan-out**: build one intersection query per binding and run them
//!    with bounded concurrency and a per-table timeout.
//!
//! Discovery failures are fatal. A failing table is logged, reported in
//! [`AggregateResult::failures`], and contributes no rows; the other tables
//! are unaffected.

mod progress;

pub use progress::{CycleToken, NoProgress, Progress, ProgressSink};

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::stream::{self, StreamExt, TryStreamExt};
use serde::{Serialize, Serializer};
use thiserror::Error;

use crate::cache::Discovery;
use crate::catalog::{Catalog, DiscoveryError};
use crate::config::QuerySettings;
use crate::executor::{QueryExecutor, QueryRows};
use crate::feature::{RawFeatureRow, GEOMETRY_ALIAS};
use crate::geometry::QueryScope;
use crate::matcher::{bind, LayerMatcher, TableBinding};
use crate::reproject::{CrsRegistry, Srid};
use crate::sql::{QueryBuildError, ReprojectionSite, SpatialQueryBuilder};
use crate::worker::WorkerError;

/// Why one table contributed no rows.
#[derive(Debug, Error)]
pub enum TableQueryError {
    #[error("could not build query: {0}")]
    Build(#[from] QueryBuildError),

    #[error("query failed: {0}")]
    Remote(#[from] WorkerError),

    #[error("query timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("malformed result: {0}")]
    Malformed(String),
}

/// A table whose query failed.
#[derive(Debug, Serialize)]
pub struct TableFailure {
    pub table: String,
    #[serde(serialize_with = "serialize_display")]
    pub error: TableQueryError,
}

fn serialize_display<T: std::fmt::Display, S: Serializer>(
    value: &T,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}

/// Rows returned by one table, in result order.
#[derive(Debug, Clone)]
pub struct TableRows {
    pub table: String,
    pub rows: Vec<RawFeatureRow>,
}

/// Outcome of one fan-out.
#[derive(Debug, Default)]
pub struct AggregateResult {
    /// Non-empty row sets, in completion order.
    pub tables: Vec<TableRows>,
    pub failures: Vec<TableFailure>,
    /// Rows per successfully queried table, zero included.
    pub row_counts: Vec<(String, usize)>,
}

impl AggregateResult {
    /// Every row, table by table.
    pub fn rows(&self) -> impl Iterator<Item = &RawFeatureRow> {
        self.tables.iter().flat_map(|t| t.rows.iter())
    }

    pub fn row_count(&self) -> usize {
        self.tables.iter().map(|t| t.rows.len()).sum()
    }
}

/// The cycle was cancelled by a newer submission.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("superseded by a newer submission")]
pub struct Superseded;

/// Fan-out limits.
#[derive(Debug, Clone, Copy)]
pub struct AggregatorOptions {
    pub max_concurrent: usize,
    pub timeout: Duration,
}

impl Default for AggregatorOptions {
    fn default() -> Self {
        Self::from(&QuerySettings::default())
    }
}

impl From<&QuerySettings> for AggregatorOptions {
    fn from(query: &QuerySettings) -> Self {
        Self {
            max_concurrent: query.max_concurrent_queries.max(1),
            timeout: query.query_timeout(),
        }
    }
}

/// Discovers bindings and queries every bound table.
pub struct Aggregator {
    catalog: Arc<dyn Catalog>,
    executor: Arc<dyn QueryExecutor>,
    matcher: Arc<dyn LayerMatcher>,
    registry: Arc<CrsRegistry>,
    site: ReprojectionSite,
    options: AggregatorOptions,
}

impl Aggregator {
    pub fn new(
        catalog: Arc<dyn Catalog>,
        executor: Arc<dyn QueryExecutor>,
        matcher: Arc<dyn LayerMatcher>,
        registry: Arc<CrsRegistry>,
        site: ReprojectionSite,
        options: AggregatorOptions,
    ) -> Self {
        Self {
            catalog,
            executor,
            matcher,
            registry,
            site,
            options,
        }
    }

    pub fn options(&self) -> AggregatorOptions {
        self.options
    }

    /// Whether tables in `srid` can be queried.
    ///
    /// With client-side reprojection the registry must know the SRID. The
    /// database resolves SRIDs itself otherwise.
    pub fn resolvable(&self, srid: Srid) -> bool {
        match self.site {
            ReprojectionSite::Client => self.registry.contains(srid),
            ReprojectionSite::Database => true,
        }
    }

    /// Introspect the schema, bind tables to layers, and load column lists.
    pub async fn discover(&self, fingerprint: &str) -> Result<Discovery, DiscoveryError> {
        let started = Instant::now();
        let (tables, layers) =
            futures::try_join!(self.catalog.geometry_tables(), self.catalog.layers())?;

        let resolvable = |srid: Srid| self.resolvable(srid);
        let (bindings, gaps) = bind(self.matcher.as_ref(), &tables, &layers, &resolvable);

        let columns: HashMap<String, Vec<String>> = stream::iter(&bindings)
            .map(|binding| async move {
                let columns = self.catalog.table_columns(&binding.table).await?;
                Ok::<_, DiscoveryError>((binding.table.name.clone(), columns))
            })
            .buffer_unordered(self.options.max_concurrent)
            .try_collect()
            .await?;

        tracing::info!(
            tables = tables.len(),
            layers = layers.len(),
            bound = bindings.len(),
            gaps = gaps.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "discovery complete"
        );

        Ok(Discovery {
            tables,
            layers,
            bindings,
            gaps,
            columns,
            fingerprint: fingerprint.to_string(),
            discovered_at: Instant::now(),
        })
    }

    /// Query every binding of `discovery` against `scope`.
    ///
    /// Tables run at most `max_concurrent` at a time. Progress is reported
    /// once before the first table and after every completed table. When
    /// `token` is cancelled no further tables start and in-flight results
    /// are dropped.
    pub async fn query_tables(
        &self,
        discovery: &Discovery,
        builder: &SpatialQueryBuilder,
        scope: &QueryScope,
        progress: &dyn ProgressSink,
        token: &CycleToken,
    ) -> Result<AggregateResult, Superseded> {
        let total = discovery.bindings.len();
        progress.report(Progress::new(0, total));

        let mut pending = stream::iter(&discovery.bindings)
            .map(|binding| async move {
                if token.is_cancelled() {
                    return None;
                }
                Some((binding, self.query_table(binding, builder, scope).await))
            })
            .buffer_unordered(self.options.max_concurrent);

        let mut result = AggregateResult::default();
        let mut completed = 0;

        loop {
            let next = tokio::select! {
                biased;
                _ = token.cancelled() => return Err(Superseded),
                next = pending.next() => next,
            };
            let Some(outcome) = next else { break };
            let Some((binding, outcome)) = outcome else {
                return Err(Superseded);
            };

            let table = binding.table.name.clone();
            match outcome {
                Ok(rows) => {
                    result.row_counts.push((table.clone(), rows.len()));
                    if !rows.is_empty() {
                        result.tables.push(TableRows { table, rows });
                    }
                }
                Err(error) => {
                    tracing::warn!(table = %table, error = %error, "skipping table");
                    result.failures.push(TableFailure { table, error });
                }
            }

            completed += 1;
            progress.report(Progress::new(completed, total));
        }

        if token.is_cancelled() {
            return Err(Superseded);
        }

        tracing::info!(
            tables = total,
            failed = result.failures.len(),
            rows = result.row_count(),
            "queried tables"
        );
        Ok(result)
    }

    async fn query_table(
        &self,
        binding: &TableBinding,
        builder: &SpatialQueryBuilder,
        scope: &QueryScope,
    ) -> Result<Vec<RawFeatureRow>, TableQueryError> {
        let query = builder.build(&binding.table, binding.srid, scope)?;
        let started = Instant::now();

        let rows = tokio::time::timeout(self.options.timeout, self.executor.execute(&query))
            .await
            .map_err(|_| TableQueryError::Timeout(self.options.timeout))??;

        tracing::debug!(
            table = %binding.table.name,
            rows = rows.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "table query finished"
        );

        stamp_rows(&binding.table.name, builder.output_srid(binding.srid), rows)
    }
}

/// Attach the table name and geometry SRID to every result row.
fn stamp_rows(table: &str, srid: Srid, rows: QueryRows) -> Result<Vec<RawFeatureRow>, TableQueryError> {
    if rows.column_index(GEOMETRY_ALIAS).is_none() {
        return Err(TableQueryError::Malformed(format!(
            "result has no {} column",
            GEOMETRY_ALIAS
        )));
    }
    let QueryRows { columns, rows } = rows;
    Ok(rows
        .into_iter()
        .map(|values| RawFeatureRow::from_result(table, srid, &columns, values))
        .collect())
}
