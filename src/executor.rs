//! Query execution boundary.
//!
//! The pipeline never talks to a database directly. It hands a
//! [`BoundQuery`] to a [`QueryExecutor`] and gets back named columns and
//! positional rows. [`WorkerExecutor`] is the production implementation on
//! top of the worker process; tests substitute in-memory executors.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::config::RetrySettings;
use crate::sql::BoundQuery;
use crate::worker::protocol::{ConnectionParams, ExecuteQueryResponse};
use crate::worker::{WorkerClient, WorkerResult};

static NULL: Value = Value::Null;

/// Rows returned by a query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryRows {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl QueryRows {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self { columns, rows }
    }

    /// Index of a column by name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Values of one column, in row order.
    pub fn column_values<'a>(&'a self, name: &str) -> Option<impl Iterator<Item = &'a Value> + 'a> {
        let index = self.column_index(name)?;
        Some(self.rows.iter().map(move |row| row.get(index).unwrap_or(&NULL)))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl From<ExecuteQueryResponse> for QueryRows {
    fn from(response: ExecuteQueryResponse) -> Self {
        Self {
            columns: response.columns.into_iter().map(|c| c.name).collect(),
            rows: response.rows,
        }
    }
}

/// Runs bound queries.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    async fn execute(&self, query: &BoundQuery) -> WorkerResult<QueryRows>;
}

#[async_trait]
impl<E: QueryExecutor + ?Sized> QueryExecutor for Arc<E> {
    async fn execute(&self, query: &BoundQuery) -> WorkerResult<QueryRows> {
        (**self).execute(query).await
    }
}

/// [`QueryExecutor`] backed by the database worker.
///
/// Retriable failures (timeouts, lost worker, refused connections) are
/// retried with a fixed backoff up to `max_attempts` total attempts.
///
/// # Example
///
/// ```ignore
/// use geosift::executor::WorkerExecutor;
/// use geosift::worker::WorkerClient;
///
/// let client = WorkerClient::spawn("./geosift-worker").await?;
/// let executor = WorkerExecutor::new(
///     Arc::new(client),
///     "postgres",
///     "postgres://gis@localhost/gis",
///     RetrySettings::default(),
/// );
/// ```
pub struct WorkerExecutor {
    client: Arc<WorkerClient>,
    connection: ConnectionParams,
    retry: RetrySettings,
}

impl WorkerExecutor {
    pub fn new(
        client: Arc<WorkerClient>,
        driver: impl Into<String>,
        connection_string: impl Into<String>,
        retry: RetrySettings,
    ) -> Self {
        Self {
            client,
            connection: ConnectionParams {
                driver: driver.into(),
                connection_string: connection_string.into(),
            },
            retry,
        }
    }
}

#[async_trait]
impl QueryExecutor for WorkerExecutor {
    async fn execute(&self, query: &BoundQuery) -> WorkerResult<QueryRows> {
        with_retry(&self.retry, || async move {
            self.client
                .execute_query(&self.connection, &query.sql, query.args.clone())
                .await
                .map(QueryRows::from)
        })
        .await
    }
}

/// Run `op` until it succeeds, fails with a non-retriable error, or the
/// attempts run out.
pub async fn with_retry<T, F, Fut>(retry: &RetrySettings, mut op: F) -> WorkerResult<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = WorkerResult<T>>,
{
    let attempts = retry.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retriable() && attempt < attempts => {
                tracing::warn!(
                    attempt,
                    max_attempts = attempts,
                    error = %e,
                    "retrying database request"
                );
                tokio::time::sleep(retry.backoff()).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
