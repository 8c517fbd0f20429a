//! Protocol types for worker communication.
//!
//! The worker speaks NDJSON: one request envelope per line on stdin, one
//! response envelope per line on stdout, correlated by `id`.

use serde::{Deserialize, Serialize};

// ============================================================================
// Request/Response Envelope
// ============================================================================

/// Request envelope sent to the worker.
#[derive(Debug, Clone, Serialize)]
pub struct RequestEnvelope {
    /// Unique request ID for correlation.
    pub id: String,
    /// Method name (e.g., "query.execute").
    pub method: String,
    /// Method-specific parameters.
    pub params: serde_json::Value,
}

/// Response envelope received from the worker.
#[derive(Debug, Clone, Deserialize)]
pub struct ResponseEnvelope {
    /// Request ID this response corresponds to.
    pub id: String,
    /// Whether the request succeeded.
    pub success: bool,
    /// Result data (present if success = true).
    #[serde(default)]
    pub result: Option<serde_json::Value>,
    /// Error information (present if success = false).
    #[serde(default)]
    pub error: Option<ErrorInfo>,
}

/// Error information in a failed response.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorInfo {
    /// Error code.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

// ============================================================================
// Connection Parameters (included in all requests)
// ============================================================================

/// Database connection parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionParams {
    /// Database driver name (e.g., "postgres", "duckdb").
    pub driver: String,
    /// Driver-specific connection string.
    pub connection_string: String,
}

// ============================================================================
// Query Execution
// ============================================================================

/// Parameters for `query.execute`.
#[derive(Debug, Clone, Serialize)]
pub struct ExecuteQueryParams {
    #[serde(flatten)]
    pub connection: ConnectionParams,
    /// SQL statement with positional placeholders.
    pub sql: String,
    /// Values bound to the placeholders, in order.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<serde_json::Value>>,
}

/// Column information in query results.
#[derive(Debug, Clone, Deserialize)]
pub struct QueryResultColumn {
    /// Column name or alias.
    pub name: String,
    /// Database-specific type.
    #[serde(default)]
    pub data_type: String,
}

/// Response from `query.execute`.
#[derive(Debug, Clone, Deserialize)]
pub struct ExecuteQueryResponse {
    /// Result column descriptions.
    pub columns: Vec<QueryResultColumn>,
    /// Result data rows.
    pub rows: Vec<Vec<serde_json::Value>>,
    /// Number of rows returned.
    #[serde(default)]
    pub row_count: i32,
}

// ============================================================================
// Method Names
// ============================================================================

/// Worker method names.
pub mod methods {
    pub const EXECUTE_QUERY: &str = "query.execute";
}

/// Worker error codes with a dedicated [`WorkerError`](crate::worker::WorkerError) variant.
pub mod codes {
    pub const CONNECTION_FAILED: &str = "CONNECTION_FAILED";
    pub const QUERY_FAILED: &str = "QUERY_FAILED";
    pub const INVALID_REQUEST: &str = "INVALID_REQUEST";
    pub const WORKER_EXITED: &str = "WORKER_EXITED";
}
