//! Async client for communicating with the database worker process.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{de::DeserializeOwned, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::{oneshot, Mutex};

use super::error::{WorkerError, WorkerResult};
use super::protocol::{
    codes, methods, ConnectionParams, ErrorInfo, ExecuteQueryParams, ExecuteQueryResponse,
    RequestEnvelope, ResponseEnvelope,
};
use crate::config::Settings;

/// Default timeout for requests (30 seconds).
const DEFAULT_TIMEOUT_SECS: u64 = 30;

type PendingMap = Arc<Mutex<HashMap<String, oneshot::Sender<ResponseEnvelope>>>>;

/// Removes a request's entry from the pending map when the request ends,
/// including when its future is dropped before the worker answers.
struct PendingEntry {
    pending: PendingMap,
    id: String,
}

impl Drop for PendingEntry {
    fn drop(&mut self) {
        if let Ok(mut pending) = self.pending.try_lock() {
            pending.remove(&self.id);
            return;
        }
        // The reader task holds the lock; finish the removal on the runtime.
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let pending = self.pending.clone();
            let id = std::mem::take(&mut self.id);
            handle.spawn(async move {
                pending.lock().await.remove(&id);
            });
        }
    }
}

/// Async client for the database worker.
///
/// The client spawns the worker as a child process and communicates via
/// NDJSON (newline-delimited JSON) over stdin/stdout. Each request has a
/// unique ID for correlation with responses, so table queries issued
/// concurrently share one worker.
///
/// # Example
///
/// ```ignore
/// use geosift::worker::WorkerClient;
///
/// let client = WorkerClient::spawn("./geosift-worker").await?;
/// let response = client.execute_query(&connection, "SELECT 1", vec![]).await?;
/// ```
pub struct WorkerClient {
    /// Writer for sending requests to worker stdin.
    stdin: Arc<Mutex<BufWriter<ChildStdin>>>,

    /// Map of pending request IDs to response channels.
    pending: PendingMap,

    /// Handle to the worker child process.
    _child: Child,

    /// Handle to the background reader task.
    reader_task: tokio::task::JoinHandle<()>,

    /// Request timeout duration.
    timeout: Duration,
}

impl WorkerClient {
    /// Spawn a new worker process with the default timeout.
    pub async fn spawn<P: AsRef<Path>>(worker_path: P) -> WorkerResult<Self> {
        Self::spawn_with_timeout(worker_path, Duration::from_secs(DEFAULT_TIMEOUT_SECS)).await
    }

    /// Spawn a worker using settings configuration.
    pub async fn spawn_with_settings(settings: &Settings) -> WorkerResult<Self> {
        let worker_path = Self::resolve_worker_path(settings)?;
        Self::spawn_with_timeout(
            &worker_path,
            Duration::from_secs(settings.worker.timeout_secs),
        )
        .await
    }

    fn resolve_worker_path(settings: &Settings) -> WorkerResult<PathBuf> {
        settings.worker_path().ok_or_else(|| {
            WorkerError::SpawnFailed(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "Worker binary not found. Set worker.path in config or put geosift-worker on PATH",
            ))
        })
    }

    /// Spawn a new worker process with a custom timeout.
    pub async fn spawn_with_timeout<P: AsRef<Path>>(
        worker_path: P,
        timeout: Duration,
    ) -> WorkerResult<Self> {
        let mut child = Command::new(worker_path.as_ref())
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(WorkerError::SpawnFailed)?;

        let (stdin, stdout) = match (child.stdin.take(), child.stdout.take()) {
            (Some(stdin), Some(stdout)) => (stdin, stdout),
            _ => {
                return Err(WorkerError::SpawnFailed(std::io::Error::new(
                    std::io::ErrorKind::BrokenPipe,
                    "worker stdio was not captured",
                )))
            }
        };

        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let reader_task = Self::spawn_reader_task(stdout, pending.clone());

        tracing::debug!(path = %worker_path.as_ref().display(), "spawned database worker");

        Ok(Self {
            stdin: Arc::new(Mutex::new(BufWriter::new(stdin))),
            pending,
            _child: child,
            reader_task,
            timeout,
        })
    }

    /// Spawn the background task that reads responses from the worker.
    fn spawn_reader_task(stdout: ChildStdout, pending: PendingMap) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut reader = BufReader::new(stdout);
            let mut line = String::new();

            loop {
                line.clear();
                match reader.read_line(&mut line).await {
                    Ok(0) => break,
                    Ok(_) => match serde_json::from_str::<ResponseEnvelope>(&line) {
                        Ok(resp) => {
                            if let Some(tx) = pending.lock().await.remove(&resp.id) {
                                let _ = tx.send(resp);
                            }
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "worker: failed to parse response");
                        }
                    },
                    Err(e) => {
                        tracing::error!(error = %e, "worker: read error");
                        break;
                    }
                }
            }

            // Worker exited: fail every request still waiting.
            let mut pending = pending.lock().await;
            for (id, tx) in pending.drain() {
                let _ = tx.send(ResponseEnvelope {
                    id,
                    success: false,
                    result: None,
                    error: Some(ErrorInfo {
                        code: codes::WORKER_EXITED.to_string(),
                        message: "Worker process exited unexpectedly".to_string(),
                    }),
                });
            }
        })
    }

    /// Send a request to the worker and wait for a response.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails, the request
    /// times out, the worker answers with an error, or the result does not
    /// deserialize into `R`.
    pub async fn request<P, R>(&self, method: &str, params: P) -> WorkerResult<R>
    where
        P: Serialize,
        R: DeserializeOwned,
    {
        let id = uuid::Uuid::new_v4().to_string();

        let request = RequestEnvelope {
            id: id.clone(),
            method: method.to_string(),
            params: serde_json::to_value(params).map_err(WorkerError::SerializeFailed)?,
        };

        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id.clone(), tx);
        let _entry = PendingEntry {
            pending: self.pending.clone(),
            id,
        };

        {
            let mut stdin = self.stdin.lock().await;
            let line =
                serde_json::to_string(&request).map_err(WorkerError::SerializeFailed)? + "\n";
            stdin
                .write_all(line.as_bytes())
                .await
                .map_err(WorkerError::WriteFailed)?;
            stdin.flush().await.map_err(WorkerError::WriteFailed)?;
        }

        let response = match tokio::time::timeout(self.timeout, rx).await {
            Ok(resp) => resp?,
            Err(_) => return Err(WorkerError::Timeout(self.timeout.as_secs())),
        };

        if response.success {
            let result = response.result.unwrap_or(serde_json::Value::Null);
            serde_json::from_value(result).map_err(WorkerError::DeserializeFailed)
        } else {
            let error = response.error.unwrap_or_else(|| ErrorInfo {
                code: "UNKNOWN".to_string(),
                message: "Unknown error".to_string(),
            });
            Err(Self::classify_error(&error.code, &error.message))
        }
    }

    /// Classify a worker error into a more specific error type.
    fn classify_error(code: &str, message: &str) -> WorkerError {
        match code {
            codes::CONNECTION_FAILED => WorkerError::ConnectionFailed(message.to_string()),
            codes::QUERY_FAILED => WorkerError::QueryFailed(message.to_string()),
            codes::INVALID_REQUEST => WorkerError::InvalidRequest(message.to_string()),
            codes::WORKER_EXITED => WorkerError::WorkerExited,
            _ => WorkerError::remote(code, message),
        }
    }

    /// Execute a SQL statement with positional arguments.
    pub async fn execute_query(
        &self,
        connection: &ConnectionParams,
        sql: &str,
        args: Vec<serde_json::Value>,
    ) -> WorkerResult<ExecuteQueryResponse> {
        self.request(
            methods::EXECUTE_QUERY,
            ExecuteQueryParams {
                connection: connection.clone(),
                sql: sql.to_string(),
                args: (!args.is_empty()).then_some(args),
            },
        )
        .await
    }

    /// Check if the worker is still running.
    pub fn is_alive(&self) -> bool {
        !self.reader_task.is_finished()
    }

    /// Number of requests still waiting for a response.
    pub async fn pending_requests(&self) -> usize {
        self.pending.lock().await.len()
    }

    /// Get the current request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}
