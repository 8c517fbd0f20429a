//! TOML-based configuration for geosift.
//!
//! Supports a config file (geosift.toml) with environment variable expansion.
//!
//! Example configuration:
//! ```toml
//! [connections.default]
//! driver = "postgres"
//! connection_string = "${GIS_DATABASE_URL}"
//! default_schema = "public"
//!
//! [worker]
//! path = "./geosift-worker"
//! timeout_secs = 30
//!
//! [worker.retry]
//! max_attempts = 3
//! backoff_ms = 2000
//!
//! [discovery]
//! geometry_column = "SHAPE"
//! geometry_encoding = "geojson_text"
//! metadata_table = "metadata"
//! cache_ttl_seconds = 900
//!
//! [discovery.matcher]
//! min_score = 1
//! exclusive_layers = false
//!
//! [query]
//! canonical_srid = 4326
//! reprojection = "database"
//! max_concurrent_queries = 4
//! query_timeout_secs = 30
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::connection::Driver;
use crate::matcher::MatcherConfig;
use crate::sql::{GeometryEncoding, ReprojectionSite};

/// Error type for settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Connection not found: {0}")]
    ConnectionNotFound(String),

    #[error("Unsupported driver: {0}")]
    UnsupportedDriver(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Named database connections.
    pub connections: HashMap<String, ConnectionSettings>,

    /// Database worker configuration.
    pub worker: WorkerSettings,

    /// Table discovery and layer binding.
    pub discovery: DiscoverySettings,

    /// Per-polygon query execution.
    pub query: QuerySettings,
}

/// Connection configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConnectionSettings {
    /// Database driver (postgres, duckdb).
    pub driver: String,

    /// Connection string (supports ${ENV_VAR} expansion).
    pub connection_string: String,

    /// Default schema for this connection.
    #[serde(default)]
    pub default_schema: Option<String>,
}

impl ConnectionSettings {
    /// Get the driver type.
    pub fn driver_type(&self) -> Result<Driver, SettingsError> {
        Driver::from_str(&self.driver)
            .map_err(|_| SettingsError::UnsupportedDriver(self.driver.clone()))
    }

    /// Get the connection string with environment variables expanded.
    pub fn resolved_connection_string(&self) -> Result<String, SettingsError> {
        expand_env_vars(&self.connection_string)
    }
}

/// Worker configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WorkerSettings {
    /// Path to the database worker binary.
    pub path: Option<String>,

    /// Per-request timeout in seconds.
    pub timeout_secs: u64,

    /// Retry policy for transient transport failures.
    pub retry: RetrySettings,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            path: None,
            timeout_secs: 30,
            retry: RetrySettings::default(),
        }
    }
}

/// Retry policy applied to retriable worker errors.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetrySettings {
    /// Total attempts including the first one.
    pub max_attempts: u32,

    /// Fixed delay between attempts, in milliseconds.
    pub backoff_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_ms: 2000,
        }
    }
}

impl RetrySettings {
    /// Delay between attempts.
    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }
}

/// Discovery configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DiscoverySettings {
    /// Schema scanned for geometry tables.
    pub schema: String,

    /// Name of the column that marks a table as a geometry source.
    pub geometry_column: String,

    /// How the geometry column stores its values.
    pub geometry_encoding: GeometryEncoding,

    /// Table holding one metadata record per layer.
    pub metadata_table: String,

    /// How long discovery results stay valid. Zero keeps them until
    /// explicitly invalidated.
    pub cache_ttl_seconds: u64,

    /// Table-to-layer matching.
    pub matcher: MatcherConfig,
}

impl Default for DiscoverySettings {
    fn default() -> Self {
        Self {
            schema: "public".to_string(),
            geometry_column: "SHAPE".to_string(),
            geometry_encoding: GeometryEncoding::default(),
            metadata_table: "metadata".to_string(),
            cache_ttl_seconds: 0,
            matcher: MatcherConfig::default(),
        }
    }
}

impl DiscoverySettings {
    /// Cache lifetime, if one is configured.
    pub fn cache_ttl(&self) -> Option<Duration> {
        (self.cache_ttl_seconds > 0).then(|| Duration::from_secs(self.cache_ttl_seconds))
    }
}

/// Query execution configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct QuerySettings {
    /// SRID every output geometry is expressed in.
    pub canonical_srid: u32,

    /// Where source geometries are reprojected.
    pub reprojection: ReprojectionSite,

    /// Upper bound on concurrently running table queries.
    pub max_concurrent_queries: usize,

    /// Timeout for a single table query, in seconds.
    pub query_timeout_secs: u64,
}

impl Default for QuerySettings {
    fn default() -> Self {
        Self {
            canonical_srid: 4326,
            reprojection: ReprojectionSite::default(),
            max_concurrent_queries: 4,
            query_timeout_secs: 30,
        }
    }
}

impl QuerySettings {
    /// Timeout for a single table query.
    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let settings: Settings = toml::from_str(&content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from the default config file locations.
    ///
    /// Searches in order:
    /// 1. Environment variable `GEOSIFT_CONFIG`
    /// 2. `./geosift.toml`
    /// 3. `~/.config/geosift/config.toml`
    pub fn load() -> Result<Self, SettingsError> {
        if let Ok(path) = env::var("GEOSIFT_CONFIG") {
            return Self::from_file(&path);
        }

        let local_config = PathBuf::from("geosift.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("geosift").join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        Ok(Settings::default())
    }

    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.query.max_concurrent_queries == 0 {
            return Err(SettingsError::InvalidConfig(
                "query.max_concurrent_queries must be at least 1".to_string(),
            ));
        }
        if self.query.query_timeout_secs == 0 {
            return Err(SettingsError::InvalidConfig(
                "query.query_timeout_secs must be at least 1".to_string(),
            ));
        }
        if self.discovery.geometry_column.trim().is_empty() {
            return Err(SettingsError::InvalidConfig(
                "discovery.geometry_column must not be empty".to_string(),
            ));
        }
        if self.worker.retry.max_attempts == 0 {
            return Err(SettingsError::InvalidConfig(
                "worker.retry.max_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Get a connection by name.
    pub fn get_connection(&self, name: &str) -> Result<&ConnectionSettings, SettingsError> {
        self.connections
            .get(name)
            .ok_or_else(|| SettingsError::ConnectionNotFound(name.to_string()))
    }

    /// Get the default connection ("default" if it exists, else any one).
    pub fn default_connection(&self) -> Option<(&str, &ConnectionSettings)> {
        if let Some(conn) = self.connections.get("default") {
            return Some(("default", conn));
        }
        self.connections.iter().next().map(|(k, v)| (k.as_str(), v))
    }

    /// Schema to scan, preferring the connection's own default.
    pub fn schema_for(&self, connection: &ConnectionSettings) -> String {
        connection
            .default_schema
            .clone()
            .unwrap_or_else(|| self.discovery.schema.clone())
    }

    /// Get the worker binary path.
    ///
    /// Returns the configured path, or searches the working directory and PATH.
    pub fn worker_path(&self) -> Option<PathBuf> {
        if let Some(path) = &self.worker.path {
            let expanded = expand_env_vars(path).ok()?;
            return Some(PathBuf::from(expanded));
        }

        let candidates = ["./geosift-worker", "./worker/geosift-worker"];
        for candidate in candidates {
            let path = PathBuf::from(candidate);
            if path.exists() {
                return Some(path);
            }
        }

        if let Ok(output) = std::process::Command::new("which")
            .arg("geosift-worker")
            .output()
        {
            if output.status.success() {
                let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if !path.is_empty() {
                    return Some(PathBuf::from(path));
                }
            }
        }

        None
    }
}

/// Expand environment variables in a string.
///
/// Supports `${VAR}` and `$VAR` syntax. A lone `$` is kept as-is.
pub fn expand_env_vars(s: &str) -> Result<String, SettingsError> {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' {
            result.push(c);
            continue;
        }

        let mut var_name = String::new();
        if chars.peek() == Some(&'{') {
            chars.next();
            for ch in chars.by_ref() {
                if ch == '}' {
                    break;
                }
                var_name.push(ch);
            }
        } else {
            while let Some(&ch) = chars.peek() {
                if !(ch.is_alphanumeric() || ch == '_') {
                    break;
                }
                var_name.push(ch);
                chars.next();
            }
            if var_name.is_empty() {
                result.push('$');
                continue;
            }
        }

        let value =
            env::var(&var_name).map_err(|_| SettingsError::MissingEnvVar(var_name.clone()))?;
        result.push_str(&value);
    }

    Ok(result)
}
