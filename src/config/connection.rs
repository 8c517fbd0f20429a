//! Database connection configuration.
//!
//! Supports configuration via environment variables:
//! - `GEOSIFT_DB_DRIVER`: Database driver (postgres, duckdb)
//! - `GEOSIFT_DB_HOST`: Database server hostname (file path for DuckDB)
//! - `GEOSIFT_DB_NAME`: Database name
//! - `GEOSIFT_DB_PORT`: Port (optional, uses driver default)
//! - `GEOSIFT_DB_USER` / `GEOSIFT_DB_PASSWORD`: Credentials (optional)

use std::env;

/// Error type for connection configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Unsupported driver: {0}. Supported: postgres, duckdb")]
    UnsupportedDriver(String),
}

/// Supported spatial database drivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Driver {
    /// PostgreSQL with PostGIS
    Postgres,
    /// DuckDB with the spatial extension
    DuckDb,
}

impl Driver {
    /// Parse driver from string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Result<Self, ConnectionError> {
        match s.to_lowercase().as_str() {
            "postgres" | "postgresql" | "postgis" | "pg" => Ok(Driver::Postgres),
            "duckdb" | "duck" => Ok(Driver::DuckDb),
            other => Err(ConnectionError::UnsupportedDriver(other.to_string())),
        }
    }

    /// Get the driver name for the worker.
    pub fn as_str(&self) -> &'static str {
        match self {
            Driver::Postgres => "postgres",
            Driver::DuckDb => "duckdb",
        }
    }

    /// Get the default port for this driver.
    pub fn default_port(&self) -> u16 {
        match self {
            Driver::Postgres => 5432,
            Driver::DuckDb => 0,
        }
    }
}

/// Database connection configuration.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Database driver.
    pub driver: Driver,
    /// Server hostname, or the database file for DuckDB.
    pub host: String,
    /// Database name.
    pub database: String,
    /// Port (optional).
    pub port: Option<u16>,
    /// Username.
    pub username: Option<String>,
    /// Password.
    pub password: Option<String>,
}

impl ConnectionConfig {
    /// Connection to a PostGIS server.
    pub fn postgres(host: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            driver: Driver::Postgres,
            host: host.into(),
            database: database.into(),
            port: None,
            username: None,
            password: None,
        }
    }

    /// Connection to a DuckDB file.
    pub fn duckdb(path: impl Into<String>) -> Self {
        Self {
            driver: Driver::DuckDb,
            host: path.into(),
            database: String::new(),
            port: None,
            username: None,
            password: None,
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConnectionError> {
        let driver_str = env::var("GEOSIFT_DB_DRIVER").unwrap_or_else(|_| "postgres".to_string());
        let driver = Driver::from_str(&driver_str)?;

        let host = env::var("GEOSIFT_DB_HOST")
            .map_err(|_| ConnectionError::MissingEnvVar("GEOSIFT_DB_HOST".to_string()))?;

        let database = match driver {
            Driver::Postgres => env::var("GEOSIFT_DB_NAME")
                .map_err(|_| ConnectionError::MissingEnvVar("GEOSIFT_DB_NAME".to_string()))?,
            Driver::DuckDb => env::var("GEOSIFT_DB_NAME").unwrap_or_default(),
        };

        let port = env::var("GEOSIFT_DB_PORT")
            .ok()
            .and_then(|p| p.parse().ok());

        Ok(Self {
            driver,
            host,
            database,
            port,
            username: env::var("GEOSIFT_DB_USER").ok(),
            password: env::var("GEOSIFT_DB_PASSWORD").ok(),
        })
    }

    /// Build the connection string for the worker.
    pub fn to_connection_string(&self) -> String {
        match self.driver {
            Driver::Postgres => self.build_postgres_connection_string(),
            Driver::DuckDb => self.build_duckdb_connection_string(),
        }
    }

    fn build_postgres_connection_string(&self) -> String {
        let credentials = match (&self.username, &self.password) {
            (Some(user), Some(pass)) => format!("{}:{}@", user, pass),
            (Some(user), None) => format!("{}@", user),
            _ => String::new(),
        };
        let port = self.port.unwrap_or(self.driver.default_port());

        format!(
            "postgres://{}{}:{}/{}",
            credentials, self.host, port, self.database
        )
    }

    fn build_duckdb_connection_string(&self) -> String {
        if self.host.is_empty() || self.host == ":memory:" {
            ":memory:".to_string()
        } else {
            self.host.clone()
        }
    }
}
