//! Configuration module for geosift.
//!
//! Handles connection configuration, environment variables, and settings.

mod connection;
mod settings;

pub use connection::{ConnectionConfig, ConnectionError, Driver};
pub use settings::{
    expand_env_vars, ConnectionSettings, DiscoverySettings, QuerySettings, RetrySettings,
    Settings, SettingsError, WorkerSettings,
};
