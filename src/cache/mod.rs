//! In-memory discovery cache.
//!
//! Introspection and matching are expensive compared to one polygon query,
//! and their answers only change when the schema or the metadata table
//! changes. A [`Discovery`] is computed once and shared (`Arc`) by every
//! polygon submission until it is invalidated, expires, or the settings
//! that produced it change.
//!
//! # Design
//!
//! - One entry, guarded by a `tokio::sync::RwLock`
//! - Entries are immutable once published; a refresh replaces the `Arc`
//! - Keyed by a SHA-256 fingerprint of the discovery inputs
//! - Optional TTL; without one the entry lives until invalidated

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;

use crate::catalog::{DiscoveryError, LayerMetadata, TableDescriptor};
use crate::matcher::{BindingGap, TableBinding};

/// Compute the SHA-256 fingerprint of a serializable value.
///
/// The value is serialized to JSON before hashing. Returns a 64-character
/// lowercase hexadecimal string.
pub fn compute_hash<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let json = serde_json::to_string(value)?;
    let mut hasher = Sha256::new();
    hasher.update(json.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}

/// Everything one discovery cycle learned.
#[derive(Debug, Clone)]
pub struct Discovery {
    pub tables: Vec<TableDescriptor>,
    pub layers: Vec<LayerMetadata>,
    pub bindings: Vec<TableBinding>,
    pub gaps: Vec<BindingGap>,
    /// Real columns of every bound table, keyed by table name.
    pub columns: HashMap<String, Vec<String>>,
    pub fingerprint: String,
    pub discovered_at: Instant,
}

impl Discovery {
    pub fn columns_of(&self, table: &str) -> &[String] {
        self.columns.get(table).map(Vec::as_slice).unwrap_or(&[])
    }

    fn is_fresh(&self, fingerprint: &str, ttl: Option<Duration>) -> bool {
        self.fingerprint == fingerprint
            && ttl.map_or(true, |ttl| self.discovered_at.elapsed() < ttl)
    }
}

/// Shared holder of the current [`Discovery`].
#[derive(Debug, Default)]
pub struct DiscoveryCache {
    entry: RwLock<Option<Arc<Discovery>>>,
    ttl: Option<Duration>,
}

impl DiscoveryCache {
    pub fn new(ttl: Option<Duration>) -> Self {
        Self {
            entry: RwLock::new(None),
            ttl,
        }
    }

    /// The cached discovery, if it is still valid for `fingerprint`.
    pub async fn get(&self, fingerprint: &str) -> Option<Arc<Discovery>> {
        self.entry
            .read()
            .await
            .as_ref()
            .filter(|d| d.is_fresh(fingerprint, self.ttl))
            .cloned()
    }

    /// Return the cached discovery or run `discover` and publish its result.
    ///
    /// Concurrent callers wait on the write lock, so one discovery runs at a
    /// time and later callers reuse its result. A failed discovery leaves
    /// the cache empty.
    pub async fn get_or_discover<F, Fut>(
        &self,
        fingerprint: &str,
        discover: F,
    ) -> Result<Arc<Discovery>, DiscoveryError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Discovery, DiscoveryError>>,
    {
        if let Some(hit) = self.get(fingerprint).await {
            return Ok(hit);
        }

        let mut entry = self.entry.write().await;
        if let Some(hit) = entry.as_ref().filter(|d| d.is_fresh(fingerprint, self.ttl)) {
            return Ok(hit.clone());
        }

        *entry = None;
        let discovery = Arc::new(discover().await?);
        tracing::debug!(fingerprint = %fingerprint, "discovery cached");
        *entry = Some(discovery.clone());
        Ok(discovery)
    }

    /// Drop the cached discovery; the next submission rediscovers.
    pub async fn invalidate(&self) {
        if self.entry.write().await.take().is_some() {
            tracing::info!("discovery cache invalidated");
        }
    }
}
