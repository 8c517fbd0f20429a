//! # geosift
//!
//! Finds every feature, across an unknown set of spatial tables, that
//! intersects a polygon drawn on a map.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                 Drawn polygon (GeoJSON)                  │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [geometry::QueryScope]
//! ┌─────────────────────────────────────────────────────────┐
//! │      Discovery (cached per schema and settings)          │
//! │  catalog: geometry tables, columns, layer metadata       │
//! │  matcher: table → layer (exact, then best-effort)        │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [sql::SpatialQueryBuilder]
//! ┌─────────────────────────────────────────────────────────┐
//! │     aggregate: bounded fan-out of per-table queries      │
//! │     through the executor / worker process                │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [reproject]
//! ┌─────────────────────────────────────────────────────────┐
//! │    feature: typed features in the canonical CRS          │
//! │    render: markers, paths, shapes, GeoJSON export        │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! [`session::Session`] ties the stages together and owns the discovery
//! cache.

pub mod aggregate;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod executor;
pub mod feature;
pub mod geometry;
pub mod matcher;
pub mod render;
pub mod reproject;
pub mod session;
pub mod sql;
pub mod worker;

#[cfg(feature = "ui")]
pub mod web;

/// Re-exports for convenient usage.
pub mod prelude {
    pub use crate::aggregate::{CycleToken, Progress, ProgressSink, TableQueryError};
    pub use crate::catalog::{Catalog, DiscoveryError, LayerMetadata, SqlCatalog, TableDescriptor};
    pub use crate::config::Settings;
    pub use crate::executor::{QueryExecutor, QueryRows, WorkerExecutor};
    pub use crate::feature::{Feature, RawFeatureRow, Style};
    pub use crate::geometry::{FeatureGeometry, GeometryType, QueryScope};
    pub use crate::matcher::{LayerMatcher, MatchKind, PositionalMatcher, TableBinding};
    pub use crate::render::{render_all, RenderItem};
    pub use crate::reproject::{CrsRegistry, Reprojector, Srid};
    pub use crate::session::{CycleReport, PipelineError, PipelineState, Session};
    pub use crate::sql::{BoundQuery, Dialect};
}

pub use session::Session;
pub use sql::Dialect;
