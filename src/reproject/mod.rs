//! Geometry reprojection into the canonical CRS.
//!
//! Source geometries arrive in whatever system their table is stored in.
//! [`Reprojector`] unprojects each coordinate to lon/lat through the
//! [`CrsRegistry`] and projects it into the canonical system. When source
//! and canonical SRIDs are equal the geometry is returned untouched.

mod projection;
mod registry;

pub use projection::{Ellipsoid, Projection, US_SURVEY_FOOT};
pub use registry::{CrsDefinition, CrsRegistry};

use std::sync::Arc;

use geo::{Coord, Geometry, MapCoords};
use thiserror::Error;

use crate::geometry::FeatureGeometry;

/// Numeric coordinate system identifier (EPSG code).
pub type Srid = u32;

/// Canonical display CRS unless configured otherwise.
pub const DEFAULT_CANONICAL_SRID: Srid = 4326;

#[derive(Debug, Error, PartialEq)]
pub enum ReprojectionError {
    #[error("unknown SRID {0}")]
    UnknownSrid(Srid),

    #[error("unsupported geometry type {0}")]
    UnsupportedGeometry(String),

    #[error("reprojecting ({x}, {y}) from SRID {srid} produced a non-finite coordinate")]
    NonFinite { srid: Srid, x: f64, y: f64 },
}

/// Transforms geometries into one canonical CRS.
#[derive(Debug, Clone)]
pub struct Reprojector {
    registry: Arc<CrsRegistry>,
    canonical: Srid,
}

impl Reprojector {
    pub fn new(registry: Arc<CrsRegistry>, canonical: Srid) -> Self {
        Self {
            registry,
            canonical,
        }
    }

    pub fn canonical(&self) -> Srid {
        self.canonical
    }

    pub fn registry(&self) -> &CrsRegistry {
        &self.registry
    }

    /// Reproject a decoded geometry, narrowing it to a drawable kind first.
    pub fn reproject_geo(
        &self,
        geometry: Geometry<f64>,
        source: Srid,
    ) -> Result<FeatureGeometry, ReprojectionError> {
        let feature = FeatureGeometry::from_geo(geometry)
            .map_err(|name| ReprojectionError::UnsupportedGeometry(name.to_string()))?;
        self.reproject(feature, source)
    }

    /// Reproject from `source` into the canonical CRS.
    pub fn reproject(
        &self,
        geometry: FeatureGeometry,
        source: Srid,
    ) -> Result<FeatureGeometry, ReprojectionError> {
        if source == self.canonical {
            return Ok(geometry);
        }

        let from = self.projection(source)?;
        let to = self.projection(self.canonical)?;
        let transform = |c: Coord<f64>| -> Result<Coord<f64>, ReprojectionError> {
            let (lon, lat) = from.inverse(c.x, c.y);
            let (x, y) = to.forward(lon, lat);
            if x.is_finite() && y.is_finite() {
                Ok(Coord { x, y })
            } else {
                Err(ReprojectionError::NonFinite {
                    srid: source,
                    x: c.x,
                    y: c.y,
                })
            }
        };

        let projected = match geometry {
            FeatureGeometry::Point(p) => FeatureGeometry::Point(p.try_map_coords(transform)?),
            FeatureGeometry::LineString(ls) => {
                FeatureGeometry::LineString(ls.try_map_coords(transform)?)
            }
            FeatureGeometry::Polygon(p) => FeatureGeometry::Polygon(p.try_map_coords(transform)?),
            FeatureGeometry::MultiLineString(mls) => {
                FeatureGeometry::MultiLineString(mls.try_map_coords(transform)?)
            }
        };
        Ok(projected)
    }

    fn projection(&self, srid: Srid) -> Result<Projection, ReprojectionError> {
        self.registry
            .get(srid)
            .map(|def| def.projection)
            .ok_or(ReprojectionError::UnknownSrid(srid))
    }
}
