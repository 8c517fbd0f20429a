//! Geometry types shared by the query, reprojection and feature stages.
//!
//! Geometries travel through the database as GeoJSON text and live in Rust
//! as `geo` types. [`FeatureGeometry`] is the closed set of shapes the
//! render boundary knows how to draw.

mod geojson;
mod scope;

pub use geojson::{GeoJsonGeometry, Position};
pub use scope::QueryScope;

use geo::{Geometry, LineString, MultiLineString, Point, Polygon};
use serde::Serialize;
use thiserror::Error;

/// Errors raised while decoding or validating geometry.
#[derive(Debug, Error)]
pub enum GeometryError {
    /// The text is not a GeoJSON geometry.
    #[error("invalid GeoJSON: {0}")]
    Json(#[source] serde_json::Error),

    /// Structurally valid JSON with impossible geometry content.
    #[error("malformed geometry: {0}")]
    Malformed(String),

    /// A polygon was required.
    #[error("expected a Polygon, got {0}")]
    NotAPolygon(String),

    /// A polygon ring breaks the simple-feature rules.
    #[error("ring {ring} is invalid: {reason}")]
    InvalidRing { ring: usize, reason: String },

    /// A coordinate is NaN, infinite, or outside the longitude/latitude range.
    #[error("coordinate ({x}, {y}) is out of range")]
    OutOfRange { x: f64, y: f64 },
}

/// Geometry kinds a [`FeatureGeometry`] can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum GeometryType {
    Point,
    LineString,
    Polygon,
    MultiLineString,
}

impl GeometryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Point => "Point",
            Self::LineString => "LineString",
            Self::Polygon => "Polygon",
            Self::MultiLineString => "MultiLineString",
        }
    }
}

impl std::fmt::Display for GeometryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A drawable geometry.
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureGeometry {
    Point(Point<f64>),
    LineString(LineString<f64>),
    Polygon(Polygon<f64>),
    MultiLineString(MultiLineString<f64>),
}

impl FeatureGeometry {
    pub fn geometry_type(&self) -> GeometryType {
        match self {
            Self::Point(_) => GeometryType::Point,
            Self::LineString(_) => GeometryType::LineString,
            Self::Polygon(_) => GeometryType::Polygon,
            Self::MultiLineString(_) => GeometryType::MultiLineString,
        }
    }

    /// Narrow a `geo` geometry to a drawable one.
    ///
    /// Returns the GeoJSON type name of anything else as the error.
    pub fn from_geo(geometry: Geometry<f64>) -> Result<Self, &'static str> {
        match geometry {
            Geometry::Point(p) => Ok(Self::Point(p)),
            Geometry::LineString(ls) => Ok(Self::LineString(ls)),
            Geometry::Polygon(p) => Ok(Self::Polygon(p)),
            Geometry::MultiLineString(mls) => Ok(Self::MultiLineString(mls)),
            other => Err(geo_type_name(&other)),
        }
    }

    pub fn to_geo(&self) -> Geometry<f64> {
        match self {
            Self::Point(p) => Geometry::Point(*p),
            Self::LineString(ls) => Geometry::LineString(ls.clone()),
            Self::Polygon(p) => Geometry::Polygon(p.clone()),
            Self::MultiLineString(mls) => Geometry::MultiLineString(mls.clone()),
        }
    }

    pub fn to_geojson(&self) -> GeoJsonGeometry {
        GeoJsonGeometry::from_geo(&self.to_geo())
    }
}

impl Serialize for FeatureGeometry {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_geojson().serialize(serializer)
    }
}

/// GeoJSON-style name of a `geo` geometry kind.
pub fn geo_type_name(geometry: &Geometry<f64>) -> &'static str {
    match geometry {
        Geometry::Point(_) => "Point",
        Geometry::Line(_) => "Line",
        Geometry::LineString(_) => "LineString",
        Geometry::Polygon(_) => "Polygon",
        Geometry::MultiPoint(_) => "MultiPoint",
        Geometry::MultiLineString(_) => "MultiLineString",
        Geometry::MultiPolygon(_) => "MultiPolygon",
        Geometry::GeometryCollection(_) => "GeometryCollection",
        Geometry::Rect(_) => "Rect",
        Geometry::Triangle(_) => "Triangle",
    }
}
