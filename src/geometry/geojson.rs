//! GeoJSON geometry encoding.
//!
//! Only the geometry object is modelled; `crs`, `bbox` and other foreign
//! members are ignored on input and never written.

use geo::{Coord, Geometry, LineString, MultiLineString, MultiPoint, MultiPolygon, Point, Polygon};
use serde::{Deserialize, Serialize};

use super::GeometryError;

/// A position: `[x, y]` with optional trailing ordinates (z, m), which are dropped.
pub type Position = Vec<f64>;

/// A GeoJSON geometry object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GeoJsonGeometry {
    Point { coordinates: Position },
    MultiPoint { coordinates: Vec<Position> },
    LineString { coordinates: Vec<Position> },
    MultiLineString { coordinates: Vec<Vec<Position>> },
    Polygon { coordinates: Vec<Vec<Position>> },
    MultiPolygon { coordinates: Vec<Vec<Vec<Position>>> },
    GeometryCollection { geometries: Vec<GeoJsonGeometry> },
}

impl GeoJsonGeometry {
    /// Parse GeoJSON geometry text.
    pub fn parse(text: &str) -> Result<Self, GeometryError> {
        serde_json::from_str(text).map_err(GeometryError::Json)
    }

    /// Parse an already-decoded JSON value.
    ///
    /// Drivers hand back json columns either as objects or as strings.
    pub fn from_value(value: &serde_json::Value) -> Result<Self, GeometryError> {
        match value {
            serde_json::Value::String(text) => Self::parse(text),
            other => Self::deserialize(other).map_err(GeometryError::Json),
        }
    }

    /// The GeoJSON `type` member.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Point { .. } => "Point",
            Self::MultiPoint { .. } => "MultiPoint",
            Self::LineString { .. } => "LineString",
            Self::MultiLineString { .. } => "MultiLineString",
            Self::Polygon { .. } => "Polygon",
            Self::MultiPolygon { .. } => "MultiPolygon",
            Self::GeometryCollection { .. } => "GeometryCollection",
        }
    }

    /// Convert into a `geo` geometry.
    pub fn to_geo(&self) -> Result<Geometry<f64>, GeometryError> {
        Ok(match self {
            Self::Point { coordinates } => Geometry::Point(Point(coord(coordinates)?)),
            Self::MultiPoint { coordinates } => Geometry::MultiPoint(MultiPoint(
                coordinates
                    .iter()
                    .map(|p| coord(p).map(Point))
                    .collect::<Result<_, _>>()?,
            )),
            Self::LineString { coordinates } => Geometry::LineString(line(coordinates)?),
            Self::MultiLineString { coordinates } => Geometry::MultiLineString(MultiLineString(
                coordinates.iter().map(|l| line(l)).collect::<Result<_, _>>()?,
            )),
            Self::Polygon { coordinates } => Geometry::Polygon(polygon(coordinates)?),
            Self::MultiPolygon { coordinates } => Geometry::MultiPolygon(MultiPolygon(
                coordinates
                    .iter()
                    .map(|p| polygon(p))
                    .collect::<Result<_, _>>()?,
            )),
            Self::GeometryCollection { geometries } => Geometry::GeometryCollection(
                geometries
                    .iter()
                    .map(|g| g.to_geo())
                    .collect::<Result<Vec<_>, _>>()?
                    .into(),
            ),
        })
    }

    /// Encode a `geo` geometry.
    ///
    /// Line, Rect and Triangle have no GeoJSON object and are written as
    /// LineString / Polygon.
    pub fn from_geo(geometry: &Geometry<f64>) -> Self {
        match geometry {
            Geometry::Point(p) => Self::Point {
                coordinates: position(p.0),
            },
            Geometry::MultiPoint(mp) => Self::MultiPoint {
                coordinates: mp.0.iter().map(|p| position(p.0)).collect(),
            },
            Geometry::LineString(ls) => Self::LineString {
                coordinates: positions(ls),
            },
            Geometry::MultiLineString(mls) => Self::MultiLineString {
                coordinates: mls.0.iter().map(positions).collect(),
            },
            Geometry::Polygon(p) => Self::Polygon {
                coordinates: rings(p),
            },
            Geometry::MultiPolygon(mp) => Self::MultiPolygon {
                coordinates: mp.0.iter().map(rings).collect(),
            },
            Geometry::GeometryCollection(gc) => Self::GeometryCollection {
                geometries: gc.0.iter().map(Self::from_geo).collect(),
            },
            Geometry::Line(l) => Self::LineString {
                coordinates: vec![position(l.start), position(l.end)],
            },
            Geometry::Rect(r) => Self::Polygon {
                coordinates: rings(&r.to_polygon()),
            },
            Geometry::Triangle(t) => Self::Polygon {
                coordinates: rings(&t.to_polygon()),
            },
        }
    }
}

fn coord(position: &Position) -> Result<Coord<f64>, GeometryError> {
    match position.as_slice() {
        [x, y, ..] => Ok(Coord { x: *x, y: *y }),
        _ => Err(GeometryError::Malformed(format!(
            "position needs at least two ordinates, got {}",
            position.len()
        ))),
    }
}

fn line(positions: &[Position]) -> Result<LineString<f64>, GeometryError> {
    positions
        .iter()
        .map(coord)
        .collect::<Result<Vec<_>, _>>()
        .map(LineString)
}

fn polygon(rings: &[Vec<Position>]) -> Result<Polygon<f64>, GeometryError> {
    let mut rings = rings.iter().map(|r| line(r));
    let exterior = match rings.next() {
        Some(ring) => ring?,
        None => LineString(Vec::new()),
    };
    let interiors = rings.collect::<Result<Vec<_>, _>>()?;
    Ok(Polygon::new(exterior, interiors))
}

fn position(c: Coord<f64>) -> Position {
    vec![c.x, c.y]
}

fn positions(ls: &LineString<f64>) -> Vec<Position> {
    ls.0.iter().copied().map(position).collect()
}

fn rings(p: &Polygon<f64>) -> Vec<Vec<Position>> {
    if p.exterior().0.is_empty() {
        return Vec::new();
    }
    std::iter::once(p.exterior())
        .chain(p.interiors())
        .map(positions)
        .collect()
}
