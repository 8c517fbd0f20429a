//! The user-drawn query polygon.

use geo::{Coord, Geometry, LineString, Polygon};
use serde_json::Value;

use super::{GeoJsonGeometry, GeometryError, Position};

/// A validated query polygon in the canonical CRS.
///
/// Built once per submission and shared by every table query. The GeoJSON
/// text handed to the database is re-serialized from the validated rings,
/// never the caller's original text.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryScope {
    polygon: Polygon<f64>,
    srid: u32,
    geojson: String,
}

impl QueryScope {
    /// Parse a polygon from JSON text.
    ///
    /// Accepts a GeoJSON Polygon, a GeoJSON Feature wrapping one (as map
    /// draw plugins export), a bare ring `[[x, y], ...]`, or a list of rings.
    /// With `check_lon_lat`, coordinates must fall within ±180 / ±90.
    pub fn parse(text: &str, srid: u32, check_lon_lat: bool) -> Result<Self, GeometryError> {
        let value: Value = serde_json::from_str(text).map_err(GeometryError::Json)?;
        Self::from_value(&value, srid, check_lon_lat)
    }

    /// Same as [`QueryScope::parse`] for an already-decoded value.
    pub fn from_value(value: &Value, srid: u32, check_lon_lat: bool) -> Result<Self, GeometryError> {
        let rings: Vec<Vec<Position>> = match value {
            Value::Object(obj) => match obj.get("type").and_then(Value::as_str) {
                Some("Feature") => {
                    let geometry = obj
                        .get("geometry")
                        .ok_or_else(|| GeometryError::Malformed("Feature has no geometry".into()))?;
                    return Self::from_value(geometry, srid, check_lon_lat);
                }
                Some("Polygon") => match GeoJsonGeometry::from_value(value)? {
                    GeoJsonGeometry::Polygon { coordinates } => coordinates,
                    other => return Err(GeometryError::NotAPolygon(other.type_name().into())),
                },
                Some(other) => return Err(GeometryError::NotAPolygon(other.to_string())),
                None => return Err(GeometryError::Malformed("object has no type".into())),
            },
            Value::Array(items) => {
                let is_single_ring = items
                    .first()
                    .and_then(Value::as_array)
                    .and_then(|first| first.first())
                    .is_some_and(Value::is_number);
                if is_single_ring {
                    vec![serde_json::from_value(value.clone()).map_err(GeometryError::Json)?]
                } else {
                    serde_json::from_value(value.clone()).map_err(GeometryError::Json)?
                }
            }
            other => {
                return Err(GeometryError::Malformed(format!(
                    "expected a polygon, got {}",
                    other
                )))
            }
        };

        Self::from_rings(&rings, srid, check_lon_lat)
    }

    /// Build from raw rings; the first ring is the exterior.
    pub fn from_rings(
        rings: &[Vec<Position>],
        srid: u32,
        check_lon_lat: bool,
    ) -> Result<Self, GeometryError> {
        if rings.is_empty() {
            return Err(GeometryError::Malformed("polygon has no rings".into()));
        }

        let mut validated = Vec::with_capacity(rings.len());
        for (index, ring) in rings.iter().enumerate() {
            validated.push(validate_ring(index, ring, check_lon_lat)?);
        }

        let mut validated = validated.into_iter();
        let exterior = validated
            .next()
            .ok_or_else(|| GeometryError::Malformed("polygon has no rings".into()))?;
        let polygon = Polygon::new(exterior, validated.collect());

        let geojson = serde_json::to_string(&GeoJsonGeometry::from_geo(&Geometry::Polygon(
            polygon.clone(),
        )))
        .map_err(GeometryError::Json)?;

        Ok(Self {
            polygon,
            srid,
            geojson,
        })
    }

    pub fn polygon(&self) -> &Polygon<f64> {
        &self.polygon
    }

    /// SRID the polygon is expressed in.
    pub fn srid(&self) -> u32 {
        self.srid
    }

    /// Canonical GeoJSON text for binding into queries.
    pub fn geojson(&self) -> &str {
        &self.geojson
    }
}

fn validate_ring(
    index: usize,
    ring: &[Position],
    check_lon_lat: bool,
) -> Result<LineString<f64>, GeometryError> {
    let invalid = |reason: &str| GeometryError::InvalidRing {
        ring: index,
        reason: reason.to_string(),
    };

    let mut coords = Vec::with_capacity(ring.len());
    for position in ring {
        let (x, y) = match position.as_slice() {
            [x, y] => (*x, *y),
            _ => return Err(invalid("every position must be an [x, y] pair")),
        };
        let in_range = x.is_finite()
            && y.is_finite()
            && (!check_lon_lat || ((-180.0..=180.0).contains(&x) && (-90.0..=90.0).contains(&y)));
        if !in_range {
            return Err(GeometryError::OutOfRange { x, y });
        }
        coords.push(Coord { x, y });
    }

    if coords.len() < 4 {
        return Err(invalid("a ring needs at least four positions"));
    }
    if coords.first() != coords.last() {
        return Err(invalid("ring is not closed"));
    }

    let mut distinct: Vec<Coord<f64>> = Vec::new();
    for c in &coords {
        if !distinct.contains(c) {
            distinct.push(*c);
        }
    }
    if distinct.len() < 3 {
        return Err(invalid("ring is degenerate"));
    }

    Ok(LineString(coords))
}
