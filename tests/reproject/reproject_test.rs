use std::sync::Arc;

use geo::{line_string, point, polygon, Coord, LineString, MultiLineString};
use geosift::geometry::FeatureGeometry;
use geosift::reproject::{
    CrsRegistry, Ellipsoid, Projection, ReprojectionError, Reprojector, US_SURVEY_FOOT,
};

fn to_wgs84() -> Reprojector {
    Reprojector::new(Arc::new(CrsRegistry::default()), 4326)
}

fn assert_close(actual: Coord<f64>, lon: f64, lat: f64, tolerance: f64) {
    assert!(
        (actual.x - lon).abs() < tolerance && (actual.y - lat).abs() < tolerance,
        "expected ({}, {}), got ({}, {})",
        lon,
        lat,
        actual.x,
        actual.y
    );
}

fn single_coord(geometry: &FeatureGeometry) -> Coord<f64> {
    match geometry {
        FeatureGeometry::Point(p) => p.0,
        other => panic!("expected a point, got {:?}", other),
    }
}

#[test]
fn test_identity_has_no_drift() {
    let polygon = FeatureGeometry::Polygon(polygon![
        (x: -118.300_000_000_000_01, y: 33.95),
        (x: -118.2, y: 33.950_000_000_000_003),
        (x: -118.2, y: 34.1),
        (x: -118.300_000_000_000_01, y: 33.95),
    ]);
    let out = to_wgs84().reproject(polygon.clone(), 4326).unwrap();
    assert_eq!(out, polygon);
}

#[test]
fn test_state_plane_false_origin() {
    let origin = FeatureGeometry::Point(point!(
        x: 2_000_000.0 / US_SURVEY_FOOT,
        y: 500_000.0 / US_SURVEY_FOOT
    ));
    let out = to_wgs84().reproject(origin, 2229).unwrap();
    assert_close(single_coord(&out), -118.0, 33.5, 1e-9);

    let metres = FeatureGeometry::Point(point!(x: 2_000_000.0, y: 500_000.0));
    let out = to_wgs84().reproject(metres, 26945).unwrap();
    assert_close(single_coord(&out), -118.0, 33.5, 1e-9);
}

#[test]
fn test_nad27_state_plane_false_origin() {
    let origin = FeatureGeometry::Point(point!(x: 2_000_000.0, y: 0.0));
    let out = to_wgs84().reproject(origin, 26745).unwrap();
    assert_close(single_coord(&out), -118.0, 33.5, 1e-9);
}

// Worked examples from Snyder, "Map Projections: A Working Manual"
// (USGS Professional Paper 1395), both on Clarke 1866.

#[test]
fn test_lambert_conformal_conic_reference_point() {
    let conic = Projection::LambertConformalConic {
        ellipsoid: Ellipsoid::CLARKE_1866,
        lat0: 23.0,
        lon0: -96.0,
        lat1: 33.0,
        lat2: 45.0,
        false_easting: 0.0,
        false_northing: 0.0,
        unit: 1.0,
    };
    let (x, y) = conic.forward(-75.0, 35.0);
    assert!((x - 1_894_410.9).abs() < 0.1, "x = {}", x);
    assert!((y - 1_564_649.5).abs() < 0.1, "y = {}", y);

    let (lon, lat) = conic.inverse(1_894_410.9, 1_564_649.5);
    assert!((lon + 75.0).abs() < 1e-6 && (lat - 35.0).abs() < 1e-6);
}

#[test]
fn test_transverse_mercator_reference_point() {
    let tm = Projection::TransverseMercator {
        ellipsoid: Ellipsoid::CLARKE_1866,
        lat0: 0.0,
        lon0: -75.0,
        k0: 0.9996,
        false_easting: 0.0,
        false_northing: 0.0,
        unit: 1.0,
    };
    let (x, y) = tm.forward(-73.5, 40.5);
    assert!((x - 127_106.5).abs() < 0.1, "x = {}", x);
    assert!((y - 4_484_124.4).abs() < 0.1, "y = {}", y);
}

#[test]
fn test_state_plane_roundtrip_through_registry() {
    let registry = CrsRegistry::default();
    let zone_v = registry.get(2229).unwrap().projection;
    let (x, y) = zone_v.forward(-118.2437, 34.0522);

    let out = to_wgs84()
        .reproject(FeatureGeometry::Point(point!(x: x, y: y)), 2229)
        .unwrap();
    assert_close(single_coord(&out), -118.2437, 34.0522, 1e-9);
}

#[test]
fn test_utm_and_web_mercator() {
    let utm = to_wgs84()
        .reproject(FeatureGeometry::Point(point!(x: 500_000.0, y: 0.0)), 32611)
        .unwrap();
    assert_close(single_coord(&utm), -117.0, 0.0, 1e-9);

    let mercator = to_wgs84()
        .reproject(
            FeatureGeometry::Point(point!(x: 20_037_508.342_789_244, y: 0.0)),
            3857,
        )
        .unwrap();
    assert_close(single_coord(&mercator), 180.0, 0.0, 1e-9);
}

#[test]
fn test_canonical_web_mercator() {
    let reprojector = Reprojector::new(Arc::new(CrsRegistry::default()), 3857);
    let out = reprojector
        .reproject(FeatureGeometry::Point(point!(x: 180.0, y: 0.0)), 4326)
        .unwrap();
    let c = single_coord(&out);
    assert!((c.x - 20_037_508.342_789_244).abs() < 1e-6);
}

#[test]
fn test_multilinestring_keeps_structure() {
    let registry = CrsRegistry::default();
    let zone_v = registry.get(2229).unwrap().projection;
    let line = |points: &[(f64, f64)]| -> LineString<f64> {
        points
            .iter()
            .map(|&(lon, lat)| {
                let (x, y) = zone_v.forward(lon, lat);
                Coord { x, y }
            })
            .collect()
    };
    let source = FeatureGeometry::MultiLineString(MultiLineString::new(vec![
        line(&[(-118.25, 34.0), (-118.24, 34.01)]),
        line(&[(-118.22, 34.02), (-118.21, 34.03), (-118.2, 34.04)]),
    ]));

    let FeatureGeometry::MultiLineString(out) = to_wgs84().reproject(source, 2229).unwrap() else {
        panic!("geometry kind changed");
    };
    assert_eq!(out.0.len(), 2);
    assert_eq!(out.0[1].0.len(), 3);
    assert_close(out.0[1].0[2], -118.2, 34.04, 1e-9);
}

#[test]
fn test_unknown_srid_is_reported() {
    let line = FeatureGeometry::LineString(line_string![(x: 1.0, y: 2.0), (x: 3.0, y: 4.0)]);
    assert_eq!(
        to_wgs84().reproject(line, 999_999),
        Err(ReprojectionError::UnknownSrid(999_999))
    );
}

#[test]
fn test_registered_definitions() {
    let mut registry = CrsRegistry::empty();
    assert!(registry.is_empty());
    registry.register(4326, "WGS 84", Projection::Geographic);
    registry.register(3857, "WGS 84 / Pseudo-Mercator", Projection::WebMercator);
    assert_eq!(registry.len(), 2);

    let reprojector = Reprojector::new(Arc::new(registry), 4326);
    assert!(reprojector
        .reproject(FeatureGeometry::Point(point!(x: 0.0, y: 0.0)), 2229)
        .is_err());
    assert!(reprojector
        .reproject(FeatureGeometry::Point(point!(x: 0.0, y: 0.0)), 3857)
        .is_ok());
}

#[test]
fn test_builtin_coverage() {
    let registry = CrsRegistry::default();
    for srid in [4326, 4269, 4267, 3857, 900913, 32601, 32660, 32701, 32760, 26901, 26923] {
        assert!(registry.contains(srid), "missing {}", srid);
    }
    for srid in 2225..=2230 {
        assert!(registry.contains(srid), "missing {}", srid);
    }
    for srid in 26941..=26946 {
        assert!(registry.contains(srid), "missing {}", srid);
    }
    assert!(registry.is_geographic(4269));
    assert!(!registry.is_geographic(2229));
}
