//! Registry of coordinate systems by EPSG code.

use std::collections::HashMap;

use super::projection::{Ellipsoid, Projection, US_SURVEY_FOOT};
use super::Srid;

/// A registered coordinate system.
#[derive(Debug, Clone, PartialEq)]
pub struct CrsDefinition {
    pub name: String,
    pub projection: Projection,
}

/// Lookup table from SRID to projection.
///
/// [`CrsRegistry::default`] carries the built-in systems; more can be added
/// with [`CrsRegistry::register`].
#[derive(Debug, Clone)]
pub struct CrsRegistry {
    definitions: HashMap<Srid, CrsDefinition>,
}

/// California State Plane zones: (zone, NAD83 ftUS code, NAD83 metre code,
/// NAD27 code, lat0, lon0, sp1, sp2) with angles in degrees.
const CALIFORNIA_ZONES: [(&str, Srid, Srid, Srid, f64, f64, f64, f64); 6] = [
    ("I", 2225, 26941, 26741, 39.0 + 20.0 / 60.0, -122.0, 41.0 + 40.0 / 60.0, 40.0),
    ("II", 2226, 26942, 26742, 37.0 + 40.0 / 60.0, -122.0, 39.0 + 50.0 / 60.0, 38.0 + 20.0 / 60.0),
    ("III", 2227, 26943, 26743, 36.5, -120.5, 38.0 + 26.0 / 60.0, 37.0 + 4.0 / 60.0),
    ("IV", 2228, 26944, 26744, 35.0 + 20.0 / 60.0, -119.0, 37.25, 36.0),
    ("V", 2229, 26945, 26745, 33.5, -118.0, 35.0 + 28.0 / 60.0, 34.0 + 2.0 / 60.0),
    ("VI", 2230, 26946, 26746, 32.0 + 10.0 / 60.0, -116.25, 33.0 + 53.0 / 60.0, 32.0 + 47.0 / 60.0),
];

impl Default for CrsRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl CrsRegistry {
    /// An empty registry.
    pub fn empty() -> Self {
        Self {
            definitions: HashMap::new(),
        }
    }

    /// Geographic, Web Mercator, UTM and California State Plane (NAD83 and
    /// NAD27) systems.
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();

        registry.register(4326, "WGS 84", Projection::Geographic);
        registry.register(4269, "NAD83", Projection::Geographic);
        registry.register(4267, "NAD27", Projection::Geographic);

        registry.register(3857, "WGS 84 / Pseudo-Mercator", Projection::WebMercator);
        registry.register(900913, "Google Maps Global Mercator", Projection::WebMercator);

        for zone in 1..=60 {
            registry.register(
                32600 + zone,
                format!("WGS 84 / UTM zone {}N", zone),
                Projection::utm(Ellipsoid::WGS84, zone, false),
            );
            registry.register(
                32700 + zone,
                format!("WGS 84 / UTM zone {}S", zone),
                Projection::utm(Ellipsoid::WGS84, zone, true),
            );
        }
        for zone in 1..=23 {
            registry.register(
                26900 + zone,
                format!("NAD83 / UTM zone {}N", zone),
                Projection::utm(Ellipsoid::GRS80, zone, false),
            );
        }

        for (zone, feet, metres, nad27, lat0, lon0, lat1, lat2) in CALIFORNIA_ZONES {
            let conic = |unit: f64| Projection::LambertConformalConic {
                ellipsoid: Ellipsoid::GRS80,
                lat0,
                lon0,
                lat1,
                lat2,
                false_easting: 2_000_000.0,
                false_northing: 500_000.0,
                unit,
            };
            registry.register(
                metres,
                format!("NAD83 / California zone {}", zone),
                conic(1.0),
            );
            registry.register(
                feet,
                format!("NAD83 / California zone {} (ftUS)", zone),
                conic(US_SURVEY_FOOT),
            );
            // NAD27: Clarke 1866, false easting 2,000,000 ftUS, no false northing.
            registry.register(
                nad27,
                format!("NAD27 / California zone {}", zone),
                Projection::LambertConformalConic {
                    ellipsoid: Ellipsoid::CLARKE_1866,
                    lat0,
                    lon0,
                    lat1,
                    lat2,
                    false_easting: 2_000_000.0 * US_SURVEY_FOOT,
                    false_northing: 0.0,
                    unit: US_SURVEY_FOOT,
                },
            );
        }

        registry
    }

    /// Add or replace a definition.
    pub fn register(&mut self, srid: Srid, name: impl Into<String>, projection: Projection) {
        self.definitions.insert(
            srid,
            CrsDefinition {
                name: name.into(),
                projection,
            },
        );
    }

    pub fn get(&self, srid: Srid) -> Option<&CrsDefinition> {
        self.definitions.get(&srid)
    }

    pub fn contains(&self, srid: Srid) -> bool {
        self.definitions.contains_key(&srid)
    }

    /// True when `srid` is registered and expressed in lon/lat degrees.
    pub fn is_geographic(&self, srid: Srid) -> bool {
        self.get(srid)
            .is_some_and(|def| def.projection.is_geographic())
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}
