//! Map projection math.
//!
//! All public functions take and return degrees for geographic ordinates and
//! the projection's linear unit for projected ordinates.

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

/// US survey foot in metres.
pub const US_SURVEY_FOOT: f64 = 1200.0 / 3937.0;

/// Spherical radius used by Web Mercator.
const WEB_MERCATOR_RADIUS: f64 = 6_378_137.0;

/// Latitude limit of the square Web Mercator world.
const WEB_MERCATOR_MAX_LAT: f64 = 85.051_128_779_806_59;

/// Iteration limit for the conformal latitude inversion.
const MAX_ITERATIONS: usize = 15;

/// A reference ellipsoid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ellipsoid {
    /// Semi-major axis in metres.
    pub a: f64,
    /// Inverse flattening.
    pub inv_f: f64,
}

impl Ellipsoid {
    pub const WGS84: Ellipsoid = Ellipsoid {
        a: 6_378_137.0,
        inv_f: 298.257_223_563,
    };

    pub const GRS80: Ellipsoid = Ellipsoid {
        a: 6_378_137.0,
        inv_f: 298.257_222_101,
    };

    pub const CLARKE_1866: Ellipsoid = Ellipsoid {
        a: 6_378_206.4,
        inv_f: 294.978_698_213_898,
    };

    /// First eccentricity squared.
    pub fn e2(&self) -> f64 {
        let f = 1.0 / self.inv_f;
        f * (2.0 - f)
    }

    pub fn e(&self) -> f64 {
        self.e2().sqrt()
    }
}

/// How projected ordinates map to lon/lat.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    /// Longitude/latitude in degrees.
    Geographic,

    /// Spherical Mercator on the WGS 84 semi-major axis.
    WebMercator,

    TransverseMercator {
        ellipsoid: Ellipsoid,
        /// Latitude of origin, degrees.
        lat0: f64,
        /// Central meridian, degrees.
        lon0: f64,
        k0: f64,
        /// False easting in metres.
        false_easting: f64,
        /// False northing in metres.
        false_northing: f64,
        /// Metres per unit of output.
        unit: f64,
    },

    /// Lambert Conformal Conic with two standard parallels.
    LambertConformalConic {
        ellipsoid: Ellipsoid,
        lat0: f64,
        lon0: f64,
        lat1: f64,
        lat2: f64,
        false_easting: f64,
        false_northing: f64,
        unit: f64,
    },
}

impl Projection {
    /// UTM zone `zone` (1–60) on the given ellipsoid.
    pub fn utm(ellipsoid: Ellipsoid, zone: u32, south: bool) -> Self {
        Projection::TransverseMercator {
            ellipsoid,
            lat0: 0.0,
            lon0: f64::from(zone) * 6.0 - 183.0,
            k0: 0.9996,
            false_easting: 500_000.0,
            false_northing: if south { 10_000_000.0 } else { 0.0 },
            unit: 1.0,
        }
    }

    pub fn is_geographic(&self) -> bool {
        matches!(self, Projection::Geographic)
    }

    /// Project lon/lat degrees to this system.
    pub fn forward(&self, lon: f64, lat: f64) -> (f64, f64) {
        match *self {
            Projection::Geographic => (lon, lat),
            Projection::WebMercator => {
                let lat = lat.clamp(-WEB_MERCATOR_MAX_LAT, WEB_MERCATOR_MAX_LAT).to_radians();
                (
                    WEB_MERCATOR_RADIUS * lon.to_radians(),
                    WEB_MERCATOR_RADIUS * (FRAC_PI_4 + lat / 2.0).tan().ln(),
                )
            }
            Projection::TransverseMercator {
                ellipsoid,
                lat0,
                lon0,
                k0,
                false_easting,
                false_northing,
                unit,
            } => {
                let (x, y) = tm_forward(&ellipsoid, lat0, lon0, k0, lon, lat);
                ((x + false_easting) / unit, (y + false_northing) / unit)
            }
            Projection::LambertConformalConic {
                ellipsoid,
                lat0,
                lon0,
                lat1,
                lat2,
                false_easting,
                false_northing,
                unit,
            } => {
                let cone = Lcc::new(&ellipsoid, lat0, lat1, lat2);
                let rho = cone.rho(lat.to_radians());
                let theta = cone.n * (lon - lon0).to_radians();
                (
                    (false_easting + rho * theta.sin()) / unit,
                    (false_northing + cone.rho0 - rho * theta.cos()) / unit,
                )
            }
        }
    }

    /// Unproject to lon/lat degrees.
    pub fn inverse(&self, x: f64, y: f64) -> (f64, f64) {
        match *self {
            Projection::Geographic => (x, y),
            Projection::WebMercator => (
                (x / WEB_MERCATOR_RADIUS).to_degrees(),
                (2.0 * (y / WEB_MERCATOR_RADIUS).exp().atan() - FRAC_PI_2).to_degrees(),
            ),
            Projection::TransverseMercator {
                ellipsoid,
                lat0,
                lon0,
                k0,
                false_easting,
                false_northing,
                unit,
            } => tm_inverse(
                &ellipsoid,
                lat0,
                lon0,
                k0,
                x * unit - false_easting,
                y * unit - false_northing,
            ),
            Projection::LambertConformalConic {
                ellipsoid,
                lat0,
                lon0,
                lat1,
                lat2,
                false_easting,
                false_northing,
                unit,
            } => {
                let cone = Lcc::new(&ellipsoid, lat0, lat1, lat2);
                let dx = x * unit - false_easting;
                let dy = cone.rho0 - (y * unit - false_northing);
                let sign = cone.n.signum();
                let rho = sign * dx.hypot(dy);
                let theta = (sign * dx).atan2(sign * dy);
                let t = (rho / (ellipsoid.a * cone.big_f)).powf(1.0 / cone.n);
                let lat = conformal_latitude_inverse(ellipsoid.e(), t);
                (theta.to_degrees() / cone.n + lon0, lat.to_degrees())
            }
        }
    }
}

/// Meridional arc length from the equator, metres.
fn meridian_arc(ellipsoid: &Ellipsoid, phi: f64) -> f64 {
    let e2 = ellipsoid.e2();
    let e4 = e2 * e2;
    let e6 = e4 * e2;
    ellipsoid.a
        * ((1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0) * phi
            - (3.0 * e2 / 8.0 + 3.0 * e4 / 32.0 + 45.0 * e6 / 1024.0) * (2.0 * phi).sin()
            + (15.0 * e4 / 256.0 + 45.0 * e6 / 1024.0) * (4.0 * phi).sin()
            - (35.0 * e6 / 3072.0) * (6.0 * phi).sin())
}

fn tm_forward(
    ellipsoid: &Ellipsoid,
    lat0: f64,
    lon0: f64,
    k0: f64,
    lon: f64,
    lat: f64,
) -> (f64, f64) {
    let e2 = ellipsoid.e2();
    let ep2 = e2 / (1.0 - e2);
    let phi = lat.to_radians();
    let (sin_phi, cos_phi) = phi.sin_cos();
    let tan_phi = phi.tan();

    let n = ellipsoid.a / (1.0 - e2 * sin_phi * sin_phi).sqrt();
    let t = tan_phi * tan_phi;
    let c = ep2 * cos_phi * cos_phi;
    let a = (lon - lon0).to_radians() * cos_phi;
    let m = meridian_arc(ellipsoid, phi);
    let m0 = meridian_arc(ellipsoid, lat0.to_radians());

    let x = k0
        * n
        * (a + (1.0 - t + c) * a.powi(3) / 6.0
            + (5.0 - 18.0 * t + t * t + 72.0 * c - 58.0 * ep2) * a.powi(5) / 120.0);
    let y = k0
        * (m - m0
            + n * tan_phi
                * (a * a / 2.0
                    + (5.0 - t + 9.0 * c + 4.0 * c * c) * a.powi(4) / 24.0
                    + (61.0 - 58.0 * t + t * t + 600.0 * c - 330.0 * ep2) * a.powi(6) / 720.0));
    (x, y)
}

fn tm_inverse(ellipsoid: &Ellipsoid, lat0: f64, lon0: f64, k0: f64, x: f64, y: f64) -> (f64, f64) {
    let e2 = ellipsoid.e2();
    let e4 = e2 * e2;
    let e6 = e4 * e2;
    let ep2 = e2 / (1.0 - e2);

    let m = meridian_arc(ellipsoid, lat0.to_radians()) + y / k0;
    let mu = m / (ellipsoid.a * (1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0));
    let root = (1.0 - e2).sqrt();
    let e1 = (1.0 - root) / (1.0 + root);

    let phi1 = mu
        + (3.0 * e1 / 2.0 - 27.0 * e1.powi(3) / 32.0) * (2.0 * mu).sin()
        + (21.0 * e1 * e1 / 16.0 - 55.0 * e1.powi(4) / 32.0) * (4.0 * mu).sin()
        + (151.0 * e1.powi(3) / 96.0) * (6.0 * mu).sin()
        + (1097.0 * e1.powi(4) / 512.0) * (8.0 * mu).sin();

    let (sin1, cos1) = phi1.sin_cos();
    let tan1 = phi1.tan();
    let c1 = ep2 * cos1 * cos1;
    let t1 = tan1 * tan1;
    let w = 1.0 - e2 * sin1 * sin1;
    let n1 = ellipsoid.a / w.sqrt();
    let r1 = ellipsoid.a * (1.0 - e2) / w.powf(1.5);
    let d = x / (n1 * k0);

    let phi = phi1
        - (n1 * tan1 / r1)
            * (d * d / 2.0
                - (5.0 + 3.0 * t1 + 10.0 * c1 - 4.0 * c1 * c1 - 9.0 * ep2) * d.powi(4) / 24.0
                + (61.0 + 90.0 * t1 + 298.0 * c1 + 45.0 * t1 * t1 - 252.0 * ep2 - 3.0 * c1 * c1)
                    * d.powi(6)
                    / 720.0);
    let lambda = (d - (1.0 + 2.0 * t1 + c1) * d.powi(3) / 6.0
        + (5.0 - 2.0 * c1 + 28.0 * t1 - 3.0 * c1 * c1 + 8.0 * ep2 + 24.0 * t1 * t1) * d.powi(5)
            / 120.0)
        / cos1;

    (lon0 + lambda.to_degrees(), phi.to_degrees())
}

/// Cone constants of a Lambert Conformal Conic projection.
struct Lcc {
    e: f64,
    a: f64,
    n: f64,
    big_f: f64,
    rho0: f64,
}

impl Lcc {
    fn new(ellipsoid: &Ellipsoid, lat0: f64, lat1: f64, lat2: f64) -> Self {
        let e = ellipsoid.e();
        let (phi0, phi1, phi2) = (lat0.to_radians(), lat1.to_radians(), lat2.to_radians());
        let m1 = lcc_m(e, phi1);
        let m2 = lcc_m(e, phi2);
        let t1 = lcc_t(e, phi1);
        let t2 = lcc_t(e, phi2);

        let n = if (phi1 - phi2).abs() < 1e-12 {
            phi1.sin()
        } else {
            (m1.ln() - m2.ln()) / (t1.ln() - t2.ln())
        };
        let big_f = m1 / (n * t1.powf(n));
        let rho0 = ellipsoid.a * big_f * lcc_t(e, phi0).powf(n);

        Self {
            e,
            a: ellipsoid.a,
            n,
            big_f,
            rho0,
        }
    }

    fn rho(&self, phi: f64) -> f64 {
        self.a * self.big_f * lcc_t(self.e, phi).powf(self.n)
    }
}

fn lcc_m(e: f64, phi: f64) -> f64 {
    let s = phi.sin();
    phi.cos() / (1.0 - e * e * s * s).sqrt()
}

fn lcc_t(e: f64, phi: f64) -> f64 {
    let s = phi.sin();
    (FRAC_PI_4 - phi / 2.0).tan() / ((1.0 - e * s) / (1.0 + e * s)).powf(e / 2.0)
}

/// Solve `t = lcc_t(e, phi)` for `phi`.
fn conformal_latitude_inverse(e: f64, t: f64) -> f64 {
    let mut phi = FRAC_PI_2 - 2.0 * t.atan();
    for _ in 0..MAX_ITERATIONS {
        let s = phi.sin();
        let next = FRAC_PI_2 - 2.0 * (t * ((1.0 - e * s) / (1.0 + e * s)).powf(e / 2.0)).atan();
        if (next - phi).abs() < 1e-14 {
            return next;
        }
        phi = next;
    }
    phi
}
