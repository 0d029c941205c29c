//! Planar grid ↔ WGS84 longitude/latitude.
//!
//! The table's planar frame is the Israeli Transverse Mercator grid: a
//! transverse Mercator projection on the GRS80 ellipsoid, whose datum is
//! shifted to WGS84 by a 7-parameter (position vector) Helmert transform.
//! The projection is a fixed configuration constant ([`ISRAELI_TM`]).
//!
//! Pipeline, planar → geographic:
//! inverse TM (GRS80) → geocentric (GRS80) → Helmert → geodetic (WGS84).
//! The geographic → planar direction runs the same steps backwards, using the
//! exact inverse of the Helmert matrix.

#[cfg(test)]
#[path = "projection_test.rs"]
mod tests;

use crate::types::{Point, Viewport};

/// Reference ellipsoid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ellipsoid {
    /// Semi-major axis (meters).
    pub a: f64,
    /// Flattening.
    pub f: f64,
}

impl Ellipsoid {
    /// First eccentricity squared.
    #[must_use]
    pub fn e2(&self) -> f64 {
        self.f * (2.0 - self.f)
    }
}

pub const GRS80: Ellipsoid = Ellipsoid { a: 6_378_137.0, f: 1.0 / 298.257_222_101 };
pub const WGS84: Ellipsoid = Ellipsoid { a: 6_378_137.0, f: 1.0 / 298.257_223_563 };

/// Position-vector Helmert shift from the local datum to WGS84.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Helmert {
    /// Translations (meters).
    pub tx: f64,
    pub ty: f64,
    pub tz: f64,
    /// Rotations (arc-seconds).
    pub rx: f64,
    pub ry: f64,
    pub rz: f64,
    /// Scale difference (parts per million).
    pub ppm: f64,
}

/// A transverse Mercator grid with its datum shift.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransverseMercator {
    pub ellipsoid: Ellipsoid,
    /// Latitude of origin (degrees).
    pub lat0: f64,
    /// Central meridian (degrees).
    pub lon0: f64,
    /// Scale factor on the central meridian.
    pub k0: f64,
    pub false_easting: f64,
    pub false_northing: f64,
    pub to_wgs84: Helmert,
}

/// Israeli Transverse Mercator grid (the table's planar frame).
pub const ISRAELI_TM: TransverseMercator = TransverseMercator {
    ellipsoid: GRS80,
    lat0: 31.734_393_611_111_1,
    lon0: 35.204_516_944_444_4,
    k0: 1.000_006_7,
    false_easting: 219_529.584,
    false_northing: 626_907.39,
    to_wgs84: Helmert {
        tx: -24.0024,
        ty: -17.1032,
        tz: -17.8444,
        rx: -0.33077,
        ry: -1.85269,
        rz: 1.66969,
        ppm: 5.4248,
    },
};

/// Longitude/latitude in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LonLat {
    pub lon: f64,
    pub lat: f64,
}

/// Convert an Israeli TM planar point to WGS84 longitude/latitude.
#[must_use]
pub fn planar_to_geographic(planar: Point) -> Option<LonLat> {
    ISRAELI_TM.to_geographic(planar)
}

/// Convert WGS84 longitude/latitude to an Israeli TM planar point.
#[must_use]
pub fn geographic_to_planar(lon: f64, lat: f64) -> Option<Point> {
    ISRAELI_TM.to_planar(LonLat { lon, lat })
}

/// All four viewport corners as WGS84 `[sw, se, nw, ne]`.
#[must_use]
pub fn viewport_geographic_corners(viewport: &Viewport) -> Option<[LonLat; 4]> {
    let c = viewport.corners();
    Some([
        planar_to_geographic(c.sw)?,
        planar_to_geographic(c.se)?,
        planar_to_geographic(c.nw)?,
        planar_to_geographic(c.ne)?,
    ])
}

impl TransverseMercator {
    /// Grid coordinates → WGS84 degrees.
    #[must_use]
    pub fn to_geographic(&self, planar: Point) -> Option<LonLat> {
        if !planar.is_finite() {
            return None;
        }
        let (lat, lon) = self.inverse(planar.x, planar.y);
        let local = geodetic_to_ecef(lat, lon, &self.ellipsoid);
        let shifted = helmert_matrix(&self.to_wgs84).apply(local);
        let (lat, lon) = ecef_to_geodetic(shifted, &WGS84);
        finite_lon_lat(lon.to_degrees(), lat.to_degrees())
    }

    /// WGS84 degrees → grid coordinates.
    #[must_use]
    pub fn to_planar(&self, geo: LonLat) -> Option<Point> {
        if !geo.lon.is_finite() || !geo.lat.is_finite() || geo.lat.abs() >= 90.0 {
            return None;
        }
        let wgs = geodetic_to_ecef(geo.lat.to_radians(), geo.lon.to_radians(), &WGS84);
        let local = helmert_matrix(&self.to_wgs84).invert()?.apply(wgs);
        let (lat, lon) = ecef_to_geodetic(local, &self.ellipsoid);
        let (x, y) = self.forward(lat, lon);
        let p = Point::new(x, y);
        p.is_finite().then_some(p)
    }

    /// Meridional arc length from the equator to `phi` (radians).
    fn meridian_arc(&self, phi: f64) -> f64 {
        let e2 = self.ellipsoid.e2();
        let e4 = e2 * e2;
        let e6 = e4 * e2;
        self.ellipsoid.a
            * ((1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0) * phi
                - (3.0 * e2 / 8.0 + 3.0 * e4 / 32.0 + 45.0 * e6 / 1024.0) * (2.0 * phi).sin()
                + (15.0 * e4 / 256.0 + 45.0 * e6 / 1024.0) * (4.0 * phi).sin()
                - (35.0 * e6 / 3072.0) * (6.0 * phi).sin())
    }

    /// Geodetic radians on the grid ellipsoid → grid meters.
    fn forward(&self, phi: f64, lambda: f64) -> (f64, f64) {
        let e2 = self.ellipsoid.e2();
        let ep2 = e2 / (1.0 - e2);
        let sin_phi = phi.sin();
        let cos_phi = phi.cos();
        let tan_phi = phi.tan();

        let n = self.ellipsoid.a / (1.0 - e2 * sin_phi * sin_phi).sqrt();
        let t = tan_phi * tan_phi;
        let c = ep2 * cos_phi * cos_phi;
        let a = (lambda - self.lon0.to_radians()) * cos_phi;
        let m = self.meridian_arc(phi);
        let m0 = self.meridian_arc(self.lat0.to_radians());

        let x = self.k0
            * n
            * (a + (1.0 - t + c) * a.powi(3) / 6.0
                + (5.0 - 18.0 * t + t * t + 72.0 * c - 58.0 * ep2) * a.powi(5) / 120.0);
        let y = self.k0
            * (m - m0
                + n * tan_phi
                    * (a * a / 2.0
                        + (5.0 - t + 9.0 * c + 4.0 * c * c) * a.powi(4) / 24.0
                        + (61.0 - 58.0 * t + t * t + 600.0 * c - 330.0 * ep2) * a.powi(6) / 720.0));

        (x + self.false_easting, y + self.false_northing)
    }

    /// Grid meters → geodetic radians `(phi, lambda)` on the grid ellipsoid.
    fn inverse(&self, easting: f64, northing: f64) -> (f64, f64) {
        let a_axis = self.ellipsoid.a;
        let e2 = self.ellipsoid.e2();
        let e4 = e2 * e2;
        let e6 = e4 * e2;
        let ep2 = e2 / (1.0 - e2);

        let x = easting - self.false_easting;
        let m = self.meridian_arc(self.lat0.to_radians()) + (northing - self.false_northing) / self.k0;
        let mu = m / (a_axis * (1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0));
        let e1 = (1.0 - (1.0 - e2).sqrt()) / (1.0 + (1.0 - e2).sqrt());

        let phi1 = mu
            + (3.0 * e1 / 2.0 - 27.0 * e1.powi(3) / 32.0) * (2.0 * mu).sin()
            + (21.0 * e1 * e1 / 16.0 - 55.0 * e1.powi(4) / 32.0) * (4.0 * mu).sin()
            + (151.0 * e1.powi(3) / 96.0) * (6.0 * mu).sin()
            + (1097.0 * e1.powi(4) / 512.0) * (8.0 * mu).sin();

        let sin1 = phi1.sin();
        let cos1 = phi1.cos();
        let tan1 = phi1.tan();
        let c1 = ep2 * cos1 * cos1;
        let t1 = tan1 * tan1;
        let denom = 1.0 - e2 * sin1 * sin1;
        let n1 = a_axis / denom.sqrt();
        let r1 = a_axis * (1.0 - e2) / denom.powf(1.5);
        let d = x / (n1 * self.k0);

        let phi = phi1
            - (n1 * tan1 / r1)
                * (d * d / 2.0
                    - (5.0 + 3.0 * t1 + 10.0 * c1 - 4.0 * c1 * c1 - 9.0 * ep2) * d.powi(4) / 24.0
                    + (61.0 + 90.0 * t1 + 298.0 * c1 + 45.0 * t1 * t1 - 252.0 * ep2 - 3.0 * c1 * c1)
                        * d.powi(6)
                        / 720.0);
        let lambda = self.lon0.to_radians()
            + (d - (1.0 + 2.0 * t1 + c1) * d.powi(3) / 6.0
                + (5.0 - 2.0 * c1 + 28.0 * t1 - 3.0 * c1 * c1 + 8.0 * ep2 + 24.0 * t1 * t1) * d.powi(5) / 120.0)
                / cos1;

        (phi, lambda)
    }
}

fn finite_lon_lat(lon: f64, lat: f64) -> Option<LonLat> {
    (lon.is_finite() && lat.is_finite()).then_some(LonLat { lon, lat })
}

// =============================================================================
// GEOCENTRIC HELPERS
// =============================================================================

fn geodetic_to_ecef(phi: f64, lambda: f64, ellipsoid: &Ellipsoid) -> [f64; 3] {
    let e2 = ellipsoid.e2();
    let sin_phi = phi.sin();
    let cos_phi = phi.cos();
    let n = ellipsoid.a / (1.0 - e2 * sin_phi * sin_phi).sqrt();
    [n * cos_phi * lambda.cos(), n * cos_phi * lambda.sin(), n * (1.0 - e2) * sin_phi]
}

/// Bowring's closed form; height is discarded.
fn ecef_to_geodetic(p: [f64; 3], ellipsoid: &Ellipsoid) -> (f64, f64) {
    let a = ellipsoid.a;
    let b = a * (1.0 - ellipsoid.f);
    let e2 = ellipsoid.e2();
    let ep2 = (a * a - b * b) / (b * b);

    let r = (p[0] * p[0] + p[1] * p[1]).sqrt();
    let lambda = p[1].atan2(p[0]);
    let theta = (p[2] * a).atan2(r * b);
    let (sin_t, cos_t) = theta.sin_cos();
    let phi = (p[2] + ep2 * b * sin_t.powi(3)).atan2(r - e2 * a * cos_t.powi(3));
    (phi, lambda)
}

/// `x' = t + m · x`.
#[derive(Debug, Clone, Copy)]
struct Affine3 {
    m: [[f64; 3]; 3],
    t: [f64; 3],
}

impl Affine3 {
    fn apply(&self, p: [f64; 3]) -> [f64; 3] {
        let m = &self.m;
        [
            self.t[0] + m[0][0] * p[0] + m[0][1] * p[1] + m[0][2] * p[2],
            self.t[1] + m[1][0] * p[0] + m[1][1] * p[1] + m[1][2] * p[2],
            self.t[2] + m[2][0] * p[0] + m[2][1] * p[1] + m[2][2] * p[2],
        ]
    }

    /// Exact inverse: `x = m⁻¹ · (x' − t)`.
    fn invert(&self) -> Option<Self> {
        let m = &self.m;
        let det = m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
            - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
            + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0]);
        if det.abs() < f64::EPSILON {
            return None;
        }
        let inv = [
            [
                (m[1][1] * m[2][2] - m[1][2] * m[2][1]) / det,
                (m[0][2] * m[2][1] - m[0][1] * m[2][2]) / det,
                (m[0][1] * m[1][2] - m[0][2] * m[1][1]) / det,
            ],
            [
                (m[1][2] * m[2][0] - m[1][0] * m[2][2]) / det,
                (m[0][0] * m[2][2] - m[0][2] * m[2][0]) / det,
                (m[0][2] * m[1][0] - m[0][0] * m[1][2]) / det,
            ],
            [
                (m[1][0] * m[2][1] - m[1][1] * m[2][0]) / det,
                (m[0][1] * m[2][0] - m[0][0] * m[2][1]) / det,
                (m[0][0] * m[1][1] - m[0][1] * m[1][0]) / det,
            ],
        ];
        let t = [
            -(inv[0][0] * self.t[0] + inv[0][1] * self.t[1] + inv[0][2] * self.t[2]),
            -(inv[1][0] * self.t[0] + inv[1][1] * self.t[1] + inv[1][2] * self.t[2]),
            -(inv[2][0] * self.t[0] + inv[2][1] * self.t[1] + inv[2][2] * self.t[2]),
        ];
        Some(Self { m: inv, t })
    }
}

fn helmert_matrix(h: &Helmert) -> Affine3 {
    const ARCSEC: f64 = std::f64::consts::PI / (180.0 * 3600.0);
    let rx = h.rx * ARCSEC;
    let ry = h.ry * ARCSEC;
    let rz = h.rz * ARCSEC;
    let s = 1.0 + h.ppm * 1e-6;
    Affine3 {
        m: [[s, -s * rz, s * ry], [s * rz, s, -s * rx], [-s * ry, s * rx, s]],
        t: [h.tx, h.ty, h.tz],
    }
}
