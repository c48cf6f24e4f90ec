//! Reference ellipsoids and the seven-parameter Helmert shift between them.

use std::f64::consts::PI;

const ARC_SECOND: f64 = PI / (180.0 * 3600.0);

/// Successive latitude estimates closer than this (radians) end the iteration.
const LATITUDE_EPSILON: f64 = 1e-16;

/// Adjacent floating point values can alternate forever below `LATITUDE_EPSILON`.
const MAX_ITERATIONS: usize = 64;

/// Reference ellipsoid parameters.
#[derive(Clone, Copy, Debug)]
pub struct Ellipsoid {
    /// Semi-major axis (metres)
    pub a: f64,
    /// Semi-minor axis (metres)
    pub b: f64,
    /// First eccentricity squared
    pub e2: f64,
    /// Third flattening: (a - b) / (a + b)
    pub n: f64,
}

impl Ellipsoid {
    pub const fn new(a: f64, b: f64) -> Self {
        Self {
            a,
            b,
            e2: 1.0 - (b * b) / (a * a),
            n: (a - b) / (a + b),
        }
    }

    /// Transverse radius of curvature at `lat` (radians).
    pub fn prime_vertical_radius(&self, lat: f64) -> f64 {
        self.a / (1.0 - self.e2 * lat.sin().powi(2)).sqrt()
    }

    /// Geodetic latitude/longitude (radians) on the ellipsoid surface to Cartesian.
    pub fn to_cartesian(&self, lat: f64, lon: f64) -> Cartesian {
        let nu = self.prime_vertical_radius(lat);
        Cartesian {
            x: nu * lat.cos() * lon.cos(),
            y: nu * lat.cos() * lon.sin(),
            z: (1.0 - self.e2) * nu * lat.sin(),
        }
    }

    /// Cartesian to geodetic latitude/longitude (radians), height discarded.
    pub fn to_geodetic(&self, c: &Cartesian) -> (f64, f64) {
        let p = (c.x * c.x + c.y * c.y).sqrt();

        let mut lat = c.z.atan2(p * (1.0 - self.e2));
        let mut previous = 2.0 * PI;
        let mut iterations = 0;
        while (lat - previous).abs() > LATITUDE_EPSILON && iterations < MAX_ITERATIONS {
            previous = lat;
            let nu = self.prime_vertical_radius(previous);
            lat = (c.z + self.e2 * nu * previous.sin()).atan2(p);
            iterations += 1;
        }

        (lat, c.y.atan2(c.x))
    }
}

/// GRS80, the ellipsoid underlying WGS84.
pub const GRS80: Ellipsoid = Ellipsoid::new(6_378_137.000, 6_356_752.3141);

/// Airy 1830, the ellipsoid underlying OSGB36.
pub const AIRY_1830: Ellipsoid = Ellipsoid::new(6_377_563.396, 6_356_256.909);

/// Earth-centred Cartesian coordinates in metres.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Cartesian {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Small-angle similarity transform: translation (m), rotation (rad), scale - 1.
#[derive(Clone, Copy, Debug)]
pub struct Helmert {
    pub tx: f64,
    pub ty: f64,
    pub tz: f64,
    pub rx: f64,
    pub ry: f64,
    pub rz: f64,
    pub s: f64,
}

impl Helmert {
    /// Approximate inverse, exact to first order for the small parameters involved.
    pub const fn inverse(&self) -> Self {
        Self {
            tx: -self.tx,
            ty: -self.ty,
            tz: -self.tz,
            rx: -self.rx,
            ry: -self.ry,
            rz: -self.rz,
            s: -self.s,
        }
    }

    pub fn apply(&self, c: &Cartesian) -> Cartesian {
        let scale = 1.0 + self.s;
        Cartesian {
            x: self.tx + scale * c.x - self.rz * c.y + self.ry * c.z,
            y: self.ty + self.rz * c.x + scale * c.y - self.rx * c.z,
            z: self.tz - self.ry * c.x + self.rx * c.y + scale * c.z,
        }
    }
}

/// GRS80 (WGS84) to Airy 1830 (OSGB36).
pub const GRS80_TO_AIRY_1830: Helmert = Helmert {
    tx: -446.448,
    ty: 125.157,
    tz: -542.060,
    rx: -0.1502 * ARC_SECOND,
    ry: -0.2470 * ARC_SECOND,
    rz: -0.8421 * ARC_SECOND,
    s: 20.4894e-6,
};

/// Airy 1830 (OSGB36) to GRS80 (WGS84).
pub const AIRY_1830_TO_GRS80: Helmert = GRS80_TO_AIRY_1830.inverse();
