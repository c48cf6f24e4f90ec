//! Transverse Mercator projection of the Airy 1830 ellipsoid onto the
//! OSGB36 National Grid.

use super::ellipsoid::AIRY_1830;

/// Scale factor on the central meridian.
pub const F0: f64 = 0.9996012717;
/// Latitude of true origin, 49°N (radians).
pub const LAT0: f64 = 49.0 * std::f64::consts::PI / 180.0;
/// Longitude of true origin and central meridian, 2°W (radians).
pub const LON0: f64 = -2.0 * std::f64::consts::PI / 180.0;
/// Grid easting of true origin (m).
pub const E0: f64 = 400_000.0;
/// Grid northing of true origin (m).
pub const N0: f64 = -100_000.0;

/// Residual of the inverse meridional arc iteration (m).
const ARC_TOLERANCE: f64 = 0.00001;
const MAX_ARC_ITERATIONS: usize = 100;

/// Meridional arc from the true origin latitude to `lat`, series to n³.
fn meridional_arc(lat: f64) -> f64 {
    let n = AIRY_1830.n;
    let (n2, n3) = (n * n, n * n * n);

    let m1 = (1.0 + n + 1.25 * n2 + 1.25 * n3) * (lat - LAT0);
    let m2 = (3.0 * n + 3.0 * n2 + 21.0 / 8.0 * n3) * (lat - LAT0).sin() * (lat + LAT0).cos();
    let m3 = (15.0 / 8.0 * n2 + 15.0 / 8.0 * n3)
        * (2.0 * (lat - LAT0)).sin()
        * (2.0 * (lat + LAT0)).cos();
    let m4 = 35.0 / 24.0 * n3 * (3.0 * (lat - LAT0)).sin() * (3.0 * (lat + LAT0)).cos();

    AIRY_1830.b * F0 * (m1 - m2 + m3 - m4)
}

/// Scaled transverse and meridional radii of curvature, and eta² = nu/rho - 1.
fn curvature(lat: f64) -> (f64, f64, f64) {
    let s2 = 1.0 - AIRY_1830.e2 * lat.sin().powi(2);
    let nu = AIRY_1830.a * F0 / s2.sqrt();
    let rho = AIRY_1830.a * F0 * (1.0 - AIRY_1830.e2) / s2.powf(1.5);
    (nu, rho, nu / rho - 1.0)
}

/// Airy 1830 latitude/longitude (radians) to unrounded grid easting/northing.
pub fn project(lat: f64, lon: f64) -> (f64, f64) {
    let (nu, rho, eta2) = curvature(lat);
    let (sin, cos, tan) = (lat.sin(), lat.cos(), lat.tan());
    let tan2 = tan * tan;
    let tan4 = tan2 * tan2;

    let i = meridional_arc(lat) + N0;
    let ii = nu * sin * cos / 2.0;
    let iii = nu * sin * cos.powi(3) * (5.0 - tan2 + 9.0 * eta2) / 24.0;
    let iiia = nu * sin * cos.powi(5) * (61.0 - 58.0 * tan2 + tan4) / 720.0;
    let iv = nu * cos;
    let v = nu * cos.powi(3) * (nu / rho - tan2) / 6.0;
    let vi = nu * cos.powi(5) * (5.0 - 18.0 * tan2 + tan4 + 14.0 * eta2 - 58.0 * eta2 * tan2)
        / 120.0;

    let dl = lon - LON0;
    let north = i + ii * dl.powi(2) + iii * dl.powi(4) + iiia * dl.powi(6);
    let east = E0 + iv * dl + v * dl.powi(3) + vi * dl.powi(5);

    (east, north)
}

/// Grid easting/northing to Airy 1830 latitude/longitude (radians).
pub fn unproject(east: f64, north: f64) -> (f64, f64) {
    let mut lat = LAT0;
    let mut m = 0.0;
    let mut iterations = 0;
    while (north - N0 - m).abs() >= ARC_TOLERANCE && iterations < MAX_ARC_ITERATIONS {
        lat += (north - N0 - m) / (AIRY_1830.a * F0);
        m = meridional_arc(lat);
        iterations += 1;
    }

    let (nu, rho, eta2) = curvature(lat);
    let tan = lat.tan();
    let tan2 = tan * tan;
    let tan4 = tan2 * tan2;
    let tan6 = tan4 * tan2;
    let sec = 1.0 / lat.cos();

    let vii = tan / (2.0 * rho * nu);
    let viii = tan / (24.0 * rho * nu.powi(3)) * (5.0 + 3.0 * tan2 + eta2 - 9.0 * tan2 * eta2);
    let ix = tan / (720.0 * rho * nu.powi(5)) * (61.0 + 90.0 * tan2 + 45.0 * tan4);
    let x = sec / nu;
    let xi = sec / (6.0 * nu.powi(3)) * (nu / rho + 2.0 * tan2);
    let xii = sec / (120.0 * nu.powi(5)) * (5.0 + 28.0 * tan2 + 24.0 * tan4);
    let xiia = sec / (5040.0 * nu.powi(7)) * (61.0 + 662.0 * tan2 + 1320.0 * tan4 + 720.0 * tan6);

    let de = east - E0;
    let lat = lat - vii * de.powi(2) + viii * de.powi(4) - ix * de.powi(6);
    let lon = LON0 + x * de - xi * de.powi(3) + xii * de.powi(5) - xiia * de.powi(7);

    (lat, lon)
}
