//! Conversions between WGS84 latitude/longitude, OSGB36 easting/northing and
//! British National Grid references.

mod dms;
mod ellipsoid;
mod ngr;
mod projection;

use log::{error, warn};
use serde::{Deserialize, Serialize};

use crate::error::GridError;
use ellipsoid::{AIRY_1830, AIRY_1830_TO_GRS80, GRS80, GRS80_TO_AIRY_1830};

pub use dms::{Dms, degrees_to_dms, dms_to_degrees};
pub use ngr::{DIGIT_COUNTS, valid_projected, valid_ngr};

/// WGS84 latitude/longitude in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// OSGB36 National Grid coordinates in whole metres.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProjectedPoint {
    pub easting: i64,
    pub northing: i64,
}

impl ProjectedPoint {
    pub fn new(easting: i64, northing: i64) -> Self {
        Self { easting, northing }
    }

    /// Straight-line distance in metres.
    pub fn distance_to(&self, other: &ProjectedPoint) -> f64 {
        let de = (other.easting - self.easting) as f64;
        let dn = (other.northing - self.northing) as f64;
        (de * de + dn * dn).sqrt()
    }

    /// Sum of the absolute easting and northing differences in metres.
    pub fn manhattan_distance_to(&self, other: &ProjectedPoint) -> i64 {
        (other.easting - self.easting).abs() + (other.northing - self.northing).abs()
    }
}

/// Anything that can be turned back into latitude/longitude.
#[derive(Debug, Clone, PartialEq)]
pub enum GridInput<'a> {
    Projected(ProjectedPoint),
    Reference(&'a str),
}

impl From<ProjectedPoint> for GridInput<'_> {
    fn from(p: ProjectedPoint) -> Self {
        GridInput::Projected(p)
    }
}

impl<'a> From<&'a str> for GridInput<'a> {
    fn from(s: &'a str) -> Self {
        GridInput::Reference(s)
    }
}

/// WGS84 latitude/longitude to OSGB36 grid coordinates, truncated to whole metres.
///
/// No range checking is done: points far outside Great Britain still
/// produce numbers, just meaningless ones.
pub fn to_projected(point: GeoPoint) -> ProjectedPoint {
    let grs80 = GRS80.to_cartesian(point.latitude.to_radians(), point.longitude.to_radians());
    let airy = GRS80_TO_AIRY_1830.apply(&grs80);
    let (lat, lon) = AIRY_1830.to_geodetic(&airy);
    let (east, north) = projection::project(lat, lon);

    ProjectedPoint {
        easting: east as i64,
        northing: north as i64,
    }
}

/// OSGB36 grid coordinates or grid reference to WGS84, rounded to 5 decimal places.
pub fn to_geographic<'a>(input: impl Into<GridInput<'a>>) -> Result<GeoPoint, GridError> {
    let point = match input.into() {
        GridInput::Projected(p) => p,
        GridInput::Reference(ngr) => ngr::decode(ngr)?,
    };

    let (lat, lon) = projection::unproject(point.easting as f64, point.northing as f64);
    let airy = AIRY_1830.to_cartesian(lat, lon);
    let grs80 = AIRY_1830_TO_GRS80.apply(&airy);
    let (lat, lon) = GRS80.to_geodetic(&grs80);

    Ok(GeoPoint {
        latitude: round5(lat.to_degrees()),
        longitude: round5(lon.to_degrees()),
    })
}

/// Grid reference with `digits` (4, 6, 8 or 10) digits for a projected point.
pub fn projected_to_ngr(point: ProjectedPoint, digits: u8) -> Result<String, GridError> {
    ngr::encode(point, digits)
}

/// South-west corner of the square named by a grid reference.
pub fn ngr_to_projected(ngr: &str) -> Result<ProjectedPoint, GridError> {
    ngr::decode(ngr)
}

fn round5(value: f64) -> f64 {
    (value * 100_000.0).round() / 100_000.0
}

/// What a [`GridConverter`] does when a conversion fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureMode {
    /// Log the failure and exit the process with status 1.
    #[default]
    Terminate,
    /// Log the failure and hand the error back to the caller.
    Raise,
}

impl FailureMode {
    /// Apply the policy to the outcome of `operation`.
    pub fn settle<T, E: std::fmt::Display>(self, operation: &str, result: Result<T, E>) -> Result<T, E> {
        result.map_err(|e| match self {
            FailureMode::Terminate => {
                error!("{operation}: {e}");
                std::process::exit(1)
            }
            FailureMode::Raise => {
                warn!("{operation}: {e}");
                e
            }
        })
    }
}

/// Coordinate conversions bound to a failure policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct GridConverter {
    mode: FailureMode,
}

impl GridConverter {
    pub fn new(mode: FailureMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> FailureMode {
        self.mode
    }

    pub fn to_projected(&self, point: GeoPoint) -> ProjectedPoint {
        to_projected(point)
    }

    pub fn to_geographic<'a>(&self, input: impl Into<GridInput<'a>>) -> Result<GeoPoint, GridError> {
        self.settle("to_geographic", to_geographic(input))
    }

    pub fn projected_to_ngr(&self, point: ProjectedPoint, digits: u8) -> Result<String, GridError> {
        self.settle("projected_to_ngr", projected_to_ngr(point, digits))
    }

    pub fn ngr_to_projected(&self, ngr: &str) -> Result<ProjectedPoint, GridError> {
        self.settle("ngr_to_projected", ngr_to_projected(ngr))
    }

    /// Grid reference straight from latitude/longitude.
    pub fn to_ngr(&self, point: GeoPoint, digits: u8) -> Result<String, GridError> {
        self.projected_to_ngr(self.to_projected(point), digits)
    }

    fn settle<T>(&self, operation: &str, result: Result<T, GridError>) -> Result<T, GridError> {
        self.mode.settle(operation, result)
    }
}
