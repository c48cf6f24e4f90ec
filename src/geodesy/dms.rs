//! Decimal degrees to and from degrees, minutes and seconds.

use serde::{Deserialize, Serialize};

/// An angle split into whole degrees, minutes and seconds.
///
/// Every non-zero component carries the sign of the angle, so angles
/// between 0° and -1° keep their sign through the minutes or seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dms {
    pub degrees: i32,
    pub minutes: i32,
    pub seconds: i32,
}

impl Dms {
    pub fn new(degrees: i32, minutes: i32, seconds: i32) -> Self {
        Self {
            degrees,
            minutes,
            seconds,
        }
    }

    pub fn is_negative(&self) -> bool {
        self.degrees < 0 || self.minutes < 0 || self.seconds < 0
    }
}

impl std::fmt::Display for Dms {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.is_negative() { "-" } else { "" };
        write!(
            f,
            "{sign}{}°{:02}'{:02}\"",
            self.degrees.abs(),
            self.minutes.abs(),
            self.seconds.abs()
        )
    }
}

/// Split decimal degrees, rounding seconds half-up and carrying into minutes and degrees.
pub fn degrees_to_dms(value: f64) -> Dms {
    let negative = value < 0.0;
    let value = value.abs();

    let mut degrees = value.floor();
    let minutes = (value - degrees) * 60.0;
    let mut whole_minutes = minutes.floor();
    let mut seconds = ((minutes - whole_minutes) * 60.0 + 0.5).floor();

    if seconds >= 60.0 {
        seconds = 0.0;
        whole_minutes += 1.0;
    }
    if whole_minutes >= 60.0 {
        whole_minutes = 0.0;
        degrees += 1.0;
    }

    let (d, m, s) = (degrees as i32, whole_minutes as i32, seconds as i32);
    if negative {
        Dms::new(-d, -m, -s)
    } else {
        Dms::new(d, m, s)
    }
}

/// Combine degrees, minutes and seconds into decimal degrees rounded to 4 places.
pub fn dms_to_degrees(dms: Dms) -> f64 {
    let magnitude = f64::from(dms.degrees.abs())
        + f64::from(dms.minutes.abs()) / 60.0
        + f64::from(dms.seconds.abs()) / 3600.0;
    let rounded = (magnitude * 10_000.0).round() / 10_000.0;
    if dms.is_negative() { -rounded } else { rounded }
}
