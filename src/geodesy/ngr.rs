//! British National Grid references: two-letter 100 km square plus digit pairs.

use super::ProjectedPoint;
use crate::error::GridError;

const SQUARE: i64 = 100_000;

/// 100 km squares, northernmost row first; column is the easting index.
const REGIONS: [[&str; 7]; 13] = [
    ["HL", "HM", "HN", "HO", "HP", "JL", "JM"],
    ["HQ", "HR", "HS", "HT", "HU", "JQ", "JR"],
    ["HV", "HW", "HX", "HY", "HZ", "JV", "JW"],
    ["NA", "NB", "NC", "ND", "NE", "OA", "OB"],
    ["NF", "NG", "NH", "NJ", "NK", "OF", "OG"],
    ["NL", "NM", "NN", "NO", "NP", "OL", "OM"],
    ["NQ", "NR", "NS", "NT", "NU", "OQ", "OR"],
    ["NV", "NW", "NX", "NY", "NZ", "OV", "OW"],
    ["SA", "SB", "SC", "SD", "SE", "TA", "TB"],
    ["SF", "SG", "SH", "SJ", "SK", "TF", "TG"],
    ["SL", "SM", "SN", "SO", "SP", "TL", "TM"],
    ["SQ", "SR", "SS", "ST", "SU", "TQ", "TR"],
    ["SV", "SW", "SX", "SY", "SZ", "TV", "TW"],
];

/// Digit counts accepted for grid references: 1 km, 100 m, 10 m and 1 m resolution.
pub const DIGIT_COUNTS: [u8; 4] = [4, 6, 8, 10];

/// Two-letter code of the square containing the given 100 km indices.
fn region_at(x: i64, y: i64) -> Option<&'static str> {
    let column = usize::try_from(x).ok()?;
    let row_from_south = usize::try_from(y).ok()?;
    let row = (REGIONS.len() - 1).checked_sub(row_from_south)?;
    REGIONS.get(row)?.get(column).copied()
}

/// 100 km indices (easting, northing) of a region code, case-insensitive.
fn region_index(code: &str) -> Option<(i64, i64)> {
    let code = code.to_ascii_uppercase();
    REGIONS.iter().enumerate().find_map(|(row, columns)| {
        columns.iter().position(|c| *c == code).map(|column| {
            (column as i64, (REGIONS.len() - 1 - row) as i64)
        })
    })
}

/// Metres represented by the last digit of a grid reference with `digits` digits.
fn resolution(digits: u8) -> Result<i64, GridError> {
    if !DIGIT_COUNTS.contains(&digits) {
        return Err(GridError::InvalidFormat(format!(
            "{digits} digits requested, expected one of 4, 6, 8 or 10"
        )));
    }
    Ok(10_i64.pow(5 - u32::from(digits) / 2))
}

/// Format a projected point as a grid reference with `digits` digits.
pub fn encode(point: ProjectedPoint, digits: u8) -> Result<String, GridError> {
    let factor = resolution(digits)?;
    let x = point.easting.div_euclid(SQUARE);
    let y = point.northing.div_euclid(SQUARE);
    let region = region_at(x, y).ok_or(GridError::OutOfRegion {
        easting: point.easting,
        northing: point.northing,
    })?;

    let width = usize::from(digits / 2);
    let east = (point.easting - x * SQUARE) / factor;
    let north = (point.northing - y * SQUARE) / factor;
    Ok(format!("{region}{east:0width$}{north:0width$}"))
}

/// Parse a grid reference into the south-west corner of the square it denotes.
pub fn decode(ngr: &str) -> Result<ProjectedPoint, GridError> {
    let (code, digits) = split(ngr)?;
    let (x, y) = region_index(code).ok_or_else(|| GridError::UnknownRegion(code.to_string()))?;

    let half = digits.len() / 2;
    let factor = 10_i64.pow(5 - half as u32);
    let parse = |s: &str| {
        s.parse::<i64>()
            .map_err(|_| GridError::InvalidFormat(ngr.to_string()))
    };
    let east = parse(&digits[..half])?;
    let north = parse(&digits[half..])?;

    Ok(ProjectedPoint {
        easting: east * factor + x * SQUARE,
        northing: north * factor + y * SQUARE,
    })
}

/// Split `ngr` into its letter pair and digits, checking the overall shape.
fn split(ngr: &str) -> Result<(&str, &str), GridError> {
    let bad = || GridError::InvalidFormat(ngr.to_string());
    if !ngr.is_ascii() || ngr.len() < 2 {
        return Err(bad());
    }
    let (code, digits) = ngr.split_at(2);
    let shape_ok = code.bytes().all(|b| b.is_ascii_alphabetic())
        && digits.bytes().all(|b| b.is_ascii_digit())
        && matches!(digits.len(), 4 | 6 | 8 | 10);
    if shape_ok { Ok((code, digits)) } else { Err(bad()) }
}

/// True if the point lies inside one of the 100 km squares.
pub fn valid_projected(point: ProjectedPoint) -> bool {
    region_at(
        point.easting.div_euclid(SQUARE),
        point.northing.div_euclid(SQUARE),
    )
    .is_some()
}

/// True if `ngr` is well formed and names a known square.
pub fn valid_ngr(ngr: &str) -> bool {
    split(ngr).is_ok_and(|(code, _)| region_index(code).is_some())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pt(easting: i64, northing: i64) -> ProjectedPoint {
        ProjectedPoint { easting, northing }
    }

    #[test]
    fn test_encode_all_precisions() {
        let p = pt(419260, 364482);
        assert_eq!(encode(p, 4).unwrap(), "SK1964");
        assert_eq!(encode(p, 6).unwrap(), "SK192644");
        assert_eq!(encode(p, 8).unwrap(), "SK19266448");
        assert_eq!(encode(p, 10).unwrap(), "SK1926064482");
    }

    #[test]
    fn test_encode_zero_padding() {
        assert_eq!(encode(pt(327550, 672950), 6).unwrap(), "NT275729");
        assert_eq!(encode(pt(400005, 100070), 10).unwrap(), "SU0000500070");
    }

    #[test]
    fn test_region_table_corners() {
        assert_eq!(encode(pt(0, 0), 4).unwrap(), "SV0000");
        assert_eq!(encode(pt(699_999, 0), 4).unwrap(), "TW9900");
        assert_eq!(encode(pt(0, 1_299_999), 4).unwrap(), "HL0099");
        assert_eq!(encode(pt(699_999, 1_299_999), 4).unwrap(), "JM9999");
    }

    #[test]
    fn test_encode_out_of_region() {
        for p in [pt(-704174, 4227357), pt(700_000, 10), pt(10, 1_300_000), pt(-1, 10)] {
            assert_eq!(
                encode(p, 8),
                Err(GridError::OutOfRegion {
                    easting: p.easting,
                    northing: p.northing
                })
            );
        }
    }

    #[test]
    fn test_encode_invalid_digits() {
        for digits in [0, 2, 5, 7, 12] {
            assert!(matches!(
                encode(pt(419260, 364482), digits),
                Err(GridError::InvalidFormat(_))
            ));
        }
    }

    #[test]
    fn test_decode() {
        assert_eq!(decode("NT2755072950").unwrap(), pt(327550, 672950));
        assert_eq!(decode("HU431392").unwrap(), pt(443100, 1139200));
        assert_eq!(decode("SJ637560").unwrap(), pt(363700, 356000));
        assert_eq!(decode("TV374354").unwrap(), pt(537400, 35400));
        assert_eq!(decode("SK1964").unwrap(), pt(419000, 364000));
    }

    #[test]
    fn test_decode_lowercase() {
        assert_eq!(decode("sk19266448").unwrap(), pt(419260, 364480));
    }

    #[test]
    fn test_decode_unknown_region() {
        assert_eq!(
            decode("ZZ2755072950"),
            Err(GridError::UnknownRegion("ZZ".to_string()))
        );
    }

    #[test]
    fn test_decode_bad_shape() {
        for ngr in ["", "S", "SK", "SK123", "SK12345", "SK123456789012", "1K1234", "SK12a4", "SKé234"] {
            assert!(
                matches!(decode(ngr), Err(GridError::InvalidFormat(_))),
                "{ngr} should be rejected"
            );
        }
    }

    #[test]
    fn test_round_trip_truncates_to_resolution() {
        let p = pt(419266, 364481);
        for (digits, step) in [(4, 1000), (6, 100), (8, 10), (10, 1)] {
            let back = decode(&encode(p, digits).unwrap()).unwrap();
            assert_eq!(back, pt(p.easting / step * step, p.northing / step * step));
        }
    }

    #[test]
    fn test_validity_checks() {
        assert!(valid_projected(pt(419260, 364482)));
        assert!(!valid_projected(pt(-704174, 4227357)));
        assert!(valid_ngr("SK1926064482"));
        assert!(!valid_ngr("ZZ2755072950"));
        assert!(!valid_ngr("SK123"));
    }
}
