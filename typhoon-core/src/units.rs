//! Coordinate and unit helpers shared by every parser.
//!
//! Everything here is pure: no I/O, no allocation beyond the returned value.

use crate::model::Category;

/// Nautical miles (or knots) to kilometres (or km/h).
pub const NM_TO_KM: f64 = 1.852;

/// Statute miles per hour to knots.
pub const MPH_TO_KNOTS: f64 = 0.868976;

/// Degrees returned by [`degrees_from_compass`] for labels it does not know.
pub const UNKNOWN_COMPASS_DEGREES: f64 = 0.0;

const COMPASS_POINTS: [&str; 16] = [
    "N", "NNE", "NE", "ENE", "E", "ESE", "SE", "SSE", "S", "SSW", "SW", "WSW", "W", "WNW", "NW",
    "NNW",
];

/// Parses an ATCF-style coordinate token such as `125N` or `1400E`.
///
/// The digits are tenths of a degree; `S` and `W` negate the value.
/// Returns `None` when the token is empty, has no hemisphere letter, or
/// the digits are not numeric.
pub fn parse_fixed_format_coordinate(token: &str) -> Option<f64> {
    let token = token.trim();
    let hemisphere = token.chars().last()?;
    let digits = &token[..token.len() - hemisphere.len_utf8()];

    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let magnitude = digits.parse::<f64>().ok()? / 10.0;

    match hemisphere.to_ascii_uppercase() {
        'N' | 'E' => Some(magnitude),
        'S' | 'W' => Some(-magnitude),
        _ => None,
    }
}

/// Maps a 16-point compass label to degrees clockwise from north.
///
/// Unknown labels fall back to [`UNKNOWN_COMPASS_DEGREES`].
pub fn degrees_from_compass(label: &str) -> f64 {
    let label = label.trim().to_ascii_uppercase();

    COMPASS_POINTS
        .iter()
        .position(|p| *p == label)
        .map_or(UNKNOWN_COMPASS_DEGREES, |i| i as f64 * 22.5)
}

/// Nearest 16-point compass label for a heading in degrees.
pub fn compass_from_degrees(degrees: f64) -> &'static str {
    if !degrees.is_finite() {
        return COMPASS_POINTS[0];
    }

    let index = (degrees.rem_euclid(360.0) / 22.5).round() as usize % COMPASS_POINTS.len();
    COMPASS_POINTS[index]
}

pub fn knots_to_kph(knots: f64) -> f64 {
    (knots * NM_TO_KM).round()
}

pub fn mph_to_knots(mph: f64) -> f64 {
    (mph * MPH_TO_KNOTS).round()
}

/// Saffir-Simpson style classification from sustained wind in knots.
pub fn category_from_wind_speed(knots: f64) -> Category {
    Category::from_wind_speed(knots)
}

/// `true` when both values are finite and inside WGS84 bounds.
pub fn is_valid_lon_lat(lon: f64, lat: f64) -> bool {
    lon.is_finite()
        && lat.is_finite()
        && (-180.0..=180.0).contains(&lon)
        && (-90.0..=90.0).contains(&lat)
}
