//! Forecast cone and wind-radii display geometry.
//!
//! The cone is a circular simplification: each forecast point gets a
//! regular polygon whose radius grows with the forecast horizon. Official
//! cone products are built from skewed historical error envelopes, so these
//! shapes are illustrative and must not be presented as authoritative.

use geojson::{Feature, FeatureCollection, Geometry, JsonObject, Value};
use serde_json::json;

use crate::{
    model::{Coordinates, ForecastPoint, Quadrants, Typhoon, WindRadii},
    units::NM_TO_KM,
};

/// Vertices per cone circle, excluding the closing vertex.
pub const CONE_SEGMENTS: usize = 16;

pub const BASE_ERROR_NM: f64 = 50.0;
pub const ERROR_GROWTH_NM: f64 = 50.0;
pub const MAX_ERROR_NM: f64 = 300.0;
pub const MAX_CONE_RADIUS_DEGREES: f64 = 5.0;

const NM_PER_DEGREE: f64 = 60.0;
const HOURS_PER_STEP: u32 = 24;

/// Shrinks physical radii so circles stay readable at map zoom levels.
/// This is a presentation choice, not a unit conversion.
pub const VISUAL_RADIUS_SCALE: f64 = 0.15;

pub const FALLBACK_RADIUS_34KT_KM: f64 = 50.0;
pub const FALLBACK_RADIUS_50KT_KM: f64 = 30.0;
pub const FALLBACK_RADIUS_64KT_KM: f64 = 15.0;

/// One cone segment around a forecast point.
#[derive(Debug, Clone, PartialEq)]
pub struct ConePolygon {
    /// Position of the source point in the forecast sequence.
    pub index: usize,
    pub forecast_hour: u32,
    pub center: Coordinates,
    pub radius_degrees: f64,
    /// Closed ring: the first vertex is repeated at the end.
    pub ring: Vec<Coordinates>,
}

/// Error radius in degrees for the forecast point at `index`.
pub fn cone_radius_degrees(index: usize) -> f64 {
    let nm = (BASE_ERROR_NM + ERROR_GROWTH_NM * index as f64).min(MAX_ERROR_NM);
    (nm / NM_PER_DEGREE).min(MAX_CONE_RADIUS_DEGREES)
}

/// One polygon per usable forecast point; empty for an empty forecast.
///
/// Points with invalid coordinates contribute nothing. Vertices that fall
/// outside valid lon/lat are dropped, and a polygon left with fewer than
/// three distinct vertices is discarded.
pub fn calculate_uncertainty_cone(forecast: &[ForecastPoint]) -> Vec<ConePolygon> {
    forecast
        .iter()
        .enumerate()
        .filter(|(_, point)| point.coordinates.is_valid())
        .filter_map(|(index, point)| cone_polygon(index, point.coordinates))
        .collect()
}

fn cone_polygon(index: usize, center: Coordinates) -> Option<ConePolygon> {
    let radius = cone_radius_degrees(index);

    let mut ring: Vec<Coordinates> = (0..CONE_SEGMENTS)
        .map(|k| {
            let angle = std::f64::consts::TAU * k as f64 / CONE_SEGMENTS as f64;
            Coordinates::new(center.lon + radius * angle.cos(), center.lat + radius * angle.sin())
        })
        .filter(Coordinates::is_valid)
        .collect();

    if ring.len() < 3 {
        return None;
    }
    ring.push(ring[0]);

    Some(ConePolygon {
        index,
        forecast_hour: (index as u32 + 1) * HOURS_PER_STEP,
        center,
        radius_degrees: radius,
        ring,
    })
}

/// Current position followed by the valid forecast positions.
pub fn forecast_track(typhoon: &Typhoon) -> Vec<Coordinates> {
    if typhoon.forecast.is_empty() {
        return Vec::new();
    }

    std::iter::once(typhoon.coordinates)
        .chain(typhoon.forecast.iter().map(|p| p.coordinates))
        .filter(Coordinates::is_valid)
        .collect()
}

/// Cone polygons plus the track line, ready for a map layer.
pub fn cone_feature_collection(typhoon: &Typhoon) -> FeatureCollection {
    let mut features: Vec<Feature> = calculate_uncertainty_cone(&typhoon.forecast)
        .into_iter()
        .map(|cone| {
            let ring = cone.ring.iter().map(position).collect();
            feature(
                Value::Polygon(vec![ring]),
                properties(json!({
                    "id": typhoon.id,
                    "index": cone.index,
                    "forecastHour": cone.forecast_hour,
                    "radiusDegrees": cone.radius_degrees,
                })),
            )
        })
        .collect();

    let track = forecast_track(typhoon);
    if track.len() >= 2 {
        features.push(feature(
            Value::LineString(track.iter().map(position).collect()),
            properties(json!({
                "id": typhoon.id,
                "name": typhoon.name,
                "category": typhoon.category,
                "color": typhoon.category.color(),
            })),
        ));
    }

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

fn position(c: &Coordinates) -> Vec<f64> {
    vec![c.lon, c.lat]
}

fn feature(value: Value, properties: JsonObject) -> Feature {
    Feature {
        bbox: None,
        geometry: Some(Geometry::new(value)),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

fn properties(value: serde_json::Value) -> JsonObject {
    match value {
        serde_json::Value::Object(map) => map,
        _ => JsonObject::new(),
    }
}

/// Display radius per wind threshold, in kilometres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindRadiiDisplay {
    pub radius34kt_km: f64,
    pub radius50kt_km: f64,
    pub radius64kt_km: f64,
}

impl WindRadiiDisplay {
    /// Largest quadrant per threshold, scaled by [`VISUAL_RADIUS_SCALE`].
    /// Missing thresholds use the fallback constants.
    pub fn from_radii(radii: Option<&WindRadii>) -> Self {
        Self {
            radius34kt_km: display_km(radii.and_then(|r| r.radius34kt), FALLBACK_RADIUS_34KT_KM),
            radius50kt_km: display_km(radii.and_then(|r| r.radius50kt), FALLBACK_RADIUS_50KT_KM),
            radius64kt_km: display_km(radii.and_then(|r| r.radius64kt), FALLBACK_RADIUS_64KT_KM),
        }
    }
}

fn display_km(quadrants: Option<Quadrants>, fallback: f64) -> f64 {
    quadrants
        .map(|q| q.max() * NM_TO_KM * VISUAL_RADIUS_SCALE)
        .filter(|km| *km > 0.0)
        .unwrap_or(fallback)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ProviderId;
    use chrono::{Duration, TimeZone, Utc};

    fn point(hours: i64, lon: f64, lat: f64) -> ForecastPoint {
        let base = Utc.with_ymd_and_hms(2024, 9, 1, 0, 0, 0).unwrap();
        ForecastPoint::new(base + Duration::hours(hours), Coordinates::new(lon, lat), 80.0, None)
    }

    fn storm(forecast: Vec<ForecastPoint>) -> Typhoon {
        let mut t = Typhoon::new(
            ProviderId::Forecast,
            "wp012024",
            "Yagi",
            "Western Pacific",
            Coordinates::new(130.0, 15.0),
            Utc.with_ymd_and_hms(2024, 9, 1, 0, 0, 0).unwrap(),
            90.0,
        );
        t.forecast = forecast;
        t
    }

    #[test]
    fn empty_forecast_gives_no_geometry() {
        assert!(calculate_uncertainty_cone(&[]).is_empty());

        let t = storm(Vec::new());
        assert!(forecast_track(&t).is_empty());
        assert!(cone_feature_collection(&t).features.is_empty());
    }

    #[test]
    fn radius_grows_and_is_capped() {
        assert!((cone_radius_degrees(0) - 50.0 / 60.0).abs() < 1e-12);
        assert!((cone_radius_degrees(1) - 100.0 / 60.0).abs() < 1e-12);
        assert_eq!(cone_radius_degrees(5), 5.0);
        for i in 0..1000 {
            assert!(cone_radius_degrees(i) <= MAX_CONE_RADIUS_DEGREES);
        }
    }

    #[test]
    fn polygons_are_closed_circles_around_each_point() {
        let cones = calculate_uncertainty_cone(&[point(24, 128.0, 16.0), point(48, 126.0, 17.0)]);
        assert_eq!(cones.len(), 2);

        let first = &cones[0];
        assert_eq!(first.ring.len(), CONE_SEGMENTS + 1);
        assert_eq!(first.ring.first(), first.ring.last());
        assert_eq!(first.forecast_hour, 24);
        assert_eq!(cones[1].forecast_hour, 48);

        for v in &first.ring {
            let d = ((v.lon - 128.0).powi(2) + (v.lat - 16.0).powi(2)).sqrt();
            assert!((d - first.radius_degrees).abs() < 1e-9);
        }
    }

    #[test]
    fn invalid_points_are_skipped_keeping_horizon_index() {
        let cones =
            calculate_uncertainty_cone(&[point(24, f64::NAN, 10.0), point(48, 126.0, 17.0)]);

        assert_eq!(cones.len(), 1);
        assert_eq!(cones[0].index, 1);
        assert_eq!(cones[0].forecast_hour, 48);
    }

    #[test]
    fn vertices_beyond_the_pole_are_dropped() {
        let cones = calculate_uncertainty_cone(&[point(24, 0.0, 89.9)]);
        assert_eq!(cones.len(), 1);
        assert!(cones[0].ring.iter().all(Coordinates::is_valid));
        assert!(cones[0].ring.len() < CONE_SEGMENTS + 1);
    }

    #[test]
    fn feature_collection_has_cones_and_track() {
        let t = storm(vec![point(24, 128.0, 16.0), point(48, 126.0, 17.0)]);
        let fc = cone_feature_collection(&t);

        assert_eq!(fc.features.len(), 3);
        assert_eq!(fc.features[0].property("forecastHour"), Some(&json!(24)));

        let track = fc.features.last().unwrap();
        match &track.geometry.as_ref().unwrap().value {
            Value::LineString(line) => {
                assert_eq!(line.len(), 3);
                assert_eq!(line[0], vec![130.0, 15.0]);
            }
            other => panic!("expected LineString, got {other:?}"),
        }
        assert_eq!(track.property("category"), Some(&json!("Cat2")));
    }

    #[test]
    fn wind_radii_display_scales_or_falls_back() {
        let fallback = WindRadiiDisplay::from_radii(None);
        assert_eq!(fallback.radius34kt_km, 50.0);
        assert_eq!(fallback.radius50kt_km, 30.0);
        assert_eq!(fallback.radius64kt_km, 15.0);

        let radii = WindRadii {
            radius34kt: Some(Quadrants {
                ne: 100.0,
                se: 120.0,
                sw: 80.0,
                nw: 90.0,
            }),
            ..WindRadii::default()
        };
        let display = WindRadiiDisplay::from_radii(Some(&radii));

        assert!((display.radius34kt_km - 120.0 * 1.852 * 0.15).abs() < 1e-9);
        assert_eq!(display.radius50kt_km, 30.0);
    }
}
