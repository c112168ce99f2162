//! NOAA active alerts (`api.weather.gov/alerts/active`), GeoJSON.
//!
//! Only features whose `event` mentions "tropical" are considered. The
//! position is the Point itself or the vertex centroid of the first
//! polygon ring; alerts without geometry are skipped.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use geojson::{Feature, Value};
use regex::Regex;

use super::{SourceParser, slug};
use crate::{
    model::{Coordinates, Typhoon},
    provider::ProviderId,
    units::mph_to_knots,
};

static WIND_VALUE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+)\s*(mph|kt)\b").expect("valid regex"));
static STORM_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i:hurricane|typhoon|tropical storm|tropical depression|tropical cyclone)\s+([A-Z][A-Za-z-]+)")
        .expect("valid regex")
});

/// Words that follow "Tropical Storm" in product names rather than storm names.
const PRODUCT_WORDS: &[&str] = &[
    "warning", "watch", "statement", "advisory", "conditions", "force", "local",
];

#[derive(Debug, Clone)]
pub struct AlertsParser {
    basin: String,
}

impl AlertsParser {
    /// Alerts carry no basin, so the caller assigns one to every record.
    pub fn new(basin: impl Into<String>) -> Self {
        Self {
            basin: basin.into(),
        }
    }

    fn parse_feature(&self, feature: &Feature, now: DateTime<Utc>) -> Option<Typhoon> {
        let event = string_property(feature, "event")?;
        if !event.to_lowercase().contains("tropical") {
            return None;
        }

        let coordinates = extract_position(feature)?;
        let headline = string_property(feature, "headline");
        let description = string_property(feature, "description").unwrap_or_default();

        let name = headline
            .as_deref()
            .and_then(extract_storm_name)
            .or_else(|| extract_storm_name(&description))
            .unwrap_or_else(|| event.clone());

        let id = extract_alert_id(feature).unwrap_or_else(|| format!("alert_{}", slug(&name)));
        let timestamp = ["sent", "effective", "onset"]
            .iter()
            .find_map(|key| string_property(feature, key).and_then(|v| parse_time(&v)))
            .unwrap_or(now);

        let mut typhoon = Typhoon::new(
            ProviderId::NoaaAlerts,
            id,
            name,
            self.basin.clone(),
            coordinates,
            timestamp,
            extract_wind_knots(&description).unwrap_or(0.0),
        );
        typhoon.warnings.push(headline.unwrap_or(event));

        Some(typhoon)
    }
}

impl SourceParser for AlertsParser {
    fn parse_at(&self, raw: &str, now: DateTime<Utc>) -> Vec<Typhoon> {
        let features = match serde_json::from_str::<serde_json::Value>(raw) {
            Ok(serde_json::Value::Object(mut doc))
                if doc.get("type").and_then(|t| t.as_str()) == Some("FeatureCollection") =>
            {
                match doc.remove("features") {
                    Some(serde_json::Value::Array(features)) => features,
                    _ => {
                        log::debug!("Alerts FeatureCollection has no features array");
                        return Vec::new();
                    }
                }
            }
            Ok(_) => {
                log::debug!("Alerts document is not a FeatureCollection");
                return Vec::new();
            }
            Err(err) => {
                log::debug!("Alerts document is not valid JSON: {err}");
                return Vec::new();
            }
        };

        features
            .into_iter()
            .filter_map(|value| match Feature::try_from(value) {
                Ok(feature) => Some(feature),
                Err(err) => {
                    log::debug!("Skipping malformed alert feature: {err}");
                    None
                }
            })
            .filter_map(|f| self.parse_feature(&f, now))
            .filter_map(Typhoon::validated)
            .collect()
    }
}

fn string_property(feature: &Feature, key: &str) -> Option<String> {
    feature
        .property(key)?
        .as_str()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn extract_alert_id(feature: &Feature) -> Option<String> {
    string_property(feature, "id").or_else(|| match feature.id.as_ref()? {
        geojson::feature::Id::String(id) => Some(id.clone()),
        geojson::feature::Id::Number(n) => Some(n.to_string()),
    })
}

fn extract_position(feature: &Feature) -> Option<Coordinates> {
    match &feature.geometry.as_ref()?.value {
        Value::Point(p) => position(p),
        Value::Polygon(rings) => ring_centroid(rings.first()?),
        Value::MultiPolygon(polygons) => ring_centroid(polygons.first()?.first()?),
        _ => None,
    }
}

fn position(p: &[f64]) -> Option<Coordinates> {
    match p {
        [lon, lat, ..] => Some(Coordinates::new(*lon, *lat)),
        _ => None,
    }
}

/// Mean of the ring's vertices, ignoring the closing duplicate.
fn ring_centroid(ring: &[Vec<f64>]) -> Option<Coordinates> {
    let mut points: Vec<Coordinates> = ring.iter().filter_map(|p| position(p)).collect();
    if points.len() > 1 && points.first() == points.last() {
        points.pop();
    }
    if points.is_empty() {
        return None;
    }

    let n = points.len() as f64;
    let lon = points.iter().map(|p| p.lon).sum::<f64>() / n;
    let lat = points.iter().map(|p| p.lat).sum::<f64>() / n;
    Some(Coordinates::new(lon, lat))
}

fn extract_wind_knots(text: &str) -> Option<f64> {
    let caps = WIND_VALUE_RE.captures(text)?;
    let value = caps.get(1)?.as_str().parse::<f64>().ok()?;

    Some(if caps.get(2)?.as_str().eq_ignore_ascii_case("mph") {
        mph_to_knots(value)
    } else {
        value
    })
}

fn extract_storm_name(text: &str) -> Option<String> {
    STORM_NAME_RE
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
        .find(|candidate| !PRODUCT_WORDS.contains(&candidate.to_lowercase().as_str()))
        .map(str::to_string)
}

fn parse_time(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value).ok().map(|d| d.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Category, DEFAULT_PRESSURE_MB};
    use chrono::TimeZone;

    const ALERTS: &str = r#"{
      "type": "FeatureCollection",
      "features": [
        {
          "type": "Feature",
          "id": "https://api.weather.gov/alerts/urn:oid:2.49.0.1.840.0.1",
          "geometry": {
            "type": "Polygon",
            "coordinates": [[[-66.0, 18.0], [-65.0, 18.0], [-65.0, 19.0], [-66.0, 19.0], [-66.0, 18.0]]]
          },
          "properties": {
            "id": "urn:oid:2.49.0.1.840.0.1",
            "event": "Tropical Storm Warning",
            "sent": "2024-08-14T11:00:00-04:00",
            "headline": "Tropical Storm Warning issued August 14 by NWS San Juan PR",
            "description": "Tropical Storm Ernesto is producing sustained winds of 60 mph with higher gusts."
          }
        },
        {
          "type": "Feature",
          "geometry": null,
          "properties": { "event": "Tropical Storm Watch", "description": "Zone based" }
        },
        {
          "type": "Feature",
          "geometry": { "type": "Point", "coordinates": [-90.0, 30.0] },
          "properties": { "event": "Flood Warning", "description": "River flooding" }
        }
      ]
    }"#;

    fn parser() -> AlertsParser {
        AlertsParser::new("Atlantic")
    }

    #[test]
    fn parses_tropical_polygon_alert() {
        let storms = parser().parse(ALERTS);
        assert_eq!(storms.len(), 1);

        let s = &storms[0];
        assert_eq!(s.id, "urn:oid:2.49.0.1.840.0.1");
        assert_eq!(s.name, "Ernesto");
        assert_eq!(s.basin, "Atlantic");
        assert_eq!(s.provider, ProviderId::NoaaAlerts);
        assert!((s.coordinates.lon - -65.5).abs() < 1e-9);
        assert!((s.coordinates.lat - 18.5).abs() < 1e-9);
        assert_eq!(s.wind_speed, 52.0);
        assert_eq!(s.category, Category::TS);
        assert_eq!(s.pressure, DEFAULT_PRESSURE_MB);
        assert_eq!(s.timestamp, Utc.with_ymd_and_hms(2024, 8, 14, 15, 0, 0).unwrap());
        assert!(s.forecast.is_empty());
    }

    #[test]
    fn point_alert_with_knots_and_no_name() {
        let doc = r#"{"type":"FeatureCollection","features":[{"type":"Feature",
            "geometry":{"type":"Point","coordinates":[-155.0,19.5]},
            "properties":{"event":"Post-Tropical Cyclone Statement","description":"Winds near 40 kt"}}]}"#;

        let storms = parser().parse(doc);
        assert_eq!(storms.len(), 1);
        assert_eq!(storms[0].name, "Post-Tropical Cyclone Statement");
        assert_eq!(storms[0].wind_speed, 40.0);
        assert_eq!(storms[0].coordinates, Coordinates::new(-155.0, 19.5));
    }

    #[test]
    fn storm_name_skips_product_words() {
        let text = "Tropical Storm Warning in effect. Tropical Storm Debby nears";
        assert_eq!(extract_storm_name(text).as_deref(), Some("Debby"));
        assert_eq!(extract_storm_name("Hurricane Watch"), None);
    }

    #[test]
    fn malformed_feature_does_not_hide_its_neighbours() {
        let doc = r#"{"type":"FeatureCollection","features":[
            {"type":"Feature",
             "geometry":{"type":"Point","coordinates":"bogus"},
             "properties":{"event":"Hurricane Warning","description":"Winds near 90 kt"}},
            {"type":"Feature",
             "geometry":{"type":"Point","coordinates":[-80.0,25.0]},
             "properties":{"event":"Tropical Storm Warning",
                           "description":"Tropical Storm Fay has winds of 45 kt"}}
        ]}"#;

        let storms = parser().parse(doc);

        assert_eq!(storms.len(), 1);
        assert_eq!(storms[0].name, "Fay");
        assert_eq!(storms[0].wind_speed, 45.0);
        assert_eq!(storms[0].coordinates, Coordinates::new(-80.0, 25.0));
    }

    #[test]
    fn non_collections_and_garbage_yield_nothing() {
        assert!(parser().parse("").is_empty());
        assert!(parser().parse("{\"type\": \"Feature").is_empty());
        assert!(parser().parse(r#"{"type":"Point","coordinates":[1.0,2.0]}"#).is_empty());
    }
}
