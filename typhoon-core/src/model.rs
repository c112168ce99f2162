use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    provider::ProviderId,
    units::{is_valid_lon_lat, knots_to_kph},
};

/// Sea-level pressure assumed when a source reports none.
pub const DEFAULT_PRESSURE_MB: f64 = 1013.0;

pub const DEFAULT_STATUS: &str = "Active";

/// Intensity class derived from sustained wind speed in knots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    TD,
    TS,
    Cat1,
    Cat2,
    Cat3,
    Cat4,
    Cat5,
}

impl Category {
    pub fn from_wind_speed(knots: f64) -> Self {
        match knots {
            k if k < 34.0 => Category::TD,
            k if k < 64.0 => Category::TS,
            k if k < 83.0 => Category::Cat1,
            k if k < 96.0 => Category::Cat2,
            k if k < 113.0 => Category::Cat3,
            k if k < 137.0 => Category::Cat4,
            _ => Category::Cat5,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::TD => "TD",
            Category::TS => "TS",
            Category::Cat1 => "Cat1",
            Category::Cat2 => "Cat2",
            Category::Cat3 => "Cat3",
            Category::Cat4 => "Cat4",
            Category::Cat5 => "Cat5",
        }
    }

    pub const fn all() -> &'static [Category] {
        &[
            Category::TD,
            Category::TS,
            Category::Cat1,
            Category::Cat2,
            Category::Cat3,
            Category::Cat4,
            Category::Cat5,
        ]
    }

    /// Case-insensitive match on the canonical tokens (`TD`, `Cat3`, ...).
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        Self::all()
            .iter()
            .copied()
            .find(|c| c.as_str().eq_ignore_ascii_case(value))
    }

    pub fn color(&self) -> &'static str {
        match self {
            Category::TD => "#3B82F6",
            Category::TS => "#10B981",
            Category::Cat1 => "#F59E0B",
            Category::Cat2 => "#F97316",
            Category::Cat3 => "#EF4444",
            Category::Cat4 => "#DC2626",
            Category::Cat5 => "#991B1B",
        }
    }

    pub fn intensity_label(&self) -> &'static str {
        match self {
            Category::TD => "Tropical Depression",
            Category::TS => "Tropical Storm",
            Category::Cat1 => "Category 1 Typhoon",
            Category::Cat2 => "Category 2 Typhoon",
            Category::Cat3 => "Category 3 Typhoon (Major)",
            Category::Cat4 => "Category 4 Typhoon (Major)",
            Category::Cat5 => "Category 5 Typhoon (Catastrophic)",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

const UNKNOWN_CATEGORY_COLOR: &str = "#6B7280";
const UNKNOWN_CATEGORY_LABEL: &str = "Unknown";

/// Map color for a category token; unrecognised tokens render gray.
pub fn color_for_category(category: &str) -> &'static str {
    Category::parse(category).map_or(UNKNOWN_CATEGORY_COLOR, |c| c.color())
}

/// Display label for a category token; unrecognised tokens read "Unknown".
pub fn intensity_label(category: &str) -> &'static str {
    Category::parse(category).map_or(UNKNOWN_CATEGORY_LABEL, |c| c.intensity_label())
}

/// WGS84 position, serialised longitude first as `[lon, lat]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Coordinates {
    pub lon: f64,
    pub lat: f64,
}

impl Coordinates {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    pub fn is_valid(&self) -> bool {
        is_valid_lon_lat(self.lon, self.lat)
    }
}

impl From<[f64; 2]> for Coordinates {
    fn from([lon, lat]: [f64; 2]) -> Self {
        Self { lon, lat }
    }
}

impl From<Coordinates> for [f64; 2] {
    fn from(c: Coordinates) -> Self {
        [c.lon, c.lat]
    }
}

/// Per-quadrant extent in nautical miles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Quadrants {
    pub ne: f64,
    pub se: f64,
    pub sw: f64,
    pub nw: f64,
}

impl Quadrants {
    pub fn max(&self) -> f64 {
        [self.ne, self.se, self.sw, self.nw]
            .into_iter()
            .filter(|v| v.is_finite())
            .fold(0.0, f64::max)
    }
}

/// Wind radii for the 34/50/64 knot thresholds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WindRadii {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radius34kt: Option<Quadrants>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radius50kt: Option<Quadrants>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radius64kt: Option<Quadrants>,
}

impl WindRadii {
    /// Stores `quadrants` under the given threshold; other thresholds are ignored.
    pub fn set(&mut self, threshold_kt: u32, quadrants: Quadrants) {
        match threshold_kt {
            34 => self.radius34kt = Some(quadrants),
            50 => self.radius50kt = Some(quadrants),
            64 => self.radius64kt = Some(quadrants),
            _ => {}
        }
    }

    pub fn is_empty(&self) -> bool {
        self.radius34kt.is_none() && self.radius50kt.is_none() && self.radius64kt.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastPoint {
    pub timestamp: DateTime<Utc>,
    pub coordinates: Coordinates,
    pub wind_speed: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pressure: Option<f64>,
    pub category: Category,
}

impl ForecastPoint {
    pub fn new(
        timestamp: DateTime<Utc>,
        coordinates: Coordinates,
        wind_speed: f64,
        pressure: Option<f64>,
    ) -> Self {
        Self {
            timestamp,
            coordinates,
            wind_speed,
            pressure,
            category: Category::from_wind_speed(wind_speed),
        }
    }
}

/// One tropical cyclone as reported by one provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Typhoon {
    pub id: String,
    pub provider: ProviderId,
    pub name: String,
    pub basin: String,
    pub category: Category,
    pub coordinates: Coordinates,
    pub timestamp: DateTime<Utc>,
    /// Sustained wind, knots.
    pub wind_speed: f64,
    pub wind_speed_kph: f64,
    /// Central pressure, millibars.
    pub pressure: f64,
    /// Knots.
    pub movement_speed: f64,
    /// Degrees clockwise from north.
    pub movement_direction: f64,
    pub forecast: Vec<ForecastPoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wind_radii: Option<WindRadii>,
    pub warnings: Vec<String>,
    pub status: String,
    pub jtwc_url: String,
}

impl Typhoon {
    /// Record with the given identity and position; everything else defaulted.
    pub fn new(
        provider: ProviderId,
        id: impl Into<String>,
        name: impl Into<String>,
        basin: impl Into<String>,
        coordinates: Coordinates,
        timestamp: DateTime<Utc>,
        wind_speed: f64,
    ) -> Self {
        Self {
            id: id.into(),
            provider,
            name: name.into(),
            basin: basin.into(),
            category: Category::from_wind_speed(wind_speed),
            coordinates,
            timestamp,
            wind_speed,
            wind_speed_kph: knots_to_kph(wind_speed),
            pressure: DEFAULT_PRESSURE_MB,
            movement_speed: 0.0,
            movement_direction: 0.0,
            forecast: Vec::new(),
            wind_radii: None,
            warnings: Vec::new(),
            status: DEFAULT_STATUS.to_string(),
            jtwc_url: provider.attribution_url().to_string(),
        }
    }

    /// Enforces the record invariants, or drops the record.
    ///
    /// Rejects invalid positions and negative or non-finite wind. Derived
    /// fields (category, km/h) are recomputed, unusable forecast points are
    /// removed and the remainder ordered by strictly increasing timestamp.
    pub fn validated(mut self) -> Option<Self> {
        if !self.coordinates.is_valid() || !self.wind_speed.is_finite() || self.wind_speed < 0.0 {
            return None;
        }

        if !self.pressure.is_finite() || self.pressure <= 0.0 {
            self.pressure = DEFAULT_PRESSURE_MB;
        }
        if !self.movement_speed.is_finite() || self.movement_speed < 0.0 {
            self.movement_speed = 0.0;
        }
        self.movement_direction = if self.movement_direction.is_finite() {
            self.movement_direction.rem_euclid(360.0)
        } else {
            0.0
        };

        self.category = Category::from_wind_speed(self.wind_speed);
        self.wind_speed_kph = knots_to_kph(self.wind_speed);

        self.forecast.retain(|p| {
            p.coordinates.is_valid() && p.wind_speed.is_finite() && p.wind_speed >= 0.0
        });
        for point in &mut self.forecast {
            point.category = Category::from_wind_speed(point.wind_speed);
            point.pressure = point.pressure.filter(|p| p.is_finite() && *p > 0.0);
        }
        self.forecast.sort_by_key(|p| p.timestamp);
        self.forecast.dedup_by_key(|p| p.timestamp);

        if self.wind_radii.is_some_and(|r| r.is_empty()) {
            self.wind_radii = None;
        }

        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn sample() -> Typhoon {
        let ts = Utc.with_ymd_and_hms(2024, 9, 1, 0, 0, 0).unwrap();
        Typhoon::new(
            ProviderId::BestTrack,
            "wp012024",
            "YAGI",
            "Western Pacific",
            Coordinates::new(140.0, 12.5),
            ts,
            65.0,
        )
    }

    #[test]
    fn new_derives_category_and_kph() {
        let t = sample();
        assert_eq!(t.category, Category::Cat1);
        assert_eq!(t.wind_speed_kph, 120.0);
        assert_eq!(t.pressure, DEFAULT_PRESSURE_MB);
        assert_eq!(t.status, "Active");
    }

    #[test]
    fn category_tokens_parse_case_insensitively() {
        for c in Category::all() {
            assert_eq!(Category::parse(c.as_str()), Some(*c));
        }
        assert_eq!(Category::parse("cat4"), Some(Category::Cat4));
        assert_eq!(Category::parse("Hurricane"), None);
    }

    #[test]
    fn presentation_lookups_default_for_unknown() {
        assert_eq!(color_for_category("TS"), "#10B981");
        assert_eq!(color_for_category("bogus"), "#6B7280");
        assert_eq!(intensity_label("Cat5"), "Category 5 Typhoon (Catastrophic)");
        assert_eq!(intensity_label(""), "Unknown");
    }

    #[test]
    fn coordinates_serialize_longitude_first() {
        let json = serde_json::to_string(&Coordinates::new(121.5, 14.6)).unwrap();
        assert_eq!(json, "[121.5,14.6]");

        let back: Coordinates = serde_json::from_str("[121.5,14.6]").unwrap();
        assert_eq!(back, Coordinates::new(121.5, 14.6));
    }

    #[test]
    fn typhoon_serializes_camel_case() {
        let value = serde_json::to_value(sample()).unwrap();
        assert_eq!(value["windSpeed"], 65.0);
        assert_eq!(value["category"], "Cat1");
        assert_eq!(value["provider"], "best-track");
        assert!(value.get("windRadii").is_none());
    }

    #[test]
    fn validated_drops_out_of_range_coordinates() {
        let mut t = sample();
        t.coordinates = Coordinates::new(181.0, 10.0);
        assert!(t.validated().is_none());

        let mut t = sample();
        t.coordinates = Coordinates::new(120.0, f64::NAN);
        assert!(t.validated().is_none());
    }

    #[test]
    fn validated_drops_negative_wind() {
        let mut t = sample();
        t.wind_speed = -1.0;
        assert!(t.validated().is_none());
    }

    #[test]
    fn validated_repairs_derived_fields_and_orders_forecast() {
        let mut t = sample();
        let base = t.timestamp;
        t.category = Category::Cat5;
        t.pressure = f64::NAN;
        t.movement_direction = 370.0;
        let at = |hours| base + Duration::hours(hours);
        t.forecast = vec![
            ForecastPoint::new(at(48), Coordinates::new(130.0, 16.0), 90.0, None),
            ForecastPoint::new(at(24), Coordinates::new(135.0, 14.0), 70.0, None),
            ForecastPoint::new(at(72), Coordinates::new(f64::NAN, 18.0), 80.0, None),
        ];

        let t = t.validated().unwrap();

        assert_eq!(t.category, Category::Cat1);
        assert_eq!(t.pressure, DEFAULT_PRESSURE_MB);
        assert_eq!(t.movement_direction, 10.0);
        assert_eq!(t.forecast.len(), 2);
        assert!(t.forecast[0].timestamp < t.forecast[1].timestamp);
        assert_eq!(t.forecast[1].category, Category::Cat2);
    }

    #[test]
    fn quadrants_max_ignores_non_finite() {
        let q = Quadrants {
            ne: 80.0,
            se: f64::NAN,
            sw: 50.0,
            nw: 70.0,
        };
        assert_eq!(q.max(), 80.0);
    }
}
