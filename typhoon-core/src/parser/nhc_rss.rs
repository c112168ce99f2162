//! NHC RSS feeds with the `nhc:` cyclone extension.
//!
//! Each `<item>` carrying an `<nhc:Cyclone>` block becomes one record. The
//! feed has no track, so `forecast` is always empty.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;

use super::{SourceParser, first_capture, slug};
use crate::{
    model::{Coordinates, DEFAULT_PRESSURE_MB, Typhoon},
    provider::ProviderId,
    units::{degrees_from_compass, mph_to_knots},
};

static ITEM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<item\b[^>]*>(.*?)</item>").expect("valid regex"));
static CYCLONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<nhc:Cyclone>(.*?)</nhc:Cyclone>").expect("valid regex"));

static NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<nhc:name>(.*?)</nhc:name>").expect("valid regex"));
static CENTER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<nhc:center>(.*?)</nhc:center>").expect("valid regex"));
static TYPE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<nhc:type>(.*?)</nhc:type>").expect("valid regex"));
static WIND_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<nhc:wind>(.*?)</nhc:wind>").expect("valid regex"));
static PRESSURE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<nhc:pressure>(.*?)</nhc:pressure>").expect("valid regex"));
static MOVEMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<nhc:movement>(.*?)</nhc:movement>").expect("valid regex"));
static ATCF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<nhc:atcf>(.*?)</nhc:atcf>").expect("valid regex"));
static HEADLINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<nhc:headline>(.*?)</nhc:headline>").expect("valid regex"));
static PUB_DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<pubDate>(.*?)</pubDate>").expect("valid regex"));

static SPEED_VALUE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+)\s*(mph|kt)").expect("valid regex"));
static PRESSURE_VALUE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+)\s*mb").expect("valid regex"));
static MOVEMENT_VALUE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\w+)\s+at\s+(\d+)\s*(mph|kt)").expect("valid regex"));

#[derive(Debug, Clone)]
pub struct NhcRssParser {
    provider: ProviderId,
    basin: String,
}

impl NhcRssParser {
    pub fn new(provider: ProviderId, basin: impl Into<String>) -> Self {
        Self {
            provider,
            basin: basin.into(),
        }
    }

    /// `now` stands in for the observation time when an item has no `pubDate`.
    fn parse_item(&self, item: &str, now: DateTime<Utc>) -> Option<Typhoon> {
        let cyclone = CYCLONE_RE.captures(item)?.get(1)?.as_str();

        let name = extract_name(cyclone)?;
        let coordinates = extract_center(cyclone)?;
        let kind = extract_type(cyclone)?;

        let wind_speed = extract_wind_knots(cyclone).unwrap_or(0.0);
        let (movement_speed, movement_direction) = extract_movement(cyclone).unwrap_or((0.0, 0.0));

        let id = extract_atcf_id(cyclone).unwrap_or_else(|| format!("typhoon_{}", slug(&name)));
        let timestamp = extract_pub_date(item).unwrap_or(now);

        let mut warnings = vec![format!("{kind} {name} in {}", self.basin)];
        warnings.extend(extract_headline(cyclone));

        Some(Typhoon {
            pressure: extract_pressure_mb(cyclone).unwrap_or(DEFAULT_PRESSURE_MB),
            movement_speed,
            movement_direction,
            warnings,
            ..Typhoon::new(
                self.provider,
                id,
                name,
                self.basin.clone(),
                coordinates,
                timestamp,
                wind_speed,
            )
        })
    }
}

impl SourceParser for NhcRssParser {
    fn parse_at(&self, raw: &str, now: DateTime<Utc>) -> Vec<Typhoon> {
        ITEM_RE
            .captures_iter(raw)
            .filter_map(|caps| caps.get(1))
            .filter(|item| item.as_str().contains("<nhc:Cyclone>"))
            .filter_map(|item| {
                let parsed = self.parse_item(item.as_str(), now);
                if parsed.is_none() {
                    log::debug!("Skipping NHC item without usable cyclone data ({})", self.basin);
                }
                parsed
            })
            .filter_map(Typhoon::validated)
            .collect()
    }
}

fn extract_name(cyclone: &str) -> Option<String> {
    first_capture(&NAME_RE, cyclone)
}

fn extract_type(cyclone: &str) -> Option<String> {
    first_capture(&TYPE_RE, cyclone)
}

fn extract_atcf_id(cyclone: &str) -> Option<String> {
    first_capture(&ATCF_RE, cyclone).map(|id| id.to_lowercase())
}

fn extract_headline(cyclone: &str) -> Option<String> {
    first_capture(&HEADLINE_RE, cyclone)
}

/// `"28.5, -85.0"` (latitude first) into lon/lat coordinates.
fn extract_center(cyclone: &str) -> Option<Coordinates> {
    let center = first_capture(&CENTER_RE, cyclone)?;
    let (lat, lon) = center.split_once(',')?;
    let lat = lat.trim().parse::<f64>().ok()?;
    let lon = lon.trim().parse::<f64>().ok()?;

    (lat.is_finite() && lon.is_finite()).then(|| Coordinates::new(lon, lat))
}

/// `"40 mph"` or `"35 kt"`, always returned in knots.
fn extract_wind_knots(cyclone: &str) -> Option<f64> {
    let wind = first_capture(&WIND_RE, cyclone)?;
    speed_in_knots(&SPEED_VALUE_RE, &wind, 1, 2)
}

fn extract_pressure_mb(cyclone: &str) -> Option<f64> {
    let pressure = first_capture(&PRESSURE_RE, cyclone)?;
    PRESSURE_VALUE_RE.captures(&pressure)?.get(1)?.as_str().parse().ok()
}

/// `"NNW at 12 mph"` into (speed in knots, heading in degrees).
fn extract_movement(cyclone: &str) -> Option<(f64, f64)> {
    let movement = first_capture(&MOVEMENT_RE, cyclone)?;
    let speed = speed_in_knots(&MOVEMENT_VALUE_RE, &movement, 2, 3)?;
    let heading = MOVEMENT_VALUE_RE.captures(&movement)?.get(1)?.as_str();

    Some((speed, degrees_from_compass(heading)))
}

fn extract_pub_date(item: &str) -> Option<DateTime<Utc>> {
    let date = first_capture(&PUB_DATE_RE, item)?;
    DateTime::parse_from_rfc2822(&date).ok().map(|d| d.with_timezone(&Utc))
}

fn speed_in_knots(re: &Regex, text: &str, value_group: usize, unit_group: usize) -> Option<f64> {
    let caps = re.captures(text)?;
    let value = caps.get(value_group)?.as_str().parse::<f64>().ok()?;
    let unit = caps.get(unit_group)?.as_str();

    Some(if unit.eq_ignore_ascii_case("mph") { mph_to_knots(value) } else { value })
}
