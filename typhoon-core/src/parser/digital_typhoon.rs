//! Digital Typhoon Atom feed.
//!
//! The feed only carries a title and a geotag per entry. Wind speed is a
//! placeholder: the lower bound of the class named in the title (typhoon,
//! tropical storm, otherwise depression). Pressure stays at the default.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;

use super::{SourceParser, first_capture, slug};
use crate::{
    model::{Coordinates, Typhoon},
    provider::ProviderId,
};

/// Placeholder wind for entries titled as typhoons.
pub const PLACEHOLDER_TYPHOON_WIND_KT: f64 = 64.0;
/// Placeholder wind for entries titled as tropical storms.
pub const PLACEHOLDER_STORM_WIND_KT: f64 = 34.0;
/// Placeholder wind for everything else that passes the keyword check.
pub const PLACEHOLDER_DEPRESSION_WIND_KT: f64 = 25.0;

static ENTRY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<entry\b[^>]*>(.*?)</entry>").expect("valid regex"));
static TITLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<title\b[^>]*>(.*?)</title>").expect("valid regex"));
static GEO_LAT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<geo:lat>(.*?)</geo:lat>").expect("valid regex"));
static GEO_LONG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<geo:long>(.*?)</geo:long>").expect("valid regex"));
static UPDATED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<updated>(.*?)</updated>").expect("valid regex"));
static LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<link\b[^>]*href="([^"]+)""#).expect("valid regex"));
static NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(([^)]+)\)").expect("valid regex"));

static TYPHOON_KEYWORD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i:\b(typhoon|tropical\s+(storm|depression|cyclone)|cyclone)\b)|\b(TY|STS|TS|TD)\b")
        .expect("valid regex")
});
static TYPHOON_CLASS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i:\btyphoon\b)|\bTY\b").expect("valid regex"));
static STORM_CLASS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i:\btropical\s+storm\b)|\bS?TS\b").expect("valid regex"));

#[derive(Debug, Clone)]
pub struct DigitalTyphoonParser {
    basin: String,
}

impl DigitalTyphoonParser {
    pub fn new(basin: impl Into<String>) -> Self {
        Self {
            basin: basin.into(),
        }
    }

    fn parse_entry(&self, entry: &str, now: DateTime<Utc>) -> Option<Typhoon> {
        let title = extract_title(entry)?;
        if !is_typhoon_title(&title) {
            return None;
        }

        let coordinates = extract_geotag(entry)?;
        let name = extract_storm_name(&title).unwrap_or_else(|| title.clone());
        let timestamp = extract_updated(entry).unwrap_or(now);

        let mut typhoon = Typhoon::new(
            ProviderId::DigitalTyphoon,
            format!("dt_{}", slug(&name)),
            name,
            self.basin.clone(),
            coordinates,
            timestamp,
            placeholder_wind(&title),
        );
        typhoon.warnings.push(title);
        if let Some(link) = extract_link(entry) {
            typhoon.jtwc_url = link;
        }

        Some(typhoon)
    }
}

impl SourceParser for DigitalTyphoonParser {
    fn parse_at(&self, raw: &str, now: DateTime<Utc>) -> Vec<Typhoon> {
        ENTRY_RE
            .captures_iter(raw)
            .filter_map(|caps| caps.get(1))
            .filter_map(|entry| self.parse_entry(entry.as_str(), now))
            .filter_map(Typhoon::validated)
            .collect()
    }
}

fn extract_title(entry: &str) -> Option<String> {
    first_capture(&TITLE_RE, entry)
}

fn extract_geotag(entry: &str) -> Option<Coordinates> {
    let lat = first_capture(&GEO_LAT_RE, entry)?.parse::<f64>().ok()?;
    let lon = first_capture(&GEO_LONG_RE, entry)?.parse::<f64>().ok()?;
    (lat.is_finite() && lon.is_finite()).then(|| Coordinates::new(lon, lat))
}

fn extract_updated(entry: &str) -> Option<DateTime<Utc>> {
    let updated = first_capture(&UPDATED_RE, entry)?;
    DateTime::parse_from_rfc3339(&updated).ok().map(|d| d.with_timezone(&Utc))
}

fn extract_link(entry: &str) -> Option<String> {
    first_capture(&LINK_RE, entry)
}

/// `"Typhoon 202410 (SHANSHAN)"` -> `"SHANSHAN"`.
fn extract_storm_name(title: &str) -> Option<String> {
    first_capture(&NAME_RE, title)
}

fn is_typhoon_title(title: &str) -> bool {
    TYPHOON_KEYWORD_RE.is_match(title)
}

fn placeholder_wind(title: &str) -> f64 {
    if TYPHOON_CLASS_RE.is_match(title) {
        PLACEHOLDER_TYPHOON_WIND_KT
    } else if STORM_CLASS_RE.is_match(title) {
        PLACEHOLDER_STORM_WIND_KT
    } else {
        PLACEHOLDER_DEPRESSION_WIND_KT
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Category, DEFAULT_PRESSURE_MB};
    use chrono::TimeZone;

    const FEED: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom" xmlns:geo="http://www.w3.org/2003/01/geo/wgs84_pos#">
  <title>Digital Typhoon: Latest</title>
  <entry>
    <title>Typhoon 202410 (SHANSHAN)</title>
    <link rel="alternate" href="http://agora.ex.nii.ac.jp/digital-typhoon/summary/wnp/s/202410.html.en"/>
    <updated>2024-08-27T06:00:00Z</updated>
    <geo:lat>28.1</geo:lat>
    <geo:long>132.4</geo:long>
  </entry>
  <entry>
    <title>Site maintenance notice</title>
    <geo:lat>35.0</geo:lat>
    <geo:long>139.0</geo:long>
  </entry>
  <entry>
    <title>Tropical Storm 202411 (AMPIL)</title>
    <updated>2024-08-27T06:00:00Z</updated>
  </entry>
</feed>"#;

    fn parser() -> DigitalTyphoonParser {
        DigitalTyphoonParser::new("Western Pacific")
    }

    #[test]
    fn keeps_only_geotagged_typhoon_entries() {
        let storms = parser().parse(FEED);
        assert_eq!(storms.len(), 1);

        let s = &storms[0];
        assert_eq!(s.id, "dt_shanshan");
        assert_eq!(s.name, "SHANSHAN");
        assert_eq!(s.basin, "Western Pacific");
        assert_eq!(s.provider, ProviderId::DigitalTyphoon);
        assert_eq!(s.coordinates, Coordinates::new(132.4, 28.1));
        assert_eq!(s.wind_speed, PLACEHOLDER_TYPHOON_WIND_KT);
        assert_eq!(s.category, Category::Cat1);
        assert_eq!(s.pressure, DEFAULT_PRESSURE_MB);
        assert_eq!(s.timestamp, Utc.with_ymd_and_hms(2024, 8, 27, 6, 0, 0).unwrap());
        assert!(s.jtwc_url.ends_with("202410.html.en"));
        assert!(s.forecast.is_empty());
    }

    #[test]
    fn placeholder_wind_follows_title_class() {
        assert_eq!(placeholder_wind("Typhoon 202410"), PLACEHOLDER_TYPHOON_WIND_KT);
        assert_eq!(placeholder_wind("Severe Tropical Storm 202411"), PLACEHOLDER_STORM_WIND_KT);
        assert_eq!(placeholder_wind("TD 202412"), PLACEHOLDER_DEPRESSION_WIND_KT);
    }

    #[test]
    fn malformed_feeds_yield_nothing() {
        assert!(parser().parse("").is_empty());
        let truncated = "<entry><title>Typhoon (X)</title><geo:lat>abc</geo:lat>";
        assert!(parser().parse(truncated).is_empty());
        let bad_lat =
            "<entry><title>Typhoon (X)</title><geo:lat>abc</geo:lat><geo:long>1</geo:long></entry>";
        assert!(parser().parse(bad_lat).is_empty());
    }

    #[test]
    fn non_finite_geotag_is_rejected_at_extraction() {
        let nan = "<geo:lat>NaN</geo:lat><geo:long>120.5</geo:long>";
        let inf = "<geo:lat>14.0</geo:lat><geo:long>inf</geo:long>";

        assert_eq!(extract_geotag(nan), None);
        assert_eq!(extract_geotag(inf), None);
        assert_eq!(
            extract_geotag("<geo:lat>14.0</geo:lat><geo:long>120.5</geo:long>"),
            Some(Coordinates::new(120.5, 14.0))
        );
    }
}
