//! ATCF best-track (`BEST`) and official forecast (`OFCL`) lines.
//!
//! Lines are comma separated with positional fields:
//!
//! | idx | field                         |
//! |-----|-------------------------------|
//! | 0   | basin code (`WP`, `AL`, ...)  |
//! | 1   | storm number                  |
//! | 2   | synoptic time `YYYYMMDDHH`    |
//! | 4   | technique (`BEST`, `OFCL`)    |
//! | 5   | forecast hour (tau)           |
//! | 6,7 | lat/lon tokens (`125N 1400E`) |
//! | 8   | max sustained wind, kt        |
//! | 9   | MSLP, mb                      |
//! | 11  | wind radii threshold, kt      |
//! | 12  | radii code (`NEQ`, `AAA`)     |
//! | 13-16 | NE/SE/SW/NW radii, nm       |
//! | 25  | storm heading, deg            |
//! | 26  | storm speed, kt               |
//! | 27  | storm name                    |
//!
//! One record is produced per storm, from its latest synoptic time. Storms
//! whose latest time is older than [`RECENCY_WINDOW_DAYS`] are dropped so
//! archived tracks do not resurface as active.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};

use super::SourceParser;
use crate::{
    basin,
    model::{Coordinates, DEFAULT_PRESSURE_MB, ForecastPoint, Quadrants, Typhoon, WindRadii},
    provider::ProviderId,
    units::parse_fixed_format_coordinate,
};

pub const RECENCY_WINDOW_DAYS: i64 = 7;

const MIN_FIELDS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AtcfVariant {
    BestTrack,
    Forecast,
}

impl AtcfVariant {
    fn technique(&self) -> &'static str {
        match self {
            AtcfVariant::BestTrack => "BEST",
            AtcfVariant::Forecast => "OFCL",
        }
    }

    fn provider(&self) -> ProviderId {
        match self {
            AtcfVariant::BestTrack => ProviderId::BestTrack,
            AtcfVariant::Forecast => ProviderId::Forecast,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AtcfParser {
    variant: AtcfVariant,
}

impl AtcfParser {
    pub fn new(variant: AtcfVariant) -> Self {
        Self { variant }
    }

    pub fn best_track() -> Self {
        Self::new(AtcfVariant::BestTrack)
    }

    pub fn forecast() -> Self {
        Self::new(AtcfVariant::Forecast)
    }

    fn build_record(&self, rows: &[AtcfRow], now: DateTime<Utc>) -> Option<Typhoon> {
        let latest = rows.iter().map(|r| r.time).max()?;
        if now - latest > Duration::days(RECENCY_WINDOW_DAYS) {
            return None;
        }

        let current: Vec<&AtcfRow> = rows
            .iter()
            .filter(|r| r.time == latest && r.tau == 0)
            .collect();
        let head = *current.first()?;

        let mut radii = WindRadii::default();
        for row in &current {
            if let Some((threshold, quadrants)) = row.radii {
                radii.set(threshold, quadrants);
            }
        }

        let name = rows
            .iter()
            .rev()
            .find_map(|r| r.name.clone())
            .unwrap_or_else(|| format!("{}{:02}", head.basin_code, head.number));

        let forecast = match self.variant {
            AtcfVariant::BestTrack => Vec::new(),
            AtcfVariant::Forecast => forecast_points(rows, latest),
        };

        let provider = self.variant.provider();
        Some(Typhoon {
            pressure: head.pressure_mb.unwrap_or(DEFAULT_PRESSURE_MB),
            movement_speed: head.speed_kt.unwrap_or(0.0),
            movement_direction: head.heading.unwrap_or(0.0),
            forecast,
            wind_radii: (!radii.is_empty()).then_some(radii),
            ..Typhoon::new(
                provider,
                storm_id(&head.basin_code, head.number, latest),
                name,
                basin_name(&head.basin_code),
                head.position,
                latest,
                head.wind_kt,
            )
        })
    }
}

impl SourceParser for AtcfParser {
    /// `now` is the instant the recency window is measured back from.
    fn parse_at(&self, raw: &str, now: DateTime<Utc>) -> Vec<Typhoon> {
        let technique = self.variant.technique();
        let mut storms: BTreeMap<(String, u32), Vec<AtcfRow>> = BTreeMap::new();

        for line in raw.lines().filter(|l| !l.trim().is_empty()) {
            match parse_row(line) {
                Some(row) if row.technique.eq_ignore_ascii_case(technique) => {
                    storms
                        .entry((row.basin_code.clone(), row.number))
                        .or_default()
                        .push(row);
                }
                Some(_) => {}
                None => log::debug!("Skipping malformed ATCF line: {line}"),
            }
        }

        storms
            .values()
            .filter_map(|rows| self.build_record(rows, now))
            .filter_map(Typhoon::validated)
            .collect()
    }
}

/// Forecast rows issued at `base`, one point per tau > 0, ordered by tau.
fn forecast_points(rows: &[AtcfRow], base: DateTime<Utc>) -> Vec<ForecastPoint> {
    let mut by_tau: BTreeMap<i64, &AtcfRow> = BTreeMap::new();
    for row in rows.iter().filter(|r| r.time == base && r.tau > 0) {
        by_tau.entry(row.tau).or_insert(row);
    }

    by_tau
        .into_iter()
        .map(|(tau, row)| {
            ForecastPoint::new(
                base + Duration::hours(tau),
                row.position,
                row.wind_kt,
                row.pressure_mb,
            )
        })
        .collect()
}

#[derive(Debug, Clone)]
struct AtcfRow {
    basin_code: String,
    number: u32,
    time: DateTime<Utc>,
    technique: String,
    tau: i64,
    position: Coordinates,
    wind_kt: f64,
    pressure_mb: Option<f64>,
    radii: Option<(u32, Quadrants)>,
    heading: Option<f64>,
    speed_kt: Option<f64>,
    name: Option<String>,
}

fn parse_row(line: &str) -> Option<AtcfRow> {
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    if fields.len() < MIN_FIELDS {
        return None;
    }

    let basin_code = fields[0].to_ascii_uppercase();
    if basin_code.is_empty() || !basin_code.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }

    let lat = parse_fixed_format_coordinate(fields[6])?;
    let lon = parse_fixed_format_coordinate(fields[7])?;

    Some(AtcfRow {
        basin_code,
        number: fields[1].parse().ok()?,
        time: parse_synoptic_time(fields[2])?,
        technique: fields[4].to_string(),
        tau: fields[5].parse().ok()?,
        position: Coordinates::new(lon, lat),
        wind_kt: fields[8].parse().ok()?,
        pressure_mb: fields[9].parse::<f64>().ok().filter(|p| *p > 0.0),
        radii: parse_radii(&fields),
        heading: optional_number(&fields, 25),
        speed_kt: optional_number(&fields, 26),
        name: fields
            .get(27)
            .filter(|n| !n.is_empty())
            .map(|n| n.to_string()),
    })
}

/// `YYYYMMDDHH` in UTC.
fn parse_synoptic_time(value: &str) -> Option<DateTime<Utc>> {
    if value.len() != 10 || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let date = NaiveDate::parse_from_str(&value[..8], "%Y%m%d").ok()?;
    let hour: u32 = value[8..].parse().ok()?;
    Some(date.and_hms_opt(hour, 0, 0)?.and_utc())
}

fn parse_radii(fields: &[&str]) -> Option<(u32, Quadrants)> {
    let threshold: u32 = fields.get(11)?.parse().ok()?;
    let code = fields.get(12)?.to_ascii_uppercase();
    let values: Vec<f64> = (13..=16)
        .map(|i| optional_number(fields, i).unwrap_or(0.0))
        .collect();

    let quadrants = match code.as_str() {
        "NEQ" => Quadrants {
            ne: values[0],
            se: values[1],
            sw: values[2],
            nw: values[3],
        },
        "AAA" => Quadrants {
            ne: values[0],
            se: values[0],
            sw: values[0],
            nw: values[0],
        },
        _ => return None,
    };

    (quadrants.max() > 0.0).then_some((threshold, quadrants))
}

fn optional_number(fields: &[&str], index: usize) -> Option<f64> {
    fields.get(index)?.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn storm_id(basin_code: &str, number: u32, time: DateTime<Utc>) -> String {
    format!("{}{:02}{}", basin_code.to_lowercase(), number, time.year())
}

/// Provider-facing basin name for an ATCF basin code.
pub fn basin_name(code: &str) -> String {
    match code.to_ascii_uppercase().as_str() {
        "WP" => basin::WESTERN_PACIFIC,
        "EP" => basin::EASTERN_PACIFIC,
        "CP" => basin::CENTRAL_PACIFIC,
        "AL" => basin::ATLANTIC,
        "IO" | "BB" | "AS" => basin::NORTH_INDIAN,
        "SH" | "SI" | "SP" => basin::SOUTHERN_HEMISPHERE,
        _ => code,
    }
    .to_string()
}
