//! Basin names and the basin filter.
//!
//! Basins are compared as exact strings. Providers use different
//! vocabularies ("Western Pacific" from one, a raw ATCF code from another),
//! and no synonym mapping is applied here.

use std::collections::HashSet;

use crate::model::Typhoon;

pub const WESTERN_PACIFIC: &str = "Western Pacific";
pub const EASTERN_PACIFIC: &str = "Eastern Pacific";
pub const CENTRAL_PACIFIC: &str = "Central Pacific";
pub const ATLANTIC: &str = "Atlantic";
pub const NORTH_INDIAN: &str = "North Indian";
pub const SOUTHERN_HEMISPHERE: &str = "Southern Hemisphere";

/// Every basin name the providers assign.
pub const KNOWN_BASINS: &[&str] = &[
    WESTERN_PACIFIC,
    EASTERN_PACIFIC,
    CENTRAL_PACIFIC,
    ATLANTIC,
    NORTH_INDIAN,
    SOUTHERN_HEMISPHERE,
];

/// Basins shown by the Philippine view.
pub const PHILIPPINE_BASINS: &[&str] = &[WESTERN_PACIFIC, EASTERN_PACIFIC];

/// Keeps records whose `basin` is one of `basins`, in their original order.
pub fn filter_by_basin(records: Vec<Typhoon>, basins: &HashSet<String>) -> Vec<Typhoon> {
    records
        .into_iter()
        .filter(|t| basins.contains(&t.basin))
        .collect()
}

pub fn basin_set<I, S>(names: I) -> HashSet<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    names.into_iter().map(Into::into).collect()
}
