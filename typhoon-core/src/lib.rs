//! Core library for the `typhoon` CLI.
//!
//! This crate defines:
//! - Normalized tropical cyclone records and unit conversions
//! - One total parser per upstream wire format (NHC RSS, Digital Typhoon
//!   Atom, ATCF best track / forecast, NOAA alert GeoJSON)
//! - Providers that fetch and parse one source each, never failing outward
//! - The concurrent aggregator, basin filter and forecast cone geometry
//! - Configuration handling
//!
//! It is used by `typhoon-cli`, but can also back an HTTP route or any
//! other consumer of the aggregated records.

pub mod aggregator;
pub mod basin;
pub mod config;
pub mod error;
pub mod geometry;
pub mod model;
pub mod parser;
pub mod provider;
pub mod units;

pub use aggregator::{Aggregator, ReportMetadata, TyphoonReport};
pub use basin::filter_by_basin;
pub use config::{AtcfConfig, Config, ProviderConfig};
pub use error::FetchError;
pub use geometry::{
    ConePolygon, WindRadiiDisplay, calculate_uncertainty_cone, cone_feature_collection,
    forecast_track,
};
pub use model::{
    Category, Coordinates, ForecastPoint, Typhoon, WindRadii, color_for_category, intensity_label,
};
pub use parser::SourceParser;
pub use provider::{ProviderId, TyphoonProvider, providers_from_config};
