use crate::{
    Config,
    error::FetchError,
    model::Typhoon,
    parser::{AlertsParser, AtcfParser, DigitalTyphoonParser, NhcRssParser, SourceParser},
    provider::{archive::ArchiveProvider, feed::FeedProvider},
};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::{convert::TryFrom, fmt::Debug, sync::Arc, time::Duration};

pub mod archive;
pub mod feed;
pub mod http;

/// Upstream sources, declared in aggregation priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderId {
    BestTrack,
    Forecast,
    NhcAtlantic,
    NhcEasternPacific,
    DigitalTyphoon,
    NoaaAlerts,
}

impl ProviderId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::BestTrack => "best-track",
            ProviderId::Forecast => "forecast",
            ProviderId::NhcAtlantic => "nhc-atlantic",
            ProviderId::NhcEasternPacific => "nhc-eastern-pacific",
            ProviderId::DigitalTyphoon => "digital-typhoon",
            ProviderId::NoaaAlerts => "noaa-alerts",
        }
    }

    pub const fn all() -> &'static [ProviderId] {
        &[
            ProviderId::BestTrack,
            ProviderId::Forecast,
            ProviderId::NhcAtlantic,
            ProviderId::NhcEasternPacific,
            ProviderId::DigitalTyphoon,
            ProviderId::NoaaAlerts,
        ]
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ProviderId::BestTrack => "ATCF best track",
            ProviderId::Forecast => "ATCF official forecast",
            ProviderId::NhcAtlantic => "NHC Atlantic RSS",
            ProviderId::NhcEasternPacific => "NHC Eastern Pacific RSS",
            ProviderId::DigitalTyphoon => "Digital Typhoon Atom",
            ProviderId::NoaaAlerts => "NOAA active alerts",
        }
    }

    /// Built-in feed URL. The ATCF entries are templates expanded with
    /// `{basin}`, `{number}` and `{year}` per lookup.
    pub fn default_url(&self) -> &'static str {
        match self {
            ProviderId::BestTrack => {
                "https://hurricanes.ral.ucar.edu/repository/data/bdecks_open/{year}/b{basin}{number}{year}.dat"
            }
            ProviderId::Forecast => "https://ftp.nhc.noaa.gov/atcf/fst/{basin}{number}{year}.fst",
            ProviderId::NhcAtlantic => "https://www.nhc.noaa.gov/index-at.xml",
            ProviderId::NhcEasternPacific => "https://www.nhc.noaa.gov/index-ep.xml",
            ProviderId::DigitalTyphoon => "https://agora.ex.nii.ac.jp/digital-typhoon/atom/en.xml",
            ProviderId::NoaaAlerts => "https://api.weather.gov/alerts/active?status=actual",
        }
    }

    /// Basin assigned to every record of a feed that does not state one.
    /// `None` for ATCF, whose lines carry their own basin code.
    pub fn basin(&self) -> Option<&'static str> {
        match self {
            ProviderId::BestTrack | ProviderId::Forecast => None,
            ProviderId::NhcAtlantic | ProviderId::NoaaAlerts => Some(crate::basin::ATLANTIC),
            ProviderId::NhcEasternPacific => Some(crate::basin::EASTERN_PACIFIC),
            ProviderId::DigitalTyphoon => Some(crate::basin::WESTERN_PACIFIC),
        }
    }

    /// Public page credited as the record's source.
    pub fn attribution_url(&self) -> &'static str {
        match self {
            ProviderId::BestTrack | ProviderId::Forecast => {
                "https://www.metoc.navy.mil/jtwc/jtwc.html"
            }
            ProviderId::NhcAtlantic | ProviderId::NhcEasternPacific => "https://www.nhc.noaa.gov/",
            ProviderId::DigitalTyphoon => "http://agora.ex.nii.ac.jp/digital-typhoon/",
            ProviderId::NoaaAlerts => "https://www.weather.gov/",
        }
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ProviderId {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let lower = value.trim().to_lowercase();

        ProviderId::all()
            .iter()
            .copied()
            .find(|id| id.as_str() == lower)
            .ok_or_else(|| {
                let supported: Vec<&str> = ProviderId::all().iter().map(|id| id.as_str()).collect();
                anyhow::anyhow!(
                    "Unknown provider '{value}'. Supported providers: {}.",
                    supported.join(", ")
                )
            })
    }
}

/// One upstream source of tropical cyclone records.
///
/// Implementors only write [`TyphoonProvider::try_fetch`]. The provided
/// [`TyphoonProvider::fetch`] bounds it by [`TyphoonProvider::timeout`] and
/// contains every failure, so callers always get a (possibly empty) list.
#[async_trait]
pub trait TyphoonProvider: Send + Sync + Debug {
    fn id(&self) -> ProviderId;

    fn timeout(&self) -> Duration;

    async fn try_fetch(&self) -> Result<Vec<Typhoon>, FetchError>;

    async fn fetch(&self) -> Vec<Typhoon> {
        let after = self.timeout();
        let result = match tokio::time::timeout(after, self.try_fetch()).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout {
                provider: self.id(),
                after,
            }),
        };

        match result {
            Ok(records) => {
                log::debug!("{} returned {} record(s)", self.id(), records.len());
                records
            }
            Err(err) => {
                log::warn!("{} unavailable: {err}", self.id());
                Vec::new()
            }
        }
    }
}

/// Parser for the wire format a provider serves.
pub fn parser_for(id: ProviderId) -> Box<dyn SourceParser> {
    let basin = id.basin().unwrap_or_default();
    match id {
        ProviderId::BestTrack => Box::new(AtcfParser::best_track()),
        ProviderId::Forecast => Box::new(AtcfParser::forecast()),
        ProviderId::NhcAtlantic | ProviderId::NhcEasternPacific => {
            Box::new(NhcRssParser::new(id, basin))
        }
        ProviderId::DigitalTyphoon => Box::new(DigitalTyphoonParser::new(basin)),
        ProviderId::NoaaAlerts => Box::new(AlertsParser::new(basin)),
    }
}

/// Construct one provider from config and explicit ProviderId.
pub fn provider_from_config(
    id: ProviderId,
    config: &Config,
    http: Client,
) -> Arc<dyn TyphoonProvider> {
    let url = config.provider_url(id).to_owned();

    match id {
        ProviderId::BestTrack | ProviderId::Forecast => Arc::new(ArchiveProvider::new(
            id,
            url,
            config.atcf.clone(),
            http,
            config.lookup_timeout(),
        )),
        _ => Arc::new(FeedProvider::new(id, url, http, config.feed_timeout())),
    }
}

/// Every enabled provider, in priority order, sharing one HTTP client.
pub fn providers_from_config(config: &Config) -> anyhow::Result<Vec<Arc<dyn TyphoonProvider>>> {
    let http = http::client(&config.user_agent)?;

    Ok(ProviderId::all()
        .iter()
        .copied()
        .filter(|id| config.provider_enabled(*id))
        .map(|id| provider_from_config(id, config, http.clone()))
        .collect())
}
