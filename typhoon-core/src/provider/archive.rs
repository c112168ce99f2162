//! ATCF archive lookups.
//!
//! The archives have no index of active storms, so every basin configured
//! for the provider is probed for storm numbers `1..=max_storm_number` in the current season.
//! Lookups run concurrently and each is bounded on its own; a 404 means the
//! number is unused this season.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{Datelike, Utc};
use futures::future::join_all;
use reqwest::Client;

use super::{ProviderId, TyphoonProvider, http::get_text, parser_for};
use crate::{config::AtcfConfig, error::FetchError, model::Typhoon, parser::SourceParser};

/// Slack on top of the per-lookup bound for the provider as a whole.
const PROVIDER_GRACE: Duration = Duration::from_millis(250);

#[derive(Debug)]
pub struct ArchiveProvider {
    id: ProviderId,
    url_template: String,
    atcf: AtcfConfig,
    parser: Box<dyn SourceParser>,
    http: Client,
    lookup_timeout: Duration,
}

enum Lookup {
    Found(Vec<Typhoon>),
    Missing,
    Failed(FetchError),
}

impl ArchiveProvider {
    pub fn new(
        id: ProviderId,
        url_template: String,
        atcf: AtcfConfig,
        http: Client,
        lookup_timeout: Duration,
    ) -> Self {
        Self {
            id,
            url_template,
            atcf,
            parser: parser_for(id),
            http,
            lookup_timeout,
        }
    }

    /// Every archive URL probed in one pass for `year`.
    pub fn lookup_urls(&self, year: i32) -> Vec<String> {
        self.atcf
            .basins_for(self.id)
            .iter()
            .flat_map(|basin| {
                (1..=self.atcf.max_storm_number)
                    .map(move |number| expand_template(&self.url_template, basin, number, year))
            })
            .collect()
    }

    async fn lookup(&self, url: &str) -> Lookup {
        let fetched = match tokio::time::timeout(
            self.lookup_timeout,
            get_text(&self.http, url, self.lookup_timeout),
        )
        .await
        {
            Ok(fetched) => fetched,
            Err(_) => Err(FetchError::Timeout {
                provider: self.id,
                after: self.lookup_timeout,
            }),
        };

        match fetched {
            Ok(body) => Lookup::Found(self.parser.parse(&body)),
            Err(err) if err.is_not_found() => Lookup::Missing,
            Err(err) => {
                log::debug!("{} lookup {url} failed: {err}", self.id);
                Lookup::Failed(err)
            }
        }
    }
}

#[async_trait]
impl TyphoonProvider for ArchiveProvider {
    fn id(&self) -> ProviderId {
        self.id
    }

    fn timeout(&self) -> Duration {
        self.lookup_timeout + PROVIDER_GRACE
    }

    /// Fails only when no lookup got an answer at all.
    async fn try_fetch(&self) -> Result<Vec<Typhoon>, FetchError> {
        let year = self.atcf.year.unwrap_or_else(|| Utc::now().year());
        let urls = self.lookup_urls(year);

        let lookups = join_all(urls.iter().map(|url| self.lookup(url))).await;

        let mut records = Vec::new();
        let mut answered = false;
        let mut first_error = None;
        for lookup in lookups {
            match lookup {
                Lookup::Found(found) => {
                    answered = true;
                    records.extend(found);
                }
                Lookup::Missing => answered = true,
                Lookup::Failed(err) => {
                    first_error.get_or_insert(err);
                }
            }
        }

        match first_error {
            Some(err) if !answered => Err(err),
            _ => Ok(records),
        }
    }
}

fn expand_template(template: &str, basin: &str, number: u32, year: i32) -> String {
    template
        .replace("{basin}", &basin.to_lowercase())
        .replace("{number}", &format!("{number:02}"))
        .replace("{year}", &year.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(id: ProviderId, basins: &[&str], max: u32) -> ArchiveProvider {
        let basins: Vec<String> = basins.iter().map(|b| b.to_string()).collect();
        ArchiveProvider::new(
            id,
            id.default_url().to_string(),
            AtcfConfig {
                best_track_basins: basins.clone(),
                forecast_basins: basins,
                max_storm_number: max,
                year: Some(2024),
            },
            Client::new(),
            Duration::from_millis(200),
        )
    }

    #[test]
    fn best_track_urls_cover_every_basin_and_number() {
        let urls = provider(ProviderId::BestTrack, &["wp", "EP"], 3).lookup_urls(2024);

        assert_eq!(urls.len(), 6);
        assert_eq!(
            urls[0],
            "https://hurricanes.ral.ucar.edu/repository/data/bdecks_open/2024/bwp012024.dat"
        );
        assert_eq!(
            urls[5],
            "https://hurricanes.ral.ucar.edu/repository/data/bdecks_open/2024/bep032024.dat"
        );
    }

    #[test]
    fn forecast_urls_use_fst_layout() {
        let urls = provider(ProviderId::Forecast, &["al"], 12).lookup_urls(2025);
        assert_eq!(urls[11], "https://ftp.nhc.noaa.gov/atcf/fst/al122025.fst");
    }

    #[test]
    fn default_forecast_lookups_skip_western_pacific() {
        let p = ArchiveProvider::new(
            ProviderId::Forecast,
            ProviderId::Forecast.default_url().to_string(),
            AtcfConfig::default(),
            Client::new(),
            Duration::from_millis(200),
        );

        let urls = p.lookup_urls(2025);

        assert_eq!(urls.len(), 90);
        assert_eq!(urls[0], "https://ftp.nhc.noaa.gov/atcf/fst/al012025.fst");
        assert!(urls.iter().any(|u| u.ends_with("/cp302025.fst")));
        assert!(!urls.iter().any(|u| u.contains("/wp")));
    }

    #[test]
    fn default_best_track_lookups_stay_in_western_pacific() {
        let p = ArchiveProvider::new(
            ProviderId::BestTrack,
            ProviderId::BestTrack.default_url().to_string(),
            AtcfConfig::default(),
            Client::new(),
            Duration::from_millis(200),
        );

        let urls = p.lookup_urls(2025);

        assert_eq!(urls.len(), 30);
        assert!(urls.iter().all(|u| u.contains("/bwp")));
    }

    #[test]
    fn provider_timeout_exceeds_lookup_timeout() {
        let p = provider(ProviderId::BestTrack, &["wp"], 1);
        assert!(p.timeout() > Duration::from_millis(200));
    }

    #[tokio::test]
    async fn unreachable_archive_is_contained() {
        let mut p = provider(ProviderId::BestTrack, &["wp"], 2);
        p.url_template = "http://127.0.0.1:9/b{basin}{number}{year}.dat".to_string();

        assert!(p.try_fetch().await.is_err());
        assert!(p.fetch().await.is_empty());
    }
}
