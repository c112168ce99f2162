//! Concurrent fan-out over every enabled provider.
//!
//! Each provider runs on its own task. The pass waits for all of them or
//! until the global deadline, whichever comes first; tasks still running at
//! the deadline are aborted and contribute nothing. Results are
//! concatenated in provider priority order and are not de-duplicated, so
//! the same storm may appear once per provider that reports it.

use std::{collections::HashSet, sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::{
    Config,
    basin::filter_by_basin,
    model::Typhoon,
    provider::{ProviderId, TyphoonProvider, providers_from_config},
};

pub const UPDATE_FREQUENCY: &str = "5 minutes (real-time)";
pub const REPORT_SOURCE: &str = "Active Tropical Cyclones Only";
pub const NOTE_EMPTY: &str = "No active tropical cyclones at this time";
pub const NOTE_ACTIVE: &str = "Showing active tropical cyclones only";

#[derive(Debug, Clone)]
pub struct Aggregator {
    providers: Vec<Arc<dyn TyphoonProvider>>,
    timeout: Duration,
}

/// Records plus the metadata block served alongside them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TyphoonReport {
    pub typhoons: Vec<Typhoon>,
    pub metadata: ReportMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportMetadata {
    pub source: String,
    pub basins: Vec<String>,
    pub generated: DateTime<Utc>,
    pub count: usize,
    pub update_frequency: String,
    pub data_sources: Vec<String>,
    pub note: String,
}

impl Aggregator {
    /// `providers` must already be in priority order.
    pub fn new(providers: Vec<Arc<dyn TyphoonProvider>>, timeout: Duration) -> Self {
        Self { providers, timeout }
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Ok(Self::new(providers_from_config(config)?, config.aggregate_timeout()))
    }

    pub fn provider_ids(&self) -> Vec<ProviderId> {
        self.providers.iter().map(|p| p.id()).collect()
    }

    /// All records from every provider that answered in time.
    ///
    /// Never fails: if nothing answers, the result is empty.
    pub async fn fetch_all_typhoons(&self) -> Vec<Typhoon> {
        let started = Instant::now();
        let deadline = started + self.timeout;

        let tasks: Vec<_> = self
            .providers
            .iter()
            .map(|provider| {
                let provider = Arc::clone(provider);
                (provider.id(), tokio::spawn(async move { provider.fetch().await }))
            })
            .collect();

        let mut records = Vec::new();
        let mut answered = 0usize;
        for (id, mut task) in tasks {
            match tokio::time::timeout_at(deadline, &mut task).await {
                Ok(Ok(found)) => {
                    answered += 1;
                    records.extend(found);
                }
                Ok(Err(err)) => log::warn!("{id} task failed: {err}"),
                Err(_) => {
                    task.abort();
                    log::warn!("{id} missed the {:?} aggregation deadline", self.timeout);
                }
            }
        }

        let records: Vec<Typhoon> = records.into_iter().filter_map(Typhoon::validated).collect();

        log::info!(
            "Aggregated {} record(s) from {}/{} provider(s) in {:?}",
            records.len(),
            answered,
            self.providers.len(),
            started.elapsed()
        );

        records
    }

    /// [`Aggregator::fetch_all_typhoons`] narrowed to `basins` (exact match).
    pub async fn fetch_typhoons_for_basin(&self, basins: &HashSet<String>) -> Vec<Typhoon> {
        filter_by_basin(self.fetch_all_typhoons().await, basins)
    }

    /// Records for `basins` plus report metadata; `None` means every basin.
    pub async fn report(&self, basins: Option<&HashSet<String>>) -> TyphoonReport {
        let typhoons = match basins {
            Some(basins) => self.fetch_typhoons_for_basin(basins).await,
            None => self.fetch_all_typhoons().await,
        };

        let mut basin_names: Vec<String> = basins.into_iter().flatten().cloned().collect();
        basin_names.sort();
        let note = if typhoons.is_empty() { NOTE_EMPTY } else { NOTE_ACTIVE };

        TyphoonReport {
            metadata: ReportMetadata {
                source: REPORT_SOURCE.to_string(),
                basins: basin_names,
                generated: Utc::now(),
                count: typhoons.len(),
                update_frequency: UPDATE_FREQUENCY.to_string(),
                data_sources: self
                    .provider_ids()
                    .iter()
                    .map(|id| id.display_name().to_string())
                    .collect(),
                note: note.to_string(),
            },
            typhoons,
        }
    }
}
