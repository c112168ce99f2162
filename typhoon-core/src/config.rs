use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fs, path::PathBuf, time::Duration};

use crate::{
    basin::PHILIPPINE_BASINS,
    provider::ProviderId,
};

/// Per-provider switches, keyed by provider id in [`Config::providers`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,

    /// Replaces the provider's built-in feed URL (or URL template for the
    /// ATCF archives).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            url: None,
        }
    }
}

fn enabled_by_default() -> bool {
    true
}

/// Which ATCF archive files to probe on every pass.
///
/// Each archive covers different basins. The best-track b-decks are
/// published for every basin, while the official forecast files exist only
/// for the basins NHC and CPHC forecast (`al`, `ep`, `cp`); Western Pacific
/// storms therefore arrive without a forecast track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AtcfConfig {
    /// Lowercase ATCF basin codes probed by `best-track`, e.g. `wp`, `ep`.
    pub best_track_basins: Vec<String>,
    /// Lowercase ATCF basin codes probed by `forecast`.
    pub forecast_basins: Vec<String>,
    /// Storm numbers `1..=max_storm_number` are looked up per basin.
    pub max_storm_number: u32,
    /// Season year; the current UTC year when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
}

impl Default for AtcfConfig {
    fn default() -> Self {
        Self {
            best_track_basins: vec!["wp".to_string()],
            forecast_basins: ["al", "ep", "cp"].map(String::from).to_vec(),
            max_storm_number: 30,
            year: None,
        }
    }
}

impl AtcfConfig {
    /// Basin codes probed by the given ATCF provider; empty for feed providers.
    pub fn basins_for(&self, id: ProviderId) -> &[String] {
        match id {
            ProviderId::BestTrack => &self.best_track_basins,
            ProviderId::Forecast => &self.forecast_basins,
            _ => &[],
        }
    }
}

/// Top-level configuration stored on disk.
///
/// Every field is optional in the TOML file:
///
/// ```toml
/// default_basins = ["Western Pacific"]
/// aggregate_timeout_ms = 5000
///
/// [atcf]
/// best_track_basins = ["wp", "ep"]
///
/// [providers.noaa-alerts]
/// enabled = false
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Basin names used when a caller asks for "my basins" without naming any.
    pub default_basins: Vec<String>,

    /// Upper bound for one whole aggregation pass.
    pub aggregate_timeout_ms: u64,

    /// Per-request bound for RSS, Atom and GeoJSON feeds.
    pub feed_timeout_ms: u64,

    /// Per-request bound for ATCF best-track and forecast lookups.
    pub lookup_timeout_ms: u64,

    pub user_agent: String,

    pub atcf: AtcfConfig,

    pub providers: HashMap<String, ProviderConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_basins: PHILIPPINE_BASINS.iter().map(|b| b.to_string()).collect(),
            aggregate_timeout_ms: 5_000,
            feed_timeout_ms: 4_000,
            lookup_timeout_ms: 1_000,
            user_agent: concat!("typhoon-watch/", env!("CARGO_PKG_VERSION")).to_string(),
            atcf: AtcfConfig::default(),
            providers: HashMap::new(),
        }
    }
}

impl Config {
    pub fn aggregate_timeout(&self) -> Duration {
        Duration::from_millis(self.aggregate_timeout_ms)
    }

    pub fn feed_timeout(&self) -> Duration {
        Duration::from_millis(self.feed_timeout_ms)
    }

    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_millis(self.lookup_timeout_ms)
    }

    pub fn provider_config(&self, id: ProviderId) -> Option<&ProviderConfig> {
        self.providers.get(id.as_str())
    }

    /// Providers are enabled unless the config says otherwise.
    pub fn provider_enabled(&self, id: ProviderId) -> bool {
        self.provider_config(id).is_none_or(|cfg| cfg.enabled)
    }

    /// Configured URL override, or the provider's built-in URL.
    pub fn provider_url(&self, id: ProviderId) -> &str {
        self.provider_config(id)
            .and_then(|cfg| cfg.url.as_deref())
            .unwrap_or_else(|| id.default_url())
    }

    pub fn set_provider_enabled(&mut self, id: ProviderId, enabled: bool) {
        self.providers.entry(id.as_str().to_string()).or_default().enabled = enabled;
    }

    pub fn set_default_basins(&mut self, basins: Vec<String>) {
        self.default_basins = basins;
    }

    /// Load config from disk, or return the defaults if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }

        Self::load_from(&path)
    }

    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let mut cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        cfg.providers = canonical_provider_keys(cfg.providers)
            .with_context(|| format!("Invalid provider section in {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_file_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(&path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "typhoon-watch", "typhoon")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }
}

/// Rewrites provider sections to their canonical ids (`NOAA-Alerts` becomes
/// `noaa-alerts`) so lookups by [`ProviderId::as_str`] find them.
fn canonical_provider_keys(
    providers: HashMap<String, ProviderConfig>,
) -> Result<HashMap<String, ProviderConfig>> {
    let mut canonical = HashMap::with_capacity(providers.len());

    for (key, cfg) in providers {
        let id = ProviderId::try_from(key.as_str())?;
        if canonical.insert(id.as_str().to_string(), cfg).is_some() {
            return Err(anyhow!("Provider '{id}' is configured more than once"));
        }
    }

    Ok(canonical)
}
