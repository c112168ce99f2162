use std::{collections::HashSet, fs, path::PathBuf};

use anyhow::{Context, anyhow};
use clap::{Parser, Subcommand};
use inquire::MultiSelect;
use typhoon_core::{
    Aggregator, Config, ProviderId, SourceParser, Typhoon, basin, cone_feature_collection,
    provider::parser_for, units::compass_from_degrees,
};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "typhoon", version, about = "Active tropical cyclone monitor")]
pub struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List active storms from every enabled provider.
    List {
        /// Basin name, e.g. "Western Pacific". Repeatable; defaults to the configured basins.
        #[arg(long = "basin", value_name = "NAME")]
        basins: Vec<String>,

        /// Ignore basin filtering entirely.
        #[arg(long, conflicts_with = "basins")]
        all: bool,

        /// Print the full report as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Print the forecast cone of one storm as GeoJSON.
    Cone {
        /// Storm id as shown by `typhoon list`, e.g. "wp012024".
        id: String,

        #[arg(long = "basin", value_name = "NAME")]
        basins: Vec<String>,
    },

    /// Run one provider's parser over a local file and print the records.
    Parse {
        /// Provider id, e.g. "best-track" or "nhc-atlantic".
        provider: String,

        file: PathBuf,
    },

    /// Choose default basins and enabled providers.
    Configure,

    /// Show every provider and whether it is enabled.
    Providers,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::List { basins, all, json } => {
                let config = Config::load()?;
                let basins = selected_basins(&config, basins, all);
                let report = Aggregator::from_config(&config)?.report(basins.as_ref()).await;

                if json {
                    println!("{}", serde_json::to_string_pretty(&report)?);
                } else if report.typhoons.is_empty() {
                    println!("{}", report.metadata.note);
                } else {
                    print_table(&report.typhoons);
                }
            }
            Command::Cone { id, basins } => {
                let config = Config::load()?;
                let aggregator = Aggregator::from_config(&config)?;

                let records = match selected_basins(&config, basins, true) {
                    Some(basins) => aggregator.fetch_typhoons_for_basin(&basins).await,
                    None => aggregator.fetch_all_typhoons().await,
                };

                let storm = records
                    .iter()
                    .find(|t| t.id.eq_ignore_ascii_case(&id))
                    .ok_or_else(|| anyhow!("No active storm with id '{id}'"))?;

                println!("{}", serde_json::to_string_pretty(&cone_feature_collection(storm))?);
            }
            Command::Parse { provider, file } => {
                let id = ProviderId::try_from(provider.as_str())?;
                let raw = fs::read_to_string(&file)
                    .with_context(|| format!("Failed to read {}", file.display()))?;

                let records = parser_for(id).parse(&raw);
                log::info!("{} record(s) parsed from {}", records.len(), file.display());

                println!("{}", serde_json::to_string_pretty(&records)?);
            }
            Command::Configure => configure()?,
            Command::Providers => {
                let config = Config::load()?;
                for id in ProviderId::all() {
                    let state = if config.provider_enabled(*id) { "enabled" } else { "disabled" };
                    println!(
                        "{:<20} {:<9} {:<24} {}",
                        id.as_str(),
                        state,
                        id.display_name(),
                        config.provider_url(*id)
                    );
                }
            }
        }

        Ok(())
    }
}

/// Basin set for a listing; `None` means no filtering.
///
/// Explicit `--basin` flags win; otherwise `all` disables filtering and the
/// configured defaults apply.
fn selected_basins(config: &Config, basins: Vec<String>, all: bool) -> Option<HashSet<String>> {
    if !basins.is_empty() {
        Some(basin::basin_set(basins))
    } else if all {
        None
    } else {
        Some(basin::basin_set(config.default_basins.iter().cloned()))
    }
}

fn configure() -> anyhow::Result<()> {
    let mut config = Config::load()?;

    let basin_defaults: Vec<usize> = basin::KNOWN_BASINS
        .iter()
        .enumerate()
        .filter(|(_, b)| config.default_basins.iter().any(|d| d.as_str() == **b))
        .map(|(i, _)| i)
        .collect();
    let basins = MultiSelect::new("Default basins:", basin::KNOWN_BASINS.to_vec())
        .with_default(&basin_defaults)
        .prompt()
        .context("Basin selection cancelled")?;

    let provider_defaults: Vec<usize> = ProviderId::all()
        .iter()
        .enumerate()
        .filter(|(_, id)| config.provider_enabled(**id))
        .map(|(i, _)| i)
        .collect();
    let enabled = MultiSelect::new("Enabled providers:", ProviderId::all().to_vec())
        .with_default(&provider_defaults)
        .prompt()
        .context("Provider selection cancelled")?;

    config.set_default_basins(basins.into_iter().map(str::to_string).collect());
    for id in ProviderId::all() {
        config.set_provider_enabled(*id, enabled.contains(id));
    }

    config.save()?;
    println!("Saved configuration to {}", Config::config_file_path()?.display());

    Ok(())
}

fn print_table(typhoons: &[Typhoon]) {
    println!(
        "{:<12} {:<14} {:<16} {:<5} {:>9} {:>7} {:>16} {:>10}  {:<17} SOURCE",
        "ID", "NAME", "BASIN", "CAT", "WIND", "MB", "POSITION", "MOVING", "OBSERVED"
    );

    for t in typhoons {
        let wind = format!("{:.0}kt/{:.0}", t.wind_speed, t.wind_speed_kph);
        let position = format!("{:.1}, {:.1}", t.coordinates.lat, t.coordinates.lon);
        let moving = format!(
            "{} {:.0}kt",
            compass_from_degrees(t.movement_direction),
            t.movement_speed
        );

        println!(
            "{:<12} {:<14} {:<16} {:<5} {:>9} {:>7.0} {:>16} {:>10}  {:<17} {}",
            t.id,
            t.name,
            t.basin,
            t.category.as_str(),
            wind,
            t.pressure,
            position,
            moving,
            t.timestamp.format("%Y-%m-%d %H:%MZ").to_string(),
            t.provider
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_accepts_repeated_basins() {
        let cli = Cli::try_parse_from([
            "typhoon",
            "list",
            "--basin",
            "Western Pacific",
            "--basin",
            "Atlantic",
            "--json",
        ])
        .unwrap();

        match cli.command {
            Command::List { basins, all, json } => {
                assert_eq!(basins, vec!["Western Pacific", "Atlantic"]);
                assert!(!all);
                assert!(json);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn all_conflicts_with_basin() {
        assert!(Cli::try_parse_from(["typhoon", "list", "--all", "--basin", "Atlantic"]).is_err());
    }

    #[test]
    fn verbose_is_global() {
        let cli = Cli::try_parse_from(["typhoon", "providers", "-v"]).unwrap();
        assert!(cli.verbose);
    }

    #[test]
    fn basin_selection_prefers_flags_then_all_then_config() {
        let config = Config::default();

        let explicit = selected_basins(&config, vec!["Atlantic".into()], false).unwrap();
        assert_eq!(explicit, HashSet::from(["Atlantic".to_string()]));

        assert_eq!(selected_basins(&config, Vec::new(), true), None);

        let defaults = selected_basins(&config, Vec::new(), false).unwrap();
        assert!(defaults.contains("Western Pacific"));
        assert!(defaults.contains("Eastern Pacific"));
    }
}
