#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line front end for corridor searches.
//!
//! Builds the corridor between two sites and searches FCC tower
//! registrations, the wind turbine database and LIDAR coverage along it.

mod report;
mod search_flow;

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use link_corridor_cli_utils::IndicatifProgress;
use link_corridor_geometry::coordinates::{CoordinateError, parse_point};
use link_corridor_geometry::corridor::{DEFAULT_RING_SEGMENTS, search_ring};
use link_corridor_geometry::diagnostics::diagnose_corridor;
use link_corridor_geometry::units::feet_to_meters;
use link_corridor_geometry_models::CorridorSpec;
use link_corridor_search::{SearchConfig, SearchRequest};
use link_corridor_search_models::SearchSource;
use link_corridor_towers::{RecordSource, TowerFilters, TowerStore};
use link_corridor_turbines::TurbineStore;

#[derive(Parser)]
#[command(
    name = "link_corridor_cli",
    about = "Search for obstructions and LIDAR coverage along a link corridor"
)]
struct Cli {
    /// Config file (defaults to `link-corridor.toml` in the working
    /// directory, if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the corridor polygon, its bounds and width checks as JSON
    Corridor {
        #[command(flatten)]
        corridor: CorridorArgs,
    },
    /// Print a closed ring of points around one site as JSON
    Ring {
        /// Site latitude
        #[arg(long, allow_hyphen_values = true)]
        lat: String,
        /// Site longitude
        #[arg(long, allow_hyphen_values = true)]
        lon: String,
        /// Ring radius, feet
        #[arg(long)]
        radius_ft: f64,
        /// Number of points before closing the ring
        #[arg(long, default_value_t = DEFAULT_RING_SEGMENTS)]
        segments: usize,
    },
    /// Manage the FCC tower database
    Towers {
        #[command(subcommand)]
        command: TowerCommands,
    },
    /// Inspect the wind turbine dataset
    Turbines {
        #[command(subcommand)]
        command: TurbineCommands,
    },
    /// Search every source along a corridor
    Search {
        #[command(flatten)]
        corridor: CorridorArgs,
        /// Sources to search, comma-separated (`tower`, `turbine`,
        /// `lidar`). Defaults to all.
        #[arg(long, value_delimiter = ',')]
        sources: Vec<SearchSource>,
        /// Only towers at least this tall above ground, feet
        #[arg(long)]
        min_height_ft: Option<f64>,
        /// Only towers at most this tall above ground, feet
        #[arg(long)]
        max_height_ft: Option<f64>,
        /// Only these structure types (e.g. `TOWER`, `MTOWER`); repeatable
        #[arg(long)]
        structure_type: Vec<String>,
        /// Earliest LIDAR acquisition date
        #[arg(long, default_value = "2000-01-01")]
        start_date: NaiveDate,
        /// Latest LIDAR acquisition date (defaults to today)
        #[arg(long)]
        end_date: Option<NaiveDate>,
        /// Print the full report as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum TowerCommands {
    /// Import `RA.dat`, `CO.dat` and `EN.dat`
    Import {
        /// Directory holding the record files (defaults to the configured
        /// FCC records directory)
        #[arg(long)]
        dir: Option<PathBuf>,
        /// Re-import even if the database is already populated
        #[arg(long)]
        force: bool,
    },
    /// Print database statistics as JSON
    Stats,
}

#[derive(Subcommand)]
enum TurbineCommands {
    /// Compare polygon membership with centerline distance for turbines
    /// near a corridor
    Diagnose {
        #[command(flatten)]
        corridor: CorridorArgs,
        /// How many of the nearest turbines to list
        #[arg(long, default_value_t = link_corridor_turbines::diagnostics::DEFAULT_CLOSEST)]
        closest: usize,
    },
    /// List every turbine in one state as JSON
    State {
        /// Two-letter state code, e.g. `PA`
        state: String,
    },
}

/// Endpoints and widths shared by every corridor command. Coordinates are
/// decimal degrees or DMS such as `40-26-46.0 N`.
#[derive(Args)]
struct CorridorArgs {
    /// Start site latitude
    #[arg(long, allow_hyphen_values = true)]
    from_lat: String,
    /// Start site longitude
    #[arg(long, allow_hyphen_values = true)]
    from_lon: String,
    /// End site latitude
    #[arg(long, allow_hyphen_values = true)]
    to_lat: String,
    /// End site longitude
    #[arg(long, allow_hyphen_values = true)]
    to_lon: String,
    /// Distance from the centerline to each edge, feet
    #[arg(long)]
    half_width_ft: Option<f64>,
    /// Distance the corridor extends past each site, feet
    #[arg(long)]
    extension_ft: Option<f64>,
}

impl CorridorArgs {
    fn to_spec(&self, config: &SearchConfig) -> Result<CorridorSpec, CoordinateError> {
        let start = parse_point(&self.from_lat, &self.from_lon)?;
        let end = parse_point(&self.to_lat, &self.to_lon)?;
        let half_width_ft = self.half_width_ft.unwrap_or(config.default_half_width_ft);
        let extension_ft = self.extension_ft.unwrap_or(config.default_extension_ft);

        Ok(CorridorSpec::new(
            start,
            end,
            feet_to_meters(half_width_ft),
            feet_to_meters(extension_ft),
        ))
    }
}

#[allow(clippy::too_many_lines)]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = link_corridor_cli_utils::init_logger();
    let cli = Cli::parse();
    let config = SearchConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Corridor { corridor } => {
            let spec = corridor.to_spec(&config)?;
            let diagnostics = diagnose_corridor(&spec)?;
            if !diagnostics.consistent_width {
                log::warn!(
                    "Corridor width differs between ends: {:.1} m vs {:.1} m",
                    diagnostics.width_at_start_m,
                    diagnostics.width_at_end_m
                );
            }
            println!("{}", serde_json::to_string_pretty(&diagnostics)?);
        }
        Commands::Ring {
            lat,
            lon,
            radius_ft,
            segments,
        } => {
            let center = parse_point(&lat, &lon)?;
            let ring = search_ring(center, feet_to_meters(radius_ft), segments);
            println!("{}", serde_json::to_string_pretty(&ring)?);
        }
        Commands::Towers { command } => {
            let mut store = TowerStore::open(&config.tower_db)?;
            match command {
                TowerCommands::Import { dir, force } => {
                    let dir = dir.unwrap_or_else(|| config.fcc_records_dir.clone());
                    let progress = IndicatifProgress::import_bar(&multi, "Importing FCC records");
                    let stats = if force {
                        Some(store.import_batch(RecordSource::from_dir(&dir)?, progress.as_ref())?)
                    } else {
                        store.ensure_imported(&dir, progress.as_ref())?
                    };
                    match stats {
                        Some(stats) => println!("{}", serde_json::to_string_pretty(&stats)?),
                        None => {
                            progress.finish_and_clear();
                            log::info!(
                                "{} is already imported; pass --force to re-import",
                                store.location()
                            );
                        }
                    }
                }
                TowerCommands::Stats => {
                    println!("{}", serde_json::to_string_pretty(&store.stats()?)?);
                }
            }
        }
        Commands::Turbines { command } => match command {
            TurbineCommands::Diagnose { corridor, closest } => {
                let spec = corridor.to_spec(&config)?;
                let store = TurbineStore::load(&config.turbine_dataset)?;
                let diagnostics = store.diagnose(&spec, closest)?;
                if !diagnostics.is_consistent() {
                    log::warn!(
                        "{} turbines are within the corridor by distance but outside the polygon",
                        diagnostics.expected_but_missing.len()
                    );
                }
                println!("{}", serde_json::to_string_pretty(&diagnostics)?);
            }
            TurbineCommands::State { state } => {
                let store = TurbineStore::load(&config.turbine_dataset)?;
                let turbines = store.query_state(&state);
                log::info!("{} turbines in {}", turbines.len(), state.to_uppercase());
                println!("{}", serde_json::to_string_pretty(&turbines)?);
            }
        },
        Commands::Search {
            corridor,
            sources,
            min_height_ft,
            max_height_ft,
            structure_type,
            start_date,
            end_date,
            json,
        } => {
            let spec = corridor.to_spec(&config)?;
            let mut filters = TowerFilters::default();
            if let Some(ft) = min_height_ft {
                filters = filters.with_min_height_m(feet_to_meters(ft));
            }
            if let Some(ft) = max_height_ft {
                filters = filters.with_max_height_m(feet_to_meters(ft));
            }
            for structure_type in &structure_type {
                filters = filters.with_structure_type(structure_type);
            }

            let end_date = end_date.unwrap_or_else(|| chrono::Local::now().date_naive());
            let mut request = SearchRequest::new(spec)
                .with_tower_filters(filters)
                .with_lidar_dates(start_date, end_date);
            if !sources.is_empty() {
                request = request.with_sources(sources);
            }

            search_flow::run(&config, &multi, request, json).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_accepts_dms_and_negative_decimals() {
        let cli = Cli::try_parse_from([
            "link_corridor_cli",
            "search",
            "--from-lat",
            "40-26-46.0 N",
            "--from-lon",
            "79-58-56.0 W",
            "--to-lat",
            "40.5",
            "--to-lon",
            "-79.5",
            "--sources",
            "tower,lidar",
        ])
        .unwrap();

        let Commands::Search {
            corridor, sources, ..
        } = cli.command
        else {
            panic!("expected search");
        };
        assert_eq!(sources, vec![SearchSource::Tower, SearchSource::Lidar]);

        let spec = corridor.to_spec(&SearchConfig::default()).unwrap();
        assert!((spec.start.longitude + 79.982_222).abs() < 1e-5);
        assert!((spec.end.longitude + 79.5).abs() < f64::EPSILON);
        assert!((spec.half_width_m - feet_to_meters(1000.0)).abs() < 1e-9);
        assert!(spec.extension_m.abs() < f64::EPSILON);
    }

    #[test]
    fn widths_are_given_in_feet() {
        let cli = Cli::try_parse_from([
            "link_corridor_cli",
            "corridor",
            "--from-lat",
            "40",
            "--from-lon",
            "-80",
            "--to-lat",
            "40",
            "--to-lon",
            "-79",
            "--half-width-ft",
            "500",
            "--extension-ft",
            "100",
        ])
        .unwrap();

        let Commands::Corridor { corridor } = cli.command else {
            panic!("expected corridor");
        };
        let spec = corridor.to_spec(&SearchConfig::default()).unwrap();
        assert!((spec.half_width_m - 152.4).abs() < 1e-9);
        assert!((spec.extension_m - 30.48).abs() < 1e-9);
    }

    #[test]
    fn bad_coordinate_is_reported() {
        let cli = Cli::try_parse_from([
            "link_corridor_cli",
            "corridor",
            "--from-lat",
            "north",
            "--from-lon",
            "-80",
            "--to-lat",
            "40",
            "--to-lon",
            "-79",
        ])
        .unwrap();

        let Commands::Corridor { corridor } = cli.command else {
            panic!("expected corridor");
        };
        assert!(corridor.to_spec(&SearchConfig::default()).is_err());
    }

    #[test]
    fn ring_accepts_negative_longitude() {
        let cli = Cli::try_parse_from([
            "link_corridor_cli",
            "ring",
            "--lat",
            "40.0",
            "--lon",
            "-80.0",
            "--radius-ft",
            "820",
        ])
        .unwrap();

        let Commands::Ring {
            lon, segments, ..
        } = cli.command
        else {
            panic!("expected ring");
        };
        assert_eq!(lon, "-80.0");
        assert_eq!(segments, DEFAULT_RING_SEGMENTS);
    }

    #[test]
    fn turbines_state_takes_a_code() {
        let cli =
            Cli::try_parse_from(["link_corridor_cli", "turbines", "state", "pa"]).unwrap();
        let Commands::Turbines {
            command: TurbineCommands::State { state },
        } = cli.command
        else {
            panic!("expected turbines state");
        };
        assert_eq!(state, "pa");
    }

    #[test]
    fn unknown_source_is_rejected() {
        let result = Cli::try_parse_from([
            "link_corridor_cli",
            "search",
            "--from-lat",
            "40",
            "--from-lon",
            "-80",
            "--to-lat",
            "40",
            "--to-lon",
            "-79",
            "--sources",
            "satellite",
        ]);
        assert!(result.is_err());
    }
}
