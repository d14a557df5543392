#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line front end for the tree manager.
//!
//! Each subcommand prints pretty JSON to stdout. Run without a subcommand
//! for an interactive menu.
//!
//! Uses `indicatif-log-bridge` (via [`tree_manager_cli_utils::init_logger`])
//! to route `log` output through `indicatif::MultiProgress` so that log
//! lines and progress bars never fight for the terminal.

mod commands;
mod interactive;
mod paths;

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use tree_manager_analysis::{DEFAULT_CONCURRENCY, DEFAULT_SOIL_DEADLINE};
use tree_manager_catalog::SortOrder;
use tree_manager_catalog::recommend::DEFAULT_PH_TOLERANCE;
use tree_manager_site_models::KoppenZone;
use tree_manager_species_models::{ExperienceLevel, MaintenanceLevel, PrimaryUse, UserGoals};

use crate::commands::{Location, Settings, TreeQuery};

/// Site analysis and tree species lookup.
#[derive(Parser)]
#[command(name = "tree_manager")]
#[command(about = "Climate, soil and tree suggestions for garden parcels")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    /// Tool to run; omit for the interactive menu.
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args)]
struct GlobalArgs {
    /// Köppen GeoTIFF location (default: `KOPPEN_GEOTIFF_PATH` or
    /// `data/koppen/`).
    #[arg(long, global = true)]
    koppen_path: Option<PathBuf>,

    /// Species catalog JSON (default: `TREE_CATALOG_PATH` or
    /// `data/processed/tree_species.json`).
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    /// Deadline for each soil stage (measured, then geology), in seconds.
    #[arg(long, global = true, default_value_t = DEFAULT_SOIL_DEADLINE.as_secs())]
    deadline_secs: u64,

    /// Parcels analysed at once in batch mode.
    #[arg(long, global = true, default_value_t = DEFAULT_CONCURRENCY)]
    concurrency: usize,

    /// Half-width of the soil pH window when matching species.
    #[arg(long, global = true, default_value_t = DEFAULT_PH_TOLERANCE)]
    ph_tolerance: f64,
}

impl From<GlobalArgs> for Settings {
    fn from(args: GlobalArgs) -> Self {
        Self {
            koppen_path: args.koppen_path,
            catalog_path: args.catalog,
            deadline: Duration::from_secs(args.deadline_secs),
            concurrency: args.concurrency,
            ph_tolerance: args.ph_tolerance,
        }
    }
}

#[derive(Args)]
struct PointArgs {
    /// Latitude (WGS84).
    #[arg(long, allow_negative_numbers = true)]
    lat: f64,

    /// Longitude (WGS84).
    #[arg(long, allow_negative_numbers = true)]
    lon: f64,
}

#[derive(Args)]
struct LocationArgs {
    /// Latitude (WGS84).
    #[arg(long, allow_negative_numbers = true, requires = "lon")]
    lat: Option<f64>,

    /// Longitude (WGS84).
    #[arg(long, allow_negative_numbers = true, requires = "lat")]
    lon: Option<f64>,

    /// Free-form address to geocode instead of coordinates.
    #[arg(long, conflicts_with_all = ["lat", "lon"])]
    address: Option<String>,
}

impl LocationArgs {
    fn into_location(self) -> commands::CliResult<Location> {
        Location::from_args(self.lat, self.lon, self.address)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Geocode a free-form address.
    Geocode {
        /// Address text.
        address: String,
    },

    /// Classify the Köppen climate zone at a point.
    Zone {
        #[command(flatten)]
        point: PointArgs,
    },

    /// Resolve topsoil pH and drainage at a point.
    Soil {
        #[command(flatten)]
        point: PointArgs,

        /// Skip measured data and estimate from the dominant rock type.
        #[arg(long)]
        geology_only: bool,
    },

    /// Analyze one site, or every parcel in a JSON file.
    Analyze {
        #[command(flatten)]
        location: LocationArgs,

        /// JSON array of parcels (`location` or `polygon` each).
        #[arg(long, conflicts_with_all = ["lat", "lon", "address"])]
        parcels: Option<PathBuf>,
    },

    /// Browse the species catalog.
    Trees {
        /// Primary use (fruit, ornamental, screening, shade, wildlife).
        #[arg(long = "type")]
        primary_use: Option<String>,

        /// Size bucket (small, medium, large).
        #[arg(long)]
        size: Option<String>,

        /// Maintenance level (low, medium, high).
        #[arg(long)]
        maintenance: Option<String>,

        /// Köppen zone code the species must occur in (e.g. `Cfb`).
        #[arg(long)]
        zone: Option<KoppenZone>,

        /// Soil pH the species must tolerate (within `--ph-tolerance`).
        #[arg(long)]
        ph: Option<f64>,

        /// Only drought-tolerant species.
        #[arg(long)]
        drought_tolerant: bool,

        /// Result order (common-name, scientific-name, height-asc,
        /// height-desc).
        #[arg(long, default_value_t = SortOrder::CommonName)]
        sort: SortOrder,
    },

    /// Rank species that suit a site and your goals.
    Recommend {
        #[command(flatten)]
        location: LocationArgs,

        /// Goals, comma separated (fruit, ornamental, screening, shade,
        /// wildlife).
        #[arg(long, value_delimiter = ',')]
        goals: Vec<PrimaryUse>,

        /// Highest maintenance you are willing to take on.
        #[arg(long)]
        maintenance: Option<MaintenanceLevel>,

        /// Your gardening experience.
        #[arg(long)]
        experience: Option<ExperienceLevel>,

        /// Maximum number of recommendations to print.
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },

    /// Download the Köppen-Geiger GeoTIFF (required once before zone
    /// lookups).
    DownloadKoppen,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = tree_manager_cli_utils::init_logger();
    let cli = Cli::parse();
    let settings = Settings::from(cli.global);

    match cli.command {
        None => interactive::run(&settings, &multi).await?,
        Some(Commands::Geocode { address }) => commands::geocode(&address).await?,
        Some(Commands::Zone { point }) => commands::zone(&settings, point.lat, point.lon).await?,
        Some(Commands::Soil {
            point,
            geology_only,
        }) => commands::soil(&settings, point.lat, point.lon, geology_only).await?,
        Some(Commands::Analyze {
            parcels: Some(file),
            ..
        }) => commands::analyze_parcels(&settings, &file, &multi).await?,
        Some(Commands::Analyze { location, .. }) => {
            commands::analyze(&settings, location.into_location()?).await?;
        }
        Some(Commands::Trees {
            primary_use,
            size,
            maintenance,
            zone,
            ph,
            drought_tolerant,
            sort,
        }) => commands::trees(
            &settings,
            TreeQuery {
                primary_use,
                size,
                maintenance,
                zone,
                ph,
                drought_tolerant,
                sort,
            },
        )?,
        Some(Commands::Recommend {
            location,
            goals,
            maintenance,
            experience,
            limit,
        }) => {
            let goals = UserGoals {
                goals: goals.into_iter().collect(),
                maintenance_level: maintenance,
                experience_level: experience,
            };
            commands::recommend_trees(&settings, location.into_location()?, &goals, limit)
                .await?;
        }
        Some(Commands::DownloadKoppen) => commands::download(&settings, &multi).await?,
    }

    Ok(())
}
