//! Menu-driven front end used when no subcommand is given.

use std::collections::BTreeSet;

use dialoguer::{Confirm, Input, MultiSelect, Select};
use tree_manager_cli_utils::MultiProgress;
use tree_manager_site_models::KoppenZone;
use tree_manager_species_models::{ExperienceLevel, MaintenanceLevel, PrimaryUse, UserGoals};

use crate::commands::{self, CliResult, Location, Settings, TreeQuery};

/// Top-level tool selection.
enum Tool {
    Analyze,
    Recommend,
    BrowseTrees,
    Zone,
    Soil,
    Geocode,
    DownloadKoppen,
}

impl Tool {
    const ALL: &[Self] = &[
        Self::Analyze,
        Self::Recommend,
        Self::BrowseTrees,
        Self::Zone,
        Self::Soil,
        Self::Geocode,
        Self::DownloadKoppen,
    ];

    #[must_use]
    const fn label(&self) -> &'static str {
        match self {
            Self::Analyze => "Analyze a site",
            Self::Recommend => "Recommend trees for a site",
            Self::BrowseTrees => "Browse the species catalog",
            Self::Zone => "Look up climate zone",
            Self::Soil => "Look up soil",
            Self::Geocode => "Geocode an address",
            Self::DownloadKoppen => "Download Köppen raster",
        }
    }
}

pub async fn run(settings: &Settings, multi: &MultiProgress) -> CliResult {
    let labels: Vec<&str> = Tool::ALL.iter().map(Tool::label).collect();

    let idx = Select::new()
        .with_prompt("What would you like to do?")
        .items(&labels)
        .default(0)
        .interact()?;

    match Tool::ALL[idx] {
        Tool::Analyze => commands::analyze(settings, prompt_location()?).await,
        Tool::Recommend => {
            let location = prompt_location()?;
            let goals = prompt_goals()?;
            commands::recommend_trees(settings, location, &goals, 20).await
        }
        Tool::BrowseTrees => commands::trees(settings, prompt_tree_query()?),
        Tool::Zone => {
            let (lat, lon) = prompt_point()?;
            commands::zone(settings, lat, lon).await
        }
        Tool::Soil => {
            let (lat, lon) = prompt_point()?;
            let geology_only = Confirm::new()
                .with_prompt("Skip measured data and estimate from geology?")
                .default(false)
                .interact()?;
            commands::soil(settings, lat, lon, geology_only).await
        }
        Tool::Geocode => {
            let address: String = Input::new().with_prompt("Address").interact_text()?;
            commands::geocode(&address).await
        }
        Tool::DownloadKoppen => commands::download(settings, multi).await,
    }
}

fn prompt_point() -> CliResult<(f64, f64)> {
    let lat: f64 = Input::new().with_prompt("Latitude").interact_text()?;
    let lon: f64 = Input::new().with_prompt("Longitude").interact_text()?;
    Ok((lat, lon))
}

fn prompt_location() -> CliResult<Location> {
    let by_address = Select::new()
        .with_prompt("Locate the site by")
        .items(&["Address", "Coordinates"])
        .default(0)
        .interact()?
        == 0;

    if by_address {
        let address: String = Input::new().with_prompt("Address").interact_text()?;
        Ok(Location::Address(address))
    } else {
        let (latitude, longitude) = prompt_point()?;
        Ok(Location::Point {
            latitude,
            longitude,
        })
    }
}

fn prompt_goals() -> CliResult<UserGoals> {
    let uses = PrimaryUse::all();
    let labels: Vec<&str> = uses.iter().map(|u| u.label()).collect();
    let picked = MultiSelect::new()
        .with_prompt("Goals (space=toggle, enter=confirm)")
        .items(&labels)
        .interact()?;
    let goals: BTreeSet<PrimaryUse> = picked.into_iter().map(|i| uses[i]).collect();

    let levels = [
        MaintenanceLevel::Low,
        MaintenanceLevel::Medium,
        MaintenanceLevel::High,
    ];
    let maintenance = Select::new()
        .with_prompt("Maintenance you are willing to take on")
        .items(&["low", "medium", "high"])
        .default(1)
        .interact()?;

    let experience = [
        ExperienceLevel::Beginner,
        ExperienceLevel::Intermediate,
        ExperienceLevel::Experienced,
    ];
    let experience_idx = Select::new()
        .with_prompt("Gardening experience")
        .items(&["beginner", "intermediate", "experienced"])
        .default(0)
        .interact()?;

    Ok(UserGoals {
        goals,
        maintenance_level: Some(levels[maintenance]),
        experience_level: Some(experience[experience_idx]),
    })
}

fn optional_text(prompt: &str) -> CliResult<Option<String>> {
    let value: String = Input::new()
        .with_prompt(prompt)
        .allow_empty(true)
        .interact_text()?;
    Ok(Some(value).filter(|v| !v.trim().is_empty()))
}

fn prompt_tree_query() -> CliResult<TreeQuery> {
    Ok(TreeQuery {
        primary_use: optional_text("Type (fruit, ornamental, screening, shade, wildlife; blank for any)")?,
        size: optional_text("Size (small, medium, large; blank for any)")?,
        maintenance: optional_text("Maintenance (low, medium, high; blank for any)")?,
        zone: optional_text("Köppen zone code (e.g. Cfb; blank for any)")?
            .map(|code| code.trim().parse::<KoppenZone>())
            .transpose()?,
        ..TreeQuery::default()
    })
}
