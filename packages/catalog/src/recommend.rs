//! Goal-aware ranking of species that suit a site.
//!
//! Climate zone and pH are hard constraints taken from the parcel's
//! profile. The user's goals only affect the score.

use std::fmt;

use serde::Serialize;
use tree_manager_site_models::{Drainage, EnvironmentalProfile};
use tree_manager_species_models::{
    ExperienceLevel, MaintenanceLevel, PrimaryUse, SpeciesRecord, UserGoals,
};

use crate::Catalog;
use crate::filter::{FilterCriteria, PhWindow};

/// Default half-width of the pH overlap window.
pub const DEFAULT_PH_TOLERANCE: f64 = 0.5;

const GOAL_POINTS: u32 = 3;
const MAINTENANCE_POINTS: u32 = 2;
const BEGINNER_POINTS: u32 = 1;
const DROUGHT_POINTS: u32 = 1;

/// Why a species scored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", content = "value", rename_all = "snake_case")]
pub enum Reason {
    /// Primary use is one of the user's goals.
    MatchesGoal(PrimaryUse),
    /// Maintenance is at or below what the user will take on.
    WithinMaintenance(MaintenanceLevel),
    /// Low maintenance and the user is a beginner.
    BeginnerFriendly,
    /// Drought tolerant and the site drains well.
    DroughtTolerantOnWellDrained,
}

impl Reason {
    /// Score contribution.
    #[must_use]
    pub const fn points(self) -> u32 {
        match self {
            Self::MatchesGoal(_) => GOAL_POINTS,
            Self::WithinMaintenance(_) => MAINTENANCE_POINTS,
            Self::BeginnerFriendly => BEGINNER_POINTS,
            Self::DroughtTolerantOnWellDrained => DROUGHT_POINTS,
        }
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MatchesGoal(goal) => write!(f, "Matches your goal: {}", goal.label()),
            Self::WithinMaintenance(level) => {
                write!(f, "Fits your {level} maintenance tolerance")
            }
            Self::BeginnerFriendly => f.write_str("Low maintenance, good for beginners"),
            Self::DroughtTolerantOnWellDrained => {
                f.write_str("Drought tolerant on well-drained soil")
            }
        }
    }
}

/// A ranked candidate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation<'a> {
    /// Catalog record.
    pub species: &'a SpeciesRecord,
    /// Sum of [`Reason::points`].
    pub score: u32,
    /// What contributed to the score, in scoring order.
    pub reasons: Vec<Reason>,
}

fn reasons_for(
    species: &SpeciesRecord,
    profile: &EnvironmentalProfile,
    goals: &UserGoals,
) -> Vec<Reason> {
    let mut reasons = Vec::new();

    if goals.goals.contains(&species.primary_use) {
        reasons.push(Reason::MatchesGoal(species.primary_use));
    }
    if let Some(tolerance) = goals.maintenance_level
        && species.maintenance_level <= tolerance
    {
        reasons.push(Reason::WithinMaintenance(tolerance));
    }
    if goals.experience_level == Some(ExperienceLevel::Beginner)
        && species.maintenance_level == MaintenanceLevel::Low
    {
        reasons.push(Reason::BeginnerFriendly);
    }
    if species.drought_tolerant && profile.soil_drainage() == Some(Drainage::WellDrained) {
        reasons.push(Reason::DroughtTolerantOnWellDrained);
    }

    reasons
}

/// Ranks the species that can grow on a site with `profile`.
///
/// Species outside the profile's climate zone, or whose pH range misses
/// the profile's pH by more than `ph_tolerance`, are excluded. Unset
/// profile fields impose no constraint. Results are ordered by score,
/// ties keeping catalog order.
#[must_use]
pub fn recommend<'a>(
    catalog: &'a Catalog,
    profile: &EnvironmentalProfile,
    goals: &UserGoals,
    ph_tolerance: f64,
) -> Vec<Recommendation<'a>> {
    let hard = FilterCriteria {
        climate_zone: profile.climate_zone(),
        soil_ph: profile.soil_ph().map(|ph| PhWindow {
            ph,
            tolerance: ph_tolerance,
        }),
        ..FilterCriteria::default()
    };

    let mut ranked: Vec<Recommendation<'a>> = crate::filter(catalog, &hard)
        .map(|species| {
            let reasons = reasons_for(species, profile, goals);
            Recommendation {
                species,
                score: reasons.iter().map(|r| r.points()).sum(),
                reasons,
            }
        })
        .collect();

    ranked.sort_by(|a, b| b.score.cmp(&a.score));
    log::debug!(
        "{} of {} species suit the site",
        ranked.len(),
        catalog.len()
    );
    ranked
}
