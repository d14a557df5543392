#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Tree species records and the taxonomies used to filter them.
//!
//! Species records are built offline by the catalog ETL and are read-only
//! at query time. User goals are stored on the account and feed the
//! recommendation ranking.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use tree_manager_site_models::KoppenZone;

/// Main reason a gardener would plant a species. Also used as the user's
/// goal tags.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PrimaryUse {
    /// Fruit and nut trees
    Fruit,
    /// Garden display
    Ornamental,
    /// Privacy screening and hedges
    Screening,
    /// Canopy cover
    Shade,
    /// Wildlife and pollinator support
    Wildlife,
}

impl PrimaryUse {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Fruit,
            Self::Ornamental,
            Self::Screening,
            Self::Shade,
            Self::Wildlife,
        ]
    }

    /// Label shown in goal pickers.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Fruit => "Fruit Trees",
            Self::Ornamental => "Ornamental",
            Self::Screening => "Privacy Screening",
            Self::Shade => "Shade",
            Self::Wildlife => "Wildlife & Pollinators",
        }
    }
}

/// A goal tag on the user's account.
pub type Goal = PrimaryUse;

/// Upkeep effort, ordered low < medium < high.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MaintenanceLevel {
    Low,
    Medium,
    High,
}

/// Self-reported gardening experience.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ExperienceLevel {
    Beginner,
    Intermediate,
    Experienced,
}

/// Mature-height bucket.
///
/// Small is `< 8 m`, medium is `8..=15 m`, large is `> 15 m`. The buckets
/// are disjoint and cover every non-negative height.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SizeBucket {
    Small,
    Medium,
    Large,
}

impl SizeBucket {
    /// Lower bound (inclusive) of the medium band, in metres.
    pub const MEDIUM_MIN_M: f64 = 8.0;
    /// Upper bound (inclusive) of the medium band, in metres.
    pub const MEDIUM_MAX_M: f64 = 15.0;

    /// Returns `true` if a tree of `height_m` falls in this bucket.
    #[must_use]
    pub fn contains(self, height_m: f64) -> bool {
        match self {
            Self::Small => height_m < Self::MEDIUM_MIN_M,
            Self::Medium => (Self::MEDIUM_MIN_M..=Self::MEDIUM_MAX_M).contains(&height_m),
            Self::Large => height_m > Self::MEDIUM_MAX_M,
        }
    }

    /// Bucket for a given height.
    #[must_use]
    pub fn for_height(height_m: f64) -> Self {
        if height_m < Self::MEDIUM_MIN_M {
            Self::Small
        } else if height_m <= Self::MEDIUM_MAX_M {
            Self::Medium
        } else {
            Self::Large
        }
    }
}

/// Acceptable soil pH interval of a species (inclusive).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhRange {
    /// Lowest tolerated pH.
    pub min: f64,
    /// Highest tolerated pH.
    pub max: f64,
}

impl PhRange {
    /// Returns `true` if this range shares any value with `[low, high]`.
    #[must_use]
    pub fn overlaps(&self, low: f64, high: f64) -> bool {
        self.min <= high && low <= self.max
    }
}

/// A tree species as stored in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeciesRecord {
    /// Binomial name; unique key.
    pub scientific_name: String,
    /// Common (vernacular) name; default catalog ordering.
    pub common_name: String,
    /// Köppen zones where the species occurs.
    pub climate_zones: BTreeSet<KoppenZone>,
    /// Tolerated soil pH.
    pub soil_ph_range: PhRange,
    /// Whether the species tolerates drought.
    pub drought_tolerant: bool,
    /// Main use-case.
    pub primary_use: PrimaryUse,
    /// Mature height in metres.
    pub max_height_m: f64,
    /// Upkeep effort.
    pub maintenance_level: MaintenanceLevel,
    /// Image URL, if one was found by the ETL.
    pub image_url: Option<String>,
    /// Free-form tags (e.g. "Deciduous", "Native").
    pub attributes: BTreeSet<String>,
}

impl SpeciesRecord {
    /// Height bucket of this species.
    #[must_use]
    pub fn size_bucket(&self) -> SizeBucket {
        SizeBucket::for_height(self.max_height_m)
    }

    /// Returns `true` if the species occurs in `zone`.
    #[must_use]
    pub fn grows_in(&self, zone: KoppenZone) -> bool {
        self.climate_zones.contains(&zone)
    }
}

impl std::fmt::Display for SpeciesRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.common_name, self.scientific_name)
    }
}

/// A user's stated planting goals.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserGoals {
    /// Use-case tags the user is interested in.
    #[serde(default)]
    pub goals: BTreeSet<Goal>,
    /// Highest upkeep the user is willing to take on.
    #[serde(default)]
    pub maintenance_level: Option<MaintenanceLevel>,
    /// Gardening experience.
    #[serde(default)]
    pub experience_level: Option<ExperienceLevel>,
}

impl UserGoals {
    /// A profile is complete once goals and both levels are set.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.goals.is_empty()
            && self.maintenance_level.is_some()
            && self.experience_level.is_some()
    }
}
