//! Catalog entries as written by the ETL job.
//!
//! Only `scientific_name` is required. Missing fields take the same
//! defaults the ETL loader applies; unknown zone codes are dropped and
//! entries with unknown use or maintenance tokens are skipped, each with a
//! warning.

use std::collections::BTreeSet;

use serde::Deserialize;
use tree_manager_site_models::KoppenZone;
use tree_manager_species_models::{MaintenanceLevel, PhRange, PrimaryUse, SpeciesRecord};

/// Default lower pH bound.
pub const DEFAULT_SOIL_PH_MIN: f64 = 5.0;
/// Default upper pH bound.
pub const DEFAULT_SOIL_PH_MAX: f64 = 7.5;
/// Default mature height in metres.
pub const DEFAULT_MAX_HEIGHT_M: f64 = 15.0;

const fn default_ph_min() -> f64 {
    DEFAULT_SOIL_PH_MIN
}

const fn default_ph_max() -> f64 {
    DEFAULT_SOIL_PH_MAX
}

const fn default_max_height() -> f64 {
    DEFAULT_MAX_HEIGHT_M
}

fn default_primary_use() -> String {
    PrimaryUse::Ornamental.to_string()
}

fn default_maintenance() -> String {
    MaintenanceLevel::Medium.to_string()
}

/// One element of the ETL's `tree_species.json`.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogEntry {
    /// Binomial name.
    pub scientific_name: String,
    /// Common name; blank falls back to the scientific name.
    #[serde(default)]
    pub common_name: String,
    /// Köppen short codes (`"Cfb"`).
    #[serde(default)]
    pub koppen_zones: Vec<String>,
    /// Lower pH bound.
    #[serde(default = "default_ph_min")]
    pub soil_ph_min: f64,
    /// Upper pH bound.
    #[serde(default = "default_ph_max")]
    pub soil_ph_max: f64,
    /// Drought tolerance.
    #[serde(default)]
    pub drought_tolerant: bool,
    /// Primary use token.
    #[serde(default = "default_primary_use")]
    pub primary_use: String,
    /// Mature height.
    #[serde(default = "default_max_height")]
    pub max_height_m: f64,
    /// Maintenance token.
    #[serde(default = "default_maintenance")]
    pub maintenance_level: String,
    /// Image URL; empty means none.
    #[serde(default)]
    pub image_url: Option<String>,
    /// Free-form tags.
    #[serde(default)]
    pub attributes: Vec<String>,
}

impl CatalogEntry {
    /// Converts to a species record, or `None` if a required token is not
    /// recognised.
    #[must_use]
    pub fn into_record(self) -> Option<SpeciesRecord> {
        let Ok(primary_use) = self.primary_use.parse::<PrimaryUse>() else {
            log::warn!(
                "Skipping {}: unknown primary use '{}'",
                self.scientific_name,
                self.primary_use
            );
            return None;
        };
        let Ok(maintenance_level) = self.maintenance_level.parse::<MaintenanceLevel>() else {
            log::warn!(
                "Skipping {}: unknown maintenance level '{}'",
                self.scientific_name,
                self.maintenance_level
            );
            return None;
        };

        let climate_zones: BTreeSet<KoppenZone> = self
            .koppen_zones
            .iter()
            .filter_map(|code| {
                code.parse::<KoppenZone>()
                    .inspect_err(|_| {
                        log::warn!(
                            "{}: dropping unknown Köppen zone '{code}'",
                            self.scientific_name
                        );
                    })
                    .ok()
            })
            .collect();

        let common_name = if self.common_name.trim().is_empty() {
            self.scientific_name.clone()
        } else {
            self.common_name
        };

        let (min, max) = if self.soil_ph_min <= self.soil_ph_max {
            (self.soil_ph_min, self.soil_ph_max)
        } else {
            (self.soil_ph_max, self.soil_ph_min)
        };

        Some(SpeciesRecord {
            scientific_name: self.scientific_name,
            common_name,
            climate_zones,
            soil_ph_range: PhRange { min, max },
            drought_tolerant: self.drought_tolerant,
            primary_use,
            max_height_m: self.max_height_m,
            maintenance_level,
            image_url: self.image_url.filter(|url| !url.trim().is_empty()),
            attributes: self.attributes.into_iter().collect(),
        })
    }
}
