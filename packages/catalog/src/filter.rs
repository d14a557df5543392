//! Multi-criteria species filtering.
//!
//! Every criterion is optional and independent; a species matches when it
//! passes all criteria that are set. Each criterion is a standalone
//! predicate function so it can be tested and composed on its own.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use tree_manager_site_models::KoppenZone;
use tree_manager_species_models::{MaintenanceLevel, PrimaryUse, SizeBucket, SpeciesRecord};

use crate::{Catalog, CatalogError, default_order};

/// Order of filter results.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum SortOrder {
    /// Catalog order: common name, then scientific name.
    #[default]
    CommonName,
    /// Alphabetical by scientific name.
    ScientificName,
    /// Shortest mature height first.
    HeightAsc,
    /// Tallest mature height first.
    HeightDesc,
}

/// Soil pH with the tolerance applied on both sides.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhWindow {
    /// Measured or inferred pH.
    pub ph: f64,
    /// Half-width of the window.
    pub tolerance: f64,
}

impl PhWindow {
    /// Lower bound of the window.
    #[must_use]
    pub fn low(&self) -> f64 {
        self.ph - self.tolerance
    }

    /// Upper bound of the window.
    #[must_use]
    pub fn high(&self) -> f64 {
        self.ph + self.tolerance
    }
}

/// Browse criteria. `None` means "no constraint".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterCriteria {
    /// Primary use must equal this.
    pub primary_use: Option<PrimaryUse>,
    /// Mature height must fall in this bucket.
    pub size: Option<SizeBucket>,
    /// Maintenance level must equal this.
    pub maintenance_level: Option<MaintenanceLevel>,
    /// Species must occur in this zone.
    pub climate_zone: Option<KoppenZone>,
    /// Species pH range must overlap this window.
    pub soil_ph: Option<PhWindow>,
    /// Drought tolerance must equal this.
    pub drought_tolerant: Option<bool>,
    /// Result order.
    #[serde(default)]
    pub sort: SortOrder,
}

impl FilterCriteria {
    /// Builds criteria from the raw browse tokens.
    ///
    /// Blank tokens mean no criterion. An unrecognised size token is
    /// ignored.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::UnknownToken`] for an unrecognised use or
    /// maintenance token.
    pub fn from_tokens(
        primary_use: Option<&str>,
        size: Option<&str>,
        maintenance_level: Option<&str>,
    ) -> Result<Self, CatalogError> {
        let primary_use = parse_token(primary_use, "type")?;
        let maintenance_level = parse_token(maintenance_level, "maintenance")?;
        let size = non_blank(size).and_then(|token| {
            token
                .to_ascii_lowercase()
                .parse::<SizeBucket>()
                .inspect_err(|_| log::debug!("Ignoring unknown size '{token}'"))
                .ok()
        });

        Ok(Self {
            primary_use,
            size,
            maintenance_level,
            ..Self::default()
        })
    }

    /// Returns `true` if `species` passes every criterion that is set.
    #[must_use]
    pub fn matches(&self, species: &SpeciesRecord) -> bool {
        self.primary_use.is_none_or(|u| matches_use(species, u))
            && self.size.is_none_or(|b| matches_size(species, b))
            && self
                .maintenance_level
                .is_none_or(|m| matches_maintenance(species, m))
            && self.climate_zone.is_none_or(|z| matches_zone(species, z))
            && self.soil_ph.is_none_or(|w| matches_ph(species, w))
            && self
                .drought_tolerant
                .is_none_or(|d| species.drought_tolerant == d)
    }
}

fn non_blank(token: Option<&str>) -> Option<&str> {
    token.map(str::trim).filter(|t| !t.is_empty())
}

fn parse_token<T: std::str::FromStr>(
    token: Option<&str>,
    field: &'static str,
) -> Result<Option<T>, CatalogError> {
    non_blank(token)
        .map(|value| {
            value
                .to_ascii_lowercase()
                .parse::<T>()
                .map_err(|_| CatalogError::UnknownToken {
                    field,
                    value: value.to_string(),
                })
        })
        .transpose()
}

/// Primary use equality.
#[must_use]
pub fn matches_use(species: &SpeciesRecord, primary_use: PrimaryUse) -> bool {
    species.primary_use == primary_use
}

/// Size bucket membership.
#[must_use]
pub fn matches_size(species: &SpeciesRecord, bucket: SizeBucket) -> bool {
    bucket.contains(species.max_height_m)
}

/// Maintenance level equality.
#[must_use]
pub fn matches_maintenance(species: &SpeciesRecord, level: MaintenanceLevel) -> bool {
    species.maintenance_level == level
}

/// Climate zone membership.
#[must_use]
pub fn matches_zone(species: &SpeciesRecord, zone: KoppenZone) -> bool {
    species.grows_in(zone)
}

/// pH range overlap with the window.
#[must_use]
pub fn matches_ph(species: &SpeciesRecord, window: PhWindow) -> bool {
    species.soil_ph_range.overlaps(window.low(), window.high())
}

/// Lazy iterator over matching species. Clone it to restart.
#[derive(Debug, Clone)]
pub struct Matches<'a> {
    order: std::vec::IntoIter<&'a SpeciesRecord>,
    criteria: FilterCriteria,
}

impl<'a> Iterator for Matches<'a> {
    type Item = &'a SpeciesRecord;

    fn next(&mut self) -> Option<Self::Item> {
        let criteria = &self.criteria;
        self.order.find(|species| criteria.matches(species))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, self.order.size_hint().1)
    }
}

/// Filters `catalog` by `criteria`, in the order the criteria ask for.
#[must_use]
pub fn filter<'a>(catalog: &'a Catalog, criteria: &FilterCriteria) -> Matches<'a> {
    let mut order: Vec<&SpeciesRecord> = catalog.iter().collect();
    match criteria.sort {
        SortOrder::CommonName => {}
        SortOrder::ScientificName => {
            order.sort_by(|a, b| a.scientific_name.cmp(&b.scientific_name));
        }
        SortOrder::HeightAsc => order.sort_by(|a, b| {
            a.max_height_m
                .total_cmp(&b.max_height_m)
                .then_with(|| default_order(a, b))
        }),
        SortOrder::HeightDesc => order.sort_by(|a, b| {
            b.max_height_m
                .total_cmp(&a.max_height_m)
                .then_with(|| default_order(a, b))
        }),
    }

    Matches {
        order: order.into_iter(),
        criteria: criteria.clone(),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use tree_manager_species_models::PhRange;

    use super::*;
    use crate::test_support::species;

    fn scenario_catalog() -> Catalog {
        Catalog::from_records([
            species("Quercus robur", "English oak", PrimaryUse::Fruit, 20.0, MaintenanceLevel::Low),
            species("Acer palmatum", "Japanese maple", PrimaryUse::Ornamental, 12.0, MaintenanceLevel::Medium),
            species("Platanus orientalis", "Plane", PrimaryUse::Shade, 25.0, MaintenanceLevel::Low),
            species("Prunus avium", "Cherry", PrimaryUse::Fruit, 6.0, MaintenanceLevel::Medium),
        ])
    }

    fn names<'a>(matches: impl Iterator<Item = &'a SpeciesRecord>) -> Vec<&'a str> {
        matches.map(|s| s.scientific_name.as_str()).collect()
    }

    #[test]
    fn fruit_and_small_returns_only_the_short_fruit_tree() {
        let catalog = scenario_catalog();
        let criteria = FilterCriteria::from_tokens(Some("fruit"), Some("small"), None).unwrap();
        assert_eq!(names(filter(&catalog, &criteria)), ["Prunus avium"]);
    }

    #[test]
    fn no_criteria_returns_catalog_order() {
        let catalog = scenario_catalog();
        assert_eq!(
            names(filter(&catalog, &FilterCriteria::default())),
            ["Prunus avium", "Quercus robur", "Acer palmatum", "Platanus orientalis"]
        );
    }

    #[test]
    fn unknown_size_is_ignored() {
        let catalog = scenario_catalog();
        let criteria = FilterCriteria::from_tokens(Some("fruit"), Some("gigantic"), None).unwrap();
        assert!(criteria.size.is_none());
        assert_eq!(filter(&catalog, &criteria).count(), 2);
    }

    #[test]
    fn blank_tokens_mean_no_criterion() {
        let criteria = FilterCriteria::from_tokens(Some(""), Some("  "), None).unwrap();
        assert_eq!(criteria, FilterCriteria::default());
    }

    #[test]
    fn unknown_use_or_maintenance_is_rejected() {
        assert!(matches!(
            FilterCriteria::from_tokens(Some("timber"), None, None),
            Err(CatalogError::UnknownToken { field: "type", .. })
        ));
        assert!(matches!(
            FilterCriteria::from_tokens(None, None, Some("none")),
            Err(CatalogError::UnknownToken { field: "maintenance", .. })
        ));
    }

    #[test]
    fn tokens_are_case_insensitive() {
        let criteria =
            FilterCriteria::from_tokens(Some("Fruit"), Some("Small"), Some("LOW")).unwrap();
        assert_eq!(criteria.primary_use, Some(PrimaryUse::Fruit));
        assert_eq!(criteria.size, Some(SizeBucket::Small));
        assert_eq!(criteria.maintenance_level, Some(MaintenanceLevel::Low));
    }

    #[test]
    fn maintenance_filter_is_equality() {
        let catalog = scenario_catalog();
        let criteria = FilterCriteria {
            maintenance_level: Some(MaintenanceLevel::Low),
            ..FilterCriteria::default()
        };
        assert_eq!(
            names(filter(&catalog, &criteria)),
            ["Quercus robur", "Platanus orientalis"]
        );
    }

    #[test]
    fn size_buckets_split_at_boundaries() {
        let at = |h: f64| species("X", "X", PrimaryUse::Shade, h, MaintenanceLevel::Low);
        assert!(matches_size(&at(7.9), SizeBucket::Small));
        assert!(matches_size(&at(8.0), SizeBucket::Medium));
        assert!(matches_size(&at(15.0), SizeBucket::Medium));
        assert!(matches_size(&at(15.1), SizeBucket::Large));
        assert!(!matches_size(&at(8.0), SizeBucket::Small));
    }

    #[test]
    fn zone_and_ph_predicates_compose() {
        let mut acid = species("Rhododendron sp", "Rhododendron", PrimaryUse::Ornamental, 3.0, MaintenanceLevel::High);
        acid.soil_ph_range = PhRange { min: 4.5, max: 5.5 };
        acid.climate_zones = BTreeSet::from([KoppenZone::Cfb, KoppenZone::Dfb]);
        let mut chalk = species("Fagus sylvatica", "Beech", PrimaryUse::Shade, 30.0, MaintenanceLevel::Low);
        chalk.soil_ph_range = PhRange { min: 6.5, max: 8.0 };
        let catalog = Catalog::from_records([acid, chalk]);

        let criteria = FilterCriteria {
            climate_zone: Some(KoppenZone::Cfb),
            soil_ph: Some(PhWindow { ph: 7.2, tolerance: 0.5 }),
            ..FilterCriteria::default()
        };
        assert_eq!(names(filter(&catalog, &criteria)), ["Fagus sylvatica"]);

        let criteria = FilterCriteria {
            climate_zone: Some(KoppenZone::Dfb),
            ..FilterCriteria::default()
        };
        assert_eq!(names(filter(&catalog, &criteria)), ["Rhododendron sp"]);
    }

    #[test]
    fn ph_window_edges_are_inclusive() {
        let record = species("X", "X", PrimaryUse::Shade, 5.0, MaintenanceLevel::Low);
        assert!(matches_ph(&record, PhWindow { ph: 8.0, tolerance: 0.5 }));
        assert!(!matches_ph(&record, PhWindow { ph: 8.1, tolerance: 0.5 }));
    }

    #[test]
    fn drought_filter() {
        let mut olive = species("Olea europaea", "Olive", PrimaryUse::Fruit, 10.0, MaintenanceLevel::Low);
        olive.drought_tolerant = true;
        let willow = species("Salix alba", "Willow", PrimaryUse::Shade, 25.0, MaintenanceLevel::Medium);
        let catalog = Catalog::from_records([olive, willow]);

        let criteria = FilterCriteria {
            drought_tolerant: Some(true),
            ..FilterCriteria::default()
        };
        assert_eq!(names(filter(&catalog, &criteria)), ["Olea europaea"]);
    }

    #[test]
    fn sort_orders_override_catalog_order() {
        let catalog = scenario_catalog();
        let by = |sort| {
            let criteria = FilterCriteria {
                sort,
                ..FilterCriteria::default()
            };
            names(filter(&catalog, &criteria))
        };

        assert_eq!(
            by(SortOrder::ScientificName),
            ["Acer palmatum", "Platanus orientalis", "Prunus avium", "Quercus robur"]
        );
        assert_eq!(
            by(SortOrder::HeightAsc),
            ["Prunus avium", "Acer palmatum", "Quercus robur", "Platanus orientalis"]
        );
        assert_eq!(
            by(SortOrder::HeightDesc),
            ["Platanus orientalis", "Quercus robur", "Acer palmatum", "Prunus avium"]
        );
    }

    #[test]
    fn sort_order_parses_from_kebab_case() {
        assert_eq!("height-desc".parse::<SortOrder>().unwrap(), SortOrder::HeightDesc);
        assert_eq!("common-name".parse::<SortOrder>().unwrap(), SortOrder::CommonName);
        assert!("tallest".parse::<SortOrder>().is_err());
    }

    #[test]
    fn matches_is_restartable() {
        let catalog = scenario_catalog();
        let criteria = FilterCriteria::from_tokens(Some("fruit"), None, None).unwrap();
        let matches = filter(&catalog, &criteria);
        let first: Vec<_> = names(matches.clone());
        let second: Vec<_> = names(matches);
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
    }
}
