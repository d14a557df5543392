#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! The tree species catalog and the queries run against it.
//!
//! The catalog is built offline by the ETL job and loaded read-only from
//! its JSON output ([`Catalog::load`]). Browsing uses [`filter::filter`];
//! site-aware suggestions use [`recommend::recommend`].

pub mod filter;
pub mod load;
pub mod recommend;

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tree_manager_species_models::SpeciesRecord;

pub use filter::{FilterCriteria, Matches, PhWindow, SortOrder, filter};
pub use recommend::{Reason, Recommendation, recommend};

/// Errors from catalog loading and queries.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// The catalog file could not be read.
    #[error("failed to read catalog {}: {source}", .path.display())]
    Io {
        /// Catalog location.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The catalog is not a JSON array of species entries.
    #[error("invalid catalog JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A filter token is not one of the known values.
    #[error("unknown {field} '{value}'")]
    UnknownToken {
        /// Criterion name (`type`, `maintenance`, ...).
        field: &'static str,
        /// Token as received.
        value: String,
    },
}

/// Read-only species catalog in default order (common name, then
/// scientific name).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    species: Vec<SpeciesRecord>,
}

impl Catalog {
    /// Builds a catalog from records. A later record with the same
    /// scientific name replaces an earlier one.
    #[must_use]
    pub fn from_records(records: impl IntoIterator<Item = SpeciesRecord>) -> Self {
        let mut by_name: BTreeMap<String, SpeciesRecord> = BTreeMap::new();
        for record in records {
            let name = record.scientific_name.clone();
            if by_name.insert(name.clone(), record).is_some() {
                log::debug!("Duplicate catalog entry for {name}, keeping the later one");
            }
        }

        let mut species: Vec<SpeciesRecord> = by_name.into_values().collect();
        species.sort_by(default_order);
        Self { species }
    }

    /// Loads the ETL JSON output from `path`.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Io`] if the file cannot be read and
    /// [`CatalogError::Json`] if it is not a JSON array of entries.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let json = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let catalog = Self::from_json_str(&json)?;
        log::info!(
            "Loaded {} species from {}",
            catalog.len(),
            path.display()
        );
        Ok(catalog)
    }

    /// Parses the ETL JSON output.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Json`] if the text is not a JSON array of
    /// entries.
    pub fn from_json_str(json: &str) -> Result<Self, CatalogError> {
        let entries: Vec<load::CatalogEntry> = serde_json::from_str(json)?;
        Ok(Self::from_records(
            entries.into_iter().filter_map(load::CatalogEntry::into_record),
        ))
    }

    /// Number of species.
    #[must_use]
    pub fn len(&self) -> usize {
        self.species.len()
    }

    /// Returns `true` if the catalog has no species.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.species.is_empty()
    }

    /// Species in default order.
    pub fn iter(&self) -> std::slice::Iter<'_, SpeciesRecord> {
        self.species.iter()
    }

    #[cfg(test)]
    pub(crate) fn get(&self, scientific_name: &str) -> Option<&SpeciesRecord> {
        self.species
            .iter()
            .find(|s| s.scientific_name == scientific_name)
    }
}

impl<'a> IntoIterator for &'a Catalog {
    type Item = &'a SpeciesRecord;
    type IntoIter = std::slice::Iter<'a, SpeciesRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Catalog default ordering.
#[must_use]
pub fn default_order(a: &SpeciesRecord, b: &SpeciesRecord) -> Ordering {
    a.common_name
        .cmp(&b.common_name)
        .then_with(|| a.scientific_name.cmp(&b.scientific_name))
}
