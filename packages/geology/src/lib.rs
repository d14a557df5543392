#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Soil estimates from bedrock geology.
//!
//! Used when no measured soil data exists near a parcel. The geologic map
//! unit under the point is looked up, its dominant lithology (the first
//! entry of a composite description such as
//! `"limestone [60%..80%]; clay [20%..40%]"`) is matched against
//! [`LITHOLOGY_SOIL_TABLE`], and the matching pH / drainage pair is returned
//! as an approximate sample.

pub mod macrostrat;

use tree_manager_site_models::{Coordinate, Drainage, SoilSample};

pub use macrostrat::MacrostratClient;

/// A rock-type keyword and the soil it typically weathers into.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LithologySoil {
    /// Substring matched against the dominant lithology.
    pub keyword: &'static str,
    /// Typical topsoil pH.
    pub ph: f64,
    /// Typical drainage.
    pub drainage: Drainage,
}

const fn entry(keyword: &'static str, ph: f64, drainage: Drainage) -> LithologySoil {
    LithologySoil {
        keyword,
        ph,
        drainage,
    }
}

/// Keyword table, searched in order; the first keyword contained in the
/// dominant lithology wins.
pub static LITHOLOGY_SOIL_TABLE: [LithologySoil; 19] = [
    entry("limestone", 7.5, Drainage::WellDrained),
    entry("chalk", 7.5, Drainage::WellDrained),
    entry("dolomite", 7.5, Drainage::WellDrained),
    entry("sandstone", 6.0, Drainage::WellDrained),
    entry("sand", 6.0, Drainage::WellDrained),
    entry("clay", 7.0, Drainage::PoorlyDrained),
    entry("mudstone", 7.0, Drainage::PoorlyDrained),
    entry("shale", 7.0, Drainage::PoorlyDrained),
    entry("silt", 6.5, Drainage::ModeratelyDrained),
    entry("siltstone", 6.5, Drainage::ModeratelyDrained),
    entry("gravel", 6.5, Drainage::WellDrained),
    entry("conglomerate", 6.5, Drainage::WellDrained),
    entry("alluvium", 6.5, Drainage::WellDrained),
    entry("granite", 5.5, Drainage::WellDrained),
    entry("gneiss", 5.5, Drainage::WellDrained),
    entry("schist", 5.5, Drainage::WellDrained),
    entry("basalt", 6.5, Drainage::ModeratelyDrained),
    entry("volcanic", 6.5, Drainage::ModeratelyDrained),
    entry("marl", 7.0, Drainage::ModeratelyDrained),
];

/// Pair used when no keyword matches.
pub static DEFAULT_SOIL: LithologySoil = entry("", 6.5, Drainage::ModeratelyDrained);

/// Errors from the geology estimator.
#[derive(Debug, thiserror::Error)]
pub enum GeologyError {
    /// The request did not complete in time.
    #[error("geology service timed out")]
    Timeout,

    /// Connection or other transport failure.
    #[error("geology service request failed: {0}")]
    Transport(#[source] reqwest::Error),

    /// The service answered with a non-success status.
    #[error("geology service returned HTTP {status}")]
    Status {
        /// HTTP status code.
        status: u16,
    },

    /// The body was not valid JSON.
    #[error("invalid geology service response: {message}")]
    Decode {
        /// Parser message.
        message: String,
    },

    /// No geologic unit is mapped at the point.
    #[error("no geology data available for ({latitude}, {longitude})")]
    NoData {
        /// Queried latitude.
        latitude: f64,
        /// Queried longitude.
        longitude: f64,
    },

    /// The first unit has no lithology description.
    #[error("no lithology data in geology response for ({latitude}, {longitude})")]
    NoLithology {
        /// Queried latitude.
        latitude: f64,
        /// Queried longitude.
        longitude: f64,
    },
}

/// A geologic-unit-by-location service.
#[async_trait::async_trait]
pub trait GeologySource: Send + Sync {
    /// Returns the lithology description of the first unit at `point`.
    ///
    /// # Errors
    ///
    /// Returns [`GeologyError`] on transport or status failures, when no
    /// unit is mapped there, or when the unit has no lithology.
    async fn lithology_at(&self, point: Coordinate) -> Result<String, GeologyError>;
}

/// Returns the dominant rock name: the first `;`-separated entry with any
/// `[..]` percentage annotation removed, trimmed and lower-cased.
#[must_use]
pub fn dominant_lithology(lithology: &str) -> String {
    let first = lithology.split(';').next().unwrap_or_default();
    first
        .split('[')
        .next()
        .unwrap_or_default()
        .trim()
        .to_lowercase()
}

/// Maps a lithology description to an approximate soil sample.
#[must_use]
pub fn estimate_from_lithology(lithology: &str) -> SoilSample {
    let dominant = dominant_lithology(lithology);
    let soil = LITHOLOGY_SOIL_TABLE
        .iter()
        .find(|s| dominant.contains(s.keyword))
        .unwrap_or_else(|| {
            log::debug!("No lithology keyword matches '{dominant}', using default soil");
            &DEFAULT_SOIL
        });

    SoilSample::inferred(soil.ph, soil.drainage)
}

/// Estimates soil at `point` from the geology reported by `source`.
///
/// # Errors
///
/// Propagates the [`GeologyError`] from the lookup.
pub async fn estimate_from_geology<G: GeologySource + ?Sized>(
    source: &G,
    point: Coordinate,
) -> Result<SoilSample, GeologyError> {
    let lithology = source.lithology_at(point).await?;
    log::debug!("Lithology at {point}: {lithology}");
    Ok(estimate_from_lithology(&lithology))
}
