#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Measured topsoil properties for a coordinate.
//!
//! [`resolve_soil`] asks a [`SoilPointSource`] for pH, clay and sand at the
//! requested point. Coverage is sparse along coastlines and on small
//! islands, so when the point has no data the resolver walks a fixed list
//! of nearby points ([`NEARBY_OFFSETS`]) one at a time and keeps the first
//! that answers. Any sample taken away from the origin is marked
//! approximate.

pub mod soilgrids;

use tree_manager_site_models::{Coordinate, SoilSample, SoilTexture};

pub use soilgrids::SoilGridsClient;

/// `(Δlat, Δlon)` in degrees, tried in order after the origin: the four
/// cardinal directions at roughly 5 km, 15 km and 25 km.
pub const NEARBY_OFFSETS: [(f64, f64); 12] = [
    (0.05, 0.0),
    (-0.05, 0.0),
    (0.0, 0.05),
    (0.0, -0.05),
    (0.13, 0.0),
    (-0.13, 0.0),
    (0.0, 0.13),
    (0.0, -0.13),
    (0.22, 0.0),
    (-0.22, 0.0),
    (0.0, 0.22),
    (0.0, -0.22),
];

/// Errors from soil resolution.
#[derive(Debug, thiserror::Error)]
pub enum SoilError {
    /// A request did not complete in time.
    #[error("soil service timed out at ({latitude}, {longitude})")]
    Timeout {
        /// Queried latitude.
        latitude: f64,
        /// Queried longitude.
        longitude: f64,
    },

    /// Connection or other transport failure.
    #[error("soil service request failed: {0}")]
    Transport(#[source] reqwest::Error),

    /// The service answered with a non-success status.
    #[error("soil service returned HTTP {status}")]
    Status {
        /// HTTP status code.
        status: u16,
    },

    /// The response did not have the expected property layers.
    #[error("unexpected soil service response format: {message}")]
    Format {
        /// What was missing.
        message: String,
    },

    /// The walk over the origin and nearby points ran past the caller's
    /// overall deadline.
    #[error("soil lookup at ({latitude}, {longitude}) exceeded its {seconds}s deadline")]
    Deadline {
        /// Origin latitude.
        latitude: f64,
        /// Origin longitude.
        longitude: f64,
        /// Deadline that elapsed.
        seconds: f64,
    },

    /// Neither the origin nor any nearby point had data.
    #[error("no soil data for ({latitude}, {longitude}) or nearby areas ({attempts} points tried)")]
    Exhausted {
        /// Origin latitude.
        latitude: f64,
        /// Origin longitude.
        longitude: f64,
        /// Number of points queried.
        attempts: usize,
    },
}

impl SoilError {
    /// Whether the caller should fall back to a geology-based estimate.
    ///
    /// Service failures and missing data do; a malformed response points at
    /// a client bug and does not.
    #[must_use]
    pub const fn triggers_geology_fallback(&self) -> bool {
        !matches!(self, Self::Format { .. })
    }
}

/// Raw values in service units: pH × 10 and texture shares in g/kg.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawSoilValues {
    /// pH (H2O) × 10.
    pub ph_h2o: f64,
    /// Clay content in g/kg.
    pub clay: f64,
    /// Sand content in g/kg.
    pub sand: f64,
}

impl RawSoilValues {
    /// Converts to a sample: pH to one decimal place, texture to percent.
    #[must_use]
    pub fn to_sample(self, approximate: bool) -> SoilSample {
        let ph = round_to_tenth(self.ph_h2o / 10.0);
        let texture = SoilTexture {
            clay_pct: self.clay / 10.0,
            sand_pct: self.sand / 10.0,
        };
        SoilSample::measured(ph, texture, approximate)
    }
}

fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// A point-property soil service.
#[async_trait::async_trait]
pub trait SoilPointSource: Send + Sync {
    /// Returns raw values at `point`, or `None` when the service has no data
    /// there.
    ///
    /// # Errors
    ///
    /// Returns [`SoilError`] on transport, status or format failures.
    async fn fetch_point(&self, point: Coordinate) -> Result<Option<RawSoilValues>, SoilError>;
}

/// Resolves soil at `origin`, falling back through [`NEARBY_OFFSETS`].
///
/// Points are queried sequentially and the first with data wins. Any error
/// stops the walk immediately.
///
/// # Errors
///
/// Returns the first transport, status or format error encountered, or
/// [`SoilError::Exhausted`] if all 13 points had no data.
pub async fn resolve_soil<S: SoilPointSource + ?Sized>(
    source: &S,
    origin: Coordinate,
) -> Result<SoilSample, SoilError> {
    let points = std::iter::once((0.0, 0.0)).chain(NEARBY_OFFSETS);
    let mut attempts = 0;

    for (delta_lat, delta_lon) in points {
        let point = origin.offset(delta_lat, delta_lon);
        attempts += 1;
        if attempts > 1 {
            log::debug!("No soil data yet for {origin}, trying offset ({delta_lat}, {delta_lon})");
        }

        if let Some(raw) = source.fetch_point(point).await? {
            let approximate = attempts > 1;
            if approximate {
                log::info!(
                    "Using soil data from {point} for {origin} (offset {delta_lat}, {delta_lon})"
                );
            }
            return Ok(raw.to_sample(approximate));
        }
    }

    Err(SoilError::Exhausted {
        latitude: origin.latitude(),
        longitude: origin.longitude(),
        attempts,
    })
}
