#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Address geocoding for parcel creation.
//!
//! Turns a free-form address typed by the gardener into a coordinate using
//! the public Nominatim / OpenStreetMap search endpoint. The service
//! definition is embedded from `services/nominatim.toml`; set
//! `NOMINATIM_URL` to point at another instance.

pub mod nominatim;

use serde::Serialize;
use thiserror::Error;
use tree_manager_site_models::{Coordinate, CoordinateError};

pub use nominatim::NominatimClient;

/// A geocoding hit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeocodedAddress {
    /// Latitude (WGS84).
    pub latitude: f64,
    /// Longitude (WGS84).
    pub longitude: f64,
    /// Canonical address returned by the geocoder.
    pub display_name: String,
}

impl GeocodedAddress {
    /// The hit as a validated coordinate.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinateError`] if the service returned an out-of-range
    /// point.
    pub fn coordinate(&self) -> Result<Coordinate, CoordinateError> {
        Coordinate::new(self.latitude, self.longitude)
    }
}

/// Errors from geocoding operations.
#[derive(Debug, Error)]
pub enum GeocodeError {
    /// The address was empty or whitespace.
    #[error("address must not be blank")]
    EmptyQuery,

    /// The request did not complete in time.
    #[error("geocoding request timed out")]
    Timeout,

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[source] reqwest::Error),

    /// The service answered with a non-success status.
    #[error("geocoder returned HTTP {status}")]
    Status {
        /// HTTP status code.
        status: u16,
    },

    /// Response parsing failed.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of the parsing failure.
        message: String,
    },
}
