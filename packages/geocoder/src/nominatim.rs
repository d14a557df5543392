//! Nominatim / OpenStreetMap geocoder client.
//!
//! The public instance allows at most one request per second and requires
//! an identifying `User-Agent`; both are the caller's and the service
//! config's responsibility respectively.
//!
//! See <https://nominatim.org/release-docs/develop/api/Search/>

use tree_manager_http::{HttpError, ServiceConfig, send_json};

use crate::{GeocodeError, GeocodedAddress};

/// Environment variable that overrides the service URL.
pub const URL_ENV_VAR: &str = "NOMINATIM_URL";

const SERVICE_TOML: &str = include_str!("../services/nominatim.toml");

/// Returns the embedded service definition with any env override applied.
///
/// # Panics
///
/// Panics if the embedded TOML is malformed.
#[must_use]
pub fn default_config() -> ServiceConfig {
    ServiceConfig::embedded("nominatim", SERVICE_TOML).with_env_override(URL_ENV_VAR)
}

/// HTTP client for the Nominatim search endpoint.
#[derive(Debug, Clone)]
pub struct NominatimClient {
    client: reqwest::Client,
    config: ServiceConfig,
}

impl NominatimClient {
    /// Creates a client for `config`.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError::Http`] if the HTTP client cannot be built.
    pub fn new(config: ServiceConfig) -> Result<Self, GeocodeError> {
        let client = config.build_client().map_err(map_http_error)?;
        Ok(Self { client, config })
    }

    /// Geocodes a free-form address, returning the best hit.
    ///
    /// Returns `Ok(None)` when the service finds nothing.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError::EmptyQuery`] for a blank address (no request
    /// is sent), and [`GeocodeError`] if the request or response parsing
    /// fails.
    pub async fn geocode(&self, address: &str) -> Result<Option<GeocodedAddress>, GeocodeError> {
        let address = address.trim();
        if address.is_empty() {
            return Err(GeocodeError::EmptyQuery);
        }

        log::debug!("Nominatim search for '{address}'");

        let request = self.client.get(&self.config.base_url).query(&[
            ("q", address),
            ("format", "json"),
            ("limit", "1"),
        ]);
        let body = send_json(request).await.map_err(map_http_error)?;

        parse_response(&body)
    }
}

fn map_http_error(e: HttpError) -> GeocodeError {
    match e {
        HttpError::Timeout { .. } => GeocodeError::Timeout,
        HttpError::Transport(e) => GeocodeError::Http(e),
        HttpError::Status { status, .. } => GeocodeError::Status { status },
        HttpError::Decode { message, .. } => GeocodeError::Parse { message },
    }
}

/// Parses Nominatim JSON response.
fn parse_response(body: &serde_json::Value) -> Result<Option<GeocodedAddress>, GeocodeError> {
    let results = body.as_array().ok_or_else(|| GeocodeError::Parse {
        message: "Nominatim response is not an array".to_string(),
    })?;

    let Some(first) = results.first() else {
        return Ok(None);
    };

    let lat = first["lat"]
        .as_str()
        .and_then(|s| s.parse::<f64>().ok())
        .ok_or_else(|| GeocodeError::Parse {
            message: "Missing lat in Nominatim response".to_string(),
        })?;

    let lon = first["lon"]
        .as_str()
        .and_then(|s| s.parse::<f64>().ok())
        .ok_or_else(|| GeocodeError::Parse {
            message: "Missing lon in Nominatim response".to_string(),
        })?;

    let display_name = first["display_name"]
        .as_str()
        .map(String::from)
        .ok_or_else(|| GeocodeError::Parse {
            message: "Missing display_name in Nominatim response".to_string(),
        })?;

    Ok(Some(GeocodedAddress {
        latitude: lat,
        longitude: lon,
        display_name,
    }))
}
