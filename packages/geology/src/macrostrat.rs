//! Macrostrat geologic map units by location.
//!
//! `GET /api/v2/geologic_units/map?lat=..&lng=..&response=long` returns the
//! map units under the point; the `lith` field of the first unit is the
//! composite lithology description.

use serde_json::Value;
use tree_manager_http::{HttpError, ServiceConfig, send_json};
use tree_manager_site_models::Coordinate;

use crate::{GeologyError, GeologySource};

/// Environment variable that overrides the service URL.
pub const URL_ENV_VAR: &str = "MACROSTRAT_URL";

const SERVICE_TOML: &str = include_str!("../services/macrostrat.toml");

/// Returns the embedded service definition with any env override applied.
///
/// # Panics
///
/// Panics if the embedded TOML is malformed.
#[must_use]
pub fn default_config() -> ServiceConfig {
    ServiceConfig::embedded("macrostrat", SERVICE_TOML).with_env_override(URL_ENV_VAR)
}

/// HTTP client for the Macrostrat map-units endpoint.
#[derive(Debug, Clone)]
pub struct MacrostratClient {
    client: reqwest::Client,
    config: ServiceConfig,
}

impl MacrostratClient {
    /// Creates a client for `config`.
    ///
    /// # Errors
    ///
    /// Returns [`GeologyError::Transport`] if the HTTP client cannot be
    /// built.
    pub fn new(config: ServiceConfig) -> Result<Self, GeologyError> {
        let client = config.build_client().map_err(map_http_error)?;
        Ok(Self { client, config })
    }
}

#[async_trait::async_trait]
impl GeologySource for MacrostratClient {
    async fn lithology_at(&self, point: Coordinate) -> Result<String, GeologyError> {
        log::debug!("Macrostrat query at {point}");

        let request = self.client.get(&self.config.base_url).query(&[
            ("lat", point.latitude().to_string()),
            ("lng", point.longitude().to_string()),
            ("response", "long".to_string()),
        ]);
        let body = send_json(request).await.map_err(map_http_error)?;

        first_lithology(&body, point)
    }
}

fn map_http_error(e: HttpError) -> GeologyError {
    match e {
        HttpError::Timeout { .. } => GeologyError::Timeout,
        HttpError::Transport(e) => GeologyError::Transport(e),
        HttpError::Status { status, .. } => GeologyError::Status { status },
        HttpError::Decode { message, .. } => GeologyError::Decode { message },
    }
}

/// Returns the `lith` string of the first unit in a response body.
///
/// Units are read from a top-level `data` list, or from `success.data` as
/// the live API nests them.
///
/// # Errors
///
/// Returns [`GeologyError::NoData`] for an empty or missing unit list and
/// [`GeologyError::NoLithology`] when the first unit's `lith` is missing
/// or blank.
pub fn first_lithology(body: &Value, point: Coordinate) -> Result<String, GeologyError> {
    let units = body
        .get("data")
        .or_else(|| body.get("success").and_then(|s| s.get("data")))
        .and_then(Value::as_array);

    let Some(first) = units.and_then(|u| u.first()) else {
        return Err(GeologyError::NoData {
            latitude: point.latitude(),
            longitude: point.longitude(),
        });
    };

    match first.get("lith").and_then(Value::as_str).map(str::trim) {
        Some(lith) if !lith.is_empty() => Ok(lith.to_string()),
        _ => Err(GeologyError::NoLithology {
            latitude: point.latitude(),
            longitude: point.longitude(),
        }),
    }
}
