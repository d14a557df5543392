//! ISRIC `SoilGrids` v2.0 point-property client.
//!
//! One GET per point with `lon`, `lat`, three `property` values, the
//! `0-5cm` depth band and `value=mean`. The response nests values as
//! `properties.layers[].depths[0].values.mean`; the service answers `null`
//! where it has no coverage (oceans, built-up areas, data voids).

use serde_json::Value;
use tree_manager_http::{HttpError, ServiceConfig, send_json};
use tree_manager_site_models::Coordinate;

use crate::{RawSoilValues, SoilError, SoilPointSource};

/// Environment variable that overrides the service URL.
pub const URL_ENV_VAR: &str = "SOILGRIDS_URL";

/// Properties requested for every point.
pub const PROPERTIES: [&str; 3] = ["phh2o", "clay", "sand"];

/// Depth band requested for every point.
pub const DEPTH: &str = "0-5cm";

const SERVICE_TOML: &str = include_str!("../services/soilgrids.toml");

/// Returns the embedded service definition with any env override applied.
///
/// # Panics
///
/// Panics if the embedded TOML is malformed.
#[must_use]
pub fn default_config() -> ServiceConfig {
    ServiceConfig::embedded("soilgrids", SERVICE_TOML).with_env_override(URL_ENV_VAR)
}

/// HTTP client for the `SoilGrids` properties query endpoint.
#[derive(Debug, Clone)]
pub struct SoilGridsClient {
    client: reqwest::Client,
    config: ServiceConfig,
}

impl SoilGridsClient {
    /// Creates a client for `config`.
    ///
    /// # Errors
    ///
    /// Returns [`SoilError::Transport`] if the HTTP client cannot be built.
    pub fn new(config: ServiceConfig) -> Result<Self, SoilError> {
        let client = config.build_client().map_err(|e| map_http_error(e, None))?;
        Ok(Self { client, config })
    }

    /// Service definition in use.
    #[must_use]
    pub const fn config(&self) -> &ServiceConfig {
        &self.config
    }
}

#[async_trait::async_trait]
impl SoilPointSource for SoilGridsClient {
    async fn fetch_point(&self, point: Coordinate) -> Result<Option<RawSoilValues>, SoilError> {
        log::debug!("SoilGrids query at {point}");

        let mut query: Vec<(&str, String)> = vec![
            ("lon", point.longitude().to_string()),
            ("lat", point.latitude().to_string()),
        ];
        query.extend(PROPERTIES.iter().map(|p| ("property", (*p).to_string())));
        query.push(("depth", DEPTH.to_string()));
        query.push(("value", "mean".to_string()));

        let request = self.client.get(&self.config.base_url).query(&query);
        let body = send_json(request)
            .await
            .map_err(|e| map_http_error(e, Some(point)))?;

        parse_response(&body)
    }
}

fn map_http_error(e: HttpError, point: Option<Coordinate>) -> SoilError {
    match e {
        HttpError::Timeout { .. } => SoilError::Timeout {
            latitude: point.map_or(f64::NAN, |p| p.latitude()),
            longitude: point.map_or(f64::NAN, |p| p.longitude()),
        },
        HttpError::Transport(e) => SoilError::Transport(e),
        HttpError::Status { status, .. } => SoilError::Status { status },
        HttpError::Decode { message, .. } => SoilError::Format { message },
    }
}

/// Extracts the three property means from a response body.
///
/// Returns `Ok(None)` when any of the three values is `null`.
///
/// # Errors
///
/// Returns [`SoilError::Format`] if the layer list or one of the requested
/// properties is missing.
pub fn parse_response(body: &Value) -> Result<Option<RawSoilValues>, SoilError> {
    let layers = body
        .get("properties")
        .and_then(|p| p.get("layers"))
        .and_then(Value::as_array)
        .ok_or_else(|| format_error("missing properties.layers"))?;

    let mean_of = |name: &str| -> Result<Option<f64>, SoilError> {
        let layer = layers
            .iter()
            .find(|l| l.get("name").and_then(Value::as_str) == Some(name))
            .ok_or_else(|| format_error(&format!("missing layer '{name}'")))?;

        let mean = layer
            .get("depths")
            .and_then(|d| d.get(0))
            .and_then(|d| d.get("values"))
            .and_then(|v| v.get("mean"))
            .ok_or_else(|| format_error(&format!("layer '{name}' has no depths[0].values.mean")))?;

        if mean.is_null() {
            return Ok(None);
        }
        mean.as_f64()
            .map(Some)
            .ok_or_else(|| format_error(&format!("layer '{name}' mean is not a number")))
    };

    let (Some(ph_h2o), Some(clay), Some(sand)) =
        (mean_of("phh2o")?, mean_of("clay")?, mean_of("sand")?)
    else {
        return Ok(None);
    };

    Ok(Some(RawSoilValues {
        ph_h2o,
        clay,
        sand,
    }))
}

fn format_error(message: &str) -> SoilError {
    SoilError::Format {
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;
    use tree_manager_site_models::Drainage;
    use wiremock::matchers::{method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::resolve_soil;

    fn layer(name: &str, mean: Option<f64>) -> Value {
        json!({
            "name": name,
            "depths": [{"label": "0-5cm", "values": {"mean": mean}}]
        })
    }

    fn body(ph: Option<f64>, clay: Option<f64>, sand: Option<f64>) -> Value {
        json!({
            "type": "Feature",
            "properties": {
                "layers": [layer("phh2o", ph), layer("clay", clay), layer("sand", sand)]
            }
        })
    }

    fn client(server: &MockServer) -> SoilGridsClient {
        let config = default_config()
            .with_base_url(format!("{}/query", server.uri()))
            .with_timeout(Duration::from_secs(1));
        SoilGridsClient::new(config).unwrap()
    }

    fn origin() -> Coordinate {
        Coordinate::new(48.85, 2.35).unwrap()
    }

    #[test]
    fn embedded_config_parses() {
        let config = ServiceConfig::embedded("soilgrids", SERVICE_TOML);
        assert_eq!(config.id, "soilgrids");
        assert!(config.base_url.starts_with("https://rest.isric.org/"));
        assert_eq!(config.timeout_secs, 10);
    }

    #[test]
    fn parses_property_means() {
        let raw = parse_response(&body(Some(65.0), Some(250.0), Some(350.0)))
            .unwrap()
            .unwrap();
        assert!((raw.ph_h2o - 65.0).abs() < 1e-9);
        assert!((raw.clay - 250.0).abs() < 1e-9);
        assert!((raw.sand - 350.0).abs() < 1e-9);
    }

    #[test]
    fn any_null_means_no_data() {
        assert!(parse_response(&body(None, None, None)).unwrap().is_none());
        assert!(parse_response(&body(Some(65.0), None, Some(350.0))).unwrap().is_none());
    }

    #[test]
    fn missing_layers_are_a_format_error() {
        assert!(matches!(
            parse_response(&json!({"type": "Feature"})),
            Err(SoilError::Format { .. })
        ));
        let only_ph = json!({"properties": {"layers": [layer("phh2o", Some(60.0))]}});
        assert!(matches!(parse_response(&only_ph), Err(SoilError::Format { .. })));
        let no_depths = json!({"properties": {"layers": [
            {"name": "phh2o", "depths": []},
            layer("clay", Some(1.0)),
            layer("sand", Some(1.0))
        ]}});
        assert!(matches!(parse_response(&no_depths), Err(SoilError::Format { .. })));
    }

    #[tokio::test]
    async fn sends_expected_query_and_resolves_exact_sample() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("lat", "48.85"))
            .and(query_param("lon", "2.35"))
            .and(query_param("property", "clay"))
            .and(query_param("depth", "0-5cm"))
            .and(query_param("value", "mean"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(body(Some(65.0), Some(250.0), Some(350.0))),
            )
            .expect(1)
            .mount(&server)
            .await;

        let sample = resolve_soil(&client(&server), origin()).await.unwrap();
        assert!((sample.ph - 6.5).abs() < 1e-9);
        assert_eq!(sample.drainage, Drainage::ModeratelyDrained);
        assert!(!sample.approximate);
    }

    #[tokio::test]
    async fn all_null_points_exhaust_after_thirteen_requests() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body(None, None, None)))
            .expect(13)
            .mount(&server)
            .await;

        let err = resolve_soil(&client(&server), origin()).await.unwrap_err();
        assert!(matches!(err, SoilError::Exhausted { attempts: 13, .. }));
    }

    #[tokio::test]
    async fn offset_point_answers_after_origin_void() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("lat", "48.85"))
            .and(query_param("lon", "2.35"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body(None, None, None)))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(body(Some(80.0), Some(100.0), Some(700.0))),
            )
            .mount(&server)
            .await;

        let sample = resolve_soil(&client(&server), origin()).await.unwrap();
        assert!((sample.ph - 8.0).abs() < 1e-9);
        assert_eq!(sample.drainage, Drainage::WellDrained);
        assert!(sample.approximate);
    }

    #[tokio::test]
    async fn server_error_is_a_status_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let err = resolve_soil(&client(&server), origin()).await.unwrap_err();
        assert!(matches!(err, SoilError::Status { status: 500 }));
        assert!(err.triggers_geology_fallback());
    }

    #[tokio::test]
    async fn slow_service_is_a_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(body(Some(65.0), Some(250.0), Some(350.0)))
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let err = resolve_soil(&client(&server), origin()).await.unwrap_err();
        assert!(matches!(err, SoilError::Timeout { .. }));
    }

    #[tokio::test]
    async fn unexpected_shape_is_a_format_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"detail": "oops"})))
            .mount(&server)
            .await;

        let err = resolve_soil(&client(&server), origin()).await.unwrap_err();
        assert!(matches!(err, SoilError::Format { .. }));
        assert!(!err.triggers_geology_fallback());
    }
}
