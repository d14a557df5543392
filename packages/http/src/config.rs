//! Remote service configuration.
//!
//! Each client crate embeds its service definition from a TOML file under
//! its own `services/` directory and parses it with
//! [`ServiceConfig::from_toml`]. The base URL can be redirected at runtime
//! through an environment variable (useful for mirrors and mock servers).

use std::time::Duration;

use serde::Deserialize;

use crate::HttpError;

/// Default per-request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// A remote service definition loaded from TOML.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServiceConfig {
    /// Unique identifier (e.g., `"soilgrids"`).
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Endpoint URL that requests are sent to.
    pub base_url: String,
    /// Per-request timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// `User-Agent` header value, if the service requires one.
    #[serde(default)]
    pub user_agent: Option<String>,
}

const fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

/// Errors from parsing a service definition.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML was malformed or missing fields.
    #[error("invalid service config: {0}")]
    Toml(#[from] toml::de::Error),

    /// A field had an unusable value.
    #[error("invalid service config '{id}': {message}")]
    Invalid {
        /// Service identifier.
        id: String,
        /// What was wrong.
        message: String,
    },
}

impl ServiceConfig {
    /// Parses and validates a TOML service definition.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the TOML is malformed, the base URL is
    /// empty, or the timeout is zero.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::de::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Parses a TOML definition that was embedded at compile time.
    ///
    /// # Panics
    ///
    /// Panics if the TOML is malformed. Embedded definitions are covered
    /// by each client crate's tests.
    #[must_use]
    pub fn embedded(name: &str, toml_str: &str) -> Self {
        Self::from_toml(toml_str)
            .unwrap_or_else(|e| panic!("Failed to parse service config '{name}': {e}"))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid {
                id: self.id.clone(),
                message: "base_url is empty".to_string(),
            });
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                id: self.id.clone(),
                message: "timeout_secs must be positive".to_string(),
            });
        }
        Ok(())
    }

    /// Replaces the base URL with the value of `var`, if set and
    /// non-empty.
    #[must_use]
    pub fn with_env_override(mut self, var: &str) -> Self {
        if let Ok(url) = std::env::var(var) {
            let url = url.trim();
            if !url.is_empty() {
                log::debug!("{}: base URL overridden by {var}: {url}", self.id);
                self.base_url = url.to_string();
            }
        }
        self
    }

    /// Replaces the base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Replaces the per-request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_secs = timeout.as_secs();
        self
    }

    /// Per-request timeout as a [`Duration`].
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Builds a `reqwest` client with this service's timeout and
    /// `User-Agent`.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError::Transport`] if the client cannot be built.
    pub fn build_client(&self) -> Result<reqwest::Client, HttpError> {
        let mut builder = reqwest::Client::builder().timeout(self.timeout());
        if let Some(agent) = &self.user_agent {
            builder = builder.user_agent(agent.as_str());
        }
        builder.build().map_err(HttpError::Transport)
    }
}
