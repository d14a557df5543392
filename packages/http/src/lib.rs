#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! HTTP plumbing shared by the soil, geology and geocoding clients, plus
//! the progress trait used by downloads and batch analysis.
//!
//! Every remote lookup goes through [`send_json`], which sends a single
//! request and classifies the outcome into the four failure shapes the
//! callers care about: timeout, other transport failure, non-2xx status,
//! and an undecodable body. Nothing is retried here; callers own their
//! retry/fallback policy.

pub mod config;
pub mod progress;

pub use config::{ConfigError, ServiceConfig};
pub use progress::{NullProgress, ProgressCallback, null_progress};

/// Maximum length of the response body preview included in error logs.
const BODY_PREVIEW_LEN: usize = 500;

/// Errors from a single HTTP JSON request.
#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    /// The request did not complete within the client timeout.
    #[error("request to {url} timed out")]
    Timeout {
        /// Request URL.
        url: String,
    },

    /// Connection, TLS or other transport failure.
    #[error("HTTP request failed: {0}")]
    Transport(reqwest::Error),

    /// The server answered with a non-success status.
    #[error("HTTP {status} from {url}")]
    Status {
        /// Request URL.
        url: String,
        /// HTTP status code.
        status: u16,
    },

    /// The body could not be read or parsed as JSON.
    #[error("invalid JSON from {url}: {message}")]
    Decode {
        /// Request URL.
        url: String,
        /// Description of the decoding failure.
        message: String,
    },
}

impl HttpError {
    fn from_reqwest(url: &str, e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout {
                url: url.to_string(),
            }
        } else {
            Self::Transport(e)
        }
    }
}

/// Sends a request and parses the response body as JSON.
///
/// # Errors
///
/// Returns [`HttpError::Timeout`] or [`HttpError::Transport`] if the
/// request fails, [`HttpError::Status`] for a non-2xx answer, and
/// [`HttpError::Decode`] if the body is not valid JSON.
pub async fn send_json(request: reqwest::RequestBuilder) -> Result<serde_json::Value, HttpError> {
    let response = request
        .send()
        .await
        .map_err(|e| {
            let url = e.url().map(ToString::to_string).unwrap_or_default();
            HttpError::from_reqwest(&url, e)
        })?;

    let url = response.url().to_string();
    let status = response.status();

    if !status.is_success() {
        log::debug!("HTTP {status} from {url}");
        return Err(HttpError::Status {
            url,
            status: status.as_u16(),
        });
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(String::from);

    // Read the raw body as text first, then parse as JSON.
    // This lets us log the actual response content on failure.
    let text = response
        .text()
        .await
        .map_err(|e| HttpError::from_reqwest(&url, e))?;

    serde_json::from_str(&text).map_err(|json_err| {
        let preview = body_preview(&text);
        log::error!(
            "JSON parse failed.\n  \
             url: {url}\n  \
             status: {status}\n  \
             content-type: {content_type:?}\n  \
             received: {} bytes\n  \
             parse error: {json_err}\n  \
             body preview: {preview}",
            text.len(),
        );
        HttpError::Decode {
            url: url.clone(),
            message: json_err.to_string(),
        }
    })
}

/// Truncates a body to [`BODY_PREVIEW_LEN`] bytes on a char boundary.
fn body_preview(text: &str) -> String {
    if text.len() <= BODY_PREVIEW_LEN {
        return text.to_string();
    }
    let mut end = BODY_PREVIEW_LEN;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}
