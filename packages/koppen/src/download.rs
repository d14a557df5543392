//! Setup step: fetch the Köppen GeoTIFF.
//!
//! The raster is about 150 MB, so it is streamed to `<dest>.part` and only
//! renamed into place once the body has been fully written. An existing
//! file at the destination is left alone.

use std::path::{Path, PathBuf};

use futures::StreamExt as _;
use tokio::io::AsyncWriteExt as _;
use tree_manager_http::ProgressCallback;

/// Beck et al. (2018) Köppen-Geiger maps on figshare.
pub const BECK_KOPPEN_URL: &str = "https://figshare.com/ndownloader/files/12407516";

const USER_AGENT: &str = "TreeManagerApp/1.0";

/// Result of a download request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadStatus {
    /// The destination already existed; nothing was fetched.
    AlreadyPresent,
    /// The file was fetched.
    Downloaded {
        /// Bytes written.
        bytes: u64,
    },
}

/// Errors from download operations.
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    /// HTTP request error.
    #[error("HTTP error: {0}")]
    Http(reqwest::Error),

    /// Non-success HTTP status.
    #[error("HTTP {status} for {url}")]
    HttpStatus {
        /// Request URL.
        url: String,
        /// HTTP status code.
        status: u16,
    },

    /// I/O error writing to disk.
    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        /// Path that caused the error.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> DownloadError + '_ {
    move |source| DownloadError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Downloads the Köppen raster from `url` to `dest` unless it already
/// exists.
///
/// # Errors
///
/// Returns [`DownloadError`] if the request fails, the server answers with
/// a non-success status, or the file cannot be written. A failed download
/// leaves no file at `dest`.
pub async fn download_koppen(
    url: &str,
    dest: &Path,
    progress: &dyn ProgressCallback,
) -> Result<DownloadStatus, DownloadError> {
    if tokio::fs::try_exists(dest).await.map_err(io_error(dest))? {
        log::info!("Köppen GeoTIFF already present at {}", dest.display());
        progress.finish(format!("Already present: {}", dest.display()));
        return Ok(DownloadStatus::AlreadyPresent);
    }

    log::info!("Downloading {url}");
    log::info!("  -> {}", dest.display());

    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(io_error(parent))?;
    }

    let client = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .build()
        .map_err(DownloadError::Http)?;

    let response = client.get(url).send().await.map_err(DownloadError::Http)?;

    if !response.status().is_success() {
        return Err(DownloadError::HttpStatus {
            url: url.to_string(),
            status: response.status().as_u16(),
        });
    }

    if let Some(size) = response.content_length() {
        #[allow(clippy::cast_precision_loss)]
        let mb = size as f64 / 1_048_576.0;
        log::info!("  file size: {mb:.1} MB");
        progress.set_total(size);
    }
    progress.set_message("Downloading Köppen GeoTIFF".to_string());

    let part = part_path(dest);
    let written = write_body(response, &part, progress).await;
    let bytes = match written {
        Ok(bytes) => bytes,
        Err(e) => {
            tokio::fs::remove_file(&part).await.ok();
            return Err(e);
        }
    };

    tokio::fs::rename(&part, dest).await.map_err(io_error(dest))?;

    #[allow(clippy::cast_precision_loss)]
    let mb = bytes as f64 / 1_048_576.0;
    log::info!("  download complete: {mb:.1} MB");
    progress.finish(format!("Downloaded {mb:.1} MB"));

    Ok(DownloadStatus::Downloaded { bytes })
}

async fn write_body(
    response: reqwest::Response,
    part: &Path,
    progress: &dyn ProgressCallback,
) -> Result<u64, DownloadError> {
    let mut file = tokio::fs::File::create(part).await.map_err(io_error(part))?;

    let mut stream = response.bytes_stream();
    let mut downloaded: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(DownloadError::Http)?;
        file.write_all(&chunk).await.map_err(io_error(part))?;
        downloaded += chunk.len() as u64;
        progress.inc(chunk.len() as u64);
    }

    file.flush().await.map_err(io_error(part))?;

    Ok(downloaded)
}

fn part_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    dest.with_file_name(name)
}
