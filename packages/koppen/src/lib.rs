#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Köppen-Geiger climate zone classification.
//!
//! Zones are read from the Beck et al. (2018) present-day map, a global
//! single-band GeoTIFF at 0.0083° resolution whose pixel values 1..=30
//! index the zone table in [`tree_manager_site_models::KoppenZone`] and
//! whose value 0 marks ocean / no data.
//!
//! The raster file is not shipped with the repository; fetch it once with
//! [`download::download_koppen`] (exposed as `tree_manager download-koppen`).

pub mod classifier;
pub mod download;
pub mod raster;

use std::path::PathBuf;

pub use classifier::ZoneClassifier;
pub use raster::{GeoTiffRaster, GeoTransform, PixelSource};

/// File name of the Beck et al. present-day 1 km map.
pub const GEOTIFF_FILE_NAME: &str = "Beck_KG_V1_present_0p0083.tif";

/// Errors from zone classification.
#[derive(Debug, thiserror::Error)]
pub enum KoppenError {
    /// The raster file has not been downloaded yet.
    #[error(
        "Köppen GeoTIFF not found at {}. Run `tree_manager download-koppen` first.",
        .path.display()
    )]
    SetupMissing {
        /// Expected raster location.
        path: PathBuf,
    },

    /// The raster file exists but could not be read.
    #[error("failed to read Köppen GeoTIFF {}: {source}", .path.display())]
    Io {
        /// Raster location.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The TIFF structure or a compressed chunk could not be decoded.
    #[error("failed to decode Köppen GeoTIFF {}: {source}", .path.display())]
    Decode {
        /// Raster location.
        path: PathBuf,
        /// Underlying TIFF error.
        source: tiff::TiffError,
    },

    /// The GeoTIFF lacks usable pixel-scale / tiepoint tags.
    #[error("Köppen GeoTIFF {} is not georeferenced: {message}", .path.display())]
    Georeference {
        /// Raster location.
        path: PathBuf,
        /// What was missing or invalid.
        message: String,
    },

    /// A decoded chunk is shorter than its declared dimensions.
    #[error(
        "Köppen GeoTIFF {} chunk {chunk} has no sample at offset {offset}",
        .path.display()
    )]
    TruncatedChunk {
        /// Raster location.
        path: PathBuf,
        /// Chunk (strip or tile) index.
        chunk: u32,
        /// Sample offset within the chunk.
        offset: usize,
    },

    /// Pixels are stored in a sample format other than integers.
    #[error("Köppen GeoTIFF {} uses an unsupported sample format", .path.display())]
    UnsupportedSampleFormat {
        /// Raster location.
        path: PathBuf,
    },

    /// The point is ocean, off the grid, or carries an unmapped value.
    #[error("No climate data available for coordinates ({latitude}, {longitude})")]
    NoData {
        /// Requested latitude.
        latitude: f64,
        /// Requested longitude.
        longitude: f64,
    },
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::fs::File;
    use std::path::{Path, PathBuf};

    use tiff::encoder::{TiffEncoder, colortype};
    use tiff::tags::Tag;

    /// Returns a unique path under the system temp directory.
    pub fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "tree_manager_koppen_{}_{name}",
            std::process::id()
        ))
    }

    /// Writes an 8-bit single-band GeoTIFF with the given top-left corner
    /// and square pixel size, split into strips of `rows_per_strip` rows.
    pub fn write_geotiff(
        path: &Path,
        width: u32,
        height: u32,
        pixels: &[u8],
        top_left: (f64, f64),
        pixel_size: f64,
        rows_per_strip: u32,
    ) {
        let file = File::create(path).unwrap();
        let mut encoder = TiffEncoder::new(file).unwrap();
        let mut image = encoder
            .new_image::<colortype::Gray8>(width, height)
            .unwrap();
        image.rows_per_strip(rows_per_strip).unwrap();
        image
            .encoder()
            .write_tag(
                Tag::from_u16_exhaustive(33550),
                &[pixel_size, pixel_size, 0.0][..],
            )
            .unwrap();
        image
            .encoder()
            .write_tag(
                Tag::from_u16_exhaustive(33922),
                &[0.0, 0.0, 0.0, top_left.0, top_left.1, 0.0][..],
            )
            .unwrap();
        image.write_data(pixels).unwrap();
    }
}
