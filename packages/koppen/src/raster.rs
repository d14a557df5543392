//! Point reads from a north-up, single-band GeoTIFF.
//!
//! Only the strip or tile containing the requested pixel is decoded. The
//! last decoded chunk is kept on the handle, so repeated lookups in the
//! same area (a batch of nearby parcels) hit memory instead of the file.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use tiff::decoder::{Decoder, DecodingResult};
use tiff::tags::Tag;
use tree_manager_site_models::Coordinate;

use crate::KoppenError;

/// `ModelPixelScaleTag`: `[ScaleX, ScaleY, ScaleZ]`.
const MODEL_PIXEL_SCALE_TAG: u16 = 33550;
/// `ModelTiepointTag`: `[I, J, K, X, Y, Z]`.
const MODEL_TIEPOINT_TAG: u16 = 33922;

/// A source of raw pixel values addressed by coordinate.
///
/// Implementations are not required to be thread-safe for reads; the
/// classifier serialises access behind a mutex.
pub trait PixelSource: Send {
    /// Returns the pixel value under `coordinate`, or `None` when the point
    /// lies outside the grid.
    ///
    /// # Errors
    ///
    /// Returns [`KoppenError`] if the underlying data cannot be read.
    fn pixel_at(&mut self, coordinate: Coordinate) -> Result<Option<u32>, KoppenError>;
}

/// Affine mapping from map coordinates to pixel indices for a north-up
/// raster.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoTransform {
    /// Longitude of the left edge of column 0.
    pub origin_x: f64,
    /// Latitude of the top edge of row 0.
    pub origin_y: f64,
    /// Pixel width in degrees.
    pub pixel_width: f64,
    /// Pixel height in degrees (positive).
    pub pixel_height: f64,
}

impl GeoTransform {
    /// Builds the transform from GeoTIFF pixel-scale and tiepoint values.
    ///
    /// The tiepoint ties raster point `(I, J)` to map point `(X, Y)`, so the
    /// top-left corner is `(X - I * sx, Y + J * sy)`.
    ///
    /// # Errors
    ///
    /// Returns a description of the problem if either tag is too short or
    /// the scale is not a positive finite number.
    pub fn from_tags(pixel_scale: &[f64], tiepoint: &[f64]) -> Result<Self, String> {
        let [sx, sy, ..] = *pixel_scale else {
            return Err(format!(
                "ModelPixelScale has {} values, expected 3",
                pixel_scale.len()
            ));
        };
        let [i, j, _, x, y, ..] = *tiepoint else {
            return Err(format!(
                "ModelTiepoint has {} values, expected 6",
                tiepoint.len()
            ));
        };
        if !(sx.is_finite() && sy.is_finite() && sx > 0.0 && sy > 0.0) {
            return Err(format!("invalid pixel scale ({sx}, {sy})"));
        }

        Ok(Self {
            origin_x: i.mul_add(-sx, x),
            origin_y: j.mul_add(sy, y),
            pixel_width: sx,
            pixel_height: sy,
        })
    }

    /// Returns `(column, row)` of the pixel containing `coordinate` in a
    /// `width` x `height` grid, or `None` when it falls outside.
    #[must_use]
    pub fn pixel_index(&self, coordinate: Coordinate, width: u32, height: u32) -> Option<(u32, u32)> {
        let col = ((coordinate.longitude() - self.origin_x) / self.pixel_width).floor();
        let row = ((self.origin_y - coordinate.latitude()) / self.pixel_height).floor();

        if col < 0.0 || row < 0.0 || col >= f64::from(width) || row >= f64::from(height) {
            return None;
        }

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        Some((col as u32, row as u32))
    }
}

struct CachedChunk {
    index: u32,
    width: u32,
    data: DecodingResult,
}

/// An open GeoTIFF read one chunk at a time.
pub struct GeoTiffRaster {
    path: PathBuf,
    decoder: Decoder<BufReader<File>>,
    width: u32,
    height: u32,
    chunk_width: u32,
    chunk_height: u32,
    chunks_across: u32,
    transform: GeoTransform,
    cached: Option<CachedChunk>,
}

impl std::fmt::Debug for GeoTiffRaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeoTiffRaster")
            .field("path", &self.path)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("transform", &self.transform)
            .finish_non_exhaustive()
    }
}

impl GeoTiffRaster {
    /// Opens a GeoTIFF and reads its georeferencing.
    ///
    /// # Errors
    ///
    /// Returns [`KoppenError::SetupMissing`] if the file does not exist,
    /// [`KoppenError::Io`] or [`KoppenError::Decode`] if it cannot be read,
    /// and [`KoppenError::Georeference`] if the georeferencing tags are
    /// missing or invalid.
    pub fn open(path: &Path) -> Result<Self, KoppenError> {
        let file = File::open(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                KoppenError::SetupMissing {
                    path: path.to_path_buf(),
                }
            } else {
                KoppenError::Io {
                    path: path.to_path_buf(),
                    source: e,
                }
            }
        })?;

        let decode_err = |source| KoppenError::Decode {
            path: path.to_path_buf(),
            source,
        };
        let georef_err = |message: String| KoppenError::Georeference {
            path: path.to_path_buf(),
            message,
        };

        let mut decoder = Decoder::new(BufReader::new(file)).map_err(decode_err)?;
        let (width, height) = decoder.dimensions().map_err(decode_err)?;
        let (chunk_width, chunk_height) = decoder.chunk_dimensions();
        if chunk_width == 0 || chunk_height == 0 {
            return Err(georef_err(format!(
                "invalid chunk size {chunk_width}x{chunk_height}"
            )));
        }

        let pixel_scale = decoder
            .get_tag_f64_vec(Tag::from_u16_exhaustive(MODEL_PIXEL_SCALE_TAG))
            .map_err(|e| georef_err(format!("ModelPixelScale: {e}")))?;
        let tiepoint = decoder
            .get_tag_f64_vec(Tag::from_u16_exhaustive(MODEL_TIEPOINT_TAG))
            .map_err(|e| georef_err(format!("ModelTiepoint: {e}")))?;
        let transform = GeoTransform::from_tags(&pixel_scale, &tiepoint).map_err(georef_err)?;

        log::info!(
            "Opened Köppen raster {} ({width}x{height}, {chunk_width}x{chunk_height} chunks)",
            path.display()
        );

        Ok(Self {
            path: path.to_path_buf(),
            decoder,
            width,
            height,
            chunk_width,
            chunk_height,
            chunks_across: width.div_ceil(chunk_width),
            transform,
            cached: None,
        })
    }

    /// Raster dimensions in pixels.
    #[must_use]
    pub const fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Georeferencing of this raster.
    #[must_use]
    pub const fn transform(&self) -> GeoTransform {
        self.transform
    }

    fn ensure_chunk(&mut self, index: u32) -> Result<&CachedChunk, KoppenError> {
        let chunk = match self.cached.take() {
            Some(chunk) if chunk.index == index => chunk,
            _ => {
                let data =
                    self.decoder
                        .read_chunk(index)
                        .map_err(|source| KoppenError::Decode {
                            path: self.path.clone(),
                            source,
                        })?;
                let (width, _) = self.decoder.chunk_data_dimensions(index);
                CachedChunk { index, width, data }
            }
        };
        Ok(self.cached.insert(chunk))
    }
}

impl PixelSource for GeoTiffRaster {
    fn pixel_at(&mut self, coordinate: Coordinate) -> Result<Option<u32>, KoppenError> {
        let Some((col, row)) = self.transform.pixel_index(coordinate, self.width, self.height)
        else {
            return Ok(None);
        };

        let chunk_index = (row / self.chunk_height) * self.chunks_across + col / self.chunk_width;
        let local_row = (row % self.chunk_height) as usize;
        let local_col = (col % self.chunk_width) as usize;

        let chunk = self.ensure_chunk(chunk_index)?;
        let offset = local_row * chunk.width as usize + local_col;

        match sample_value(&chunk.data, offset) {
            Sample::Value(value) => Ok(Some(value)),
            Sample::OutOfChunk => Err(KoppenError::TruncatedChunk {
                path: self.path.clone(),
                chunk: chunk_index,
                offset,
            }),
            Sample::Unsupported => Err(KoppenError::UnsupportedSampleFormat {
                path: self.path.clone(),
            }),
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Sample {
    Value(u32),
    OutOfChunk,
    Unsupported,
}

/// Reads one integer sample. Negative signed values read as 0 (no data).
fn sample_value(data: &DecodingResult, offset: usize) -> Sample {
    let value = match data {
        DecodingResult::U8(v) => v.get(offset).map(|&p| u32::from(p)),
        DecodingResult::U16(v) => v.get(offset).map(|&p| u32::from(p)),
        DecodingResult::U32(v) => v.get(offset).copied(),
        DecodingResult::I8(v) => v.get(offset).map(|&p| u32::try_from(p).unwrap_or(0)),
        DecodingResult::I16(v) => v.get(offset).map(|&p| u32::try_from(p).unwrap_or(0)),
        DecodingResult::I32(v) => v.get(offset).map(|&p| u32::try_from(p).unwrap_or(0)),
        _ => return Sample::Unsupported,
    };
    value.map_or(Sample::OutOfChunk, Sample::Value)
}
