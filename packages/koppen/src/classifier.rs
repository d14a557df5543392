//! Coordinate to climate zone lookup over an owned raster handle.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use tree_manager_site_models::{Coordinate, KoppenZone};

use crate::KoppenError;
use crate::raster::{GeoTiffRaster, PixelSource};

/// Classifies coordinates into Köppen zones.
///
/// The raster is opened on first use (or eagerly with
/// [`ZoneClassifier::open`]) and reused for every later lookup. TIFF
/// decoders are not safe for concurrent reads, so the handle sits behind a
/// mutex and lookups are serialised. Share one classifier across tasks with
/// an `Arc` and call [`ZoneClassifier::classify`] from a blocking worker.
pub struct ZoneClassifier {
    path: PathBuf,
    raster: Mutex<Option<Box<dyn PixelSource>>>,
}

impl std::fmt::Debug for ZoneClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZoneClassifier")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl ZoneClassifier {
    /// Creates a classifier that opens `path` on the first lookup.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            raster: Mutex::new(None),
        }
    }

    /// Creates a classifier and opens the raster immediately, so a missing
    /// or corrupt file is reported before any lookup.
    ///
    /// # Errors
    ///
    /// Returns [`KoppenError`] if the raster cannot be opened.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, KoppenError> {
        let path = path.into();
        let raster = GeoTiffRaster::open(&path)?;
        Ok(Self {
            path,
            raster: Mutex::new(Some(Box::new(raster))),
        })
    }

    /// Creates a classifier over an already-open pixel source.
    #[must_use]
    pub fn with_source(source: impl PixelSource + 'static) -> Self {
        Self {
            path: PathBuf::new(),
            raster: Mutex::new(Some(Box::new(source))),
        }
    }

    /// Location of the backing raster.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the climate zone at `coordinate`.
    ///
    /// # Errors
    ///
    /// * [`KoppenError::SetupMissing`] if the raster file does not exist
    /// * [`KoppenError::Io`], [`KoppenError::Decode`],
    ///   [`KoppenError::Georeference`] or
    ///   [`KoppenError::UnsupportedSampleFormat`] if it cannot be read
    /// * [`KoppenError::NoData`] for ocean, off-grid and unmapped pixels
    pub fn classify(&self, coordinate: Coordinate) -> Result<KoppenZone, KoppenError> {
        let mut guard = self.raster.lock().unwrap_or_else(PoisonError::into_inner);

        if guard.is_none() {
            *guard = Some(Box::new(GeoTiffRaster::open(&self.path)?));
        }
        let Some(raster) = guard.as_mut() else {
            return Err(KoppenError::SetupMissing {
                path: self.path.clone(),
            });
        };

        let pixel = raster.pixel_at(coordinate)?;
        drop(guard);

        let zone = pixel.and_then(KoppenZone::from_pixel);
        log::debug!("Köppen lookup at {coordinate}: pixel {pixel:?} -> {zone:?}");

        zone.ok_or(KoppenError::NoData {
            latitude: coordinate.latitude(),
            longitude: coordinate.longitude(),
        })
    }
}
