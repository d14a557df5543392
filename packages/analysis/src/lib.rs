#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Site analysis for parcels.
//!
//! Combines the Köppen zone lookup with two-stage soil resolution:
//! measured values from the point-property service (including its
//! nearby-point fallback), then an estimate from the dominant rock type
//! when the service has nothing usable. Results are written back to a
//! parcel's profile only for the parts that succeeded.

pub mod analyzer;
pub mod soil;

use tree_manager_geology::GeologyError;
use tree_manager_koppen::KoppenError;
use tree_manager_soil::SoilError;

pub use analyzer::{DEFAULT_CONCURRENCY, DEFAULT_SOIL_DEADLINE, SiteAnalyzer, SiteReport};
pub use soil::{ResolvedSoil, resolve_site_soil};

/// Errors from site analysis.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    /// Climate zone lookup failed.
    #[error(transparent)]
    Zone(#[from] KoppenError),

    /// The blocking worker running the zone lookup panicked or was
    /// cancelled.
    #[error("climate zone worker failed: {0}")]
    ZoneWorker(#[from] tokio::task::JoinError),

    /// Neither measured nor inferred soil data could be obtained.
    #[error(
        "soil data unavailable: {measured}{}",
        .inferred
            .as_ref()
            .map(|e| format!("; geology estimate failed: {e}"))
            .unwrap_or_default()
    )]
    SoilUnavailable {
        /// Failure of the point-property lookup.
        measured: SoilError,
        /// Failure of the geology estimate, `None` if it was not attempted.
        inferred: Option<GeologyError>,
    },
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use tree_manager_geology::{GeologyError, GeologySource};
    use tree_manager_koppen::{KoppenError, PixelSource, ZoneClassifier};
    use tree_manager_site_models::Coordinate;
    use tree_manager_soil::{RawSoilValues, SoilError, SoilPointSource};

    pub fn coord(lat: f64, lon: f64) -> Coordinate {
        Coordinate::new(lat, lon).unwrap()
    }

    struct ConstantPixel(Option<u32>);

    impl PixelSource for ConstantPixel {
        fn pixel_at(&mut self, _coordinate: Coordinate) -> Result<Option<u32>, KoppenError> {
            Ok(self.0)
        }
    }

    /// A classifier that sees the same pixel everywhere.
    pub fn zones(pixel: Option<u32>) -> Arc<ZoneClassifier> {
        Arc::new(ZoneClassifier::with_source(ConstantPixel(pixel)))
    }

    pub struct FakeSoil {
        values: Option<RawSoilValues>,
        error: Option<fn() -> SoilError>,
        delay: Duration,
        calls: AtomicUsize,
    }

    impl FakeSoil {
        fn new(values: Option<RawSoilValues>, error: Option<fn() -> SoilError>) -> Self {
            Self {
                values,
                error,
                delay: Duration::ZERO,
                calls: AtomicUsize::new(0),
            }
        }

        /// Data at every point.
        pub fn data(ph_h2o: f64, clay: f64, sand: f64) -> Self {
            Self::new(Some(RawSoilValues { ph_h2o, clay, sand }), None)
        }

        /// No data anywhere.
        pub fn empty() -> Self {
            Self::new(None, None)
        }

        /// Every request fails.
        pub fn failing(error: fn() -> SoilError) -> Self {
            Self::new(None, Some(error))
        }

        pub const fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl SoilPointSource for FakeSoil {
        async fn fetch_point(
            &self,
            _point: Coordinate,
        ) -> Result<Option<RawSoilValues>, SoilError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.error.map_or(Ok(self.values), |error| Err(error()))
        }
    }

    pub struct FakeGeology {
        answer: Result<String, fn() -> GeologyError>,
        calls: AtomicUsize,
    }

    impl FakeGeology {
        pub fn lithology(lithology: &str) -> Self {
            Self {
                answer: Ok(lithology.to_string()),
                calls: AtomicUsize::new(0),
            }
        }

        pub fn failing(error: fn() -> GeologyError) -> Self {
            Self {
                answer: Err(error),
                calls: AtomicUsize::new(0),
            }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl GeologySource for FakeGeology {
        async fn lithology_at(&self, _point: Coordinate) -> Result<String, GeologyError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.answer {
                Ok(lithology) => Ok(lithology.clone()),
                Err(error) => Err(error()),
            }
        }
    }
}
