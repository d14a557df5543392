//! Per-location and batch analysis.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt as _};
use tree_manager_geology::GeologySource;
use tree_manager_http::ProgressCallback;
use tree_manager_koppen::ZoneClassifier;
use tree_manager_site_models::{Coordinate, KoppenZone, Parcel};
use tree_manager_soil::SoilPointSource;

use crate::AnalysisError;
use crate::soil::{ResolvedSoil, resolve_site_soil};

/// Default deadline for each soil stage (measured walk, geology estimate).
pub const DEFAULT_SOIL_DEADLINE: Duration = Duration::from_secs(60);

/// Default number of parcels analysed at once.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Outcome of analysing one location. Zone and soil succeed or fail
/// independently.
#[derive(Debug)]
pub struct SiteReport {
    /// Analysed point.
    pub location: Coordinate,
    /// Köppen zone, or why it could not be classified.
    pub climate_zone: Result<KoppenZone, AnalysisError>,
    /// Measured or inferred soil, or why neither was available.
    pub soil: Result<ResolvedSoil, AnalysisError>,
}

impl SiteReport {
    /// Writes the successful parts into `parcel`'s profile. Failed parts
    /// leave the existing values untouched.
    pub fn apply_to(&self, parcel: &mut Parcel) {
        if let Ok(zone) = &self.climate_zone {
            parcel.apply_climate_zone(*zone);
        }
        if let Ok(resolved) = &self.soil {
            parcel.apply_soil(&resolved.sample, resolved.source);
        }
    }
}

/// Runs zone and soil lookups for locations.
///
/// The classifier is shared; zone lookups run on the blocking pool since
/// raster reads are synchronous.
pub struct SiteAnalyzer<S, G> {
    zones: Arc<ZoneClassifier>,
    soil: S,
    geology: G,
    soil_deadline: Duration,
}

impl<S, G> std::fmt::Debug for SiteAnalyzer<S, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SiteAnalyzer")
            .field("zones", &self.zones)
            .field("soil_deadline", &self.soil_deadline)
            .finish_non_exhaustive()
    }
}

impl<S: SoilPointSource, G: GeologySource> SiteAnalyzer<S, G> {
    #[must_use]
    pub const fn new(zones: Arc<ZoneClassifier>, soil: S, geology: G) -> Self {
        Self {
            zones,
            soil,
            geology,
            soil_deadline: DEFAULT_SOIL_DEADLINE,
        }
    }

    /// Overrides the per-stage soil deadline.
    #[must_use]
    pub const fn with_soil_deadline(mut self, deadline: Duration) -> Self {
        self.soil_deadline = deadline;
        self
    }

    /// Analyses one location. The zone lookup and soil resolution run
    /// concurrently.
    pub async fn analyze(&self, location: Coordinate) -> SiteReport {
        let zones = Arc::clone(&self.zones);
        let zone_lookup = tokio::task::spawn_blocking(move || zones.classify(location));
        let soil_lookup =
            resolve_site_soil(&self.soil, &self.geology, location, self.soil_deadline);

        let (zone, soil) = tokio::join!(zone_lookup, soil_lookup);

        let climate_zone = match zone {
            Ok(result) => result.map_err(AnalysisError::from),
            Err(e) => Err(AnalysisError::ZoneWorker(e)),
        };

        SiteReport {
            location,
            climate_zone,
            soil,
        }
    }

    /// Analyses `parcel` and applies the successful results to it.
    pub async fn analyze_parcel(&self, parcel: &mut Parcel) -> SiteReport {
        let report = self.analyze(parcel.location).await;
        report.apply_to(parcel);
        report
    }

    /// Analyses many parcels, at most `concurrency` at a time, and applies
    /// each report to its parcel. Reports are returned in parcel order.
    pub async fn analyze_parcels(
        &self,
        parcels: &mut [Parcel],
        concurrency: usize,
        progress: &Arc<dyn ProgressCallback>,
    ) -> Vec<SiteReport> {
        let locations: Vec<(usize, Coordinate)> = parcels
            .iter()
            .map(|p| p.location)
            .enumerate()
            .collect();

        log::info!(
            "Analysing {} parcels (concurrency={concurrency})",
            locations.len()
        );
        progress.set_total(locations.len() as u64);

        let mut reports: Vec<(usize, SiteReport)> = stream::iter(locations)
            .map(|(index, location)| async move {
                let report = self.analyze(location).await;
                progress.inc(1);
                (index, report)
            })
            .buffer_unordered(concurrency.max(1))
            .collect()
            .await;

        reports.sort_by_key(|(index, _)| *index);

        let mut failures = 0;
        for (index, report) in &reports {
            if report.climate_zone.is_err() || report.soil.is_err() {
                failures += 1;
            }
            if let Some(parcel) = parcels.get_mut(*index) {
                report.apply_to(parcel);
            }
        }

        progress.finish(format!(
            "Analysed {} parcels ({failures} with failures)",
            reports.len()
        ));

        reports.into_iter().map(|(_, report)| report).collect()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU64, Ordering};

    use tree_manager_http::null_progress;
    use tree_manager_koppen::KoppenError;
    use tree_manager_site_models::{Drainage, SoilSample, SoilSource, SoilTexture};
    use tree_manager_soil::SoilError;

    use super::*;
    use crate::test_support::{FakeGeology, FakeSoil, coord, zones};

    #[tokio::test]
    async fn zone_and_soil_are_resolved_together() {
        let analyzer = SiteAnalyzer::new(
            zones(Some(15)),
            FakeSoil::data(65.0, 250.0, 350.0),
            FakeGeology::lithology("granite"),
        );

        let report = analyzer.analyze(coord(51.5, -0.1)).await;
        assert_eq!(report.climate_zone.unwrap(), KoppenZone::Cfb);
        let soil = report.soil.unwrap();
        assert_eq!(soil.source, SoilSource::Measured);
        assert!((soil.sample.ph - 6.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn zone_failure_does_not_block_soil() {
        let analyzer = SiteAnalyzer::new(
            zones(Some(0)),
            FakeSoil::data(70.0, 100.0, 700.0),
            FakeGeology::lithology("granite"),
        );

        let report = analyzer.analyze(coord(0.0, -30.0)).await;
        assert!(matches!(
            report.climate_zone,
            Err(AnalysisError::Zone(KoppenError::NoData { .. }))
        ));
        assert!(report.soil.is_ok());
    }

    #[tokio::test]
    async fn parcel_profile_is_written_on_success() {
        let analyzer = SiteAnalyzer::new(
            zones(Some(15)),
            FakeSoil::data(65.0, 250.0, 350.0),
            FakeGeology::lithology("granite"),
        );
        let mut parcel = Parcel::new("user-1", "Orchard", coord(51.5, -0.1));
        let before = parcel.updated_at;

        analyzer.analyze_parcel(&mut parcel).await;

        assert_eq!(parcel.profile.climate_zone(), Some(KoppenZone::Cfb));
        assert_eq!(parcel.profile.soil_ph(), Some(6.5));
        assert_eq!(parcel.profile.soil_source(), Some(SoilSource::Measured));
        assert!(parcel.updated_at >= before);
    }

    #[tokio::test]
    async fn failed_soil_leaves_previous_values() {
        let analyzer = SiteAnalyzer::new(
            zones(Some(15)),
            FakeSoil::failing(|| SoilError::Format {
                message: "bad".to_string(),
            }),
            FakeGeology::lithology("granite"),
        );
        let mut parcel = Parcel::new("user-1", "Meadow", coord(51.5, -0.1));
        let previous = SoilSample::measured(
            5.8,
            SoilTexture {
                clay_pct: 20.0,
                sand_pct: 40.0,
            },
            false,
        );
        parcel.apply_soil(&previous, SoilSource::Measured);

        let report = analyzer.analyze_parcel(&mut parcel).await;

        assert!(report.soil.is_err());
        assert_eq!(parcel.profile.climate_zone(), Some(KoppenZone::Cfb));
        assert_eq!(parcel.profile.soil_ph(), Some(5.8));
        assert_eq!(parcel.profile.soil_source(), Some(SoilSource::Measured));
    }

    #[tokio::test]
    async fn slow_soil_service_falls_back_to_geology() {
        let analyzer = SiteAnalyzer::new(
            zones(Some(15)),
            FakeSoil::empty().with_delay(Duration::from_millis(20)),
            FakeGeology::lithology("limestone [60%..80%]; clay [20%..40%]"),
        )
        .with_soil_deadline(Duration::from_millis(100));

        let report = analyzer.analyze(coord(51.5, -0.1)).await;
        let soil = report.soil.unwrap();
        assert_eq!(soil.source, SoilSource::Inferred);
        assert_eq!(soil.sample.drainage, Drainage::WellDrained);
        assert!(report.climate_zone.is_ok());
    }

    struct CountingProgress {
        total: AtomicU64,
        done: AtomicU64,
    }

    impl ProgressCallback for CountingProgress {
        fn set_total(&self, total: u64) {
            self.total.store(total, Ordering::SeqCst);
        }
        fn inc(&self, delta: u64) {
            self.done.fetch_add(delta, Ordering::SeqCst);
        }
        fn set_message(&self, _msg: String) {}
        fn finish(&self, _msg: String) {}
    }

    #[tokio::test]
    async fn batch_applies_each_report_to_its_parcel() {
        let analyzer = SiteAnalyzer::new(
            zones(Some(1)),
            FakeSoil::data(55.0, 450.0, 200.0),
            FakeGeology::lithology("granite"),
        );
        let mut parcels: Vec<Parcel> = (0..5)
            .map(|i| Parcel::new("user-1", format!("P{i}"), coord(f64::from(i), 10.0)))
            .collect();
        let counting = Arc::new(CountingProgress {
            total: AtomicU64::new(0),
            done: AtomicU64::new(0),
        });
        let progress: Arc<dyn ProgressCallback> = counting.clone();

        let reports = analyzer.analyze_parcels(&mut parcels, 2, &progress).await;

        assert_eq!(reports.len(), 5);
        for (i, report) in reports.iter().enumerate() {
            assert_eq!(report.location, parcels[i].location);
        }
        assert!(parcels.iter().all(|p| p.profile.climate_zone() == Some(KoppenZone::Af)));
        assert!(parcels.iter().all(|p| p.profile.soil_ph() == Some(5.5)));
        assert_eq!(counting.total.load(Ordering::SeqCst), 5);
        assert_eq!(counting.done.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn zero_concurrency_still_progresses() {
        let analyzer = SiteAnalyzer::new(
            zones(Some(15)),
            FakeSoil::empty(),
            FakeGeology::lithology("sandstone"),
        );
        let mut parcels = vec![Parcel::new("user-1", "", coord(10.0, 10.0))];

        let reports = analyzer
            .analyze_parcels(&mut parcels, 0, &null_progress())
            .await;

        assert_eq!(reports.len(), 1);
        assert_eq!(parcels[0].profile.soil_source(), Some(SoilSource::Inferred));
    }
}
