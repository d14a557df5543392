//! Measured-then-inferred soil resolution.

use std::time::Duration;

use tree_manager_geology::{GeologyError, GeologySource, estimate_from_geology};
use tree_manager_site_models::{Coordinate, SoilSample, SoilSource};
use tree_manager_soil::{SoilError, SoilPointSource, resolve_soil};

use crate::AnalysisError;

/// A soil sample and where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSoil {
    /// pH, texture and drainage.
    pub sample: SoilSample,
    /// Whether the sample was measured or estimated from geology.
    pub source: SoilSource,
}

/// Resolves soil at `location`.
///
/// The point-property service is tried first (with its own nearby-point
/// fallback). If it fails with anything other than a malformed response,
/// the dominant rock type at `location` is used instead.
///
/// Each stage gets its own `deadline`: a measured walk that runs out of
/// time counts as a service failure and still falls back to geology.
///
/// # Errors
///
/// Returns [`AnalysisError::SoilUnavailable`] carrying the measured
/// failure and, if it was attempted, the geology failure.
pub async fn resolve_site_soil<S, G>(
    soil: &S,
    geology: &G,
    location: Coordinate,
    deadline: Duration,
) -> Result<ResolvedSoil, AnalysisError>
where
    S: SoilPointSource + ?Sized,
    G: GeologySource + ?Sized,
{
    let measured = match tokio::time::timeout(deadline, resolve_soil(soil, location)).await {
        Ok(Ok(sample)) => {
            return Ok(ResolvedSoil {
                sample,
                source: SoilSource::Measured,
            });
        }
        Ok(Err(e)) => e,
        Err(_) => SoilError::Deadline {
            latitude: location.latitude(),
            longitude: location.longitude(),
            seconds: deadline.as_secs_f64(),
        },
    };

    if !measured.triggers_geology_fallback() {
        log::error!("Soil lookup at {location} failed without fallback: {measured}");
        return Err(AnalysisError::SoilUnavailable {
            measured,
            inferred: None,
        });
    }

    log::warn!("Soil lookup at {location} failed ({measured}), estimating from geology");

    let inferred = tokio::time::timeout(deadline, estimate_from_geology(geology, location))
        .await
        .unwrap_or(Err(GeologyError::Timeout));

    match inferred {
        Ok(sample) => Ok(ResolvedSoil {
            sample,
            source: SoilSource::Inferred,
        }),
        Err(inferred) => Err(AnalysisError::SoilUnavailable {
            measured,
            inferred: Some(inferred),
        }),
    }
}

#[cfg(test)]
mod tests {
    use tree_manager_site_models::Drainage;

    use super::*;
    use crate::DEFAULT_SOIL_DEADLINE;
    use crate::test_support::{FakeGeology, FakeSoil, coord};

    #[tokio::test]
    async fn measured_data_wins_without_geology_call() {
        let soil = FakeSoil::data(65.0, 250.0, 350.0);
        let geology = FakeGeology::lithology("granite");

        let resolved = resolve_site_soil(&soil, &geology, coord(52.0, 5.0), DEFAULT_SOIL_DEADLINE)
            .await
            .unwrap();

        assert_eq!(resolved.source, SoilSource::Measured);
        assert!((resolved.sample.ph - 6.5).abs() < 1e-9);
        assert_eq!(resolved.sample.drainage, Drainage::ModeratelyDrained);
        assert!(!resolved.sample.approximate);
        assert_eq!(geology.calls(), 0);
    }

    #[tokio::test]
    async fn exhausted_offsets_fall_back_to_geology() {
        let soil = FakeSoil::empty();
        let geology = FakeGeology::lithology("limestone [60%..80%]; clay [20%..40%]");

        let resolved = resolve_site_soil(&soil, &geology, coord(52.0, 5.0), DEFAULT_SOIL_DEADLINE)
            .await
            .unwrap();

        assert_eq!(soil.calls(), 13);
        assert_eq!(resolved.source, SoilSource::Inferred);
        assert!((resolved.sample.ph - 7.5).abs() < 1e-9);
        assert_eq!(resolved.sample.drainage, Drainage::WellDrained);
        assert!(resolved.sample.approximate);
    }

    #[tokio::test]
    async fn service_failure_falls_back_to_geology() {
        let soil = FakeSoil::failing(|| SoilError::Status { status: 503 });
        let geology = FakeGeology::lithology("basalt");

        let resolved = resolve_site_soil(&soil, &geology, coord(52.0, 5.0), DEFAULT_SOIL_DEADLINE)
            .await
            .unwrap();

        assert_eq!(resolved.source, SoilSource::Inferred);
        assert_eq!(geology.calls(), 1);
    }

    #[tokio::test]
    async fn format_error_does_not_fall_back() {
        let soil = FakeSoil::failing(|| SoilError::Format {
            message: "missing layers".to_string(),
        });
        let geology = FakeGeology::lithology("basalt");

        let err = resolve_site_soil(&soil, &geology, coord(52.0, 5.0), DEFAULT_SOIL_DEADLINE)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            AnalysisError::SoilUnavailable {
                measured: SoilError::Format { .. },
                inferred: None,
            }
        ));
        assert_eq!(geology.calls(), 0);
    }

    #[tokio::test]
    async fn both_failures_are_reported() {
        let soil = FakeSoil::empty();
        let geology = FakeGeology::failing(|| GeologyError::NoData {
            latitude: 0.0,
            longitude: 0.0,
        });

        let err = resolve_site_soil(&soil, &geology, coord(0.0, 0.0), DEFAULT_SOIL_DEADLINE)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            AnalysisError::SoilUnavailable {
                measured: SoilError::Exhausted { attempts: 13, .. },
                inferred: Some(GeologyError::NoData { .. }),
            }
        ));
        assert!(err.to_string().contains("geology estimate failed"));
    }

    #[tokio::test]
    async fn slow_offset_walk_still_falls_back_to_geology() {
        let soil = FakeSoil::empty().with_delay(Duration::from_millis(20));
        let geology = FakeGeology::lithology("limestone [60%..80%]; clay [20%..40%]");

        let resolved = resolve_site_soil(
            &soil,
            &geology,
            coord(52.0, 5.0),
            Duration::from_millis(100),
        )
        .await
        .unwrap();

        assert!(soil.calls() < 13);
        assert_eq!(geology.calls(), 1);
        assert_eq!(resolved.source, SoilSource::Inferred);
        assert!((resolved.sample.ph - 7.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn deadline_is_reported_when_geology_also_fails() {
        let soil = FakeSoil::empty().with_delay(Duration::from_millis(50));
        let geology = FakeGeology::failing(|| GeologyError::Status { status: 502 });

        let err = resolve_site_soil(
            &soil,
            &geology,
            coord(52.0, 5.0),
            Duration::from_millis(20),
        )
        .await
        .unwrap_err();

        assert!(matches!(
            err,
            AnalysisError::SoilUnavailable {
                measured: SoilError::Deadline { .. },
                inferred: Some(GeologyError::Status { status: 502 }),
            }
        ));
        assert_eq!(geology.calls(), 1);
    }
}
