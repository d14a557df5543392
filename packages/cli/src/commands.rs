//! Implementations shared by the subcommands and the interactive menu.

use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tree_manager_analysis::{
    AnalysisError, ResolvedSoil, SiteAnalyzer, SiteReport, resolve_site_soil,
};
use tree_manager_catalog::{Catalog, FilterCriteria, PhWindow, SortOrder, filter, recommend};
use tree_manager_cli_utils::{IndicatifProgress, MultiProgress};
use tree_manager_geocoder::NominatimClient;
use tree_manager_geology::{MacrostratClient, estimate_from_geology, macrostrat};
use tree_manager_koppen::ZoneClassifier;
use tree_manager_koppen::download::{BECK_KOPPEN_URL, DownloadStatus, download_koppen};
use tree_manager_site_models::{Coordinate, KoppenZone, Parcel, SoilSource};
use tree_manager_soil::{SoilGridsClient, soilgrids};
use tree_manager_species_models::UserGoals;

use crate::paths;

pub type CliResult<T = ()> = Result<T, Box<dyn Error>>;

type Analyzer = SiteAnalyzer<SoilGridsClient, MacrostratClient>;

/// Options shared by every tool.
#[derive(Debug, Clone)]
pub struct Settings {
    pub koppen_path: Option<PathBuf>,
    pub catalog_path: Option<PathBuf>,
    pub deadline: Duration,
    pub concurrency: usize,
    pub ph_tolerance: f64,
}

impl Settings {
    fn koppen_path(&self) -> PathBuf {
        paths::koppen_path(self.koppen_path.as_deref())
    }

    fn load_catalog(&self) -> CliResult<Catalog> {
        Ok(Catalog::load(&paths::catalog_path(
            self.catalog_path.as_deref(),
        ))?)
    }

    fn analyzer(&self) -> CliResult<Analyzer> {
        let zones = Arc::new(ZoneClassifier::new(self.koppen_path()));
        let soil = SoilGridsClient::new(soilgrids::default_config())?;
        let geology = MacrostratClient::new(macrostrat::default_config())?;
        Ok(SiteAnalyzer::new(zones, soil, geology).with_soil_deadline(self.deadline))
    }
}

/// Where to analyse: explicit coordinates or an address to geocode.
#[derive(Debug, Clone)]
pub enum Location {
    Point { latitude: f64, longitude: f64 },
    Address(String),
}

impl Location {
    /// Builds a location from optional CLI arguments.
    ///
    /// # Errors
    ///
    /// Fails if neither a full coordinate pair nor an address was given.
    pub fn from_args(
        latitude: Option<f64>,
        longitude: Option<f64>,
        address: Option<String>,
    ) -> CliResult<Self> {
        match (latitude, longitude, address) {
            (Some(latitude), Some(longitude), _) => Ok(Self::Point {
                latitude,
                longitude,
            }),
            (None, None, Some(address)) => Ok(Self::Address(address)),
            _ => Err("give either --lat and --lon, or --address".into()),
        }
    }

    async fn resolve(self) -> CliResult<Coordinate> {
        match self {
            Self::Point {
                latitude,
                longitude,
            } => Ok(Coordinate::new(latitude, longitude)?),
            Self::Address(address) => {
                let client = NominatimClient::new(tree_manager_geocoder::nominatim::default_config())?;
                let hit = client
                    .geocode(&address)
                    .await?
                    .ok_or_else(|| format!("no geocoding result for '{address}'"))?;
                log::info!("Geocoded '{address}' to {}", hit.display_name);
                Ok(hit.coordinate()?)
            }
        }
    }
}

pub fn print_json(value: &impl Serialize) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub async fn geocode(address: &str) -> CliResult {
    let client = NominatimClient::new(tree_manager_geocoder::nominatim::default_config())?;
    print_json(&client.geocode(address).await?)
}

pub async fn zone(settings: &Settings, latitude: f64, longitude: f64) -> CliResult {
    let point = Coordinate::new(latitude, longitude)?;
    let path = settings.koppen_path();
    let zone = tokio::task::spawn_blocking(move || {
        ZoneClassifier::open(path).and_then(|zones| zones.classify(point))
    })
    .await??;

    print_json(&zone_json(zone))
}

fn zone_json(zone: KoppenZone) -> serde_json::Value {
    json!({ "code": zone.code(), "label": zone.label() })
}

fn soil_json(resolved: &ResolvedSoil) -> serde_json::Value {
    json!({
        "ph": resolved.sample.ph,
        "drainage": resolved.sample.drainage,
        "texture": resolved.sample.texture,
        "approximate": resolved.sample.approximate,
        "source": resolved.source,
    })
}

pub async fn soil(
    settings: &Settings,
    latitude: f64,
    longitude: f64,
    geology_only: bool,
) -> CliResult {
    let point = Coordinate::new(latitude, longitude)?;
    let geology = MacrostratClient::new(macrostrat::default_config())?;

    let resolved = if geology_only {
        ResolvedSoil {
            sample: estimate_from_geology(&geology, point).await?,
            source: SoilSource::Inferred,
        }
    } else {
        let soil = SoilGridsClient::new(soilgrids::default_config())?;
        resolve_site_soil(&soil, &geology, point, settings.deadline).await?
    };

    print_json(&soil_json(&resolved))
}

fn report_json(report: &SiteReport) -> serde_json::Value {
    let error = |e: &AnalysisError| json!({ "error": e.to_string() });
    json!({
        "location": report.location,
        "climate_zone": report.climate_zone.as_ref().map_or_else(error, |z| zone_json(*z)),
        "soil": report.soil.as_ref().map_or_else(error, soil_json),
    })
}

pub async fn analyze(settings: &Settings, location: Location) -> CliResult {
    let point = location.resolve().await?;
    let report = settings.analyzer()?.analyze(point).await;
    print_json(&report_json(&report))
}

/// One parcel in a `--parcels` file: either a point or a boundary ring.
#[derive(Debug, Deserialize)]
struct ParcelInput {
    #[serde(default)]
    name: String,
    #[serde(default = "default_owner")]
    owner: String,
    #[serde(default)]
    location: Option<Coordinate>,
    #[serde(default)]
    polygon: Option<Vec<Coordinate>>,
    #[serde(default)]
    area_m2: Option<f64>,
}

fn default_owner() -> String {
    "local".to_string()
}

impl ParcelInput {
    fn into_parcel(self) -> CliResult<Parcel> {
        match (self.polygon, self.location) {
            (Some(ring), _) => Ok(Parcel::from_polygon(
                self.owner,
                self.name,
                ring,
                self.area_m2,
            )?),
            (None, Some(location)) => {
                let mut parcel = Parcel::new(self.owner, self.name, location);
                parcel.area_m2 = self.area_m2;
                Ok(parcel)
            }
            (None, None) => {
                Err(format!("parcel '{}' has neither location nor polygon", self.name).into())
            }
        }
    }
}

pub async fn analyze_parcels(settings: &Settings, file: &Path, multi: &MultiProgress) -> CliResult {
    let text = std::fs::read_to_string(file)?;
    let inputs: Vec<ParcelInput> = serde_json::from_str(&text)?;
    let mut parcels = inputs
        .into_iter()
        .map(ParcelInput::into_parcel)
        .collect::<CliResult<Vec<_>>>()?;

    let progress = IndicatifProgress::batch_bar(multi, "Analysing parcels");
    let reports = settings
        .analyzer()?
        .analyze_parcels(&mut parcels, settings.concurrency, &progress)
        .await;

    let failures: Vec<serde_json::Value> = parcels
        .iter()
        .zip(&reports)
        .filter(|(_, r)| r.climate_zone.is_err() || r.soil.is_err())
        .map(|(p, r)| json!({ "parcel": p.display_name(), "report": report_json(r) }))
        .collect();

    print_json(&json!({ "parcels": parcels, "failures": failures }))
}

/// Browse filters as typed on the command line.
#[derive(Debug, Clone, Default)]
pub struct TreeQuery {
    pub primary_use: Option<String>,
    pub size: Option<String>,
    pub maintenance: Option<String>,
    pub zone: Option<KoppenZone>,
    pub ph: Option<f64>,
    pub drought_tolerant: bool,
    pub sort: SortOrder,
}

pub fn trees(settings: &Settings, query: TreeQuery) -> CliResult {
    let catalog = settings.load_catalog()?;
    let mut criteria = FilterCriteria::from_tokens(
        query.primary_use.as_deref(),
        query.size.as_deref(),
        query.maintenance.as_deref(),
    )?;
    criteria.climate_zone = query.zone;
    criteria.soil_ph = query.ph.map(|ph| PhWindow {
        ph,
        tolerance: settings.ph_tolerance,
    });
    criteria.drought_tolerant = query.drought_tolerant.then_some(true);
    criteria.sort = query.sort;

    let species: Vec<_> = filter(&catalog, &criteria).collect();
    log::info!("{} of {} species match", species.len(), catalog.len());
    print_json(&species)
}

pub async fn recommend_trees(
    settings: &Settings,
    location: Location,
    goals: &UserGoals,
    limit: usize,
) -> CliResult {
    let catalog = settings.load_catalog()?;
    let point = location.resolve().await?;

    let mut parcel = Parcel::new("local", "", point);
    let report = settings.analyzer()?.analyze_parcel(&mut parcel).await;
    if let Err(e) = &report.climate_zone {
        log::warn!("Climate zone unavailable, not filtering by zone: {e}");
    }
    if let Err(e) = &report.soil {
        log::warn!("Soil data unavailable, not filtering by pH: {e}");
    }

    let ranked = recommend(&catalog, &parcel.profile, goals, settings.ph_tolerance);
    let top: Vec<serde_json::Value> = ranked
        .iter()
        .take(limit)
        .map(|r| {
            json!({
                "scientific_name": r.species.scientific_name,
                "common_name": r.species.common_name,
                "score": r.score,
                "reasons": r.reasons.iter().map(ToString::to_string).collect::<Vec<_>>(),
            })
        })
        .collect();

    print_json(&json!({
        "profile": parcel.profile,
        "candidates": ranked.len(),
        "recommendations": top,
    }))
}

pub async fn download(settings: &Settings, multi: &MultiProgress) -> CliResult {
    let dest = settings.koppen_path();
    let progress = IndicatifProgress::bytes_bar(multi, "Köppen GeoTIFF");
    match download_koppen(BECK_KOPPEN_URL, &dest, progress.as_ref()).await? {
        DownloadStatus::AlreadyPresent => println!("Already present: {}", dest.display()),
        DownloadStatus::Downloaded { bytes } => {
            println!("Downloaded {bytes} bytes to {}", dest.display());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_needs_both_coordinates_or_an_address() {
        assert!(matches!(
            Location::from_args(Some(1.0), Some(2.0), None).unwrap(),
            Location::Point { .. }
        ));
        assert!(matches!(
            Location::from_args(None, None, Some("Paris".to_string())).unwrap(),
            Location::Address(_)
        ));
        assert!(Location::from_args(Some(1.0), None, None).is_err());
        assert!(Location::from_args(None, None, None).is_err());
    }

    #[test]
    fn parcel_input_accepts_point_or_polygon() {
        let inputs: Vec<ParcelInput> = serde_json::from_str(
            r#"[
                {"name": "Orchard", "location": {"latitude": 51.5, "longitude": -0.1}},
                {"polygon": [
                    {"latitude": 0.0, "longitude": 0.0},
                    {"latitude": 0.0, "longitude": 2.0},
                    {"latitude": 2.0, "longitude": 2.0},
                    {"latitude": 2.0, "longitude": 0.0}
                ]},
                {"name": "Nowhere"}
            ]"#,
        )
        .unwrap();
        let mut parcels = inputs.into_iter().map(ParcelInput::into_parcel);

        let orchard = parcels.next().unwrap().unwrap();
        assert_eq!(orchard.display_name(), "Orchard");
        assert_eq!(orchard.owner, "local");

        let ring = parcels.next().unwrap().unwrap();
        assert!((ring.location.latitude() - 1.0).abs() < 1e-9);
        assert!((ring.location.longitude() - 1.0).abs() < 1e-9);

        assert!(parcels.next().unwrap().is_err());
    }
}
