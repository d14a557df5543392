#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Site types shared by the climate, soil and recommendation crates.
//!
//! A [`Parcel`] owns an [`EnvironmentalProfile`] that is filled in by the
//! analysis step: a Köppen climate zone from the raster classifier and a
//! soil pH / drainage pair from either a measured [`SoilSample`] or a
//! geology-based estimate.

pub mod koppen;
pub mod parcel;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

pub use koppen::KoppenZone;
pub use parcel::Parcel;

/// A WGS84 point.
///
/// Constructed through [`Coordinate::new`], which rejects non-finite and
/// out-of-range values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCoordinate")]
pub struct Coordinate {
    latitude: f64,
    longitude: f64,
}

#[derive(Deserialize)]
struct RawCoordinate {
    latitude: f64,
    longitude: f64,
}

impl TryFrom<RawCoordinate> for Coordinate {
    type Error = CoordinateError;

    fn try_from(raw: RawCoordinate) -> Result<Self, Self::Error> {
        Self::new(raw.latitude, raw.longitude)
    }
}

/// Error returned for an invalid latitude/longitude pair.
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum CoordinateError {
    /// Latitude or longitude is NaN or infinite.
    #[error("coordinates must be finite (got {latitude}, {longitude})")]
    NotFinite {
        /// Supplied latitude.
        latitude: f64,
        /// Supplied longitude.
        longitude: f64,
    },
    /// Latitude outside `[-90, 90]` or longitude outside `[-180, 180]`.
    #[error("coordinates out of range (got {latitude}, {longitude})")]
    OutOfRange {
        /// Supplied latitude.
        latitude: f64,
        /// Supplied longitude.
        longitude: f64,
    },
}

impl Coordinate {
    /// Creates a coordinate from latitude and longitude in degrees.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinateError`] if either value is non-finite or out of
    /// range.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, CoordinateError> {
        if !latitude.is_finite() || !longitude.is_finite() {
            return Err(CoordinateError::NotFinite {
                latitude,
                longitude,
            });
        }
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return Err(CoordinateError::OutOfRange {
                latitude,
                longitude,
            });
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// Latitude in degrees.
    #[must_use]
    pub const fn latitude(&self) -> f64 {
        self.latitude
    }

    /// Longitude in degrees.
    #[must_use]
    pub const fn longitude(&self) -> f64 {
        self.longitude
    }

    /// Shifts the point by fixed degree deltas.
    ///
    /// Latitude is clamped at the poles. Longitude wraps across the
    /// antimeridian, so the result is always a valid coordinate.
    #[must_use]
    pub fn offset(&self, delta_lat: f64, delta_lon: f64) -> Self {
        let mut longitude = self.longitude + delta_lon;
        if longitude > 180.0 {
            longitude -= 360.0;
        } else if longitude < -180.0 {
            longitude += 360.0;
        }

        Self {
            latitude: (self.latitude + delta_lat).clamp(-90.0, 90.0),
            longitude,
        }
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.latitude, self.longitude)
    }
}

/// Coarse soil drainage class derived from texture or geology.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
pub enum Drainage {
    #[serde(rename = "Well-drained")]
    #[strum(serialize = "Well-drained")]
    WellDrained,
    #[serde(rename = "Moderately drained")]
    #[strum(serialize = "Moderately drained")]
    ModeratelyDrained,
    #[serde(rename = "Poorly drained")]
    #[strum(serialize = "Poorly drained")]
    PoorlyDrained,
}

impl Drainage {
    /// Sand share (percent) at or above which soil is well drained.
    pub const WELL_DRAINED_SAND_PCT: f64 = 65.0;

    /// Clay share (percent) at or above which soil is poorly drained,
    /// unless the sand threshold already applies.
    pub const POORLY_DRAINED_CLAY_PCT: f64 = 40.0;

    /// Derives drainage from texture percentages.
    ///
    /// Evaluated in order: sand ≥ 65 → well drained, clay ≥ 40 → poorly
    /// drained, otherwise moderately drained.
    #[must_use]
    pub fn from_texture(texture: SoilTexture) -> Self {
        if texture.sand_pct >= Self::WELL_DRAINED_SAND_PCT {
            Self::WellDrained
        } else if texture.clay_pct >= Self::POORLY_DRAINED_CLAY_PCT {
            Self::PoorlyDrained
        } else {
            Self::ModeratelyDrained
        }
    }
}

/// Where a profile's soil values came from.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SoilSource {
    /// Point-property soil service (exact or offset point).
    Measured,
    /// Estimated from the dominant rock type.
    Inferred,
}

/// Topsoil texture shares in percent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SoilTexture {
    /// Clay content (%).
    pub clay_pct: f64,
    /// Sand content (%).
    pub sand_pct: f64,
}

/// A transient soil reading, consumed immediately by the analysis step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoilSample {
    /// pH (H2O), one decimal place.
    pub ph: f64,
    /// Drainage class.
    pub drainage: Drainage,
    /// Texture, when the sample came from measured data.
    pub texture: Option<SoilTexture>,
    /// True when the value was not measured at the requested point.
    pub approximate: bool,
}

impl SoilSample {
    /// Builds a measured sample, deriving drainage from the texture.
    #[must_use]
    pub fn measured(ph: f64, texture: SoilTexture, approximate: bool) -> Self {
        Self {
            ph,
            drainage: Drainage::from_texture(texture),
            texture: Some(texture),
            approximate,
        }
    }

    /// Builds an inferred sample. Inferred samples are always approximate.
    #[must_use]
    pub const fn inferred(ph: f64, drainage: Drainage) -> Self {
        Self {
            ph,
            drainage,
            texture: None,
            approximate: true,
        }
    }
}

/// Derived environmental characteristics of a parcel.
///
/// `soil_ph`, `soil_drainage` and `soil_source` are written together by
/// [`EnvironmentalProfile::record_soil`] and are either all set or all
/// unset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawProfile")]
pub struct EnvironmentalProfile {
    climate_zone: Option<KoppenZone>,
    soil_ph: Option<f64>,
    soil_drainage: Option<Drainage>,
    soil_source: Option<SoilSource>,
    soil_approximate: bool,
}

#[derive(Deserialize)]
struct RawProfile {
    climate_zone: Option<KoppenZone>,
    soil_ph: Option<f64>,
    soil_drainage: Option<Drainage>,
    soil_source: Option<SoilSource>,
    #[serde(default)]
    soil_approximate: bool,
}

/// Error returned when a stored profile has a partial soil field group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("soil pH, drainage and source must be set together")]
pub struct PartialSoilError;

impl TryFrom<RawProfile> for EnvironmentalProfile {
    type Error = PartialSoilError;

    fn try_from(raw: RawProfile) -> Result<Self, Self::Error> {
        let set = [
            raw.soil_ph.is_some(),
            raw.soil_drainage.is_some(),
            raw.soil_source.is_some(),
        ];
        if set.iter().any(|s| *s) && !set.iter().all(|s| *s) {
            return Err(PartialSoilError);
        }
        Ok(Self {
            climate_zone: raw.climate_zone,
            soil_ph: raw.soil_ph,
            soil_drainage: raw.soil_drainage,
            soil_source: raw.soil_source,
            soil_approximate: raw.soil_ph.is_some() && raw.soil_approximate,
        })
    }
}

impl EnvironmentalProfile {
    /// Classified climate zone, if analysed.
    #[must_use]
    pub const fn climate_zone(&self) -> Option<KoppenZone> {
        self.climate_zone
    }

    /// Soil pH, if analysed.
    #[must_use]
    pub const fn soil_ph(&self) -> Option<f64> {
        self.soil_ph
    }

    /// Soil drainage class, if analysed.
    #[must_use]
    pub const fn soil_drainage(&self) -> Option<Drainage> {
        self.soil_drainage
    }

    /// Origin of the soil values, if analysed.
    #[must_use]
    pub const fn soil_source(&self) -> Option<SoilSource> {
        self.soil_source
    }

    /// Whether the stored soil values are approximate.
    #[must_use]
    pub const fn soil_is_approximate(&self) -> bool {
        self.soil_approximate
    }

    /// Overwrites the climate zone.
    pub fn record_climate_zone(&mut self, zone: KoppenZone) {
        self.climate_zone = Some(zone);
    }

    /// Overwrites the soil field group in one step.
    pub fn record_soil(&mut self, sample: &SoilSample, source: SoilSource) {
        self.soil_ph = Some(sample.ph);
        self.soil_drainage = Some(sample.drainage);
        self.soil_source = Some(source);
        self.soil_approximate = sample.approximate;
    }

    /// Returns `true` when no field has been analysed yet.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.climate_zone.is_none() && self.soil_ph.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texture(clay_pct: f64, sand_pct: f64) -> SoilTexture {
        SoilTexture { clay_pct, sand_pct }
    }

    #[test]
    fn coordinate_rejects_non_finite_values() {
        assert!(matches!(
            Coordinate::new(f64::NAN, 0.0),
            Err(CoordinateError::NotFinite { .. })
        ));
        assert!(matches!(
            Coordinate::new(0.0, f64::INFINITY),
            Err(CoordinateError::NotFinite { .. })
        ));
    }

    #[test]
    fn coordinate_rejects_out_of_range_values() {
        assert!(matches!(
            Coordinate::new(90.5, 0.0),
            Err(CoordinateError::OutOfRange { .. })
        ));
        assert!(matches!(
            Coordinate::new(0.0, -180.1),
            Err(CoordinateError::OutOfRange { .. })
        ));
        assert!(Coordinate::new(-90.0, 180.0).is_ok());
    }

    #[test]
    fn coordinate_deserialization_validates() {
        let ok: Coordinate =
            serde_json::from_str(r#"{"latitude": 48.85, "longitude": 2.35}"#).unwrap();
        assert!((ok.latitude() - 48.85).abs() < 1e-9);
        assert!(serde_json::from_str::<Coordinate>(r#"{"latitude": 91.0, "longitude": 0.0}"#).is_err());
    }

    #[test]
    fn offset_shifts_both_axes() {
        let origin = Coordinate::new(48.85, 2.35).unwrap();
        let shifted = origin.offset(0.13, -0.05);
        assert!((shifted.latitude() - 48.98).abs() < 1e-9);
        assert!((shifted.longitude() - 2.30).abs() < 1e-9);
    }

    #[test]
    fn offset_stays_in_range_near_poles_and_antimeridian() {
        let north = Coordinate::new(89.9, 0.0).unwrap().offset(0.22, 0.0);
        assert!((north.latitude() - 90.0).abs() < 1e-9);

        let east = Coordinate::new(10.0, 179.9).unwrap().offset(0.0, 0.22);
        assert!((east.longitude() + 179.88).abs() < 1e-9);

        let west = Coordinate::new(-89.95, -179.95).unwrap().offset(-0.13, -0.13);
        assert!((west.latitude() + 90.0).abs() < 1e-9);
        assert!((west.longitude() - 179.92).abs() < 1e-9);
        assert!(Coordinate::new(west.latitude(), west.longitude()).is_ok());

        let edge = Coordinate::new(0.0, 180.0).unwrap().offset(0.0, 0.0);
        assert!((edge.longitude() - 180.0).abs() < 1e-9);
    }

    #[test]
    fn sand_threshold_wins_regardless_of_clay() {
        assert_eq!(Drainage::from_texture(texture(80.0, 65.0)), Drainage::WellDrained);
        assert_eq!(Drainage::from_texture(texture(10.0, 70.0)), Drainage::WellDrained);
    }

    #[test]
    fn clay_threshold_applies_below_sand_threshold() {
        assert_eq!(Drainage::from_texture(texture(40.0, 64.9)), Drainage::PoorlyDrained);
        assert_eq!(Drainage::from_texture(texture(45.0, 20.0)), Drainage::PoorlyDrained);
    }

    #[test]
    fn remaining_textures_are_moderately_drained() {
        assert_eq!(Drainage::from_texture(texture(25.0, 35.0)), Drainage::ModeratelyDrained);
        assert_eq!(Drainage::from_texture(texture(39.9, 64.9)), Drainage::ModeratelyDrained);
        assert_eq!(Drainage::from_texture(texture(0.0, 0.0)), Drainage::ModeratelyDrained);
    }

    #[test]
    fn drainage_labels_match_display_and_serde() {
        assert_eq!(Drainage::WellDrained.to_string(), "Well-drained");
        assert_eq!(
            "Poorly drained".parse::<Drainage>().unwrap(),
            Drainage::PoorlyDrained
        );
        assert_eq!(
            serde_json::to_string(&Drainage::ModeratelyDrained).unwrap(),
            "\"Moderately drained\""
        );
    }

    #[test]
    fn inferred_samples_are_always_approximate() {
        let sample = SoilSample::inferred(7.5, Drainage::WellDrained);
        assert!(sample.approximate);
        assert!(sample.texture.is_none());
    }

    #[test]
    fn record_soil_sets_the_whole_group() {
        let mut profile = EnvironmentalProfile::default();
        assert!(profile.is_empty());

        let sample = SoilSample::measured(6.5, texture(25.0, 35.0), false);
        profile.record_soil(&sample, SoilSource::Measured);

        assert_eq!(profile.soil_ph(), Some(6.5));
        assert_eq!(profile.soil_drainage(), Some(Drainage::ModeratelyDrained));
        assert_eq!(profile.soil_source(), Some(SoilSource::Measured));
        assert!(!profile.soil_is_approximate());
        assert!(!profile.is_empty());
    }

    #[test]
    fn record_soil_overwrites_previous_values() {
        let mut profile = EnvironmentalProfile::default();
        profile.record_soil(
            &SoilSample::measured(6.5, texture(25.0, 35.0), false),
            SoilSource::Measured,
        );
        profile.record_soil(
            &SoilSample::inferred(7.5, Drainage::WellDrained),
            SoilSource::Inferred,
        );
        assert_eq!(profile.soil_ph(), Some(7.5));
        assert_eq!(profile.soil_source(), Some(SoilSource::Inferred));
        assert!(profile.soil_is_approximate());
    }

    #[test]
    fn partial_soil_group_is_rejected_on_load() {
        let json = r#"{"climate_zone": "Cfb", "soil_ph": 6.5, "soil_drainage": null, "soil_source": null}"#;
        assert!(serde_json::from_str::<EnvironmentalProfile>(json).is_err());

        let json = r#"{"climate_zone": "Cfb", "soil_ph": null, "soil_drainage": null, "soil_source": null}"#;
        let profile: EnvironmentalProfile = serde_json::from_str(json).unwrap();
        assert_eq!(profile.climate_zone(), Some(KoppenZone::Cfb));
    }
}
