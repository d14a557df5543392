//! User-owned land parcels.

use chrono::{DateTime, Utc};
use geo::{Centroid, LineString, Polygon};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Coordinate, EnvironmentalProfile, KoppenZone, SoilSample, SoilSource};

/// A parcel of land and its derived environmental profile.
///
/// Created with geometry only; the profile is filled in (and overwritten,
/// last write wins) by each analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parcel {
    /// Unique identifier.
    pub id: Uuid,
    /// Owning user identifier.
    pub owner: String,
    /// Optional display name (may be empty).
    #[serde(default)]
    pub name: String,
    /// Point used for all environmental lookups.
    pub location: Coordinate,
    /// Boundary ring drawn by the user, if any.
    #[serde(default)]
    pub polygon: Option<Vec<Coordinate>>,
    /// Parcel area in square metres, if known.
    #[serde(default)]
    pub area_m2: Option<f64>,
    /// Derived environmental profile.
    #[serde(default)]
    pub profile: EnvironmentalProfile,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Error returned when a parcel boundary cannot be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ParcelGeometryError {
    /// The ring has fewer than three distinct vertices.
    #[error("parcel boundary needs at least 3 vertices (got {0})")]
    TooFewVertices(usize),
    /// The ring is degenerate (zero area) and has no centroid.
    #[error("parcel boundary has no centroid")]
    NoCentroid,
}

impl Parcel {
    /// Creates a parcel located at a single point.
    #[must_use]
    pub fn new(owner: impl Into<String>, name: impl Into<String>, location: Coordinate) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            owner: owner.into(),
            name: name.into(),
            location,
            polygon: None,
            area_m2: None,
            profile: EnvironmentalProfile::default(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Creates a parcel from a boundary ring; its location is the ring's
    /// centroid.
    ///
    /// # Errors
    ///
    /// Returns [`ParcelGeometryError`] if the ring has fewer than three
    /// vertices or no centroid.
    pub fn from_polygon(
        owner: impl Into<String>,
        name: impl Into<String>,
        ring: Vec<Coordinate>,
        area_m2: Option<f64>,
    ) -> Result<Self, ParcelGeometryError> {
        let location = polygon_centroid(&ring)?;
        let mut parcel = Self::new(owner, name, location);
        parcel.polygon = Some(ring);
        parcel.area_m2 = area_m2;
        Ok(parcel)
    }

    /// Name for display: the parcel name, or `"Parcel <id>"` when blank.
    #[must_use]
    pub fn display_name(&self) -> String {
        if self.name.trim().is_empty() {
            format!("Parcel {}", self.id)
        } else {
            self.name.clone()
        }
    }

    /// Stores a classified climate zone.
    pub fn apply_climate_zone(&mut self, zone: KoppenZone) {
        self.profile.record_climate_zone(zone);
        self.updated_at = Utc::now();
    }

    /// Stores a soil reading (pH, drainage and source together).
    pub fn apply_soil(&mut self, sample: &SoilSample, source: SoilSource) {
        self.profile.record_soil(sample, source);
        self.updated_at = Utc::now();
    }
}

fn polygon_centroid(ring: &[Coordinate]) -> Result<Coordinate, ParcelGeometryError> {
    let mut distinct: Vec<&Coordinate> = Vec::with_capacity(ring.len());
    for point in ring {
        if !distinct.contains(&point) {
            distinct.push(point);
        }
    }
    if distinct.len() < 3 {
        return Err(ParcelGeometryError::TooFewVertices(distinct.len()));
    }

    let exterior: LineString<f64> = ring
        .iter()
        .map(|c| (c.longitude(), c.latitude()))
        .collect::<Vec<_>>()
        .into();
    let polygon = Polygon::new(exterior, vec![]);

    let centroid = polygon.centroid().ok_or(ParcelGeometryError::NoCentroid)?;
    Coordinate::new(centroid.y(), centroid.x()).map_err(|_| ParcelGeometryError::NoCentroid)
}
