//! Köppen-Geiger climate zone table.
//!
//! The Beck et al. (2018) raster encodes each zone as a pixel value in
//! `1..=30`, in the order of [`KoppenZone::ALL`]. Pixel value `0` is the
//! ocean / no-data marker and never maps to a zone.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// One of the 30 Köppen-Geiger climate classes.
///
/// `Display`/`FromStr` use the short code (e.g. `"Cfb"`), which is also
/// the form stored in the species catalog.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
pub enum KoppenZone {
    // ── Tropical ────────────────────────────────────────
    Af,
    Am,
    Aw,

    // ── Arid ────────────────────────────────────────────
    #[serde(rename = "BWh")]
    #[strum(serialize = "BWh")]
    BWh,
    #[serde(rename = "BWk")]
    #[strum(serialize = "BWk")]
    BWk,
    #[serde(rename = "BSh")]
    #[strum(serialize = "BSh")]
    BSh,
    #[serde(rename = "BSk")]
    #[strum(serialize = "BSk")]
    BSk,

    // ── Temperate ───────────────────────────────────────
    Csa,
    Csb,
    Csc,
    Cwa,
    Cwb,
    Cwc,
    Cfa,
    Cfb,
    Cfc,

    // ── Continental ─────────────────────────────────────
    Dsa,
    Dsb,
    Dsc,
    Dsd,
    Dwa,
    Dwb,
    Dwc,
    Dwd,
    Dfa,
    Dfb,
    Dfc,
    Dfd,

    // ── Polar ───────────────────────────────────────────
    #[serde(rename = "ET")]
    #[strum(serialize = "ET")]
    Et,
    #[serde(rename = "EF")]
    #[strum(serialize = "EF")]
    Ef,
}

impl KoppenZone {
    /// All zones in raster pixel order (pixel value = index + 1).
    pub const ALL: [Self; 30] = [
        Self::Af,
        Self::Am,
        Self::Aw,
        Self::BWh,
        Self::BWk,
        Self::BSh,
        Self::BSk,
        Self::Csa,
        Self::Csb,
        Self::Csc,
        Self::Cwa,
        Self::Cwb,
        Self::Cwc,
        Self::Cfa,
        Self::Cfb,
        Self::Cfc,
        Self::Dsa,
        Self::Dsb,
        Self::Dsc,
        Self::Dsd,
        Self::Dwa,
        Self::Dwb,
        Self::Dwc,
        Self::Dwd,
        Self::Dfa,
        Self::Dfb,
        Self::Dfc,
        Self::Dfd,
        Self::Et,
        Self::Ef,
    ];

    /// Maps a raster pixel value to its zone.
    ///
    /// Returns `None` for the no-data value `0` and for any value outside
    /// the table.
    #[must_use]
    pub fn from_pixel(value: u32) -> Option<Self> {
        let index = usize::try_from(value.checked_sub(1)?).ok()?;
        Self::ALL.get(index).copied()
    }

    /// Pixel value used for this zone in the raster.
    #[must_use]
    pub const fn pixel_value(self) -> u32 {
        self as u32 + 1
    }

    /// Short Köppen code (e.g. `"Cfb"`).
    #[must_use]
    pub fn code(self) -> &'static str {
        self.label().split(" - ").next().unwrap_or_default()
    }

    /// Human-readable label (e.g. `"Cfb - Oceanic"`).
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Af => "Af - Tropical rainforest",
            Self::Am => "Am - Tropical monsoon",
            Self::Aw => "Aw - Tropical savanna",
            Self::BWh => "BWh - Hot desert",
            Self::BWk => "BWk - Cold desert",
            Self::BSh => "BSh - Hot semi-arid",
            Self::BSk => "BSk - Cold semi-arid",
            Self::Csa => "Csa - Hot-summer Mediterranean",
            Self::Csb => "Csb - Warm-summer Mediterranean",
            Self::Csc => "Csc - Cold-summer Mediterranean",
            Self::Cwa => "Cwa - Monsoon-influenced humid subtropical",
            Self::Cwb => "Cwb - Subtropical highland",
            Self::Cwc => "Cwc - Cold subtropical highland",
            Self::Cfa => "Cfa - Humid subtropical",
            Self::Cfb => "Cfb - Oceanic",
            Self::Cfc => "Cfc - Subpolar oceanic",
            Self::Dsa => "Dsa - Hot-summer humid continental (Mediterranean)",
            Self::Dsb => "Dsb - Warm-summer humid continental (Mediterranean)",
            Self::Dsc => "Dsc - Subarctic (Mediterranean)",
            Self::Dsd => "Dsd - Extremely cold subarctic (Mediterranean)",
            Self::Dwa => "Dwa - Monsoon-influenced hot-summer humid continental",
            Self::Dwb => "Dwb - Monsoon-influenced warm-summer humid continental",
            Self::Dwc => "Dwc - Monsoon-influenced subarctic",
            Self::Dwd => "Dwd - Monsoon-influenced extremely cold subarctic",
            Self::Dfa => "Dfa - Hot-summer humid continental",
            Self::Dfb => "Dfb - Warm-summer humid continental",
            Self::Dfc => "Dfc - Subarctic",
            Self::Dfd => "Dfd - Extremely cold subarctic",
            Self::Et => "ET - Tundra",
            Self::Ef => "EF - Ice cap",
        }
    }
}
