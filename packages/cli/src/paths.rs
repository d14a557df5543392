//! Default data locations, relative to the workspace root.

use std::path::{Path, PathBuf};

use tree_manager_koppen::GEOTIFF_FILE_NAME;

/// Overrides the Köppen GeoTIFF location.
pub const KOPPEN_PATH_ENV_VAR: &str = "KOPPEN_GEOTIFF_PATH";

/// Overrides the species catalog location.
pub const CATALOG_PATH_ENV_VAR: &str = "TREE_CATALOG_PATH";

/// Returns the workspace root directory.
///
/// Resolved at compile time from `CARGO_MANIFEST_DIR`; falls back to the
/// working directory if the manifest sits fewer than two levels deep.
#[must_use]
pub fn project_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .ancestors()
        .nth(2)
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
}

/// Returns the `data/` directory path.
#[must_use]
pub fn data_dir() -> PathBuf {
    project_root().join("data")
}

/// Köppen raster path: explicit flag, then env var, then
/// `data/koppen/<file>`.
#[must_use]
pub fn koppen_path(explicit: Option<&Path>) -> PathBuf {
    resolve(explicit, KOPPEN_PATH_ENV_VAR, || {
        data_dir().join("koppen").join(GEOTIFF_FILE_NAME)
    })
}

/// Species catalog path: explicit flag, then env var, then
/// `data/processed/tree_species.json`.
#[must_use]
pub fn catalog_path(explicit: Option<&Path>) -> PathBuf {
    resolve(explicit, CATALOG_PATH_ENV_VAR, || {
        data_dir().join("processed").join("tree_species.json")
    })
}

fn resolve(explicit: Option<&Path>, env_var: &str, default: impl FnOnce() -> PathBuf) -> PathBuf {
    explicit
        .map(Path::to_path_buf)
        .or_else(|| {
            std::env::var(env_var)
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from)
        })
        .unwrap_or_else(default)
}
