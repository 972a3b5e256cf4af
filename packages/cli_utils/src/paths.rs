//! Canonical file paths for reference data and experiment results.
//!
//! Everything lives under a data directory, `data/` in the project root
//! unless `HUNTER_DATA_DIR` points elsewhere.

use std::path::{Path, PathBuf};

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "HUNTER_DATA_DIR";

/// Returns the workspace root directory.
///
/// Resolved at compile time from `CARGO_MANIFEST_DIR`; falls back to the
/// manifest directory itself if it has no grandparent.
#[must_use]
pub fn project_root() -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    manifest_dir
        .ancestors()
        .nth(2)
        .unwrap_or(manifest_dir)
        .to_path_buf()
}

/// Returns the data directory.
#[must_use]
pub fn data_dir() -> PathBuf {
    std::env::var_os(DATA_DIR_ENV).map_or_else(|| project_root().join("data"), PathBuf::from)
}

/// Returns the `resources/` directory holding the static reference tables.
#[must_use]
pub fn resources_dir() -> PathBuf {
    data_dir().join("resources")
}

/// Returns the path of the tab-separated airport table.
#[must_use]
pub fn airports_path() -> PathBuf {
    resources_dir().join("airports.csv")
}

/// Returns the path of the country borders `GeoJSON`.
#[must_use]
pub fn country_borders_path() -> PathBuf {
    resources_dir().join("countries.geojson")
}

/// Returns the path of the ISO code to country name table.
#[must_use]
pub fn country_codes_path() -> PathBuf {
    resources_dir().join("country_codes.json")
}

/// Returns the replication package directory holding experiment results.
#[must_use]
pub fn replication_package_dir() -> PathBuf {
    data_dir().join("replication_package")
}

/// Returns the directory of first-IP experiment results (voting input).
#[must_use]
pub fn first_ip_results_dir() -> PathBuf {
    replication_package_dir().join("experiment_results_first_ip")
}

/// Returns the directory for voted experiment results (voting output).
#[must_use]
pub fn voting_results_dir() -> PathBuf {
    replication_package_dir().join("experiment_results_voting")
}

/// Returns the `generated/` directory for maps and exports.
#[must_use]
pub fn generated_dir() -> PathBuf {
    data_dir().join("generated")
}

/// Ensures a directory exists, creating it if necessary.
///
/// # Errors
///
/// Returns an I/O error if the directory cannot be created.
pub fn ensure_dir(path: &Path) -> std::io::Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}
