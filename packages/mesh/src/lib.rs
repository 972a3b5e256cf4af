#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Probe placement mesh generation.
//!
//! A bounding box is tiled into square cells of a fixed spacing (in
//! degrees), and only cells intersecting the borders of the configured
//! countries are kept. Each kept cell is a target area for
//! `probes_per_section` measurement probes.

pub mod borders;
pub mod countries;

use std::path::Path;

use anycast_hunter_models::{BoundingBox, MeshDefinition};
use geo::{Polygon, Rect, coord};
use geojson::{Feature, FeatureCollection, JsonObject};

pub use borders::{BorderIndex, CountryBorder, load_borders};
pub use countries::CountryCodeTable;

/// Errors that can occur while building a mesh.
#[derive(Debug, thiserror::Error)]
pub enum MeshError {
    /// A country filter code has no entry in the code table.
    #[error("Unknown country code: {0}")]
    UnknownCountryCode(String),

    /// Cell spacing must be a positive finite number of degrees.
    #[error("Invalid mesh spacing: {0}")]
    InvalidSpacing(f64),

    /// Bounding box coordinates must be finite.
    #[error("Invalid mesh bounds: {0:?}")]
    InvalidBounds(BoundingBox),

    /// An input file is missing expected structure.
    #[error("Malformed input file {path}: {message}")]
    MalformedInputFile {
        /// Path of the offending file.
        path: String,
        /// What was wrong with it.
        message: String,
    },

    /// I/O error reading or writing files.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path that caused the error.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// JSON serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// `GeoJSON` parsing failed.
    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),
}

/// One square cell of the mesh.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshCell {
    /// Cell extent in degrees.
    pub rect: Rect<f64>,
}

impl MeshCell {
    /// Cell with its minimum corner at (`x`, `y`) and side `spacing`.
    #[must_use]
    pub fn new(x: f64, y: f64, spacing: f64) -> Self {
        Self {
            rect: Rect::new(coord! { x: x, y: y }, coord! { x: x + spacing, y: y + spacing }),
        }
    }

    #[must_use]
    pub fn polygon(&self) -> Polygon<f64> {
        self.rect.to_polygon()
    }
}

/// Tiles `bounds` into cells of side `spacing`.
///
/// Tiling starts at the minimum corner and advances while the cell origin
/// does not exceed the maximum, so the last row and column may extend up
/// to one cell past the box.
///
/// # Errors
///
/// Returns an error if `spacing` is not positive or the bounds are not
/// finite.
pub fn tile(bounds: &BoundingBox, spacing: f64) -> Result<Vec<MeshCell>, MeshError> {
    if !spacing.is_finite() || spacing <= 0.0 {
        return Err(MeshError::InvalidSpacing(spacing));
    }
    if ![
        bounds.longitude_min,
        bounds.latitude_min,
        bounds.longitude_max,
        bounds.latitude_max,
    ]
    .iter()
    .all(|v| v.is_finite())
    {
        return Err(MeshError::InvalidBounds(*bounds));
    }

    let x_min = bounds.longitude_min.min(bounds.longitude_max);
    let x_max = bounds.longitude_min.max(bounds.longitude_max);
    let y_min = bounds.latitude_min.min(bounds.latitude_max);
    let y_max = bounds.latitude_min.max(bounds.latitude_max);

    let mut cells = Vec::new();
    let mut y = y_min;
    while y <= y_max {
        let mut x = x_min;
        while x <= x_max {
            cells.push(MeshCell::new(x, y, spacing));
            x += spacing;
        }
        y += spacing;
    }

    Ok(cells)
}

/// Generates the mesh cells of `bounds` that intersect the borders of the
/// countries in `country_filter`, or of every country when it is empty.
///
/// # Errors
///
/// Returns [`MeshError::UnknownCountryCode`] if a filter code is not in
/// `codes`, and tiling errors from [`tile`].
pub fn generate_mesh(
    bounds: &BoundingBox,
    spacing: f64,
    country_filter: &[String],
    borders: &[CountryBorder],
    codes: &CountryCodeTable,
) -> Result<Vec<MeshCell>, MeshError> {
    let index = if country_filter.is_empty() {
        BorderIndex::new(borders)
    } else {
        let names = codes.names_for(country_filter)?;
        BorderIndex::new(borders.iter().filter(|border| names.contains(&border.name)))
    };

    if index.is_empty() {
        log::warn!("No country borders match the filter {country_filter:?}");
    }

    let cells = tile(bounds, spacing)?;
    let total = cells.len();

    let kept: Vec<MeshCell> = cells
        .into_iter()
        .filter(|cell| index.intersects(&cell.polygon()))
        .collect();

    log::info!(
        "Mesh: kept {} of {total} cells ({} borders, spacing {spacing})",
        kept.len(),
        index.len()
    );

    Ok(kept)
}

/// A generated probe placement mesh.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    /// Probes to request per cell.
    pub probes_per_section: u32,
    /// ISO codes the mesh was filtered by. Empty for all countries.
    pub country_codes: Vec<String>,
    /// Cells intersecting the filtered borders.
    pub cells: Vec<MeshCell>,
}

impl Mesh {
    /// Builds the mesh described by a definition.
    ///
    /// # Errors
    ///
    /// Propagates errors from [`generate_mesh`].
    pub fn from_definition(
        definition: &MeshDefinition,
        borders: &[CountryBorder],
        codes: &CountryCodeTable,
    ) -> Result<Self, MeshError> {
        let cells = generate_mesh(
            &definition.bounds(),
            definition.spacing,
            &definition.countries,
            borders,
            codes,
        )?;

        Ok(Self {
            probes_per_section: definition.probes_per_section,
            country_codes: definition.countries.clone(),
            cells,
        })
    }

    /// Total probes requested across all cells.
    #[must_use]
    pub fn probe_count(&self) -> u64 {
        self.cells.len() as u64 * u64::from(self.probes_per_section)
    }

    /// Cells as a `GeoJSON` feature collection of polygons.
    #[must_use]
    pub fn to_geojson(&self) -> FeatureCollection {
        let features = self
            .cells
            .iter()
            .enumerate()
            .map(|(i, cell)| {
                let mut properties = JsonObject::new();
                properties.insert("section".to_string(), serde_json::Value::from(i));
                properties.insert(
                    "probes".to_string(),
                    serde_json::Value::from(self.probes_per_section),
                );

                Feature {
                    bbox: None,
                    geometry: Some(geojson::Geometry::new(geojson::Value::from(&cell.polygon()))),
                    id: None,
                    properties: Some(properties),
                    foreign_members: None,
                }
            })
            .collect();

        FeatureCollection {
            bbox: None,
            features,
            foreign_members: None,
        }
    }
}

/// Reads a mesh definition file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or does not match the mesh
/// definition structure.
pub fn load_mesh_definition(path: &Path) -> Result<MeshDefinition, MeshError> {
    let raw = std::fs::read_to_string(path).map_err(|e| MeshError::Io {
        path: path.display().to_string(),
        source: e,
    })?;

    serde_json::from_str(&raw).map_err(|e| MeshError::MalformedInputFile {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

/// Writes the mesh cells as a `GeoJSON` file.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn write_mesh_geojson(path: &Path, mesh: &Mesh) -> Result<(), MeshError> {
    let geojson = geojson::GeoJson::from(mesh.to_geojson());
    let json = serde_json::to_string_pretty(&geojson)?;
    std::fs::write(path, json).map_err(|e| MeshError::Io {
        path: path.display().to_string(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::MultiPolygon;

    fn square(name: &str, x0: f64, y0: f64, x1: f64, y1: f64) -> CountryBorder {
        let polygon = Rect::new(coord! { x: x0, y: y0 }, coord! { x: x1, y: y1 }).to_polygon();
        CountryBorder::new(name, MultiPolygon::new(vec![polygon]))
    }

    fn bounds(x0: f64, y0: f64, x1: f64, y1: f64) -> BoundingBox {
        BoundingBox {
            longitude_min: x0,
            latitude_min: y0,
            longitude_max: x1,
            latitude_max: y1,
        }
    }

    fn codes() -> CountryCodeTable {
        CountryCodeTable::from_pairs([("ES", "Spain"), ("PT", "Portugal"), ("FR", "France")])
    }

    fn borders() -> Vec<CountryBorder> {
        vec![
            square("Spain", -9.0, 36.0, 3.0, 43.5),
            square("Portugal", -9.5, 37.0, -6.2, 42.0),
            square("France", -4.5, 43.6, 7.5, 51.0),
        ]
    }

    #[test]
    fn tiles_with_upper_slack() {
        let cells = tile(&bounds(0.0, 0.0, 2.0, 1.0), 1.0).unwrap();
        // x in {0, 1, 2}, y in {0, 1}
        assert_eq!(cells.len(), 6);
        assert_eq!(cells[0], MeshCell::new(0.0, 0.0, 1.0));
        assert_eq!(cells[5], MeshCell::new(2.0, 1.0, 1.0));
    }

    #[test]
    fn tiles_within_bounds_plus_one_cell() {
        let b = bounds(-10.0, 35.0, 5.0, 45.0);
        let spacing = 0.7;
        for cell in tile(&b, spacing).unwrap() {
            assert!(cell.rect.min().x >= b.longitude_min);
            assert!(cell.rect.min().y >= b.latitude_min);
            assert!(cell.rect.max().x <= b.longitude_max + spacing + 1e-9);
            assert!(cell.rect.max().y <= b.latitude_max + spacing + 1e-9);
        }
    }

    #[test]
    fn invalid_spacing_is_rejected() {
        for spacing in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                tile(&BoundingBox::WORLDWIDE, spacing),
                Err(MeshError::InvalidSpacing(_))
            ));
        }
    }

    #[test]
    fn invalid_bounds_are_rejected() {
        assert!(matches!(
            tile(&bounds(f64::NAN, 0.0, 1.0, 1.0), 1.0),
            Err(MeshError::InvalidBounds(_))
        ));
    }

    #[test]
    fn keeps_only_cells_touching_filtered_borders() {
        let cells = generate_mesh(
            &bounds(-12.0, 34.0, 10.0, 52.0),
            2.0,
            &["PT".to_string()],
            &borders(),
            &codes(),
        )
        .unwrap();

        assert!(!cells.is_empty());
        let portugal = square("Portugal", -9.5, 37.0, -6.2, 42.0);
        let index = BorderIndex::new([&portugal]);
        for cell in &cells {
            assert!(index.intersects(&cell.polygon()), "{cell:?} outside Portugal");
        }
    }

    #[test]
    fn empty_filter_uses_every_border() {
        let b = bounds(-12.0, 34.0, 10.0, 52.0);
        let all = generate_mesh(&b, 2.0, &[], &borders(), &codes()).unwrap();
        let spain = generate_mesh(&b, 2.0, &["ES".to_string()], &borders(), &codes()).unwrap();
        let france = generate_mesh(&b, 2.0, &["FR".to_string()], &borders(), &codes()).unwrap();

        assert!(all.len() >= spain.len());
        assert!(all.len() >= france.len());
        for cell in spain.iter().chain(&france) {
            assert!(all.contains(cell));
        }
    }

    #[test]
    fn unknown_filter_code_fails() {
        let err = generate_mesh(
            &BoundingBox::WORLDWIDE,
            10.0,
            &["XX".to_string()],
            &borders(),
            &codes(),
        )
        .unwrap_err();
        assert!(matches!(err, MeshError::UnknownCountryCode(code) if code == "XX"));
    }

    #[test]
    fn mesh_from_definition_counts_probes() {
        let definition: MeshDefinition = serde_json::from_str(
            r#"{
                "probes_per_section": 3,
                "spacing": 1.0,
                "limit_area": {"longitude_min": -9.5, "latitude_min": 37.0, "longitude_max": -7.0, "latitude_max": 39.0},
                "countries": ["PT"]
            }"#,
        )
        .unwrap();

        let mesh = Mesh::from_definition(&definition, &borders(), &codes()).unwrap();

        // x in {-9.5, -8.5, -7.5}, y in {37, 38, 39}; all touch Portugal.
        assert_eq!(mesh.cells.len(), 9);
        assert_eq!(mesh.probe_count(), 27);
        assert_eq!(mesh.to_geojson().features.len(), 9);
    }

    #[test]
    fn loads_definition_file() {
        let dir = std::env::temp_dir().join("anycast_hunter_mesh_definition");
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("mesh.json");
        std::fs::write(&path, r#"{"probes_per_section": 2, "spacing": 5, "countries": ["ES"]}"#)
            .unwrap();

        let definition = load_mesh_definition(&path).unwrap();
        assert_eq!(definition.probes_per_section, 2);
        assert_eq!(definition.bounds(), BoundingBox::WORLDWIDE);
        assert_eq!(definition.countries, ["ES"]);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
