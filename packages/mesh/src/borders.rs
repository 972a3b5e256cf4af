//! Country border polygons and their spatial index.
//!
//! Borders come from a `GeoJSON` `FeatureCollection` whose features carry
//! the country display name in the `CNTRY_NAME` property. Each border is
//! repaired on load by a boolean union with the empty geometry, which
//! resolves self-intersecting and overlapping rings the same way a
//! zero-width buffer does.

use std::path::Path;

use geo::{BooleanOps, BoundingRect, Intersects, MultiPolygon, Polygon};
use geojson::GeoJson;
use rstar::{AABB, RTree, RTreeObject};

use crate::MeshError;

/// Property holding the country display name.
pub const COUNTRY_NAME_PROPERTY: &str = "CNTRY_NAME";

/// A single country's border geometry.
#[derive(Debug, Clone)]
pub struct CountryBorder {
    /// Country display name.
    pub name: String,
    /// Repaired border geometry.
    pub geometry: MultiPolygon<f64>,
}

impl CountryBorder {
    /// Creates a border, repairing the geometry.
    #[must_use]
    pub fn new(name: impl Into<String>, geometry: MultiPolygon<f64>) -> Self {
        Self {
            name: name.into(),
            geometry: repair(&geometry),
        }
    }
}

/// Normalizes ring orientation and resolves self-intersections.
fn repair(geometry: &MultiPolygon<f64>) -> MultiPolygon<f64> {
    geometry.union(&MultiPolygon::new(Vec::new()))
}

/// Loads every border from a `GeoJSON` feature collection.
///
/// Features without a name or without a polygonal geometry are skipped.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not a `GeoJSON`
/// feature collection.
pub fn load_borders(path: &Path) -> Result<Vec<CountryBorder>, MeshError> {
    let raw = std::fs::read_to_string(path).map_err(|e| MeshError::Io {
        path: path.display().to_string(),
        source: e,
    })?;

    let borders = parse_borders(&raw).map_err(|e| match e {
        MeshError::GeoJson(source) => MeshError::MalformedInputFile {
            path: path.display().to_string(),
            message: source.to_string(),
        },
        other => other,
    })?;

    log::info!("Loaded {} country borders from {}", borders.len(), path.display());
    Ok(borders)
}

/// Parses borders from `GeoJSON` text.
///
/// # Errors
///
/// Returns an error if the text is not a `GeoJSON` feature collection.
pub fn parse_borders(raw: &str) -> Result<Vec<CountryBorder>, MeshError> {
    let GeoJson::FeatureCollection(collection) = raw.parse::<GeoJson>()? else {
        return Err(MeshError::MalformedInputFile {
            path: "<borders>".to_string(),
            message: "expected a FeatureCollection".to_string(),
        });
    };

    let mut borders = Vec::with_capacity(collection.features.len());
    for feature in collection.features {
        let Some(name) = feature
            .properties
            .as_ref()
            .and_then(|props| props.get(COUNTRY_NAME_PROPERTY))
            .and_then(serde_json::Value::as_str)
            .map(ToString::to_string)
        else {
            log::trace!("skipping border feature without {COUNTRY_NAME_PROPERTY}");
            continue;
        };

        let Some(geometry) = feature.geometry else {
            log::trace!("skipping border feature {name} without geometry");
            continue;
        };

        let polygons = match geo::Geometry::<f64>::try_from(geometry) {
            Ok(geo::Geometry::MultiPolygon(mp)) => mp,
            Ok(geo::Geometry::Polygon(p)) => MultiPolygon::new(vec![p]),
            Ok(_) => {
                log::warn!("Border for {name} is not polygonal, skipping");
                continue;
            }
            Err(e) => {
                log::warn!("Failed to convert border for {name}: {e}");
                continue;
            }
        };

        borders.push(CountryBorder::new(name, polygons));
    }

    Ok(borders)
}

/// A border stored in the R-tree with its envelope.
struct BorderEntry {
    envelope: AABB<[f64; 2]>,
    geometry: MultiPolygon<f64>,
}

impl RTreeObject for BorderEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// R-tree over border geometries for fast intersection tests.
pub struct BorderIndex {
    tree: RTree<BorderEntry>,
}

impl BorderIndex {
    /// Builds the index. Borders with empty geometry are left out.
    #[must_use]
    pub fn new<'a>(borders: impl IntoIterator<Item = &'a CountryBorder>) -> Self {
        let entries = borders
            .into_iter()
            .filter_map(|border| {
                let rect = border.geometry.bounding_rect()?;
                Some(BorderEntry {
                    envelope: AABB::from_corners(
                        [rect.min().x, rect.min().y],
                        [rect.max().x, rect.max().y],
                    ),
                    geometry: border.geometry.clone(),
                })
            })
            .collect();

        Self {
            tree: RTree::bulk_load(entries),
        }
    }

    /// Number of indexed borders.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Returns `true` if `polygon` intersects any indexed border.
    #[must_use]
    pub fn intersects(&self, polygon: &Polygon<f64>) -> bool {
        let Some(rect) = polygon.bounding_rect() else {
            return false;
        };
        let query = AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]);

        self.tree
            .locate_in_envelope_intersecting(&query)
            .any(|entry| polygon.intersects(&entry.geometry))
    }
}
