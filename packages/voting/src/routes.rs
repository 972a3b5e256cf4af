//! Origin-to-result routes extracted from voted experiment results.
//!
//! A route links the probe that ran a measurement to the first airport
//! matched for its hunter result. Only results with an elected country are
//! routed. Routes can be exported as a `GeoJSON` `FeatureCollection` of
//! line strings or as CSV.

use std::path::{Path, PathBuf};

use anycast_hunter_models::countries::is_eee_member;
use anycast_hunter_models::point::parse_point_text;
use anycast_hunter_models::{ExperimentResult, GeoPoint, HunterResult, INDETERMINATE};
use geojson::{Feature, FeatureCollection, GeoJson, JsonObject};
use serde::Serialize;
use serde_json::Value;

use crate::VotingError;
use crate::batch::{list_experiment_files, read_experiment};

/// A route from an origin probe to the location elected for it.
#[derive(Debug, Clone, PartialEq)]
pub struct HunterRoute {
    /// Id of the origin probe.
    pub origin_id: Value,
    /// Origin probe location.
    pub origin: GeoPoint,
    /// Location of the first matched airport.
    pub result: GeoPoint,
    /// Elected country code.
    pub country: String,
    /// Elected city, if any.
    pub city: Option<String>,
    /// Whether the elected country is outside the EEE.
    pub outside_eee: bool,
}

/// Extracts routes for every hunter result with an elected country.
///
/// Results whose origin probe or first airport has no usable location are
/// skipped with a warning.
#[must_use]
pub fn extract_routes(experiment: &ExperimentResult) -> Vec<HunterRoute> {
    experiment
        .hunter_results
        .iter()
        .filter_map(|result| route_for(experiment, result))
        .collect()
}

/// Resolves the experiment files to read routes from: every `.json` file
/// of a directory, or `input` itself.
///
/// # Errors
///
/// Returns an error if `input` is a directory that cannot be read.
pub fn route_inputs(input: &Path) -> Result<Vec<PathBuf>, VotingError> {
    if input.is_dir() {
        list_experiment_files(input)
    } else {
        Ok(vec![input.to_path_buf()])
    }
}

/// Reads every file and extracts its routes, keeping only routes outside
/// the EEE when `outside_eee_only` is set. Unreadable files are logged and
/// skipped.
#[must_use]
pub fn collect_routes(files: &[PathBuf], outside_eee_only: bool) -> Vec<HunterRoute> {
    let mut routes = Vec::new();
    for file in files {
        match read_experiment(file) {
            Ok(experiment) => routes.extend(extract_routes(&experiment)),
            Err(e) => log::warn!("Skipping {}: {e}", file.display()),
        }
    }

    if outside_eee_only {
        routes.retain(|route| route.outside_eee);
    }

    routes
}

fn route_for(experiment: &ExperimentResult, result: &HunterResult) -> Option<HunterRoute> {
    let location_result = result.location_result.as_ref()?;

    let country = location_result
        .get("country")
        .and_then(Value::as_str)
        .filter(|country| !country.is_empty() && *country != INDETERMINATE)?;

    let Some(result_location) = first_airport_location(location_result) else {
        log::warn!(
            "origin {}: elected {country} but no airport location",
            result.origin_id
        );
        return None;
    };

    let Some(origin) = experiment
        .origin_probe(&result.origin_id)
        .and_then(|probe| probe.location)
    else {
        log::warn!("origin {}: probe location not found", result.origin_id);
        return None;
    };

    let city = location_result
        .get("city")
        .and_then(Value::as_str)
        .filter(|city| !city.is_empty() && *city != INDETERMINATE)
        .map(ToString::to_string);

    Some(HunterRoute {
        origin_id: result.origin_id.clone(),
        origin,
        result: result_location,
        country: country.to_string(),
        city,
        outside_eee: !is_eee_member(country),
    })
}

fn first_airport_location(location_result: &serde_json::Map<String, Value>) -> Option<GeoPoint> {
    let text = location_result
        .get("airports_intersection")?
        .as_array()?
        .first()?
        .get("location")?
        .as_str()?;

    match parse_point_text(text) {
        Ok(point) => point,
        Err(e) => {
            log::warn!("Invalid airport location '{text}': {e}");
            None
        }
    }
}

fn origin_id_text(origin_id: &Value) -> String {
    origin_id
        .as_str()
        .map_or_else(|| origin_id.to_string(), ToString::to_string)
}

/// Builds a `GeoJSON` feature collection with one line string per route.
#[must_use]
pub fn routes_to_geojson(routes: &[HunterRoute]) -> FeatureCollection {
    let features = routes
        .iter()
        .map(|route| {
            let line = geo::LineString::from(vec![
                (route.origin.longitude, route.origin.latitude),
                (route.result.longitude, route.result.latitude),
            ]);

            let mut properties = JsonObject::new();
            properties.insert("origin_id".to_string(), route.origin_id.clone());
            properties.insert("country".to_string(), Value::from(route.country.clone()));
            properties.insert(
                "city".to_string(),
                route.city.clone().map_or(Value::Null, Value::from),
            );
            properties.insert("outside_EEE".to_string(), Value::Bool(route.outside_eee));

            Feature {
                bbox: None,
                geometry: Some(geojson::Geometry::new(geojson::Value::from(&line))),
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

/// Writes routes as a `GeoJSON` file.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn write_routes_geojson(path: &Path, routes: &[HunterRoute]) -> Result<(), VotingError> {
    let geojson = GeoJson::from(routes_to_geojson(routes));
    let json = serde_json::to_string_pretty(&geojson)?;
    std::fs::write(path, json).map_err(|e| VotingError::Io {
        path: path.display().to_string(),
        source: e,
    })
}

#[derive(Serialize)]
struct RouteRow<'a> {
    origin_id: String,
    origin_latitude: f64,
    origin_longitude: f64,
    result_latitude: f64,
    result_longitude: f64,
    country: &'a str,
    city: &'a str,
    #[serde(rename = "outside_EEE")]
    outside_eee: bool,
}

/// Writes routes as CSV, one row per route.
///
/// # Errors
///
/// Returns an error if the file cannot be created or a row cannot be
/// written.
pub fn write_routes_csv(path: &Path, routes: &[HunterRoute]) -> Result<(), VotingError> {
    let mut writer = csv::Writer::from_path(path)?;
    for route in routes {
        writer.serialize(RouteRow {
            origin_id: origin_id_text(&route.origin_id),
            origin_latitude: route.origin.latitude,
            origin_longitude: route.origin.longitude,
            result_latitude: route.result.latitude,
            result_longitude: route.result.longitude,
            country: &route.country,
            city: route.city.as_deref().unwrap_or(INDETERMINATE),
            outside_eee: route.outside_eee,
        })?;
    }
    writer.flush().map_err(|e| VotingError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    Ok(())
}
