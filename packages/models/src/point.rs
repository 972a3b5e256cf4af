//! Geographic point value type and its `GeoJSON` text encoding.
//!
//! Experiment results embed locations as `GeoJSON` point text inside JSON
//! string fields (e.g. `"{\"type\":\"Point\",\"coordinates\":[2.0,41.0]}"`).
//! An empty string or an empty coordinate array means "unknown location".

use serde::{Deserialize, Deserializer, Serializer};
use serde_json::Value;

/// A longitude/latitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub longitude: f64,
    pub latitude: f64,
}

impl GeoPoint {
    #[must_use]
    pub const fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            longitude,
            latitude,
        }
    }
}

impl From<GeoPoint> for geo::Point<f64> {
    fn from(point: GeoPoint) -> Self {
        Self::new(point.longitude, point.latitude)
    }
}

impl From<geo::Point<f64>> for GeoPoint {
    fn from(point: geo::Point<f64>) -> Self {
        Self::new(point.x(), point.y())
    }
}

/// Errors from decoding `GeoJSON` point text.
#[derive(Debug, thiserror::Error)]
pub enum PointParseError {
    /// The text is not valid JSON.
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The JSON is not a valid `GeoJSON` geometry.
    #[error("Invalid GeoJSON: {0}")]
    GeoJson(#[from] geojson::Error),

    /// The geometry is valid but not a point.
    #[error("Expected a Point geometry, found '{0}'")]
    NotAPoint(String),
}

/// Decodes `GeoJSON` point text.
///
/// Returns `Ok(None)` for an empty string or an empty point.
///
/// # Errors
///
/// Returns an error if the text is not a `GeoJSON` point.
pub fn parse_point_text(text: &str) -> Result<Option<GeoPoint>, PointParseError> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }

    let value: Value = serde_json::from_str(text)?;

    let kind = value
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    if kind != "Point" {
        return Err(PointParseError::NotAPoint(kind));
    }

    if value
        .get("coordinates")
        .and_then(Value::as_array)
        .is_some_and(Vec::is_empty)
    {
        return Ok(None);
    }

    let geometry = geojson::Geometry::from_json_value(value)?;
    match geo::Geometry::<f64>::try_from(geometry)? {
        geo::Geometry::Point(point) => Ok(Some(point.into())),
        _ => Err(PointParseError::NotAPoint(kind)),
    }
}

/// Encodes a point as `GeoJSON` text. `None` encodes as an empty point.
#[must_use]
pub fn point_to_text(point: Option<&GeoPoint>) -> String {
    let coordinates = point.map_or_else(Vec::new, |p| vec![p.longitude, p.latitude]);
    // Keys in `GeoJSON` order; a `serde_json` map would sort them.
    format!(
        r#"{{"type":"Point","coordinates":{}}}"#,
        Value::from(coordinates)
    )
}

/// Serde adapter for a required point stored as `GeoJSON` text.
pub mod text {
    use super::{Deserialize, Deserializer, GeoPoint, Serializer, parse_point_text, point_to_text};

    /// # Errors
    ///
    /// Propagates serializer errors.
    pub fn serialize<S: Serializer>(point: &GeoPoint, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&point_to_text(Some(point)))
    }

    /// # Errors
    ///
    /// Fails if the text is not a non-empty `GeoJSON` point.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<GeoPoint, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_point_text(&raw)
            .map_err(serde::de::Error::custom)?
            .ok_or_else(|| serde::de::Error::custom("empty point where a location is required"))
    }
}

/// Serde adapter for an optional point stored as `GeoJSON` text.
///
/// Accepts `null` and empty text as `None`. `None` serializes as an empty
/// string.
pub mod optional_text {
    use super::{Deserialize, Deserializer, GeoPoint, Serializer, parse_point_text, point_to_text};

    /// # Errors
    ///
    /// Propagates serializer errors.
    #[allow(clippy::ref_option)]
    pub fn serialize<S: Serializer>(
        point: &Option<GeoPoint>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match point {
            Some(point) => serializer.serialize_str(&point_to_text(Some(point))),
            None => serializer.serialize_str(""),
        }
    }

    /// # Errors
    ///
    /// Fails if the text is present but not a `GeoJSON` point.
    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<GeoPoint>, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        match raw {
            Some(raw) => parse_point_text(&raw).map_err(serde::de::Error::custom),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_point_text() {
        let point = parse_point_text(r#"{"type": "Point", "coordinates": [-3.8, 40.5]}"#)
            .unwrap()
            .unwrap();
        assert!((point.longitude - -3.8).abs() < f64::EPSILON);
        assert!((point.latitude - 40.5).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_text_is_unknown() {
        assert_eq!(parse_point_text("").unwrap(), None);
        assert_eq!(parse_point_text("   ").unwrap(), None);
        assert_eq!(
            parse_point_text(r#"{"type":"Point","coordinates":[]}"#).unwrap(),
            None
        );
    }

    #[test]
    fn rejects_non_point_geometry() {
        let err = parse_point_text(r#"{"type":"LineString","coordinates":[[0,0],[1,1]]}"#)
            .unwrap_err();
        assert!(matches!(err, PointParseError::NotAPoint(kind) if kind == "LineString"));
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_point_text("POINT (1 2)").is_err());
    }

    #[test]
    fn empty_point_text_round_trips_to_none() {
        let text = point_to_text(None);
        assert_eq!(text, r#"{"type":"Point","coordinates":[]}"#);
        assert_eq!(parse_point_text(&text).unwrap(), None);
    }

    #[test]
    fn converts_to_geo_point() {
        let point: geo::Point<f64> = GeoPoint::new(1.5, -2.5).into();
        assert!((point.x() - 1.5).abs() < f64::EPSILON);
        assert!((point.y() - -2.5).abs() < f64::EPSILON);
    }
}
