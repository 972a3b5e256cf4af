#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Shared types for the anycast hunter analysis toolchain.
//!
//! These types mirror the persisted experiment-result JSON produced by the
//! traceroute hunting campaigns, the airport reference table, and the mesh
//! definition files used to place probes. Fields the toolchain does not
//! interpret are carried through untouched in `extra` maps so a record can
//! be read, enriched, and written back without losing data.

pub mod countries;
pub mod point;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub use point::{GeoPoint, PointParseError};

/// Sentinel written in place of an elected value when no majority exists.
pub const INDETERMINATE: &str = "Indeterminate";

/// A reference airport loaded from the airport table.
///
/// Serializes with `location` as `GeoJSON` point text, matching the
/// `airports_intersection` entries stored in voted experiment results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Airport {
    /// IATA code, unique within the reference table (e.g. "MAD").
    pub iata_code: String,
    /// Size category as given by the reference table.
    pub size: String,
    /// Display name.
    pub name: String,
    /// Airport location.
    #[serde(with = "point::text")]
    pub location: GeoPoint,
    /// ISO 3166-1 alpha-2 country code.
    pub country_code: String,
    /// City served by the airport.
    pub city_name: String,
}

/// A hop inferred as a possible true origin of traffic towards a target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateSourceIp {
    /// IP address as recorded by the hunter.
    pub ip: String,
    /// Geolocation of the IP, `None` when unknown.
    #[serde(with = "point::optional_text", default)]
    pub location: Option<GeoPoint>,
    /// Remaining fields, passed through unchanged.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CandidateSourceIp {
    /// Returns `true` if the recorded IP parses as an IPv4 or IPv6 address.
    #[must_use]
    pub fn has_valid_ip(&self) -> bool {
        self.ip.trim().parse::<std::net::IpAddr>().is_ok()
    }
}

/// One experiment-result document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentResult {
    /// Per-probe hunter results.
    pub hunter_results: Vec<HunterResult>,
    /// Measurement metadata, including the origin probes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub measurements: Option<Measurements>,
    /// Remaining top-level fields, passed through unchanged.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ExperimentResult {
    /// Finds the origin probe with the given id.
    #[must_use]
    pub fn origin_probe(&self, probe_id: &Value) -> Option<&ProbeRecord> {
        self.measurements
            .as_ref()?
            .origin
            .iter()
            .find(|probe| &probe.probe_id == probe_id)
    }
}

/// A single probe's hunter result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HunterResult {
    /// Candidate source IPs, in hop order. Kept raw and decoded with
    /// [`HunterResult::candidates`] only when the record is voted.
    pub ips_previous_to_target: Vec<Value>,
    /// Id of the origin probe that ran the measurement.
    pub origin_id: Value,
    /// Location inference for this result. Kept as a raw object because
    /// upstream tooling owns most of its fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_result: Option<Map<String, Value>>,
    /// Remaining fields, passed through unchanged.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl HunterResult {
    /// Decodes the candidate source IPs.
    ///
    /// # Errors
    ///
    /// Returns an error if a candidate is not a valid candidate record.
    pub fn candidates(&self) -> Result<Vec<CandidateSourceIp>, serde_json::Error> {
        self.ips_previous_to_target
            .iter()
            .map(CandidateSourceIp::deserialize)
            .collect()
    }
}

/// The `measurements` block of an experiment result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurements {
    /// Probes that originated the measurements.
    #[serde(default)]
    pub origin: Vec<ProbeRecord>,
    /// Remaining fields, passed through unchanged.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// An origin probe record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeRecord {
    /// Probe id, compared against [`HunterResult::origin_id`].
    pub probe_id: Value,
    /// Probe location.
    #[serde(with = "point::optional_text", default)]
    pub location: Option<GeoPoint>,
    /// Remaining fields, passed through unchanged.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Outcome of a single majority election.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Elected {
    /// A value won a strict majority.
    Value(String),
    /// No value won a strict majority.
    Indeterminate,
}

impl Elected {
    /// Returns the elected value, or [`INDETERMINATE`].
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Value(value) => value,
            Self::Indeterminate => INDETERMINATE,
        }
    }

    #[must_use]
    pub const fn is_indeterminate(&self) -> bool {
        matches!(self, Self::Indeterminate)
    }
}

impl From<String> for Elected {
    fn from(value: String) -> Self {
        if value == INDETERMINATE {
            Self::Indeterminate
        } else {
            Self::Value(value)
        }
    }
}

impl From<Elected> for String {
    fn from(value: Elected) -> Self {
        match value {
            Elected::Value(value) => value,
            Elected::Indeterminate => INDETERMINATE.to_string(),
        }
    }
}

impl std::fmt::Display for Elected {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output of the location vote for one hunter result.
///
/// The three sequences are parallel: entry `i` of each belongs to the
/// `i`-th candidate source IP.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationVoteResult {
    /// Nearest airport of each candidate, duplicates included.
    pub airports_intersection: Vec<Airport>,
    /// Country code of each matched airport.
    pub airports_countries: Vec<String>,
    /// City name of each matched airport.
    pub airports_cities: Vec<String>,
    /// Elected country code.
    pub country: Elected,
    /// Elected city name.
    pub city: Elected,
}

impl LocationVoteResult {
    /// Returns `true` when both the country and the city were elected.
    #[must_use]
    pub const fn is_conclusive(&self) -> bool {
        !self.country.is_indeterminate() && !self.city.is_indeterminate()
    }

    /// Returns a copy of `location_result` with the vote merged in.
    ///
    /// When the vote is not conclusive, `centroid` is cleared and
    /// `nearest_airport` is set to `false`. Otherwise both are left as they
    /// were for downstream tooling to fill.
    ///
    /// # Errors
    ///
    /// Returns an error if a field cannot be converted to JSON.
    pub fn merged_into(
        &self,
        location_result: &Map<String, Value>,
    ) -> Result<Map<String, Value>, serde_json::Error> {
        let mut merged = location_result.clone();

        merged.insert(
            "airports_intersection".to_string(),
            serde_json::to_value(&self.airports_intersection)?,
        );
        merged.insert(
            "airports_countries".to_string(),
            serde_json::to_value(&self.airports_countries)?,
        );
        merged.insert(
            "airports_cities".to_string(),
            serde_json::to_value(&self.airports_cities)?,
        );
        merged.insert("country".to_string(), Value::String(self.country.to_string()));
        merged.insert("city".to_string(), Value::String(self.city.to_string()));

        if !self.is_conclusive() {
            merged.insert("centroid".to_string(), Value::String(String::new()));
            merged.insert("nearest_airport".to_string(), Value::Bool(false));
        }

        Ok(merged)
    }
}

/// A longitude/latitude box in degrees.
///
/// Field names match the `limit_area` object of a mesh definition.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub longitude_min: f64,
    pub latitude_min: f64,
    pub longitude_max: f64,
    pub latitude_max: f64,
}

impl BoundingBox {
    /// The whole globe.
    pub const WORLDWIDE: Self = Self {
        longitude_min: -180.0,
        latitude_min: -90.0,
        longitude_max: 180.0,
        latitude_max: 90.0,
    };
}

/// A mesh definition file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeshDefinition {
    /// Probes to request per mesh cell.
    pub probes_per_section: u32,
    /// Cell side length in degrees.
    pub spacing: f64,
    /// Area to tile. Worldwide when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit_area: Option<BoundingBox>,
    /// ISO alpha-2 codes of the countries to keep. All countries when empty.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub countries: Vec<String>,
}

impl MeshDefinition {
    /// Returns the configured limit area, or [`BoundingBox::WORLDWIDE`].
    #[must_use]
    pub fn bounds(&self) -> BoundingBox {
        self.limit_area.unwrap_or(BoundingBox::WORLDWIDE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn madrid() -> Airport {
        Airport {
            iata_code: "MAD".to_string(),
            size: "large".to_string(),
            name: "Adolfo Suarez Madrid-Barajas".to_string(),
            location: GeoPoint::new(-3.7, 40.4),
            country_code: "ES".to_string(),
            city_name: "Madrid".to_string(),
        }
    }

    #[test]
    fn elected_serializes_as_plain_string() {
        assert_eq!(
            serde_json::to_value(Elected::Value("ES".to_string())).unwrap(),
            Value::String("ES".to_string())
        );
        assert_eq!(
            serde_json::to_value(Elected::Indeterminate).unwrap(),
            Value::String(INDETERMINATE.to_string())
        );
        let parsed: Elected = serde_json::from_str("\"Indeterminate\"").unwrap();
        assert!(parsed.is_indeterminate());
    }

    #[test]
    fn airport_location_is_geojson_text() {
        let value = serde_json::to_value(madrid()).unwrap();
        let location = value["location"].as_str().unwrap();
        assert_eq!(location, r#"{"type":"Point","coordinates":[-3.7,40.4]}"#);
    }

    #[test]
    fn inconclusive_vote_clears_centroid() {
        let vote = LocationVoteResult {
            airports_intersection: vec![madrid()],
            airports_countries: vec!["ES".to_string()],
            airports_cities: vec!["Madrid".to_string()],
            country: Elected::Value("ES".to_string()),
            city: Elected::Indeterminate,
        };
        let mut existing = Map::new();
        existing.insert("centroid".to_string(), Value::String("x".to_string()));
        existing.insert("nearest_airport".to_string(), Value::Bool(true));
        existing.insert("untouched".to_string(), Value::from(7));

        let merged = vote.merged_into(&existing).unwrap();

        assert_eq!(merged["centroid"], Value::String(String::new()));
        assert_eq!(merged["nearest_airport"], Value::Bool(false));
        assert_eq!(merged["country"], Value::String("ES".to_string()));
        assert_eq!(merged["city"], Value::String(INDETERMINATE.to_string()));
        assert_eq!(merged["untouched"], Value::from(7));
        assert_eq!(existing["nearest_airport"], Value::Bool(true));
    }

    #[test]
    fn conclusive_vote_keeps_centroid() {
        let vote = LocationVoteResult {
            airports_intersection: vec![madrid()],
            airports_countries: vec!["ES".to_string()],
            airports_cities: vec!["Madrid".to_string()],
            country: Elected::Value("ES".to_string()),
            city: Elected::Value("Madrid".to_string()),
        };
        let mut existing = Map::new();
        existing.insert("nearest_airport".to_string(), Value::Bool(true));

        let merged = vote.merged_into(&existing).unwrap();

        assert_eq!(merged["nearest_airport"], Value::Bool(true));
        assert!(!merged.contains_key("centroid"));
    }

    #[test]
    fn experiment_result_keeps_unknown_fields() {
        let raw = r#"{
            "hunter_results": [{
                "ips_previous_to_target": [
                    {"ip": "192.0.2.1", "location": "{\"type\":\"Point\",\"coordinates\":[2.0,41.0]}"},
                    {"ip": "192.0.2.2", "location": ""}
                ],
                "origin_id": 42,
                "location_result": {"centroid": ""},
                "target": "198.51.100.7"
            }],
            "measurements": {"origin": [{"probe_id": 42, "location": "{\"type\":\"Point\",\"coordinates\":[1.0,2.0]}"}]},
            "experiment_id": "abc"
        }"#;

        let parsed: ExperimentResult = serde_json::from_str(raw).unwrap();
        let result = &parsed.hunter_results[0];
        let candidates = result.candidates().unwrap();

        assert_eq!(candidates[0].location, Some(GeoPoint::new(2.0, 41.0)));
        assert_eq!(candidates[1].location, None);
        assert_eq!(result.extra["target"], Value::from("198.51.100.7"));
        assert_eq!(parsed.extra["experiment_id"], Value::from("abc"));

        let probe = parsed.origin_probe(&Value::from(42)).unwrap();
        assert_eq!(probe.location, Some(GeoPoint::new(1.0, 2.0)));
    }

    #[test]
    fn unvoted_records_parse_without_location_result() {
        let raw = r#"{"hunter_results": [
            {"ips_previous_to_target": [], "origin_id": 1},
            {"ips_previous_to_target": [{"ip": null}], "origin_id": 2}
        ]}"#;

        let parsed: ExperimentResult = serde_json::from_str(raw).unwrap();

        assert_eq!(parsed.hunter_results[0].location_result, None);
        assert!(parsed.hunter_results[1].candidates().is_err());

        let written = serde_json::to_value(&parsed).unwrap();
        assert_eq!(
            written["hunter_results"][0],
            serde_json::json!({"ips_previous_to_target": [], "origin_id": 1})
        );
        assert_eq!(
            written["hunter_results"][1]["ips_previous_to_target"][0]["ip"],
            Value::Null
        );
    }

    #[test]
    fn merge_keeps_existing_key_order() {
        let vote = LocationVoteResult {
            airports_intersection: Vec::new(),
            airports_countries: vec!["ES".to_string()],
            airports_cities: vec!["Madrid".to_string()],
            country: Elected::Indeterminate,
            city: Elected::Indeterminate,
        };
        let existing: Map<String, Value> =
            serde_json::from_str(r#"{"nearest_airport": true, "centroid": "x", "country": "ES"}"#)
                .unwrap();

        let merged = vote.merged_into(&existing).unwrap();
        let keys: Vec<&str> = merged.keys().map(String::as_str).collect();

        assert_eq!(
            keys,
            [
                "nearest_airport",
                "centroid",
                "country",
                "airports_intersection",
                "airports_countries",
                "airports_cities",
                "city",
            ]
        );
    }

    #[test]
    fn candidate_ip_validation() {
        let valid = CandidateSourceIp {
            ip: "2001:db8::1".to_string(),
            location: None,
            extra: Map::new(),
        };
        let invalid = CandidateSourceIp {
            ip: "not-an-ip".to_string(),
            location: None,
            extra: Map::new(),
        };
        assert!(valid.has_valid_ip());
        assert!(!invalid.has_valid_ip());
    }

    #[test]
    fn mesh_definition_defaults_to_worldwide() {
        let definition: MeshDefinition =
            serde_json::from_str(r#"{"probes_per_section": 3, "spacing": 2.5}"#).unwrap();
        assert_eq!(definition.bounds(), BoundingBox::WORLDWIDE);
        assert!(definition.countries.is_empty());
    }
}
