#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Airport reference table and nearest-airport resolution.
//!
//! The table is loaded once per run from the tab-separated airport file and
//! shared read-only across every lookup. Lookups are a linear scan using the
//! spherical law of cosines; ties resolve to the first row in table order.

pub mod distance;

use std::io::Read;
use std::path::Path;

use anycast_hunter_models::{Airport, GeoPoint};
use serde::Deserialize;

pub use distance::{EARTH_RADIUS_KM, great_circle_distance_km};

/// Errors from loading or querying the airport table.
#[derive(Debug, thiserror::Error)]
pub enum AirportError {
    /// The table file could not be opened.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path that caused the error.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A row could not be parsed.
    #[error("CSV error in {path}: {source}")]
    Csv {
        /// Path to the table file.
        path: String,
        /// Underlying CSV error.
        source: csv::Error,
    },

    /// The `lat long` column is not two space-separated numbers.
    #[error("Invalid location '{value}' for airport {iata}")]
    InvalidLocation {
        /// IATA code of the offending row.
        iata: String,
        /// Raw column value.
        value: String,
    },

    /// The table has no rows, so no airport can be nearest.
    #[error("Airport reference table is empty")]
    EmptyReferenceTable,
}

/// One row of the airport TSV.
///
/// Columns not listed here (`pop`, `heuristic`, `1`, `2`, `3`) are ignored.
#[derive(Debug, Deserialize)]
struct AirportRow {
    #[serde(rename = "#IATA")]
    iata: String,
    size: String,
    name: String,
    #[serde(rename = "lat long")]
    lat_long: String,
    country_code: String,
    city: String,
}

impl AirportRow {
    fn into_airport(self) -> Result<Airport, AirportError> {
        let location = parse_lat_long(&self.lat_long).ok_or_else(|| {
            AirportError::InvalidLocation {
                iata: self.iata.clone(),
                value: self.lat_long.clone(),
            }
        })?;

        Ok(Airport {
            iata_code: self.iata,
            size: self.size,
            name: self.name,
            location,
            country_code: self.country_code,
            city_name: self.city,
        })
    }
}

/// Parses a `"lat lon"` column into a point.
fn parse_lat_long(value: &str) -> Option<GeoPoint> {
    let mut parts = value.split_whitespace();
    let latitude: f64 = parts.next()?.parse().ok()?;
    let longitude: f64 = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some(GeoPoint::new(longitude, latitude))
}

/// Immutable in-memory airport reference table.
#[derive(Debug, Clone, Default)]
pub struct AirportTable {
    airports: Vec<Airport>,
}

impl AirportTable {
    /// Builds a table from already-parsed airports, preserving order.
    #[must_use]
    pub const fn new(airports: Vec<Airport>) -> Self {
        Self { airports }
    }

    /// Loads the table from a tab-separated file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, a row is malformed, or
    /// a `lat long` value is not two numbers.
    pub fn load(path: &Path) -> Result<Self, AirportError> {
        let file = std::fs::File::open(path).map_err(|e| AirportError::Io {
            path: path.display().to_string(),
            source: e,
        })?;

        let table = Self::from_reader(file).map_err(|e| match e {
            AirportError::Csv { source, .. } => AirportError::Csv {
                path: path.display().to_string(),
                source,
            },
            other => other,
        })?;

        log::info!(
            "Loaded {} airports from {}",
            table.airports.len(),
            path.display()
        );

        Ok(table)
    }

    /// Parses the table from any tab-separated source with a header row.
    ///
    /// # Errors
    ///
    /// Returns an error if a row is malformed or has an invalid location.
    pub fn from_reader(reader: impl Read) -> Result<Self, AirportError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .flexible(true)
            .from_reader(reader);

        let mut airports = Vec::new();
        for result in csv_reader.deserialize::<AirportRow>() {
            let row = result.map_err(|e| AirportError::Csv {
                path: "<reader>".to_string(),
                source: e,
            })?;
            airports.push(row.into_airport()?);
        }

        Ok(Self { airports })
    }

    #[must_use]
    pub fn airports(&self) -> &[Airport] {
        &self.airports
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.airports.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.airports.is_empty()
    }

    /// Finds the airport nearest to `point`.
    ///
    /// # Errors
    ///
    /// Returns [`AirportError::EmptyReferenceTable`] if the table is empty.
    pub fn find_nearest(&self, point: &GeoPoint) -> Result<&Airport, AirportError> {
        find_nearest_airport(point, &self.airports)
    }
}

/// Finds the airport nearest to `point` by great-circle distance.
///
/// Exact ties resolve to the airport that appears first in `airports`.
///
/// # Errors
///
/// Returns [`AirportError::EmptyReferenceTable`] if `airports` is empty.
pub fn find_nearest_airport<'a>(
    point: &GeoPoint,
    airports: &'a [Airport],
) -> Result<&'a Airport, AirportError> {
    let mut best: Option<(&Airport, f64)> = None;

    for airport in airports {
        let distance = great_circle_distance_km(point, &airport.location);
        match best {
            Some((_, best_distance)) if distance >= best_distance => {}
            _ => best = Some((airport, distance)),
        }
    }

    best.map(|(airport, _)| airport)
        .ok_or(AirportError::EmptyReferenceTable)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &str = "#IATA\tsize\tname\tlat long\tcountry_code\tcity\tpop\theuristic\t1\t2\t3\n\
        MAD\tlarge\tMadrid Barajas\t40.4 -3.7\tES\tMadrid\t3200000\t1\t0\t0\t0\n\
        LIS\tlarge\tLisbon Portela\t38.7 -9.1\tPT\tLisbon\t500000\t1\t0\t0\t0\n";

    fn airport(iata: &str, lon: f64, lat: f64) -> Airport {
        Airport {
            iata_code: iata.to_string(),
            size: "large".to_string(),
            name: iata.to_string(),
            location: GeoPoint::new(lon, lat),
            country_code: "XX".to_string(),
            city_name: iata.to_string(),
        }
    }

    #[test]
    fn parses_table_and_swaps_lat_long() {
        let table = AirportTable::from_reader(TABLE.as_bytes()).unwrap();
        assert_eq!(table.len(), 2);

        let mad = &table.airports()[0];
        assert_eq!(mad.iata_code, "MAD");
        assert_eq!(mad.country_code, "ES");
        assert_eq!(mad.city_name, "Madrid");
        assert_eq!(mad.location, GeoPoint::new(-3.7, 40.4));
    }

    #[test]
    fn nearest_to_madrid_is_mad() {
        let table = AirportTable::from_reader(TABLE.as_bytes()).unwrap();
        let nearest = table.find_nearest(&GeoPoint::new(-3.8, 40.5)).unwrap();
        assert_eq!(nearest.iata_code, "MAD");
    }

    #[test]
    fn nearest_is_deterministic() {
        let table = AirportTable::from_reader(TABLE.as_bytes()).unwrap();
        let point = GeoPoint::new(-8.0, 39.0);
        let first = table.find_nearest(&point).unwrap().iata_code.clone();
        for _ in 0..10 {
            assert_eq!(table.find_nearest(&point).unwrap().iata_code, first);
        }
        assert_eq!(first, "LIS");
    }

    #[test]
    fn ties_resolve_to_first_row() {
        let airports = vec![airport("AAA", 10.0, 0.0), airport("BBB", -10.0, 0.0)];
        let nearest = find_nearest_airport(&GeoPoint::new(0.0, 0.0), &airports).unwrap();
        assert_eq!(nearest.iata_code, "AAA");

        let airports = vec![airport("BBB", -10.0, 0.0), airport("AAA", 10.0, 0.0)];
        let nearest = find_nearest_airport(&GeoPoint::new(0.0, 0.0), &airports).unwrap();
        assert_eq!(nearest.iata_code, "BBB");
    }

    #[test]
    fn empty_table_is_an_error() {
        let err = find_nearest_airport(&GeoPoint::new(0.0, 0.0), &[]).unwrap_err();
        assert!(matches!(err, AirportError::EmptyReferenceTable));

        let header_only = "#IATA\tsize\tname\tlat long\tcountry_code\tcity\n";
        let table = AirportTable::from_reader(header_only.as_bytes()).unwrap();
        assert!(table.is_empty());
        assert!(table.find_nearest(&GeoPoint::new(0.0, 0.0)).is_err());
    }

    #[test]
    fn invalid_lat_long_is_rejected() {
        let bad = "#IATA\tsize\tname\tlat long\tcountry_code\tcity\n\
            XXX\tsmall\tNowhere\t40.4\tES\tNowhere\n";
        let err = AirportTable::from_reader(bad.as_bytes()).unwrap_err();
        assert!(matches!(err, AirportError::InvalidLocation { iata, .. } if iata == "XXX"));
    }

    #[test]
    fn load_reports_missing_file() {
        let path = std::env::temp_dir().join("anycast_hunter_missing_airports.csv");
        let _ = std::fs::remove_file(&path);
        assert!(matches!(
            AirportTable::load(&path),
            Err(AirportError::Io { .. })
        ));
    }
}
