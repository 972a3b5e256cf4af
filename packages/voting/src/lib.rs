#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Location voting over hunter results.
//!
//! For each hunter result whose candidate source IPs sit in more than one
//! distinct location, every candidate is resolved to its nearest airport
//! and the airports' countries and cities are put to a strict-majority
//! vote. The [`batch`] module applies this to whole experiment-result
//! directories, and [`routes`] turns voted results into origin/result
//! routes for mapping.

pub mod batch;
pub mod progress;
pub mod routes;

use anycast_hunter_airport::{AirportError, AirportTable};
use anycast_hunter_models::{Airport, CandidateSourceIp, Elected, GeoPoint, LocationVoteResult};

/// Errors that can occur while voting.
#[derive(Debug, thiserror::Error)]
pub enum VotingError {
    /// The nearest-airport lookup could not run.
    #[error("Nearest-airport resolver unavailable: {0}")]
    ResolverUnavailable(#[from] AirportError),

    /// A candidate that needs resolving has no location.
    #[error("Candidate source IP {ip} has no location")]
    MissingLocation {
        /// The candidate's IP address.
        ip: String,
    },

    /// A candidate source IP of a record that needs a vote could not be
    /// decoded.
    #[error("Malformed candidate in result for origin {origin_id}: {source}")]
    MalformedCandidate {
        /// Origin id of the offending record.
        origin_id: String,
        /// Decoding error.
        source: serde_json::Error,
    },

    /// An experiment-result file is missing expected structure.
    #[error("Malformed input file {path}: {message}")]
    MalformedInputFile {
        /// Path of the offending file.
        path: String,
        /// What was wrong with it.
        message: String,
    },

    /// The output directory would overwrite the input files.
    #[error("Output directory {0} is the input directory")]
    OutputOverlapsInput(String),

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

    /// CSV serialization failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Result of running the vote on one hunter result.
#[derive(Debug, Clone, PartialEq)]
pub enum VoteOutcome {
    /// Fewer than two distinct candidate locations; nothing was computed.
    Skipped,
    /// The vote ran.
    Voted(LocationVoteResult),
}

/// Runs the location vote over the candidate source IPs of one hunter
/// result.
///
/// Candidates are deduplicated by exact location first; with one distinct
/// location or fewer the vote is skipped and no airport lookup happens.
///
/// # Errors
///
/// Returns [`VotingError::MissingLocation`] if a candidate has no location
/// and [`VotingError::ResolverUnavailable`] if the airport table is empty.
pub fn aggregate(
    candidates: &[CandidateSourceIp],
    airports: &AirportTable,
) -> Result<VoteOutcome, VotingError> {
    if distinct_locations(candidates).len() <= 1 {
        return Ok(VoteOutcome::Skipped);
    }

    let airports_intersection = candidates
        .iter()
        .map(|candidate| -> Result<Airport, VotingError> {
            let location = candidate
                .location
                .as_ref()
                .ok_or_else(|| VotingError::MissingLocation {
                    ip: candidate.ip.clone(),
                })?;
            Ok(airports.find_nearest(location)?.clone())
        })
        .collect::<Result<Vec<_>, _>>()?;

    let airports_countries: Vec<String> = airports_intersection
        .iter()
        .map(|airport| airport.country_code.clone())
        .collect();
    let airports_cities: Vec<String> = airports_intersection
        .iter()
        .map(|airport| airport.city_name.clone())
        .collect();

    // Both thresholds use the country list length.
    debug_assert_eq!(airports_countries.len(), airports_cities.len());
    let denominator = airports_countries.len();

    let country = elect(&airports_countries, denominator);
    let city = elect(&airports_cities, denominator);

    Ok(VoteOutcome::Voted(LocationVoteResult {
        airports_intersection,
        airports_countries,
        airports_cities,
        country,
        city,
    }))
}

/// Distinct candidate locations in first-seen order. Unknown locations
/// count as one distinct value.
#[must_use]
pub fn distinct_locations(candidates: &[CandidateSourceIp]) -> Vec<Option<GeoPoint>> {
    let mut distinct: Vec<Option<GeoPoint>> = Vec::new();
    for candidate in candidates {
        if !distinct.contains(&candidate.location) {
            distinct.push(candidate.location);
        }
    }
    distinct
}

/// Strict-majority election.
///
/// A value wins when its count is greater than `denominator / 2`. Values
/// are visited in first-seen order and the last winner is kept.
#[must_use]
pub fn elect(values: &[String], denominator: usize) -> Elected {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for value in values {
        match counts.iter_mut().find(|(seen, _)| *seen == value.as_str()) {
            Some((_, count)) => *count += 1,
            None => counts.push((value.as_str(), 1)),
        }
    }

    let mut elected = Elected::Indeterminate;
    for (value, count) in counts {
        if count * 2 > denominator {
            elected = Elected::Value(value.to_string());
        }
    }
    elected
}
