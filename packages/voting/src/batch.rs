//! Batch voting over a directory of experiment-result files.
//!
//! Each `.json` file in the input directory is read, every hunter result
//! that needs a vote is enriched, and the result is written under the same
//! file name in the output directory. The input directory is never
//! written to. A file that fails to parse or vote is logged and skipped.

use std::io::{BufWriter, Write as _};
use std::path::{Path, PathBuf};

use anycast_hunter_airport::AirportTable;
use anycast_hunter_models::{ExperimentResult, HunterResult};
use serde::Serialize as _;

use crate::progress::ProgressCallback;
use crate::{VoteOutcome, VotingError, aggregate};

/// Counters for a single experiment-result file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileStats {
    /// Hunter results that received a vote.
    pub records_voted: usize,
    /// Hunter results left untouched.
    pub records_skipped: usize,
}

/// Counters for a whole batch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Files written to the output directory.
    pub files_processed: usize,
    /// Files that failed and were not written.
    pub files_skipped: usize,
    /// Hunter results that received a vote.
    pub records_voted: usize,
    /// Hunter results left untouched.
    pub records_skipped: usize,
}

/// Runs the vote over every hunter result of an experiment.
///
/// Returns a new experiment value; `experiment` itself is not modified.
///
/// # Errors
///
/// Returns an error if a vote fails or its result cannot be converted to
/// JSON.
pub fn vote_experiment(
    experiment: &ExperimentResult,
    airports: &AirportTable,
) -> Result<(ExperimentResult, FileStats), VotingError> {
    let mut stats = FileStats::default();

    let hunter_results = experiment
        .hunter_results
        .iter()
        .map(|result| -> Result<HunterResult, VotingError> {
            let voted = vote_hunter_result(result, airports)?;
            if voted.is_some() {
                stats.records_voted += 1;
            } else {
                stats.records_skipped += 1;
            }
            Ok(voted.unwrap_or_else(|| result.clone()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok((
        ExperimentResult {
            hunter_results,
            ..experiment.clone()
        },
        stats,
    ))
}

/// Votes a single hunter result. Returns `None` when the vote is skipped.
fn vote_hunter_result(
    result: &HunterResult,
    airports: &AirportTable,
) -> Result<Option<HunterResult>, VotingError> {
    if result.ips_previous_to_target.len() <= 1 {
        return Ok(None);
    }

    let candidates = result
        .candidates()
        .map_err(|source| VotingError::MalformedCandidate {
            origin_id: result.origin_id.to_string(),
            source,
        })?;

    for candidate in candidates.iter().filter(|c| !c.has_valid_ip()) {
        log::warn!("Candidate source IP '{}' is not a valid address", candidate.ip);
    }

    let VoteOutcome::Voted(vote) = aggregate(&candidates, airports)? else {
        return Ok(None);
    };

    log::debug!(
        "origin {}: country {} {:?}, city {} {:?}",
        result.origin_id,
        vote.country,
        vote.airports_countries,
        vote.city,
        vote.airports_cities,
    );

    let existing = result.location_result.clone().unwrap_or_default();
    Ok(Some(HunterResult {
        location_result: Some(vote.merged_into(&existing)?),
        ..result.clone()
    }))
}

/// Reads an experiment-result file.
///
/// # Errors
///
/// Returns [`VotingError::Io`] if the file cannot be read and
/// [`VotingError::MalformedInputFile`] if it does not have the expected
/// structure.
pub fn read_experiment(path: &Path) -> Result<ExperimentResult, VotingError> {
    let raw = std::fs::read_to_string(path).map_err(|e| VotingError::Io {
        path: path.display().to_string(),
        source: e,
    })?;

    serde_json::from_str(&raw).map_err(|e| VotingError::MalformedInputFile {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

/// Writes an experiment result as JSON indented by four spaces, creating
/// parent directories as needed.
///
/// # Errors
///
/// Returns an error if the file cannot be created or written.
pub fn write_experiment(path: &Path, experiment: &ExperimentResult) -> Result<(), VotingError> {
    let io_err = |e| VotingError::Io {
        path: path.display().to_string(),
        source: e,
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }

    let file = std::fs::File::create(path).map_err(io_err)?;
    let mut writer = BufWriter::new(file);
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut writer, formatter);
    experiment.serialize(&mut serializer)?;
    writer.flush().map_err(io_err)?;

    Ok(())
}

/// Reads, votes, and writes one file.
///
/// # Errors
///
/// Returns an error if any of the three steps fails.
pub fn process_file(
    input: &Path,
    output: &Path,
    airports: &AirportTable,
) -> Result<FileStats, VotingError> {
    let experiment = read_experiment(input)?;
    let (voted, stats) = vote_experiment(&experiment, airports)?;
    write_experiment(output, &voted)?;
    Ok(stats)
}

/// Lists the `.json` files directly inside `dir`, sorted by path.
///
/// # Errors
///
/// Returns an error if the directory cannot be read.
pub fn list_experiment_files(dir: &Path) -> Result<Vec<PathBuf>, VotingError> {
    let io_err = |e| VotingError::Io {
        path: dir.display().to_string(),
        source: e,
    };

    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
            files.push(path);
        }
    }
    files.sort();

    Ok(files)
}

/// Votes every experiment-result file in `input_dir` into `output_dir`.
///
/// # Errors
///
/// Returns an error if `output_dir` is `input_dir`, or if either directory
/// cannot be read or created. Per-file failures are logged and counted in
/// [`BatchSummary::files_skipped`].
pub fn run_batch(
    input_dir: &Path,
    output_dir: &Path,
    airports: &AirportTable,
    progress: &dyn ProgressCallback,
) -> Result<BatchSummary, VotingError> {
    if same_directory(input_dir, output_dir) {
        return Err(VotingError::OutputOverlapsInput(
            output_dir.display().to_string(),
        ));
    }

    let files = list_experiment_files(input_dir)?;
    std::fs::create_dir_all(output_dir).map_err(|e| VotingError::Io {
        path: output_dir.display().to_string(),
        source: e,
    })?;

    log::info!(
        "Voting {} experiment files from {} into {}",
        files.len(),
        input_dir.display(),
        output_dir.display()
    );
    progress.set_total(files.len() as u64);

    let mut summary = BatchSummary::default();
    for input in &files {
        let Some(file_name) = input.file_name() else {
            continue;
        };
        progress.set_message(file_name.to_string_lossy().into_owned());

        match process_file(input, &output_dir.join(file_name), airports) {
            Ok(stats) => {
                log::info!(
                    "{}: {} voted, {} skipped",
                    input.display(),
                    stats.records_voted,
                    stats.records_skipped
                );
                summary.files_processed += 1;
                summary.records_voted += stats.records_voted;
                summary.records_skipped += stats.records_skipped;
            }
            Err(e) => {
                log::warn!("Skipping {}: {e}", input.display());
                summary.files_skipped += 1;
            }
        }

        progress.inc(1);
    }

    progress.finish(format!(
        "{} files voted, {} skipped",
        summary.files_processed, summary.files_skipped
    ));

    Ok(summary)
}

fn same_directory(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}
