#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the anycast hunter analysis toolchain.
//!
//! - `vote`: majority-vote the location of every hunter result in a
//!   directory of experiment results, writing enriched copies elsewhere.
//! - `mesh`: build a probe placement mesh from a mesh definition.
//! - `routes`: export origin-to-result routes of voted results for mapping.

mod routes;

use std::path::PathBuf;
use std::time::Instant;

use anycast_hunter_airport::AirportTable;
use anycast_hunter_cli_utils::{IndicatifProgress, paths};
use anycast_hunter_mesh::{CountryCodeTable, Mesh, load_borders, load_mesh_definition};
use anycast_hunter_models::countries::EEE_COUNTRY_CODES;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "anycast_hunter", about = "Anycast hunter result analysis")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Vote the most likely country and city of every hunter result
    Vote {
        /// Directory of experiment-result JSON files
        #[arg(long)]
        input: Option<PathBuf>,
        /// Directory to write voted copies to (must differ from `--input`)
        #[arg(long)]
        output: Option<PathBuf>,
        /// Tab-separated airport reference table
        #[arg(long)]
        airports: Option<PathBuf>,
    },
    /// Generate a probe placement mesh as `GeoJSON`
    Mesh {
        /// Mesh definition JSON file
        definition: PathBuf,
        /// Country borders `GeoJSON` (features keyed by `CNTRY_NAME`)
        #[arg(long)]
        borders: Option<PathBuf>,
        /// ISO alpha-2 code to country name table
        #[arg(long)]
        country_codes: Option<PathBuf>,
        /// Output `GeoJSON` path
        #[arg(long)]
        output: Option<PathBuf>,
        /// Restrict the mesh to the European Economic Area, replacing the
        /// definition's country list
        #[arg(long)]
        eee: bool,
    },
    /// Export origin-to-result routes of voted experiment results
    Routes {
        /// A voted experiment-result file, or a directory of them
        #[arg(long)]
        input: Option<PathBuf>,
        /// Output file path
        #[arg(long)]
        output: Option<PathBuf>,
        /// Output format
        #[arg(long, value_enum, default_value_t = routes::RouteFormat::Geojson)]
        format: routes::RouteFormat,
        /// Only export routes whose elected country is outside the EEE
        #[arg(long)]
        outside_eee_only: bool,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = anycast_hunter_cli_utils::init_logger();
    let cli = Cli::parse();

    match cli.command {
        Commands::Vote {
            input,
            output,
            airports,
        } => {
            let input = input.unwrap_or_else(paths::first_ip_results_dir);
            let output = output.unwrap_or_else(paths::voting_results_dir);
            let airports = airports.unwrap_or_else(paths::airports_path);

            let start = Instant::now();
            let table = AirportTable::load(&airports)?;
            let progress = IndicatifProgress::files_bar(&multi, "Voting experiment results");
            let summary =
                anycast_hunter_voting::batch::run_batch(&input, &output, &table, progress.as_ref())?;

            log::info!(
                "Voted {} records across {} files ({} files skipped) in {:.1}s",
                summary.records_voted,
                summary.files_processed,
                summary.files_skipped,
                start.elapsed().as_secs_f64()
            );
        }
        Commands::Mesh {
            definition,
            borders,
            country_codes,
            output,
            eee,
        } => {
            let mut definition_value = load_mesh_definition(&definition)?;
            if eee {
                definition_value.countries =
                    EEE_COUNTRY_CODES.iter().map(ToString::to_string).collect();
            }

            let borders = load_borders(&borders.unwrap_or_else(paths::country_borders_path))?;
            let codes =
                CountryCodeTable::load(&country_codes.unwrap_or_else(paths::country_codes_path))?;

            let mesh = Mesh::from_definition(&definition_value, &borders, &codes)?;

            let output = match output {
                Some(path) => path,
                None => {
                    let dir = paths::generated_dir();
                    paths::ensure_dir(&dir)?;
                    let stem = definition
                        .file_stem()
                        .map_or_else(|| "mesh".into(), |s| s.to_string_lossy().into_owned());
                    dir.join(format!("{stem}.geojson"))
                }
            };
            anycast_hunter_mesh::write_mesh_geojson(&output, &mesh)?;

            log::info!(
                "Mesh: {} cells, {} probes -> {}",
                mesh.cells.len(),
                mesh.probe_count(),
                output.display()
            );
        }
        Commands::Routes {
            input,
            output,
            format,
            outside_eee_only,
        } => {
            let input = input.unwrap_or_else(paths::voting_results_dir);
            routes::run(&input, output, format, outside_eee_only)?;
        }
    }

    Ok(())
}
