//! `routes` subcommand: collect routes from voted results and export them.

use std::path::{Path, PathBuf};

use anycast_hunter_cli_utils::paths;
use anycast_hunter_voting::routes::{
    collect_routes, route_inputs, write_routes_csv, write_routes_geojson,
};

/// Route export format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum RouteFormat {
    Geojson,
    Csv,
}

impl RouteFormat {
    const fn extension(self) -> &'static str {
        match self {
            Self::Geojson => "geojson",
            Self::Csv => "csv",
        }
    }
}

/// Extracts routes from `input` (a file or a directory of files) and
/// writes them in `format`.
pub fn run(
    input: &Path,
    output: Option<PathBuf>,
    format: RouteFormat,
    outside_eee_only: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let files = route_inputs(input)?;
    let routes = collect_routes(&files, outside_eee_only);

    let output = match output {
        Some(path) => path,
        None => {
            let dir = paths::generated_dir();
            paths::ensure_dir(&dir)?;
            dir.join(format!("routes.{}", format.extension()))
        }
    };

    match format {
        RouteFormat::Geojson => write_routes_geojson(&output, &routes)?,
        RouteFormat::Csv => write_routes_csv(&output, &routes)?,
    }

    log::info!(
        "Wrote {} routes from {} files to {}",
        routes.len(),
        files.len(),
        output.display()
    );

    Ok(())
}
