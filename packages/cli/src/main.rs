#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the Pride in Place neighbourhood data pipeline.

mod pipeline;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use pip_explorer_cli_utils::IndicatifProgress;
use pip_explorer_geography::boundaries::{DEFAULT_CODE_PROPERTY, filter_boundary_file};
use pip_explorer_geography::lookup::LsoaLookup;
use pip_explorer_geography::lsoa::{
    DEFAULT_MSOAS, build_lsoa_data, load_centroids, load_classifications, load_lsoa_data,
    needed_lsoas, write_lsoa_data,
};
use pip_explorer_geography::mappings::{lookup_mapping, lsoa_extract_mapping};
use pip_explorer_source::download::{build_client, fetch_source};
use pip_explorer_source::paths::{
    BOUNDARIES_FILENAME, LSOA_DATA_FILENAME, data_dir, default_output_path, project_root,
};
use pip_explorer_source::registry::{LOOKUP, all_sources, find_source};
use pip_explorer_source::table::Table;

#[derive(Parser)]
#[command(
    name = "pip_explorer",
    about = "Builds the Pride in Place neighbourhood dataset"
)]
struct Cli {
    /// Directory for cached source downloads (defaults to
    /// `PIP_EXPLORER_DATA_DIR`, then `<workspace>/data`)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch every source, compute metrics and percentiles, and export the
    /// dashboard dataset (the default)
    Gather {
        /// Re-download sources even if a cached copy exists
        #[arg(long)]
        force: bool,
        /// Output path (defaults to `<workspace>/data.json`)
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// List all registered data sources and whether they are cached
    Sources,
    /// Build the per-neighbourhood LSOA document (centroids and typology)
    Lsoa {
        /// LSOA classification CSV (typology per LSOA)
        #[arg(long)]
        classification: PathBuf,
        /// LSOA population-weighted centroids CSV
        #[arg(long)]
        centroids: PathBuf,
        /// LSOA to MSOA lookup CSV (defaults to the cached lookup source,
        /// fetching it if needed)
        #[arg(long)]
        lookup: Option<PathBuf>,
        /// Comma-separated MSOA codes to include (defaults to the built-in
        /// neighbourhood list)
        #[arg(long, value_delimiter = ',')]
        msoa: Vec<String>,
        /// Output path (defaults to `<workspace>/lsoa_data.json`)
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Filter a national LSOA boundary file to the LSOAs in the LSOA
    /// document
    Boundaries {
        /// National LSOA boundaries `GeoJSON`
        #[arg(long)]
        input: PathBuf,
        /// LSOA document produced by `lsoa` (defaults to
        /// `<workspace>/lsoa_data.json`)
        #[arg(long)]
        lsoa_data: Option<PathBuf>,
        /// Feature property holding the LSOA code
        #[arg(long, default_value = DEFAULT_CODE_PROPERTY)]
        property: String,
        /// Output path (defaults to `<workspace>/pip_lsoa_boundaries.geojson`)
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
#[allow(clippy::too_many_lines)]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = pip_explorer_cli_utils::init_logger();

    let cli = Cli::parse();
    let data_dir = cli.data_dir.unwrap_or_else(data_dir);

    match cli.command.unwrap_or(Commands::Gather {
        force: false,
        output: None,
    }) {
        Commands::Gather { force, output } => {
            let output = output.unwrap_or_else(default_output_path);
            let fetch_progress = IndicatifProgress::steps_bar(&multi, "Sources", 0);
            let build_progress = IndicatifProgress::steps_bar(&multi, "Metrics", 0);
            pipeline::gather(&data_dir, &output, force, &fetch_progress, &build_progress)
                .await?;
        }
        Commands::Sources => {
            let sources = all_sources();
            println!("{:<26} {:<8} NAME", "ID", "CACHED");
            println!("{}", "-".repeat(80));
            for source in &sources {
                let cached = if source.table_path(&data_dir).exists() {
                    "yes"
                } else {
                    "no"
                };
                println!("{:<26} {cached:<8} {}", source.id, source.name);
            }
            println!("\n{} sources registered", sources.len());
        }
        Commands::Lsoa {
            classification,
            centroids,
            lookup,
            msoa,
            output,
        } => {
            let lookup_path = match lookup {
                Some(path) => path,
                None => cached_lookup(&data_dir).await?,
            };
            let msoas: BTreeSet<String> = if msoa.is_empty() {
                DEFAULT_MSOAS.iter().map(ToString::to_string).collect()
            } else {
                msoa.into_iter().map(|c| c.trim().to_string()).collect()
            };
            let output = output.unwrap_or_else(|| project_root().join(LSOA_DATA_FILENAME));

            let mapping = lsoa_extract_mapping();
            log::info!("Loading lookup...");
            let lookup =
                LsoaLookup::from_table(&Table::from_csv_path(&lookup_path)?, &lookup_mapping())?;
            log::info!("Loading classifications...");
            let classifications = load_classifications(&classification, &mapping.classification)?;
            log::info!("Loading centroids...");
            let centroids = load_centroids(&centroids, &mapping.centroids)?;

            log::info!("Building LSOA data for {} MSOAs...", msoas.len());
            let data = build_lsoa_data(&lookup, &classifications, &centroids, &msoas);
            write_lsoa_data(&data, &output)?;
        }
        Commands::Boundaries {
            input,
            lsoa_data,
            property,
            output,
        } => {
            let lsoa_data = lsoa_data.unwrap_or_else(|| project_root().join(LSOA_DATA_FILENAME));
            let output = output.unwrap_or_else(|| project_root().join(BOUNDARIES_FILENAME));

            let needed = needed_lsoas(&load_lsoa_data(&lsoa_data)?);
            log::info!("Need boundaries for {} LSOAs", needed.len());

            let spinner = IndicatifProgress::spinner(&multi, "Filtering boundaries");
            let kept = filter_boundary_file(&input, &output, &property, &needed)?;
            spinner.finish(format!("Kept {kept} boundary features"));
        }
    }

    Ok(())
}

/// Path of the cached lookup table, downloading it first if absent.
async fn cached_lookup(data_dir: &Path) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let source = find_source(LOOKUP)?;
    let path = source.table_path(data_dir);
    if path.exists() {
        return Ok(path);
    }
    pip_explorer_source::paths::ensure_dir(data_dir)?;
    let client = build_client()?;
    Ok(fetch_source(&client, &source, data_dir, false).await?)
}
