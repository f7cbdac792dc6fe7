//! End-to-end gather pipeline.
//!
//! Fetch every registered source, load the target neighbourhoods, build the
//! national MSOA reference table (census themes plus aggregated deprivation
//! scores), rank the targets against it and export the dashboard dataset.
//! Each stage completes before the next starts; nothing is written until the
//! final export.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use pip_explorer_analytics::percentile::rank_against;
use pip_explorer_area_models::{MetricTable, TargetList};
use pip_explorer_census::processor::process_theme;
use pip_explorer_census::registry::all_themes;
use pip_explorer_generate::{DataSources, Dataset, export_to_json};
use pip_explorer_geography::aggregate::aggregate_scores;
use pip_explorer_geography::lookup::LsoaLookup;
use pip_explorer_geography::mappings::{imd_mapping, lookup_mapping, target_mapping};
use pip_explorer_geography::targets::load_targets;
use pip_explorer_source::SourceError;
use pip_explorer_source::download::{build_client, fetch_source};
use pip_explorer_source::models::SourceDefinition;
use pip_explorer_source::paths::ensure_dir;
use pip_explorer_source::progress::ProgressCallback;
use pip_explorer_source::registry::{IMD, LOOKUP, TARGETS, all_sources, find_source};
use pip_explorer_source::table::Table;

/// Downloads (or reuses cached copies of) every source, one at a time.
///
/// # Errors
///
/// Returns the first [`SourceError`] encountered; later sources are not
/// fetched.
pub async fn fetch_all(
    sources: &[SourceDefinition],
    data_dir: &Path,
    force: bool,
    progress: &Arc<dyn ProgressCallback>,
) -> Result<(), SourceError> {
    ensure_dir(data_dir).map_err(|e| SourceError::io(data_dir, e))?;
    let client = build_client()?;

    for source in sources {
        progress.set_message(format!("Fetching {}", source.id));
        log::info!("{} ({})", source.name, source.id);
        fetch_source(&client, source, data_dir, force).await?;
        progress.inc(1);
    }

    progress.finish(format!("Fetched {} sources", sources.len()));
    Ok(())
}

/// Loads the target neighbourhood list from the cached source.
///
/// # Errors
///
/// Returns an error if the source file cannot be read or its code column
/// cannot be found.
pub fn load_target_list(data_dir: &Path) -> Result<TargetList, Box<dyn std::error::Error>> {
    log::info!("Loading Pride in Place neighbourhoods...");
    let table = Table::load(&find_source(TARGETS)?, data_dir)?;
    Ok(load_targets(&table, &target_mapping())?)
}

/// Loads the cached LSOA to MSOA lookup.
///
/// # Errors
///
/// Returns an error if the lookup cannot be read or its code columns cannot
/// be found.
pub fn load_lookup(data_dir: &Path) -> Result<LsoaLookup, Box<dyn std::error::Error>> {
    log::info!("Loading LSOA to MSOA lookup...");
    let table = Table::load(&find_source(LOOKUP)?, data_dir)?;
    Ok(LsoaLookup::from_table(&table, &lookup_mapping())?)
}

/// Builds the ranked metric table for `targets`.
///
/// Every theme is processed for every MSOA in the lookup (and every target,
/// should a target be missing from it), then IMD scores are averaged up from
/// LSOA level. The targets are selected from that national table in list
/// order and ranked against it.
///
/// # Errors
///
/// Returns an error if any cached table cannot be read, or a required column
/// cannot be resolved.
pub fn build_metrics(
    data_dir: &Path,
    targets: &TargetList,
    progress: &Arc<dyn ProgressCallback>,
) -> Result<MetricTable, Box<dyn std::error::Error>> {
    let lookup = load_lookup(data_dir)?;

    let mut national: Vec<&str> = lookup.msoa_codes();
    let known: BTreeSet<&str> = national.iter().copied().collect();
    national.extend(targets.codes().into_iter().filter(|c| !known.contains(c)));
    log::info!("  {} MSOAs in the national reference", national.len());

    let themes = all_themes();
    progress.set_total(themes.len() as u64 + 1);

    let mut reference = MetricTable::new(Vec::new());
    for theme in &themes {
        progress.set_message(format!("Processing {}", theme.name));
        log::info!("Processing {}...", theme.name);
        let table = Table::load(&find_source(&theme.source)?, data_dir)?;
        let metrics = process_theme(&table, theme, &national)?;
        reference = reference.merge(&metrics);
        progress.inc(1);
    }

    progress.set_message("Aggregating deprivation scores".to_string());
    log::info!("Processing Indices of Deprivation...");
    let imd = Table::load(&find_source(IMD)?, data_dir)?;
    let scores = aggregate_scores(&imd, &imd_mapping(), &lookup)?;
    reference = reference.merge(&scores);
    progress.inc(1);
    progress.finish(format!("Built {} metrics", reference.columns().len()));

    let selected = reference.select(&targets.codes());
    Ok(rank_against(&selected, &reference))
}

/// Runs the whole pipeline and writes the dataset to `output`.
///
/// # Errors
///
/// Returns an error from any stage. No output file is written on failure.
pub async fn gather(
    data_dir: &Path,
    output: &Path,
    force: bool,
    fetch_progress: &Arc<dyn ProgressCallback>,
    build_progress: &Arc<dyn ProgressCallback>,
) -> Result<(), Box<dyn std::error::Error>> {
    let start = Instant::now();
    let sources = all_sources();

    log::info!("Data directory: {}", data_dir.display());
    fetch_progress.set_total(sources.len() as u64);
    fetch_all(&sources, data_dir, force, fetch_progress).await?;

    let targets = load_target_list(data_dir)?;
    let metrics = build_metrics(data_dir, &targets, build_progress)?;

    let dataset = Dataset::new(
        &targets,
        &metrics,
        DataSources::from_sources(&sources),
        Utc::now(),
    );
    export_to_json(&dataset, output)?;

    log::info!(
        "Done: {} areas, {} fields in {:.1}s",
        targets.areas.len(),
        metrics.columns().len(),
        start.elapsed().as_secs_f64()
    );
    Ok(())
}
