//! LSOA boundary filtering.
//!
//! Reduces the national LSOA boundary file to the features a set of LSOA
//! codes needs. Kept features are written back exactly as read: geometry,
//! properties and property order are untouched.

use std::collections::BTreeSet;
use std::path::Path;

use geojson::{Feature, FeatureCollection};
use pip_explorer_source::paths::write_atomic;

use crate::GeoError;

/// Default feature property holding the LSOA code.
pub const DEFAULT_CODE_PROPERTY: &str = "LSOA21CD";

fn feature_code<'a>(feature: &'a Feature, property: &str) -> Option<&'a str> {
    feature.property(property)?.as_str()
}

/// Keeps the features whose `property` is in `needed`.
///
/// The result is a bare collection: the input's bounding box and foreign
/// members are not carried over, since they describe the full file.
#[must_use]
pub fn filter_features(
    collection: FeatureCollection,
    property: &str,
    needed: &BTreeSet<String>,
) -> FeatureCollection {
    let features = collection
        .features
        .into_iter()
        .filter(|feature| feature_code(feature, property).is_some_and(|code| needed.contains(code)))
        .collect();

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

/// Reads `input`, filters it, and writes the result to `output`.
///
/// Returns the number of features written.
///
/// # Errors
///
/// Returns [`GeoError`] if either file cannot be accessed or `input` is not
/// a `GeoJSON` feature collection.
pub fn filter_boundary_file(
    input: &Path,
    output: &Path,
    property: &str,
    needed: &BTreeSet<String>,
) -> Result<usize, GeoError> {
    log::info!("Loading {}...", input.display());
    let file = std::fs::File::open(input).map_err(|e| GeoError::io(input, e))?;
    let collection: FeatureCollection = serde_json::from_reader(std::io::BufReader::new(file))
        .map_err(|e| GeoError::json(input, e))?;

    let total = collection.features.len();
    log::info!("Filtering {total} features to {} LSOAs...", needed.len());
    let filtered = filter_features(collection, property, needed);
    let kept = filtered.features.len();

    if kept < needed.len() {
        log::warn!(
            "{} of {} needed LSOAs have no boundary feature",
            needed.len() - kept.min(needed.len()),
            needed.len()
        );
    }

    let json = serde_json::to_vec(&filtered).map_err(|e| GeoError::json(output, e))?;
    write_atomic(output, &json).map_err(|e| GeoError::io(output, e))?;

    log::info!("Extracted {kept} features to {}", output.display());
    Ok(kept)
}
