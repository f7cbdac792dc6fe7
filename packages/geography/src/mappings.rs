//! Column mappings for geographic inputs, embedded from `mappings/*.toml`.
//!
//! Each mapping is written against one publisher release. When a release
//! renames headers, update the patterns and bump `schema_version`.

use pip_explorer_geography_models::{LookupMapping, LsoaExtractMapping, ScoreMapping, TargetMapping};
use serde::de::DeserializeOwned;

const LOOKUP_TOML: &str = include_str!("../mappings/lookup.toml");
const IMD_TOML: &str = include_str!("../mappings/imd_2025.toml");
const TARGETS_TOML: &str = include_str!("../mappings/pip_msoas.toml");
const LSOA_EXTRACT_TOML: &str = include_str!("../mappings/lsoa_extract.toml");

fn parse<T: DeserializeOwned>(name: &str, toml_str: &str) -> T {
    toml::from_str(toml_str).unwrap_or_else(|e| panic!("Failed to parse {name}.toml: {e}"))
}

/// # Panics
///
/// Panics if the embedded config is malformed.
#[must_use]
pub fn lookup_mapping() -> LookupMapping {
    parse("lookup", LOOKUP_TOML)
}

/// Scores averaged from LSOA to MSOA level.
///
/// # Panics
///
/// Panics if the embedded config is malformed.
#[must_use]
pub fn imd_mapping() -> ScoreMapping {
    parse("imd_2025", IMD_TOML)
}

/// # Panics
///
/// Panics if the embedded config is malformed.
#[must_use]
pub fn target_mapping() -> TargetMapping {
    parse("pip_msoas", TARGETS_TOML)
}

/// # Panics
///
/// Panics if the embedded config is malformed.
#[must_use]
pub fn lsoa_extract_mapping() -> LsoaExtractMapping {
    parse("lsoa_extract", LSOA_EXTRACT_TOML)
}
