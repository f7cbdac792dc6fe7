//! Registry of remote datasets, loaded from embedded TOML configs.
//!
//! Each `.toml` file in `packages/source/sources/` is baked into the binary
//! with [`include_str!`]. The order here is the order sources are fetched
//! and listed in.

use pip_explorer_source_models::SourceDefinition;

use crate::SourceError;

/// Id of the target neighbourhood list.
pub const TARGETS: &str = "pip_msoas";
/// Id of the LSOA to MSOA lookup.
pub const LOOKUP: &str = "lsoa_msoa_lookup";
/// Id of the LSOA-level deprivation indices.
pub const IMD: &str = "imd_2025";

const SOURCE_TOMLS: &[(&str, &str)] = &[
    ("pip_msoas", include_str!("../sources/pip_msoas.toml")),
    (
        "lsoa_msoa_lookup",
        include_str!("../sources/lsoa_msoa_lookup.toml"),
    ),
    // ── Census 2021 bulk tables ──────────────────────────────────────
    (
        "census_economic_activity",
        include_str!("../sources/census_economic_activity.toml"),
    ),
    ("census_health", include_str!("../sources/census_health.toml")),
    (
        "census_disability",
        include_str!("../sources/census_disability.toml"),
    ),
    (
        "census_qualifications",
        include_str!("../sources/census_qualifications.toml"),
    ),
    (
        "census_deprivation",
        include_str!("../sources/census_deprivation.toml"),
    ),
    ("census_tenure", include_str!("../sources/census_tenure.toml")),
    (
        "census_unpaid_care",
        include_str!("../sources/census_unpaid_care.toml"),
    ),
    (
        "census_occupation",
        include_str!("../sources/census_occupation.toml"),
    ),
    // ── Indices of deprivation ───────────────────────────────────────
    ("imd_2025", include_str!("../sources/imd_2025.toml")),
];

#[cfg(test)]
const EXPECTED_SOURCE_COUNT: usize = 11;

/// Parses a source definition from TOML text.
///
/// # Errors
///
/// Returns a [`toml::de::Error`] if the text is not a valid definition.
pub fn parse_source_toml(toml_str: &str) -> Result<SourceDefinition, toml::de::Error> {
    toml::from_str(toml_str)
}

/// Returns every configured source in fetch order.
///
/// # Panics
///
/// Panics if an embedded TOML config is malformed.
#[must_use]
pub fn all_sources() -> Vec<SourceDefinition> {
    SOURCE_TOMLS
        .iter()
        .map(|(name, toml)| {
            parse_source_toml(toml).unwrap_or_else(|e| panic!("Failed to parse {name}.toml: {e}"))
        })
        .collect()
}

/// Looks up a source by id.
///
/// # Errors
///
/// Returns [`SourceError::UnknownSource`] if no source has this id.
pub fn find_source(id: &str) -> Result<SourceDefinition, SourceError> {
    all_sources()
        .into_iter()
        .find(|s| s.id == id)
        .ok_or_else(|| SourceError::UnknownSource(id.to_string()))
}
