//! Theme registry, loaded from embedded TOML configs.

use crate::CensusError;
use crate::theme::ThemeDefinition;

/// Themes in processing order. The first five make up the core dashboard
/// dataset; the rest extend it.
const THEME_TOMLS: &[(&str, &str)] = &[
    (
        "economic_activity",
        include_str!("../themes/economic_activity.toml"),
    ),
    ("health", include_str!("../themes/health.toml")),
    (
        "qualifications",
        include_str!("../themes/qualifications.toml"),
    ),
    ("deprivation", include_str!("../themes/deprivation.toml")),
    ("tenure", include_str!("../themes/tenure.toml")),
    ("disability", include_str!("../themes/disability.toml")),
    ("unpaid_care", include_str!("../themes/unpaid_care.toml")),
    ("occupation", include_str!("../themes/occupation.toml")),
];

#[cfg(test)]
const EXPECTED_THEME_COUNT: usize = 8;

/// Parses a theme definition from TOML text.
///
/// # Errors
///
/// Returns a [`toml::de::Error`] if the text is not a valid definition.
pub fn parse_theme_toml(toml_str: &str) -> Result<ThemeDefinition, toml::de::Error> {
    toml::from_str(toml_str)
}

/// Returns every theme in processing order.
///
/// # Panics
///
/// Panics if an embedded TOML config is malformed.
#[must_use]
pub fn all_themes() -> Vec<ThemeDefinition> {
    THEME_TOMLS
        .iter()
        .map(|(name, toml)| {
            parse_theme_toml(toml).unwrap_or_else(|e| panic!("Failed to parse {name}.toml: {e}"))
        })
        .collect()
}

/// Looks up a theme by id.
///
/// # Errors
///
/// Returns [`CensusError::UnknownTheme`] if no theme has this id.
pub fn find_theme(id: &str) -> Result<ThemeDefinition, CensusError> {
    all_themes()
        .into_iter()
        .find(|t| t.id == id)
        .ok_or_else(|| CensusError::UnknownTheme(id.to_string()))
}
