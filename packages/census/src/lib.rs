#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Census 2021 thematic processing.
//!
//! Each theme (economic activity, health, qualifications, ...) is described
//! by an embedded TOML definition naming its source table, the column
//! mapping for the release it was written against, and the metrics it
//! produces. [`processor::process_theme`] turns a loaded table into a
//! [`pip_explorer_area_models::MetricTable`] for a set of geography codes.

pub mod processor;
pub mod registry;
pub mod theme;

use pip_explorer_source::SourceError;

/// Errors that can occur while processing a census theme.
#[derive(Debug, thiserror::Error)]
pub enum CensusError {
    /// Loading the table or resolving a required column failed.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// No theme has this id.
    #[error("Unknown census theme: {0}")]
    UnknownTheme(String),
}
