#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Geographic joins for the pip-explorer pipeline.
//!
//! Loads the LSOA to MSOA lookup, averages LSOA-level deprivation scores up
//! to MSOA level, reads the target neighbourhood list, and implements the
//! two auxiliary extracts: the per-MSOA LSOA document and the filtered LSOA
//! boundary file.

pub mod aggregate;
pub mod boundaries;
pub mod lookup;
pub mod lsoa;
pub mod mappings;
pub mod targets;

pub use pip_explorer_geography_models as models;

use pip_explorer_source::SourceError;
use thiserror::Error;

/// Errors that can occur during geography operations.
#[derive(Debug, Error)]
pub enum GeoError {
    /// Loading a table or resolving a required column failed.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// I/O error reading or writing a file.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path that caused the error.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// JSON or `GeoJSON` (de)serialization failed.
    #[error("JSON error in {path}: {source}")]
    Json {
        /// Path of the document.
        path: String,
        /// Underlying JSON error.
        source: serde_json::Error,
    },

    /// No row within the preamble looked like the expected header.
    #[error("No header row with {fields} found in the first {rows} rows of {path}")]
    HeaderNotFound {
        /// File searched.
        path: String,
        /// Rendered list of the fields that had to resolve.
        fields: String,
        /// Rows searched.
        rows: usize,
    },
}

impl GeoError {
    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }

    pub(crate) fn json(path: &std::path::Path, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.display().to_string(),
            source,
        }
    }
}
