#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Dataset acquisition for the pip-explorer pipeline.
//!
//! Downloads source files into a local cache directory, extracts the
//! wanted member of zipped census releases, loads CSV and Excel payloads
//! into string [`table::Table`]s, and resolves canonical columns through
//! the versioned mappings in [`pip_explorer_source_models`].

pub mod archive;
pub mod columns;
pub mod download;
pub mod paths;
pub mod progress;
pub mod registry;
pub mod table;

pub use pip_explorer_source_models as models;

/// Errors that can occur while fetching or reading source data.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered with a non-success status.
    #[error("HTTP {status} for {url}")]
    HttpStatus {
        /// Request URL.
        url: String,
        /// HTTP status code.
        status: u16,
    },

    /// I/O error reading or writing a cached file.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path that caused the error.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// CSV parsing failed.
    #[error("CSV error in {path}: {source}")]
    Csv {
        /// Path or label of the CSV input.
        path: String,
        /// Underlying CSV error.
        source: csv::Error,
    },

    /// Excel workbook could not be read.
    #[error("Spreadsheet error in {path}: {message}")]
    Spreadsheet {
        /// Workbook path.
        path: String,
        /// Description of what went wrong.
        message: String,
    },

    /// Zip archive could not be read.
    #[error("Zip error in {path}: {source}")]
    Zip {
        /// Archive path.
        path: String,
        /// Underlying zip error.
        source: zip::result::ZipError,
    },

    /// The archive has no member matching the expected marker.
    #[error("No CSV member containing '{marker}' found in {archive}")]
    MemberNotFound {
        /// Archive path.
        archive: String,
        /// Member name marker (e.g. `"msoa"`).
        marker: String,
    },

    /// No header matched the column mapping.
    #[error("Column '{field}' not found in {table} (looked for {spec})")]
    ColumnNotFound {
        /// Table label.
        table: String,
        /// Canonical field being resolved.
        field: String,
        /// Rendered column mapping.
        spec: String,
    },

    /// A mapping pattern matched more than one header.
    #[error("Column '{field}' is ambiguous in {table}: {spec} matches {matches:?}")]
    AmbiguousColumn {
        /// Table label.
        table: String,
        /// Canonical field being resolved.
        field: String,
        /// Rendered pattern.
        spec: String,
        /// Every matching header.
        matches: Vec<String>,
    },

    /// No registered source has this id.
    #[error("Unknown source: {0}")]
    UnknownSource(String),
}

impl SourceError {
    /// Wraps an I/O error with the path it happened on.
    #[must_use]
    pub fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }
}
