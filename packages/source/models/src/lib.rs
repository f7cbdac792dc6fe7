#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Source definitions and column mapping types.
//!
//! A [`SourceDefinition`] says where a dataset lives and how it is packaged.
//! A [`ColumnSpec`] says how a canonical field is located among a table's
//! headers. Both are deserialized from TOML files embedded at compile time.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// A remote dataset, deserialized from TOML.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDefinition {
    /// Unique identifier (e.g., `"census_health"`).
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Publisher release the source and its mappings were written against.
    pub release: String,
    /// Download URL.
    pub url: String,
    /// Cache filename under the data directory.
    pub filename: String,
    /// How the payload is packaged.
    pub format: SourceFormat,
    /// Attribution shown in the export metadata.
    #[serde(default)]
    pub attribution: Option<Attribution>,
}

impl SourceDefinition {
    /// Path the raw download is cached at.
    #[must_use]
    pub fn download_path(&self, data_dir: &Path) -> PathBuf {
        data_dir.join(&self.filename)
    }

    /// Path of the tabular file the pipeline reads.
    ///
    /// For zip payloads this is the extracted member, named
    /// `<stem>_<marker>.csv` next to the archive.
    #[must_use]
    pub fn table_path(&self, data_dir: &Path) -> PathBuf {
        match &self.format {
            SourceFormat::ZipCsv { member_marker } => {
                let stem = Path::new(&self.filename)
                    .file_stem()
                    .map_or_else(|| self.id.clone(), |s| s.to_string_lossy().into_owned());
                data_dir.join(format!("{stem}_{}.csv", member_marker.to_lowercase()))
            }
            SourceFormat::Csv | SourceFormat::Spreadsheet { .. } => self.download_path(data_dir),
        }
    }
}

/// Payload packaging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceFormat {
    /// Plain CSV file.
    Csv,
    /// Excel workbook; the named sheet, or the first one.
    Spreadsheet {
        #[serde(default)]
        sheet: Option<String>,
    },
    /// Zip archive containing one CSV per geography level.
    ZipCsv {
        /// Substring (case-insensitive) identifying the wanted member,
        /// e.g. `"msoa"`.
        member_marker: String,
    },
}

/// Attribution text for a dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribution {
    /// Key in the export's `data_sources` object. Sources sharing a key
    /// share one line.
    pub key: String,
    /// Verbatim attribution text.
    pub text: String,
}

/// A header predicate over lower-cased, trimmed header text.
///
/// A header matches when it contains every `all_of` term, at least one
/// `any_of` term (if any are given), and no `none_of` term.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnPattern {
    #[serde(default)]
    pub all_of: Vec<String>,
    #[serde(default)]
    pub any_of: Vec<String>,
    #[serde(default)]
    pub none_of: Vec<String>,
}

impl ColumnPattern {
    /// Pattern requiring every term.
    #[must_use]
    pub fn all_of(terms: &[&str]) -> Self {
        Self {
            all_of: terms.iter().map(|t| (*t).to_string()).collect(),
            ..Self::default()
        }
    }

    /// Pattern requiring any of the terms.
    #[must_use]
    pub fn any_of(terms: &[&str]) -> Self {
        Self {
            any_of: terms.iter().map(|t| (*t).to_string()).collect(),
            ..Self::default()
        }
    }

    /// Adds exclusion terms.
    #[must_use]
    pub fn excluding(mut self, terms: &[&str]) -> Self {
        self.none_of.extend(terms.iter().map(|t| (*t).to_string()));
        self
    }

    /// Whether the pattern has no inclusion terms (and so never matches).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.all_of.is_empty() && self.any_of.is_empty()
    }

    /// Tests a raw header.
    #[must_use]
    pub fn matches(&self, header: &str) -> bool {
        if self.is_empty() {
            return false;
        }
        let header = header.trim().to_lowercase();
        let contains = |term: &String| header.contains(&term.to_lowercase());

        self.all_of.iter().all(contains)
            && (self.any_of.is_empty() || self.any_of.iter().any(contains))
            && !self.none_of.iter().any(contains)
    }
}

impl fmt::Display for ColumnPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if !self.all_of.is_empty() {
            parts.push(format!("all of {:?}", self.all_of));
        }
        if !self.any_of.is_empty() {
            parts.push(format!("any of {:?}", self.any_of));
        }
        if !self.none_of.is_empty() {
            parts.push(format!("none of {:?}", self.none_of));
        }
        write!(f, "{}", parts.join(", "))
    }
}

/// How a single canonical column is found.
///
/// Patterns are tried in order. The first pattern that matches exactly one
/// header wins; a pattern matching several headers is an error rather than
/// a silent first pick. If nothing matches, the fallback (if any) applies.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub patterns: Vec<ColumnPattern>,
    #[serde(default)]
    pub fallback: Option<ColumnFallback>,
}

impl ColumnSpec {
    #[must_use]
    pub fn new(patterns: Vec<ColumnPattern>) -> Self {
        Self {
            patterns,
            fallback: None,
        }
    }

    #[must_use]
    pub fn with_fallback(mut self, fallback: ColumnFallback) -> Self {
        self.fallback = Some(fallback);
        self
    }
}

impl fmt::Display for ColumnSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let patterns: Vec<String> = self.patterns.iter().map(ToString::to_string).collect();
        write!(f, "[{}]", patterns.join(" | "))
    }
}

/// What to do when no header pattern matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ColumnFallback {
    /// Use the first column of the table.
    FirstColumn,
    /// Use the first column whose first non-empty value starts with
    /// `prefix` (e.g. `"E02"` for MSOA codes).
    ValuePrefix { prefix: String },
}
