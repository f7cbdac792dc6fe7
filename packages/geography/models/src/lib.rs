#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Geographic mapping and document types.
//!
//! Column mappings for the lookup, deprivation, target-list and auxiliary
//! input files, plus the per-MSOA LSOA document written by the `lsoa`
//! command and read back by the `boundaries` command.

use std::collections::BTreeMap;

use pip_explorer_area_models::MetricDef;
use pip_explorer_source_models::ColumnSpec;
use serde::{Deserialize, Serialize};

/// Columns of an LSOA to MSOA lookup file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupMapping {
    pub release: String,
    pub schema_version: u32,
    /// Fine-grained (LSOA) code.
    pub lsoa: ColumnSpec,
    /// Coarse-grained (MSOA) code.
    pub msoa: ColumnSpec,
}

/// A published LSOA-level score table averaged up to MSOA level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreMapping {
    pub id: String,
    /// Id of the registered source holding the table.
    pub source: String,
    pub release: String,
    pub schema_version: u32,
    pub lsoa: ColumnSpec,
    /// Score columns to average. Rank and decile columns are never listed:
    /// they do not survive averaging.
    pub scores: Vec<ScoreColumn>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreColumn {
    pub metric: MetricDef,
    pub column: ColumnSpec,
}

/// Columns of the target neighbourhood list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetMapping {
    pub release: String,
    pub schema_version: u32,
    pub code: ColumnSpec,
    #[serde(default)]
    pub name: Option<ColumnSpec>,
    #[serde(default)]
    pub local_authority: Option<ColumnSpec>,
}

/// Columns of the inputs joined into the LSOA document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LsoaExtractMapping {
    pub release: String,
    pub schema_version: u32,
    pub classification: ClassificationMapping,
    pub centroids: CentroidMapping,
}

/// Hyper-local need classification file. Its header row sits below a
/// free-text preamble of unknown length.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationMapping {
    /// How many leading rows to search for the header.
    pub max_preamble_rows: usize,
    pub lsoa: ColumnSpec,
    pub typology: ColumnSpec,
}

/// LSOA population-weighted centroid file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CentroidMapping {
    pub lsoa: ColumnSpec,
    pub name: ColumnSpec,
    pub lat: ColumnSpec,
    pub lng: ColumnSpec,
}

/// One LSOA within an MSOA, as written to `lsoa_data.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LsoaRecord {
    pub code: String,
    pub name: String,
    pub lat: f64,
    pub lng: f64,
    /// Typology label; empty when the LSOA is not classified.
    pub classification: String,
}

/// MSOA code to its LSOAs.
pub type LsoaData = BTreeMap<String, Vec<LsoaRecord>>;
