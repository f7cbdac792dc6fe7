#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Dashboard dataset export.
//!
//! Writes `{ "metadata": {...}, "areas": [...] }`: one object per target
//! area with its descriptive fields, every metric, and every percentile.
//! Absent values are written as `null`, never omitted, so every area
//! carries the same key set.

use std::path::Path;

use chrono::{DateTime, Utc};
use pip_explorer_area_models::{MetricTable, TargetList};
use pip_explorer_source::models::SourceDefinition;
use pip_explorer_source::paths::write_atomic;
use serde::Serialize;
use serde::ser::{SerializeMap as _, Serializer};
use thiserror::Error;

/// Version of the exported document's shape. Bump when keys are renamed
/// or removed.
pub const SCHEMA_VERSION: u32 = 1;

/// Errors that can occur while exporting.
#[derive(Debug, Error)]
pub enum GenerateError {
    /// Serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The output file could not be written.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Output path.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// Attribution lines keyed by source group, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataSources(Vec<(String, String)>);

impl DataSources {
    /// Collects the attributions of `sources`. Sources sharing a key
    /// contribute one line, taken from the first of them.
    #[must_use]
    pub fn from_sources(sources: &[SourceDefinition]) -> Self {
        let mut entries: Vec<(String, String)> = Vec::new();
        for attribution in sources.iter().filter_map(|s| s.attribution.as_ref()) {
            if !entries.iter().any(|(key, _)| *key == attribution.key) {
                entries.push((attribution.key.clone(), attribution.text.clone()));
            }
        }
        Self(entries)
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, text)| text.as_str())
    }
}

impl Serialize for DataSources {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, text) in &self.0 {
            map.serialize_entry(key, text)?;
        }
        map.end()
    }
}

/// Run-level metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metadata {
    pub generated: DateTime<Utc>,
    pub total_areas: usize,
    pub data_sources: DataSources,
    pub schema_version: u32,
}

/// One exported area: descriptive fields, then metrics in table order.
#[derive(Debug)]
pub struct AreaRecord<'a> {
    targets: &'a TargetList,
    index: usize,
    table: &'a MetricTable,
}

impl Serialize for AreaRecord<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let area = &self.targets.areas[self.index];
        let values = self.table.get(&area.code).map(|row| row.values.as_slice());

        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("msoa_code", &area.code)?;
        if self.targets.has_name {
            map.serialize_entry("neighbourhood_name", &area.name)?;
        }
        if self.targets.has_local_authority {
            map.serialize_entry("local_authority", &area.local_authority)?;
        }
        for (i, column) in self.table.columns().iter().enumerate() {
            let value = values.and_then(|v| v.get(i).copied().flatten());
            map.serialize_entry(&column.name, &value)?;
        }
        map.end()
    }
}

/// The complete dashboard document.
#[derive(Debug, Serialize)]
pub struct Dataset<'a> {
    pub metadata: Metadata,
    pub areas: Vec<AreaRecord<'a>>,
}

impl<'a> Dataset<'a> {
    /// Pairs each target area with its row in `table` (rows are looked up
    /// by code, so a missing row exports as all-null metrics).
    #[must_use]
    pub fn new(
        targets: &'a TargetList,
        table: &'a MetricTable,
        data_sources: DataSources,
        generated: DateTime<Utc>,
    ) -> Self {
        let areas = (0..targets.areas.len())
            .map(|index| AreaRecord {
                targets,
                index,
                table,
            })
            .collect::<Vec<_>>();
        Self {
            metadata: Metadata {
                generated,
                total_areas: areas.len(),
                data_sources,
                schema_version: SCHEMA_VERSION,
            },
            areas,
        }
    }

    /// Pretty-printed JSON, two-space indented, non-ASCII kept as UTF-8.
    ///
    /// # Errors
    ///
    /// Returns [`GenerateError::Json`] if serialization fails.
    pub fn to_json(&self) -> Result<Vec<u8>, GenerateError> {
        Ok(serde_json::to_vec_pretty(self)?)
    }
}

/// Writes `dataset` to `path` atomically.
///
/// # Errors
///
/// Returns [`GenerateError`] if serialization or the write fails; in that
/// case no file is left at `path`.
pub fn export_to_json(dataset: &Dataset<'_>, path: &Path) -> Result<(), GenerateError> {
    log::info!("Exporting to {}...", path.display());
    let json = dataset.to_json()?;
    write_atomic(path, &json).map_err(|e| GenerateError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    log::info!("  Exported {} areas", dataset.metadata.total_areas);
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone as _;
    use pip_explorer_area_models::{Direction, MetricDef, MetricKind, TargetArea};
    use pip_explorer_source::registry::all_sources;
    use serde_json::Value;

    use super::*;

    fn fixture() -> (TargetList, MetricTable) {
        let targets = TargetList {
            areas: vec![
                TargetArea {
                    code: "E02001954".to_string(),
                    name: Some("Northfield".to_string()),
                    local_authority: Some("Birmingham".to_string()),
                },
                TargetArea {
                    code: "E02006545".to_string(),
                    name: None,
                    local_authority: Some("Sunderland".to_string()),
                },
            ],
            has_name: true,
            has_local_authority: true,
        };
        let mut table = MetricTable::new(vec![
            MetricDef::new("bad_health_pct", MetricKind::Percentage, Direction::WorseIfHigher),
            MetricDef::new(
                "bad_health_pct_percentile",
                MetricKind::Percentile,
                Direction::WorseIfHigher,
            ),
        ]);
        table.push_row("E02001954", vec![Some(7.5), Some(82.25)]);
        (targets, table)
    }

    fn generated() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 11, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn data_sources_follow_registry_order() {
        let sources = DataSources::from_sources(&all_sources());
        let keys: Vec<&str> = sources.0.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, ["pride_in_place", "census_2021", "imd_2025"]);
        assert_eq!(
            sources.get("imd_2025"),
            Some("MHCLG English Indices of Deprivation 2025")
        );
    }

    #[test]
    fn areas_have_uniform_keys_and_nulls() {
        let (targets, table) = fixture();
        let dataset = Dataset::new(&targets, &table, DataSources::default(), generated());
        let json: Value = serde_json::from_slice(&dataset.to_json().unwrap()).unwrap();

        assert_eq!(json["metadata"]["total_areas"], 2);
        assert_eq!(json["metadata"]["schema_version"], SCHEMA_VERSION);
        assert_eq!(json["metadata"]["generated"], "2025-11-01T12:00:00Z");

        let areas = json["areas"].as_array().unwrap();
        assert_eq!(areas[0]["neighbourhood_name"], "Northfield");
        assert_eq!(areas[0]["bad_health_pct"], 7.5);
        assert_eq!(areas[0]["bad_health_pct_percentile"], 82.25);

        assert!(areas[1]["neighbourhood_name"].is_null());
        assert!(areas[1]["bad_health_pct"].is_null());
        let keys = |v: &Value| v.as_object().unwrap().len();
        assert_eq!(keys(&areas[0]), keys(&areas[1]));
    }

    #[test]
    fn key_order_is_descriptive_then_metrics() {
        let (targets, table) = fixture();
        let dataset = Dataset::new(&targets, &table, DataSources::default(), generated());
        let text = String::from_utf8(dataset.to_json().unwrap()).unwrap();

        let pos = |key: &str| text.find(&format!("\"{key}\"")).unwrap();
        assert!(pos("msoa_code") < pos("neighbourhood_name"));
        assert!(pos("neighbourhood_name") < pos("local_authority"));
        assert!(pos("local_authority") < pos("bad_health_pct"));
        assert!(pos("bad_health_pct") < pos("bad_health_pct_percentile"));
    }

    #[test]
    fn unresolved_descriptive_columns_are_omitted() {
        let (mut targets, table) = fixture();
        targets.has_name = false;
        targets.has_local_authority = false;
        let dataset = Dataset::new(&targets, &table, DataSources::default(), generated());
        let json: Value = serde_json::from_slice(&dataset.to_json().unwrap()).unwrap();

        assert!(json["areas"][0].get("neighbourhood_name").is_none());
        assert!(json["areas"][0].get("local_authority").is_none());
    }

    #[test]
    fn same_inputs_give_identical_areas() {
        let (targets, table) = fixture();
        let a = Dataset::new(&targets, &table, DataSources::default(), generated());
        let b = Dataset::new(&targets, &table, DataSources::default(), Utc::now());
        let areas = |d: &Dataset<'_>| serde_json::to_string(&d.areas).unwrap();
        assert_eq!(areas(&a), areas(&b));
    }

    #[test]
    fn writes_file_atomically() {
        let dir = std::env::temp_dir().join("pip_explorer_export_test");
        let _ = std::fs::remove_dir_all(&dir);
        let path = dir.join("data.json");

        let (targets, table) = fixture();
        let dataset = Dataset::new(&targets, &table, DataSources::default(), generated());
        export_to_json(&dataset, &path).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("{\n  \"metadata\""));
        assert!(!dir.join("data.json.tmp").exists());

        let _ = std::fs::remove_dir_all(&dir);
    }
}
