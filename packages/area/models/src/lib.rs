#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Area and metric types shared by every pipeline stage.
//!
//! A [`MetricTable`] holds one row per geography code and one column per
//! registered [`MetricDef`]. Stages never mutate a published table: joins,
//! selections and derived columns all produce a new table.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Which end of a metric's range denotes the more deprived position.
///
/// Every registered metric must declare one; there is no default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Larger raw values are worse (e.g. unemployment count).
    WorseIfHigher,
    /// Smaller raw values are worse (e.g. home ownership rate).
    WorseIfLower,
}

/// What sort of quantity a metric column holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    /// Raw count (people, households).
    Count,
    /// Derived percentage, `count / total * 100`.
    Percentage,
    /// Published score (e.g. an IMD domain score).
    Score,
    /// National percentile rank, 0-100, higher = more deprived.
    Percentile,
}

/// A named metric with its kind and deprivation direction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricDef {
    /// Output field name (e.g. `"bad_health_pct"`).
    pub name: String,
    /// Kind of quantity.
    pub kind: MetricKind,
    /// Deprivation direction used by the percentile ranker.
    pub direction: Direction,
}

impl MetricDef {
    #[must_use]
    pub fn new(name: impl Into<String>, kind: MetricKind, direction: Direction) -> Self {
        Self {
            name: name.into(),
            kind,
            direction,
        }
    }

    /// Name of the percentile column derived from this metric.
    #[must_use]
    pub fn percentile_name(&self) -> String {
        format!("{}_percentile", self.name)
    }

    /// Definition of the percentile column derived from this metric.
    ///
    /// Percentiles are already direction-corrected, so they are always
    /// [`Direction::WorseIfHigher`].
    #[must_use]
    pub fn percentile(&self) -> Self {
        Self::new(
            self.percentile_name(),
            MetricKind::Percentile,
            Direction::WorseIfHigher,
        )
    }
}

/// Returns `Some(value)` only for finite numbers.
#[must_use]
pub fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}

/// One area's metric values, aligned with the owning table's columns.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricRow {
    /// Geography code (e.g. `"E02001954"`).
    pub code: String,
    /// Values in column order; `None` is an explicit absence.
    pub values: Vec<Option<f64>>,
}

/// A code-keyed table of metric values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricTable {
    columns: Vec<MetricDef>,
    rows: Vec<MetricRow>,
    index: BTreeMap<String, usize>,
}

impl MetricTable {
    /// Creates an empty table with the given columns.
    ///
    /// Later columns whose name repeats an earlier one are dropped.
    #[must_use]
    pub fn new(columns: Vec<MetricDef>) -> Self {
        let mut unique: Vec<MetricDef> = Vec::with_capacity(columns.len());
        for column in columns {
            if !unique.iter().any(|c| c.name == column.name) {
                unique.push(column);
            }
        }
        Self {
            columns: unique,
            rows: Vec::new(),
            index: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn columns(&self) -> &[MetricDef] {
        &self.columns
    }

    #[must_use]
    pub fn rows(&self) -> &[MetricRow] {
        &self.rows
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of the named column.
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Appends a row, returning `false` if the code is already present.
    ///
    /// `values` is padded or truncated to the column count, and any
    /// non-finite value is stored as absent.
    pub fn push_row(&mut self, code: impl Into<String>, mut values: Vec<Option<f64>>) -> bool {
        let code = code.into();
        if self.index.contains_key(&code) {
            return false;
        }
        values.resize(self.columns.len(), None);
        let values = values.into_iter().map(|v| v.and_then(finite)).collect();
        self.index.insert(code.clone(), self.rows.len());
        self.rows.push(MetricRow { code, values });
        true
    }

    /// Row for a code, if present.
    #[must_use]
    pub fn get(&self, code: &str) -> Option<&MetricRow> {
        self.index.get(code).map(|&i| &self.rows[i])
    }

    /// A single cell.
    #[must_use]
    pub fn value(&self, code: &str, column: &str) -> Option<f64> {
        let col = self.column_index(column)?;
        self.get(code)?.values[col]
    }

    /// All present values of a column, in row order.
    #[must_use]
    pub fn present_values(&self, column: usize) -> Vec<f64> {
        self.rows
            .iter()
            .filter_map(|row| row.values.get(column).copied().flatten())
            .collect()
    }

    /// Outer join on geography code.
    ///
    /// Columns of `other` whose names already exist here are ignored. Rows
    /// keep this table's order, followed by rows only present in `other`.
    #[must_use]
    pub fn merge(&self, other: &Self) -> Self {
        let added: Vec<(usize, &MetricDef)> = other
            .columns
            .iter()
            .enumerate()
            .filter(|(_, c)| self.column_index(&c.name).is_none())
            .collect();

        let mut columns = self.columns.clone();
        columns.extend(added.iter().map(|(_, c)| (*c).clone()));
        let mut merged = Self::new(columns);

        for row in &self.rows {
            let mut values = row.values.clone();
            let theirs = other.get(&row.code);
            values.extend(added.iter().map(|(i, _)| theirs.and_then(|r| r.values[*i])));
            merged.push_row(row.code.clone(), values);
        }

        for row in &other.rows {
            if self.get(&row.code).is_some() {
                continue;
            }
            let mut values = vec![None; self.columns.len()];
            values.extend(added.iter().map(|(i, _)| row.values[*i]));
            merged.push_row(row.code.clone(), values);
        }

        merged
    }

    /// Left-join selection: one row per requested code, in request order.
    ///
    /// Codes missing from this table become all-absent rows. Repeated codes
    /// are kept so that the result mirrors the request list exactly.
    #[must_use]
    pub fn select<S: AsRef<str>>(&self, codes: &[S]) -> Self {
        let mut selected = Self::new(self.columns.clone());
        for code in codes {
            let code = code.as_ref();
            let values = self
                .get(code)
                .map_or_else(|| vec![None; self.columns.len()], |r| r.values.clone());
            if !selected.index.contains_key(code) {
                selected.index.insert(code.to_string(), selected.rows.len());
            }
            selected.rows.push(MetricRow {
                code: code.to_string(),
                values,
            });
        }
        selected
    }

    /// Returns a copy with extra columns appended.
    ///
    /// `values[i]` holds the new cells for row `i`; missing cells are absent.
    #[must_use]
    pub fn with_columns(&self, defs: Vec<MetricDef>, values: &[Vec<Option<f64>>]) -> Self {
        let mut out = self.clone();
        let width = defs.len();
        out.columns.extend(defs);
        for (i, row) in out.rows.iter_mut().enumerate() {
            let mut extra = values.get(i).cloned().unwrap_or_default();
            extra.resize(width, None);
            row.values.extend(extra.into_iter().map(|v| v.and_then(finite)));
        }
        out
    }
}

/// One of the areas the dashboard reports on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetArea {
    /// Coarse geography code (MSOA).
    pub code: String,
    /// Human-readable neighbourhood name, if the source lists one.
    pub name: Option<String>,
    /// Enclosing local authority, if the source lists one.
    pub local_authority: Option<String>,
}

/// The ordered list of target areas plus which descriptive fields were
/// available in the source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetList {
    pub areas: Vec<TargetArea>,
    pub has_name: bool,
    pub has_local_authority: bool,
}

impl TargetList {
    /// Target codes in list order.
    #[must_use]
    pub fn codes(&self) -> Vec<&str> {
        self.areas.iter().map(|a| a.code.as_str()).collect()
    }
}
