//! Percentile ranks against a national reference distribution.
//!
//! `percentile(x) = |{r in reference : r < x}| / |reference| * 100`, using
//! only the reference's present values. Ties are not counted, so the
//! national minimum ranks at 0 and a shared maximum ranks below 100.

use pip_explorer_area_models::{Direction, MetricDef, MetricKind, MetricTable};

/// A metric's national distribution, sorted for binary search.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reference {
    sorted: Vec<f64>,
}

impl Reference {
    /// Builds a reference from present values. Non-finite values are
    /// discarded.
    #[must_use]
    pub fn new(values: impl IntoIterator<Item = f64>) -> Self {
        let mut sorted: Vec<f64> = values.into_iter().filter(|v| v.is_finite()).collect();
        sorted.sort_by(f64::total_cmp);
        Self { sorted }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sorted.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sorted.is_empty()
    }

    /// Uncorrected percentile of `value`, or `None` for an empty reference
    /// or a non-finite value.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn raw_percentile(&self, value: f64) -> Option<f64> {
        if self.sorted.is_empty() || !value.is_finite() {
            return None;
        }
        let below = self.sorted.partition_point(|&r| r < value);
        Some(below as f64 / self.sorted.len() as f64 * 100.0)
    }

    /// Direction-corrected percentile: higher always means more deprived.
    /// A missing value has a missing percentile.
    #[must_use]
    pub fn percentile(&self, value: Option<f64>, direction: Direction) -> Option<f64> {
        let raw = self.raw_percentile(value?)?;
        Some(match direction {
            Direction::WorseIfHigher => raw,
            Direction::WorseIfLower => 100.0 - raw,
        })
    }
}

/// Appends a `<metric>_percentile` column to `targets` for every metric it
/// shares with `reference`.
///
/// Percentile columns are never ranked again. A metric with no present
/// reference values gets an all-absent percentile column.
#[must_use]
pub fn rank_against(targets: &MetricTable, reference: &MetricTable) -> MetricTable {
    log::info!("Calculating percentile rankings...");

    let mut defs: Vec<MetricDef> = Vec::new();
    let mut ranked: Vec<(usize, Reference, Direction)> = Vec::new();

    for (index, def) in targets.columns().iter().enumerate() {
        if def.kind == MetricKind::Percentile
            || targets.column_index(&def.percentile_name()).is_some()
        {
            continue;
        }
        let Some(reference_index) = reference.column_index(&def.name) else {
            log::debug!("{}: not in reference table, not ranked", def.name);
            continue;
        };
        let distribution = Reference::new(reference.present_values(reference_index));
        if distribution.is_empty() {
            log::warn!("{}: no national values, percentiles absent", def.name);
        }
        defs.push(def.percentile());
        ranked.push((index, distribution, def.direction));
    }

    let values: Vec<Vec<Option<f64>>> = targets
        .rows()
        .iter()
        .map(|row| {
            ranked
                .iter()
                .map(|(index, distribution, direction)| {
                    distribution.percentile(row.values[*index], *direction)
                })
                .collect()
        })
        .collect();

    log::info!("  Ranked {} metrics for {} areas", defs.len(), targets.len());
    targets.with_columns(defs, &values)
}
