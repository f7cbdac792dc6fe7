//! Theme definition types, deserialized from `themes/*.toml`.

use pip_explorer_area_models::MetricDef;
use pip_explorer_source::models::{ColumnPattern, ColumnSpec};
use serde::{Deserialize, Serialize};

/// One thematic census table and the metrics derived from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemeDefinition {
    /// Unique identifier (e.g., `"health"`).
    pub id: String,
    /// Human-readable name used in log output.
    pub name: String,
    /// Id of the registered source holding the table.
    pub source: String,
    /// Publisher release the column mapping was written against.
    pub release: String,
    /// Version of this mapping; bumped whenever patterns change.
    pub schema_version: u32,
    /// Geography code column.
    pub geography: ColumnSpec,
    /// Denominator for derived percentages.
    #[serde(default)]
    pub total: Option<TotalDefinition>,
    /// Categories of interest, in output order.
    #[serde(default)]
    pub categories: Vec<CategoryDefinition>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TotalDefinition {
    pub metric: MetricDef,
    pub column: ColumnSpec,
}

/// A category whose matching columns are summed into one count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryDefinition {
    pub id: String,
    /// Every header matching this pattern is a fragment of the category.
    pub columns: ColumnPattern,
    pub count: MetricDef,
    /// Derived `count / total * 100`; only emitted when a total resolved.
    #[serde(default)]
    pub percentage: Option<MetricDef>,
}

impl ThemeDefinition {
    /// Every metric this theme can emit, in output order.
    #[must_use]
    pub fn metrics(&self) -> Vec<&MetricDef> {
        let mut metrics = Vec::new();
        if let Some(total) = &self.total {
            metrics.push(&total.metric);
        }
        for category in &self.categories {
            metrics.push(&category.count);
            if let Some(pct) = &category.percentage {
                metrics.push(pct);
            }
        }
        metrics
    }
}
