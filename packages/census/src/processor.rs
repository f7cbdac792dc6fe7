//! Per-theme metric extraction.
//!
//! Filters a thematic table to the wanted geography codes and derives the
//! theme's counts and percentages. Optional columns degrade silently: a
//! missing total drops the total and every percentage, a category with no
//! matching headers drops that category.

use std::collections::BTreeSet;

use pip_explorer_area_models::{MetricDef, MetricTable, finite};
use pip_explorer_source::columns::{resolve_all, resolve_column, resolve_optional};
use pip_explorer_source::table::{Table, parse_number};

use crate::CensusError;
use crate::theme::{CategoryDefinition, ThemeDefinition};

/// `count / total * 100`, absent unless both are present and `total > 0`.
#[must_use]
pub fn percentage(count: Option<f64>, total: Option<f64>) -> Option<f64> {
    match (count, total) {
        (Some(count), Some(total)) if total > 0.0 => finite(count / total * 100.0),
        _ => None,
    }
}

/// Sums a row's category fragments. Any blank or non-numeric fragment makes
/// the whole sum absent rather than silently undercounting.
fn sum_cells(table: &Table, row: usize, columns: &[usize]) -> Option<f64> {
    columns.iter().try_fold(0.0, |acc, &col| {
        table.cell(row, col).and_then(parse_number).map(|v| acc + v)
    })
}

struct ResolvedCategory<'a> {
    def: &'a CategoryDefinition,
    columns: Vec<usize>,
    with_percentage: bool,
}

/// Extracts `theme`'s metrics from `table` for every row whose geography
/// code is in `codes`.
///
/// Rows for codes absent from the table are simply not present in the
/// result. When a code appears more than once, the first row wins.
///
/// # Errors
///
/// Returns [`CensusError::Source`] if the geography column cannot be
/// resolved, or if the total mapping is ambiguous.
pub fn process_theme<S: AsRef<str>>(
    table: &Table,
    theme: &ThemeDefinition,
    codes: &[S],
) -> Result<MetricTable, CensusError> {
    let geography = resolve_column(table, "geography_code", &theme.geography)?;

    let total = match &theme.total {
        Some(def) => {
            let column = resolve_optional(table, &def.metric.name, &def.column)?;
            if column.is_none() {
                log::warn!(
                    "{}: no total column ({}); percentages omitted",
                    theme.id,
                    def.column
                );
            }
            column.map(|c| (&def.metric, c))
        }
        None => None,
    };

    let categories: Vec<ResolvedCategory<'_>> = theme
        .categories
        .iter()
        .filter_map(|def| {
            let columns = resolve_all(table, &def.count.name, &def.columns);
            (!columns.is_empty()).then(|| ResolvedCategory {
                def,
                columns,
                with_percentage: def.percentage.is_some() && total.is_some(),
            })
        })
        .collect();

    let mut defs: Vec<MetricDef> = Vec::new();
    if let Some((metric, _)) = total {
        defs.push(metric.clone());
    }
    for category in &categories {
        defs.push(category.def.count.clone());
        if category.with_percentage
            && let Some(pct) = &category.def.percentage
        {
            defs.push(pct.clone());
        }
    }

    let wanted: BTreeSet<&str> = codes.iter().map(AsRef::as_ref).collect();
    let mut out = MetricTable::new(defs);
    let mut duplicates = 0_usize;

    for row in 0..table.len() {
        let Some(code) = table.cell(row, geography) else {
            continue;
        };
        if !wanted.contains(code) {
            continue;
        }

        let total_value = total.and_then(|(_, col)| table.cell(row, col).and_then(parse_number));

        let mut values = Vec::with_capacity(out.columns().len());
        if total.is_some() {
            values.push(total_value);
        }
        for category in &categories {
            let count = sum_cells(table, row, &category.columns);
            values.push(count);
            if category.with_percentage {
                values.push(percentage(count, total_value));
            }
        }

        if !out.push_row(code, values) {
            duplicates += 1;
            log::debug!("{}: duplicate row for {code} ignored", theme.id);
        }
    }

    if duplicates > 0 {
        log::warn!(
            "{}: {duplicates} duplicate geography rows ignored (first row kept)",
            theme.id
        );
    }

    log::info!(
        "  {}: {} of {} areas matched, {} metrics",
        theme.name,
        out.len(),
        wanted.len(),
        out.columns().len()
    );

    Ok(out)
}

#[cfg(test)]
mod tests {
    use pip_explorer_source::SourceError;

    use super::*;
    use crate::registry::find_theme;

    fn table(csv: &str) -> Table {
        Table::from_csv_reader("fixture", csv.as_bytes()).unwrap()
    }

    const HEALTH: &str = "date,geography,geography code,\
        General health: Total: All usual residents,General health: Very good health,\
        General health: Good health,General health: Fair health,\
        General health: Bad health,General health: Very bad health\n\
        2021,A,E02000001,200,80,60,30,20,10\n\
        2021,B,E02000002,100,50,30,10,5,5\n\
        2021,C,E02000003,0,0,0,0,0,0\n\
        2021,D,E02000004,50,,,,x,5\n";

    #[test]
    fn percentage_requires_positive_total() {
        assert_eq!(percentage(Some(5.0), Some(20.0)), Some(25.0));
        assert_eq!(percentage(Some(5.0), Some(0.0)), None);
        assert_eq!(percentage(Some(5.0), None), None);
        assert_eq!(percentage(None, Some(20.0)), None);
    }

    #[test]
    fn health_counts_and_percentages() {
        let theme = find_theme("health").unwrap();
        let out = process_theme(&table(HEALTH), &theme, &["E02000001", "E02000002"]).unwrap();

        let names: Vec<&str> = out.columns().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["health_total", "bad_health_count", "bad_health_pct"]);
        assert_eq!(out.len(), 2);
        assert_eq!(out.value("E02000001", "bad_health_count"), Some(30.0));
        assert_eq!(out.value("E02000001", "bad_health_pct"), Some(15.0));
        assert_eq!(out.value("E02000002", "bad_health_pct"), Some(10.0));
    }

    #[test]
    fn unwanted_and_absent_codes_are_dropped() {
        let theme = find_theme("health").unwrap();
        let out = process_theme(&table(HEALTH), &theme, &["E02000002", "E02999999"]).unwrap();
        assert_eq!(out.len(), 1);
        assert!(out.get("E02000001").is_none());
        assert!(out.get("E02999999").is_none());
    }

    #[test]
    fn zero_total_and_bad_cells_become_absent() {
        let theme = find_theme("health").unwrap();
        let out = process_theme(&table(HEALTH), &theme, &["E02000003", "E02000004"]).unwrap();

        assert_eq!(out.value("E02000003", "bad_health_count"), Some(0.0));
        assert_eq!(out.value("E02000003", "bad_health_pct"), None);
        assert_eq!(out.value("E02000004", "health_total"), Some(50.0));
        assert_eq!(out.value("E02000004", "bad_health_count"), None);
        assert_eq!(out.value("E02000004", "bad_health_pct"), None);
    }

    #[test]
    fn percentages_stay_within_bounds() {
        let theme = find_theme("health").unwrap();
        let codes = ["E02000001", "E02000002", "E02000003", "E02000004"];
        let out = process_theme(&table(HEALTH), &theme, &codes).unwrap();
        let pct = out.column_index("bad_health_pct").unwrap();
        for v in out.present_values(pct) {
            assert!((0.0..=100.0).contains(&v), "{v}");
        }
    }

    #[test]
    fn missing_total_drops_total_and_percentages() {
        let theme = find_theme("health").unwrap();
        let csv = "geography code,Bad health,Very bad health\nE02000001,3,1\n";
        let out = process_theme(&table(csv), &theme, &["E02000001"]).unwrap();

        let names: Vec<&str> = out.columns().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["bad_health_count"]);
        assert_eq!(out.value("E02000001", "bad_health_count"), Some(4.0));
    }

    #[test]
    fn missing_category_is_omitted() {
        let theme = find_theme("qualifications").unwrap();
        let csv = "geography code,Highest level of qualification: Total,\
                   Highest level of qualification: No qualifications\n\
                   E02000001,100,25\n";
        let out = process_theme(&table(csv), &theme, &["E02000001"]).unwrap();

        assert!(out.column_index("level4_plus_pct").is_none());
        assert_eq!(out.value("E02000001", "no_qualifications_pct"), Some(25.0));
    }

    #[test]
    fn missing_geography_column_is_fatal() {
        let theme = find_theme("health").unwrap();
        let csv = "area,total,bad health\nE02000001,10,1\n";
        let err = process_theme(&table(csv), &theme, &["E02000001"]).unwrap_err();
        assert!(matches!(
            err,
            CensusError::Source(SourceError::ColumnNotFound { .. })
        ));
    }

    #[test]
    fn first_duplicate_row_wins() {
        let theme = find_theme("health").unwrap();
        let csv = "geography code,Total,Bad health\nE02000001,10,1\nE02000001,10,9\n";
        let out = process_theme(&table(csv), &theme, &["E02000001"]).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out.value("E02000001", "bad_health_count"), Some(1.0));
    }

    #[test]
    fn deprivation_excludes_not_deprived() {
        let theme = find_theme("deprivation").unwrap();
        let csv = "geography code,Household deprivation: Total: All households,\
                   Household is not deprived in any dimension,\
                   Household is deprived in one dimension,\
                   Household is deprived in two dimensions\n\
                   E02000001,100,60,30,10\n";
        let out = process_theme(&table(csv), &theme, &["E02000001"]).unwrap();
        assert_eq!(out.value("E02000001", "deprived_households"), Some(40.0));
        assert_eq!(out.value("E02000001", "deprived_pct"), Some(40.0));
        assert_eq!(
            out.value("E02000001", "deprivation_total_households"),
            Some(100.0)
        );
    }

    #[test]
    fn economic_activity_sums_leaf_categories() {
        let theme = find_theme("economic_activity").unwrap();
        let csv = "geography code,\
            Economic activity status: Total: All usual residents aged 16 years and over,\
            Economic activity status: Economically active (excluding full-time students),\
            Economic activity status: Economically active (excluding full-time students):In employment,\
            Economic activity status: Economically active (excluding full-time students):In employment:Employee,\
            Economic activity status: Economically active (excluding full-time students):In employment:Self-employed with employees,\
            Economic activity status: Economically active (excluding full-time students): Unemployed,\
            Economic activity status: Economically active and a full-time student:In employment,\
            Economic activity status: Economically active and a full-time student: Unemployed,\
            Economic activity status: Economically inactive,\
            Economic activity status: Economically inactive: Retired,\
            Economic activity status: Economically inactive: Student\n\
            E02000001,1000,600,550,500,50,50,40,10,350,250,100\n";
        let out = process_theme(&table(csv), &theme, &["E02000001"]).unwrap();

        assert_eq!(out.value("E02000001", "total_population"), Some(1000.0));
        assert_eq!(out.value("E02000001", "unemployed_count"), Some(60.0));
        assert_eq!(out.value("E02000001", "inactive_count"), Some(350.0));
        assert_eq!(out.value("E02000001", "employed_count"), Some(590.0));
    }

    #[test]
    fn tenure_sums_owned_and_social_rented() {
        let theme = find_theme("tenure").unwrap();
        let csv = "geography code,Tenure of household: Total: All households,\
            Tenure of household: Owned,Tenure of household: Owned: Owns outright,\
            Tenure of household: Owned: Owns with a mortgage or loan,\
            Tenure of household: Shared ownership,\
            Tenure of household: Social rented,\
            Tenure of household: Social rented: Rents from council or Local Authority,\
            Tenure of household: Social rented: Other social rented,\
            Tenure of household: Private rented\n\
            E02000001,200,120,70,50,5,50,30,20,25\n";
        let out = process_theme(&table(csv), &theme, &["E02000001"]).unwrap();

        assert_eq!(out.value("E02000001", "owned"), Some(120.0));
        assert_eq!(out.value("E02000001", "owned_pct"), Some(60.0));
        assert_eq!(out.value("E02000001", "social_rented"), Some(50.0));
        assert_eq!(out.value("E02000001", "social_rented_pct"), Some(25.0));
    }
}
