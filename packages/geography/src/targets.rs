//! Target neighbourhood list.

use std::collections::BTreeSet;

use pip_explorer_area_models::{TargetArea, TargetList};
use pip_explorer_geography_models::TargetMapping;
use pip_explorer_source::columns::{resolve_column, resolve_optional};
use pip_explorer_source::table::Table;

use crate::GeoError;

/// Reads the target areas from the neighbourhood list.
///
/// Rows with a blank code are skipped; a repeated code keeps its first row.
/// Name and local authority are optional columns.
///
/// # Errors
///
/// Returns [`GeoError::Source`] if the code column cannot be found by
/// mapping or by sniffing values, or if an optional mapping is ambiguous.
pub fn load_targets(table: &Table, mapping: &TargetMapping) -> Result<TargetList, GeoError> {
    let code_col = resolve_column(table, "msoa_code", &mapping.code)?;
    let name = match &mapping.name {
        Some(spec) => resolve_optional(table, "neighbourhood_name", spec)?,
        None => None,
    };
    let local_authority = match &mapping.local_authority {
        Some(spec) => resolve_optional(table, "local_authority", spec)?,
        None => None,
    };

    log::debug!("  Columns: {:?}", table.headers());

    let text = |row: usize, col: Option<usize>| {
        col.and_then(|c| table.cell(row, c))
            .filter(|v| !v.is_empty())
            .map(ToString::to_string)
    };

    let mut seen = BTreeSet::new();
    let mut areas = Vec::new();
    for row in 0..table.len() {
        let Some(code) = table.cell(row, code_col).filter(|c| !c.is_empty()) else {
            continue;
        };
        if !seen.insert(code) {
            log::warn!("{}: duplicate target {code} ignored", table.name());
            continue;
        }
        areas.push(TargetArea {
            code: code.to_string(),
            name: text(row, name),
            local_authority: text(row, local_authority),
        });
    }

    log::info!("  Found {} Pride in Place neighbourhoods", areas.len());

    Ok(TargetList {
        areas,
        has_name: name.is_some(),
        has_local_authority: local_authority.is_some(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mappings::target_mapping;

    fn table(csv: &str) -> Table {
        Table::from_csv_reader("pip", csv.as_bytes()).unwrap()
    }

    #[test]
    fn reads_named_columns() {
        let csv = "MSOA code,Neighbourhood,Local Authority\n\
                   E02001954,Northfield,Birmingham\n\
                   E02001947,Kingstanding,Birmingham\n";
        let list = load_targets(&table(csv), &target_mapping()).unwrap();

        assert!(list.has_name);
        assert!(list.has_local_authority);
        assert_eq!(list.codes(), vec!["E02001954", "E02001947"]);
        assert_eq!(list.areas[0].name.as_deref(), Some("Northfield"));
        assert_eq!(list.areas[1].local_authority.as_deref(), Some("Birmingham"));
    }

    #[test]
    fn sniffs_code_column_by_prefix() {
        let csv = "Area,Ref\nSomewhere,E02001405\nElsewhere,E02001406\n,\n";
        let list = load_targets(&table(csv), &target_mapping()).unwrap();

        assert!(!list.has_name);
        assert!(!list.has_local_authority);
        assert_eq!(list.codes(), vec!["E02001405", "E02001406"]);
    }

    #[test]
    fn duplicate_codes_keep_first_row() {
        let csv = "MSOA code,Neighbourhood\nE02001094,First\nE02001094,Second\n";
        let list = load_targets(&table(csv), &target_mapping()).unwrap();
        assert_eq!(list.areas.len(), 1);
        assert_eq!(list.areas[0].name.as_deref(), Some("First"));
    }

    #[test]
    fn missing_code_column_is_fatal() {
        let csv = "Area,Ref\nSomewhere,X1\n";
        assert!(load_targets(&table(csv), &target_mapping()).is_err());
    }
}
