//! Column resolution against versioned header mappings.
//!
//! Upstream releases rename headers freely, so every canonical field is
//! located through a [`ColumnSpec`]. Resolution is strict: a pattern that
//! matches several headers is an error, never a silent first pick.

use pip_explorer_source_models::{ColumnFallback, ColumnPattern, ColumnSpec};

use crate::SourceError;
use crate::table::Table;

/// Indices of every header matching `pattern`, in header order.
#[must_use]
pub fn matching_columns(table: &Table, pattern: &ColumnPattern) -> Vec<usize> {
    table
        .headers()
        .iter()
        .enumerate()
        .filter(|(_, h)| pattern.matches(h))
        .map(|(i, _)| i)
        .collect()
}

/// Resolves a column that may legitimately be missing.
///
/// Returns `Ok(None)` when neither the patterns nor the fallback find a
/// column.
///
/// # Errors
///
/// Returns [`SourceError::AmbiguousColumn`] if a pattern matches more than
/// one header.
pub fn resolve_optional(
    table: &Table,
    field: &str,
    spec: &ColumnSpec,
) -> Result<Option<usize>, SourceError> {
    for pattern in &spec.patterns {
        let matches = matching_columns(table, pattern);
        match matches.as_slice() {
            [] => {}
            [single] => {
                log::trace!(
                    "{}: '{field}' -> '{}'",
                    table.name(),
                    table.headers()[*single]
                );
                return Ok(Some(*single));
            }
            _ => {
                return Err(SourceError::AmbiguousColumn {
                    table: table.name().to_string(),
                    field: field.to_string(),
                    spec: pattern.to_string(),
                    matches: matches.iter().map(|&i| table.headers()[i].clone()).collect(),
                });
            }
        }
    }

    let fallback = match &spec.fallback {
        None => None,
        Some(ColumnFallback::FirstColumn) => (!table.headers().is_empty()).then_some(0),
        Some(ColumnFallback::ValuePrefix { prefix }) => column_by_value_prefix(table, prefix),
    };

    if let Some(index) = fallback {
        log::info!(
            "{}: '{field}' resolved by fallback to '{}'",
            table.name(),
            table.headers()[index]
        );
    }

    Ok(fallback)
}

/// Resolves a column that must be present.
///
/// # Errors
///
/// Returns [`SourceError::ColumnNotFound`] if nothing matches, or
/// [`SourceError::AmbiguousColumn`] if a pattern matches several headers.
pub fn resolve_column(table: &Table, field: &str, spec: &ColumnSpec) -> Result<usize, SourceError> {
    resolve_optional(table, field, spec)?.ok_or_else(|| SourceError::ColumnNotFound {
        table: table.name().to_string(),
        field: field.to_string(),
        spec: spec.to_string(),
    })
}

/// Resolves every header making up one category.
///
/// Census tables split a category into fragments (e.g. "bad health" and
/// "very bad health"); all matching columns are returned so that callers can
/// sum them.
#[must_use]
pub fn resolve_all(table: &Table, field: &str, pattern: &ColumnPattern) -> Vec<usize> {
    let matches = matching_columns(table, pattern);
    if matches.is_empty() {
        log::warn!("{}: no columns for '{field}' ({pattern})", table.name());
    } else {
        log::trace!(
            "{}: '{field}' <- {:?}",
            table.name(),
            matches.iter().map(|&i| &table.headers()[i]).collect::<Vec<_>>()
        );
    }
    matches
}

/// First column whose first non-empty cell starts with `prefix`.
fn column_by_value_prefix(table: &Table, prefix: &str) -> Option<usize> {
    (0..table.headers().len()).find(|&col| {
        table
            .column(col)
            .find(|cell| !cell.is_empty())
            .is_some_and(|cell| cell.starts_with(prefix))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn census_table() -> Table {
        Table::from_csv_reader(
            "ts037",
            "date,geography,geography code,General health: Total: All usual residents,\
             General health: Very good health,General health: Good health,\
             General health: Bad health,General health: Very bad health\n\
             2021,Area A,E02000001,100,40,30,20,10\n"
                .as_bytes(),
        )
        .unwrap()
    }

    #[test]
    fn prefers_geography_code_over_geography() {
        let table = census_table();
        let spec = ColumnSpec::new(vec![ColumnPattern::all_of(&["geography", "code"])]);
        assert_eq!(resolve_column(&table, "code", &spec).unwrap(), 2);
    }

    #[test]
    fn ambiguous_pattern_is_an_error() {
        let table = census_table();
        let spec = ColumnSpec::new(vec![ColumnPattern::all_of(&["geography"])]);
        let err = resolve_column(&table, "code", &spec).unwrap_err();
        match err {
            SourceError::AmbiguousColumn { matches, .. } => {
                assert_eq!(matches, vec!["geography", "geography code"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn later_patterns_are_tried_in_order() {
        let table = census_table();
        let spec = ColumnSpec::new(vec![
            ColumnPattern::all_of(&["msoa", "code"]),
            ColumnPattern::all_of(&["total"]),
        ]);
        assert_eq!(resolve_column(&table, "total", &spec).unwrap(), 3);
    }

    #[test]
    fn missing_required_column_is_an_error() {
        let table = census_table();
        let spec = ColumnSpec::new(vec![ColumnPattern::all_of(&["lsoa"])]);
        assert!(matches!(
            resolve_column(&table, "lsoa", &spec),
            Err(SourceError::ColumnNotFound { .. })
        ));
        assert_eq!(resolve_optional(&table, "lsoa", &spec).unwrap(), None);
    }

    #[test]
    fn category_fragments_are_all_returned() {
        let table = census_table();
        let pattern = ColumnPattern::any_of(&["bad", "poor"]);
        assert_eq!(resolve_all(&table, "bad_health", &pattern), vec![6, 7]);
    }

    #[test]
    fn falls_back_to_first_column() {
        let table = census_table();
        let spec = ColumnSpec::new(vec![ColumnPattern::all_of(&["lsoa"])])
            .with_fallback(ColumnFallback::FirstColumn);
        assert_eq!(resolve_column(&table, "lsoa", &spec).unwrap(), 0);
    }

    #[test]
    fn falls_back_to_value_prefix() {
        let table = Table::new(
            "pip",
            vec!["Neighbourhood".to_string(), "Area".to_string()],
            vec![
                vec!["Northfield".to_string(), String::new()],
                vec!["Southside".to_string(), "E02001954".to_string()],
            ],
        );
        let spec = ColumnSpec::new(vec![ColumnPattern::all_of(&["msoa"])]).with_fallback(
            ColumnFallback::ValuePrefix {
                prefix: "E02".to_string(),
            },
        );
        assert_eq!(resolve_column(&table, "msoa_code", &spec).unwrap(), 1);
    }
}
