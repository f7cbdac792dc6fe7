//! LSOA to MSOA score aggregation.
//!
//! Each LSOA row is joined to its MSOA through the lookup, then every mapped
//! score is averaged per MSOA. Missing cells are skipped rather than
//! counted as zero. Rank and decile columns are never read: an average of
//! ranks is not a rank, and percentiles of the averaged scores take their
//! place downstream.

use std::collections::BTreeMap;

use pip_explorer_area_models::{MetricDef, MetricTable, finite};
use pip_explorer_geography_models::ScoreMapping;
use pip_explorer_source::columns::{resolve_column, resolve_optional};
use pip_explorer_source::table::{Table, parse_number};

use crate::GeoError;
use crate::lookup::LsoaLookup;

#[derive(Debug, Clone, Copy, Default)]
struct Mean {
    sum: f64,
    count: u32,
}

impl Mean {
    fn add(&mut self, value: Option<f64>) {
        if let Some(value) = value {
            self.sum += value;
            self.count += 1;
        }
    }

    fn value(self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / f64::from(self.count)).and_then(finite)
    }
}

/// Averages `mapping`'s score columns from LSOA to MSOA level.
///
/// Output rows are sorted by MSOA code. LSOAs absent from the lookup are
/// ignored; an MSOA with no scored LSOAs does not appear. Score columns that
/// cannot be found are logged and left out.
///
/// # Errors
///
/// Returns [`GeoError::Source`] if the LSOA column cannot be resolved, or a
/// score mapping matches several headers.
pub fn aggregate_scores(
    table: &Table,
    mapping: &ScoreMapping,
    lookup: &LsoaLookup,
) -> Result<MetricTable, GeoError> {
    log::info!("  Aggregating {} to MSOA level...", mapping.id);

    let lsoa = resolve_column(table, "lsoa_code", &mapping.lsoa)?;

    let mut columns: Vec<(MetricDef, usize)> = Vec::new();
    for score in &mapping.scores {
        match resolve_optional(table, &score.metric.name, &score.column)? {
            Some(col) => columns.push((score.metric.clone(), col)),
            None => log::warn!(
                "{}: no column for {} ({})",
                table.name(),
                score.metric.name,
                score.column
            ),
        }
    }

    let mut groups: BTreeMap<&str, Vec<Mean>> = BTreeMap::new();
    let mut unmatched = 0_usize;

    for row in 0..table.len() {
        let Some(code) = table.cell(row, lsoa).filter(|c| !c.is_empty()) else {
            continue;
        };
        let msoas = lookup.msoas_for(code);
        if msoas.is_empty() {
            unmatched += 1;
            continue;
        }
        for msoa in msoas {
            let means = groups
                .entry(msoa)
                .or_insert_with(|| vec![Mean::default(); columns.len()]);
            for (mean, (_, col)) in means.iter_mut().zip(&columns) {
                mean.add(table.cell(row, *col).and_then(parse_number));
            }
        }
    }

    if unmatched > 0 {
        log::warn!(
            "{}: {unmatched} LSOA rows have no MSOA in the lookup",
            table.name()
        );
    }

    let mut out = MetricTable::new(columns.into_iter().map(|(def, _)| def).collect());
    for (msoa, means) in groups {
        out.push_row(msoa, means.into_iter().map(Mean::value).collect());
    }

    log::info!("  {} MSOAs with aggregated scores", out.len());
    Ok(out)
}

#[cfg(test)]
mod tests {
    use pip_explorer_area_models::{Direction, MetricKind};
    use pip_explorer_geography_models::ScoreColumn;
    use pip_explorer_source::models::{ColumnFallback, ColumnPattern, ColumnSpec};

    use super::*;
    use crate::mappings::imd_mapping;

    fn mapping() -> ScoreMapping {
        ScoreMapping {
            id: "test".to_string(),
            source: "imd_2025".to_string(),
            release: "test".to_string(),
            schema_version: 1,
            lsoa: ColumnSpec::new(vec![ColumnPattern::all_of(&["lsoa", "code"])])
                .with_fallback(ColumnFallback::FirstColumn),
            scores: vec![ScoreColumn {
                metric: MetricDef::new("imd_score", MetricKind::Score, Direction::WorseIfHigher),
                column: ColumnSpec::new(vec![
                    ColumnPattern::all_of(&["imd", "score"]).excluding(&["rank"]),
                ]),
            }],
        }
    }

    fn imd(csv: &str) -> Table {
        Table::from_csv_reader("imd", csv.as_bytes()).unwrap()
    }

    #[test]
    fn two_children_average_exactly() {
        let lookup = LsoaLookup::from_pairs([("L1", "M1"), ("L2", "M1")]);
        let table = imd("LSOA code,IMD Score,IMD Rank\nL1,10,5\nL2,20,1\n");
        let out = aggregate_scores(&table, &mapping(), &lookup).unwrap();

        assert_eq!(out.value("M1", "imd_score"), Some(15.0));
        assert!(out.column_index("imd_rank").is_none());
    }

    #[test]
    fn duplicate_lookup_rows_do_not_double_count() {
        let lookup =
            LsoaLookup::from_pairs([("L1", "M1"), ("L1", "M1"), ("L1", "M1"), ("L2", "M1")]);
        let table = imd("LSOA code,IMD Score\nL1,10\nL2,40\n");
        let out = aggregate_scores(&table, &mapping(), &lookup).unwrap();
        assert_eq!(out.value("M1", "imd_score"), Some(25.0));
    }

    #[test]
    fn missing_cells_are_skipped_and_orphans_ignored() {
        let lookup =
            LsoaLookup::from_pairs([("L1", "M2"), ("L2", "M2"), ("L3", "M1"), ("L9", "M3")]);
        let table = imd("LSOA code,IMD Score\nL1,12\nL2,\nL3,7\nL4,100\n");
        let out = aggregate_scores(&table, &mapping(), &lookup).unwrap();

        let codes: Vec<&str> = out.rows().iter().map(|r| r.code.as_str()).collect();
        assert_eq!(codes, vec!["M1", "M2"]);
        assert_eq!(out.value("M2", "imd_score"), Some(12.0));
        assert!(out.get("M3").is_none());
    }

    #[test]
    fn all_missing_scores_become_absent() {
        let lookup = LsoaLookup::from_pairs([("L1", "M1")]);
        let table = imd("LSOA code,IMD Score\nL1,n/a\n");
        let out = aggregate_scores(&table, &mapping(), &lookup).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out.value("M1", "imd_score"), None);
    }

    #[test]
    fn published_headers_resolve_against_embedded_mapping() {
        let csv = "LSOA code (2021),LSOA name (2021),\
            Index of Multiple Deprivation (IMD) Score,\
            Index of Multiple Deprivation (IMD) Rank (where 1 is most deprived),\
            Income Score (rate),Employment Score (rate),\
            \"Education, Skills and Training Score\",\
            Health Deprivation and Disability Score,Crime Score,\
            Barriers to Housing and Services Score,Living Environment Score,\
            Income Deprivation Affecting Children Index (IDACI) Score (rate),\
            Income Deprivation Affecting Older People (IDAOPI) Score (rate),\
            Children and Young People Sub-domain Score,\
            Children and Young People Sub-domain Rank (where 1 is most deprived),\
            Adult Skills Sub-domain Score,Geographical Barriers Sub-domain Score,\
            Wider Barriers Sub-domain Score,Indoors Sub-domain Score,\
            Outdoors Sub-domain Score\n\
            L1,A,30,100,0.2,0.1,25,1.1,0.5,20,15,0.3,0.25,0.4,900,0.6,0.7,0.8,0.9,1.2\n";
        let lookup = LsoaLookup::from_pairs([("L1", "M1")]);
        let out = aggregate_scores(&imd(csv), &imd_mapping(), &lookup).unwrap();

        assert_eq!(out.columns().len(), 16);
        assert_eq!(out.value("M1", "imd_score"), Some(30.0));
        assert_eq!(out.value("M1", "education_score"), Some(25.0));
        assert_eq!(out.value("M1", "barriers_score"), Some(20.0));
        assert_eq!(out.value("M1", "idaopi_score"), Some(0.25));
        assert_eq!(out.value("M1", "children_young_people_score"), Some(0.4));
        assert_eq!(out.value("M1", "adult_skills_score"), Some(0.6));
        assert_eq!(out.value("M1", "geographical_barriers_score"), Some(0.7));
        assert_eq!(out.value("M1", "wider_barriers_score"), Some(0.8));
        assert_eq!(out.value("M1", "indoors_score"), Some(0.9));
        assert_eq!(out.value("M1", "outdoors_score"), Some(1.2));
    }
}
