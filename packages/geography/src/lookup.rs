//! LSOA to MSOA lookup.

use std::collections::{BTreeMap, BTreeSet};

use pip_explorer_geography_models::LookupMapping;
use pip_explorer_source::columns::resolve_column;
use pip_explorer_source::table::Table;

use crate::GeoError;

/// De-duplicated fine-to-coarse area pairs, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LsoaLookup {
    pairs: Vec<(String, String)>,
    by_lsoa: BTreeMap<String, Vec<usize>>,
}

impl LsoaLookup {
    /// Builds a lookup from `(lsoa, msoa)` pairs, dropping repeats and
    /// pairs with an empty code.
    #[must_use]
    pub fn from_pairs<I, A, B>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (A, B)>,
        A: Into<String>,
        B: Into<String>,
    {
        let mut lookup = Self::default();
        let mut seen = BTreeSet::new();
        for (lsoa, msoa) in pairs {
            let pair = (lsoa.into(), msoa.into());
            if pair.0.is_empty() || pair.1.is_empty() || !seen.insert(pair.clone()) {
                continue;
            }
            lookup
                .by_lsoa
                .entry(pair.0.clone())
                .or_default()
                .push(lookup.pairs.len());
            lookup.pairs.push(pair);
        }
        lookup
    }

    /// Reads the lookup columns from a loaded table.
    ///
    /// # Errors
    ///
    /// Returns [`GeoError::Source`] if either code column cannot be
    /// resolved.
    pub fn from_table(table: &Table, mapping: &LookupMapping) -> Result<Self, GeoError> {
        let lsoa = resolve_column(table, "lsoa_code", &mapping.lsoa)?;
        let msoa = resolve_column(table, "msoa_code", &mapping.msoa)?;

        let lookup = Self::from_pairs(
            (0..table.len())
                .filter_map(|row| Some((table.cell(row, lsoa)?, table.cell(row, msoa)?))),
        );

        let dropped = table.len() - lookup.len();
        if dropped > 0 {
            log::debug!("{}: {dropped} duplicate or blank lookup rows dropped", table.name());
        }
        log::info!("  Loaded {} LSOA-MSOA mappings", lookup.len());

        Ok(lookup)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Unique `(lsoa, msoa)` pairs.
    #[must_use]
    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    /// MSOAs an LSOA maps to (normally exactly one).
    #[must_use]
    pub fn msoas_for(&self, lsoa: &str) -> Vec<&str> {
        self.by_lsoa.get(lsoa).map_or_else(Vec::new, |indices| {
            indices.iter().map(|&i| self.pairs[i].1.as_str()).collect()
        })
    }

    /// Every distinct MSOA code, in first-seen order. This is the national
    /// reference population for percentile ranking.
    #[must_use]
    pub fn msoa_codes(&self) -> Vec<&str> {
        let mut seen = BTreeSet::new();
        self.pairs
            .iter()
            .map(|(_, msoa)| msoa.as_str())
            .filter(|msoa| seen.insert(*msoa))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mappings::lookup_mapping;

    #[test]
    fn duplicates_and_blanks_are_dropped() {
        let lookup = LsoaLookup::from_pairs([
            ("L1", "M1"),
            ("L2", "M1"),
            ("L1", "M1"),
            ("", "M2"),
            ("L3", "M2"),
        ]);
        assert_eq!(lookup.len(), 3);
        assert_eq!(lookup.msoa_codes(), vec!["M1", "M2"]);
        assert_eq!(lookup.msoas_for("L1"), vec!["M1"]);
        assert!(lookup.msoas_for("L9").is_empty());
    }

    #[test]
    fn reads_ons_lookup_columns() {
        let csv = "\u{feff}LSOA21CD,LSOA21NM,LSOA21NMW,MSOA21CD,MSOA21NM,MSOA21NMW\n\
                   E01000001,City of London 001A,,E02000001,City of London 001,\n\
                   E01000002,City of London 001B,,E02000001,City of London 001,\n\
                   E01000002,City of London 001B,,E02000001,City of London 001,\n";
        let table = Table::from_csv_reader("lookup", csv.as_bytes()).unwrap();
        let lookup = LsoaLookup::from_table(&table, &lookup_mapping()).unwrap();

        assert_eq!(lookup.len(), 2);
        assert_eq!(lookup.msoa_codes(), vec!["E02000001"]);
    }
}
