//! Per-MSOA LSOA document (`lsoa_data.json`).
//!
//! Joins the lookup, the hyper-local need classification and the LSOA
//! centroid table into MSOA code to `[{code, name, lat, lng,
//! classification}]`, restricted to an allow-list of MSOAs. The document is
//! plain JSON; [`load_lsoa_data`] reads it back.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use pip_explorer_geography_models::{
    CentroidMapping, ClassificationMapping, LsoaData, LsoaRecord,
};
use pip_explorer_source::SourceError;
use pip_explorer_source::columns::{resolve_column, resolve_optional};
use pip_explorer_source::paths::write_atomic;
use pip_explorer_source::table::{Table, parse_number, read_records};

use crate::GeoError;
use crate::lookup::LsoaLookup;

/// The Pride in Place MSOAs covered by the published dashboard.
pub const DEFAULT_MSOAS: [&str; 40] = [
    "E02001954", "E02001947", "E02001948", "E02001949", "E02001950", "E02001951", "E02001952",
    "E02001953", "E02001405", "E02001406", "E02001407", "E02001408", "E02001094", "E02001095",
    "E02001096", "E02001097", "E02002385", "E02002386", "E02002387", "E02002388", "E02002651",
    "E02002652", "E02002653", "E02001305", "E02001306", "E02001307", "E02004205", "E02004206",
    "E02004207", "E02005355", "E02005356", "E02005357", "E02005440", "E02005441", "E02005442",
    "E02006855", "E02006502", "E02003505", "E02003506", "E02006545",
];

/// Name and population-weighted centroid of an LSOA.
#[derive(Debug, Clone, PartialEq)]
pub struct Centroid {
    pub name: String,
    pub lat: f64,
    pub lng: f64,
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned())
}

/// Reads LSOA code to typology label from the classification file.
///
/// The header row is searched for within the first
/// `mapping.max_preamble_rows` rows: the first row on which both the LSOA
/// and typology columns resolve is taken as the header.
///
/// # Errors
///
/// Returns [`GeoError::HeaderNotFound`] if no such row exists, or the
/// resolver's error if a candidate header was ambiguous.
pub fn load_classifications(
    path: &Path,
    mapping: &ClassificationMapping,
) -> Result<BTreeMap<String, String>, GeoError> {
    let records = read_records(path)?;
    let name = file_label(path);
    let searched = mapping.max_preamble_rows.min(records.len());

    let mut header = None;
    let mut last_error: Option<SourceError> = None;
    for (index, record) in records.iter().take(searched).enumerate() {
        let candidate = Table::new(name.as_str(), record.clone(), Vec::new());
        let lsoa = resolve_optional(&candidate, "lsoa_code", &mapping.lsoa);
        let typology = resolve_optional(&candidate, "typology", &mapping.typology);
        match (lsoa, typology) {
            (Ok(Some(lsoa)), Ok(Some(typology))) => {
                header = Some((index, lsoa, typology));
                break;
            }
            (Err(e), _) | (_, Err(e)) => last_error = Some(e),
            _ => {}
        }
    }

    let Some((index, lsoa, typology)) = header else {
        if let Some(e) = last_error {
            return Err(e.into());
        }
        return Err(GeoError::HeaderNotFound {
            path: path.display().to_string(),
            fields: format!("lsoa {} and typology {}", mapping.lsoa, mapping.typology),
            rows: searched,
        });
    };

    log::debug!("{name}: header found on row {}", index + 1);

    let table = Table::from_records(name, records, index);
    let mut classifications = BTreeMap::new();
    for row in 0..table.len() {
        let Some(code) = table.cell(row, lsoa).filter(|c| !c.is_empty()) else {
            continue;
        };
        let label = table.cell(row, typology).unwrap_or_default();
        classifications
            .entry(code.to_string())
            .or_insert_with(|| label.to_string());
    }

    log::info!("  Found {} LSOA classifications", classifications.len());
    Ok(classifications)
}

/// Reads LSOA code to name and centroid.
///
/// Rows whose coordinates do not parse are skipped with a warning.
///
/// # Errors
///
/// Returns [`GeoError`] if the file cannot be read or a column is missing.
pub fn load_centroids(
    path: &Path,
    mapping: &CentroidMapping,
) -> Result<BTreeMap<String, Centroid>, GeoError> {
    let table = Table::from_csv_path(path)?;
    let lsoa = resolve_column(&table, "lsoa_code", &mapping.lsoa)?;
    let name = resolve_column(&table, "lsoa_name", &mapping.name)?;
    let lat = resolve_column(&table, "lat", &mapping.lat)?;
    let lng = resolve_column(&table, "lng", &mapping.lng)?;

    let mut centroids = BTreeMap::new();
    let mut skipped = 0_usize;
    for row in 0..table.len() {
        let Some(code) = table.cell(row, lsoa).filter(|c| !c.is_empty()) else {
            continue;
        };
        let coords = table
            .cell(row, lat)
            .and_then(parse_number)
            .zip(table.cell(row, lng).and_then(parse_number));
        let Some((lat, lng)) = coords else {
            skipped += 1;
            continue;
        };
        centroids.entry(code.to_string()).or_insert_with(|| Centroid {
            name: table.cell(row, name).unwrap_or_default().to_string(),
            lat,
            lng,
        });
    }

    if skipped > 0 {
        log::warn!("{}: {skipped} rows without valid coordinates", table.name());
    }
    log::info!("  Found {} LSOA centroids", centroids.len());
    Ok(centroids)
}

/// Groups the allow-listed MSOAs' LSOAs with their centroid and typology.
///
/// LSOAs without a centroid are left out; an unclassified LSOA gets an
/// empty classification. Every allow-listed MSOA present in the lookup gets
/// an entry, even if none of its LSOAs have a centroid.
#[must_use]
pub fn build_lsoa_data(
    lookup: &LsoaLookup,
    classifications: &BTreeMap<String, String>,
    centroids: &BTreeMap<String, Centroid>,
    msoas: &BTreeSet<String>,
) -> LsoaData {
    let mut data = LsoaData::new();
    let mut seen = BTreeSet::new();
    let mut matched = 0_usize;

    for (lsoa, msoa) in lookup.pairs() {
        if !msoas.contains(msoa) || !seen.insert(lsoa.as_str()) {
            continue;
        }
        matched += 1;
        let records = data.entry(msoa.clone()).or_default();
        if let Some(centroid) = centroids.get(lsoa) {
            records.push(LsoaRecord {
                code: lsoa.clone(),
                name: centroid.name.clone(),
                lat: centroid.lat,
                lng: centroid.lng,
                classification: classifications.get(lsoa).cloned().unwrap_or_default(),
            });
        }
    }

    log::info!("  Found {matched} LSOAs across {} MSOAs", data.len());
    data
}

/// Writes the document as pretty-printed JSON.
///
/// # Errors
///
/// Returns [`GeoError`] if serialization or the write fails.
pub fn write_lsoa_data(data: &LsoaData, path: &Path) -> Result<(), GeoError> {
    let json = serde_json::to_vec_pretty(data).map_err(|e| GeoError::json(path, e))?;
    write_atomic(path, &json).map_err(|e| GeoError::io(path, e))?;
    log::info!(
        "  Written LSOA data for {} MSOAs to {}",
        data.len(),
        path.display()
    );
    Ok(())
}

/// Reads a document written by [`write_lsoa_data`].
///
/// # Errors
///
/// Returns [`GeoError`] if the file cannot be read or is not a valid
/// document.
pub fn load_lsoa_data(path: &Path) -> Result<LsoaData, GeoError> {
    let bytes = std::fs::read(path).map_err(|e| GeoError::io(path, e))?;
    serde_json::from_slice(&bytes).map_err(|e| GeoError::json(path, e))
}

/// Every LSOA code in the document.
#[must_use]
pub fn needed_lsoas(data: &LsoaData) -> BTreeSet<String> {
    data.values()
        .flatten()
        .map(|record| record.code.clone())
        .collect()
}
