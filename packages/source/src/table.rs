//! Header + string-cell tables loaded from CSV or Excel payloads.
//!
//! Cells stay as raw strings; numeric interpretation happens where a column
//! is consumed, via [`parse_number`].

use std::io::Read;
use std::path::Path;

use calamine::{Reader as _, open_workbook_auto};
use pip_explorer_source_models::{SourceDefinition, SourceFormat};

use crate::SourceError;

/// A loaded table: one header row and any number of data rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    name: String,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    /// Builds a table from parts; rows are padded to the header width.
    #[must_use]
    pub fn new(name: impl Into<String>, headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let headers: Vec<String> = headers.iter().map(|h| clean_header(h)).collect();
        let width = headers.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                if row.len() < width {
                    row.resize(width, String::new());
                }
                row
            })
            .collect();
        Self {
            name: name.into(),
            headers,
            rows,
        }
    }

    /// Label used in log and error messages.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    #[must_use]
    pub fn rows(&self) -> &[Vec<String>] {
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

    /// A single cell, trimmed.
    #[must_use]
    pub fn cell(&self, row: usize, column: usize) -> Option<&str> {
        self.rows.get(row)?.get(column).map(|c| c.trim())
    }

    /// Every cell of a column, trimmed, in row order.
    pub fn column(&self, column: usize) -> impl Iterator<Item = &str> {
        self.rows
            .iter()
            .map(move |row| row.get(column).map_or("", |c| c.trim()))
    }

    /// Parses CSV from any reader.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Csv`] if the input is not valid CSV.
    pub fn from_csv_reader(name: &str, reader: impl Read) -> Result<Self, SourceError> {
        let csv_err = |e| SourceError::Csv {
            path: name.to_string(),
            source: e,
        };

        let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
        let headers: Vec<String> = rdr
            .headers()
            .map_err(csv_err)?
            .iter()
            .map(String::from)
            .collect();

        let mut rows = Vec::new();
        for record in rdr.records() {
            let record = record.map_err(csv_err)?;
            rows.push(record.iter().map(String::from).collect());
        }

        Ok(Self::new(name, headers, rows))
    }

    /// Builds a table from raw records, using row `header_row` as the
    /// header and discarding everything above it.
    #[must_use]
    pub fn from_records(
        name: impl Into<String>,
        mut records: Vec<Vec<String>>,
        header_row: usize,
    ) -> Self {
        if header_row >= records.len() {
            return Self::new(name, Vec::new(), Vec::new());
        }
        let rows = records.split_off(header_row + 1);
        let headers = records.pop().unwrap_or_default();
        Self::new(name, headers, rows)
    }

    /// Reads a CSV file.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the file cannot be opened or parsed.
    pub fn from_csv_path(path: &Path) -> Result<Self, SourceError> {
        let file = std::fs::File::open(path).map_err(|e| SourceError::io(path, e))?;
        Self::from_csv_reader(&file_label(path), std::io::BufReader::new(file))
    }

    /// Reads one sheet of an Excel workbook (the first one if `sheet` is
    /// `None`). Leading blank rows are skipped; the first non-blank row is
    /// the header.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Spreadsheet`] if the workbook or sheet cannot
    /// be read.
    pub fn from_spreadsheet(path: &Path, sheet: Option<&str>) -> Result<Self, SourceError> {
        let spreadsheet_err = |message: String| SourceError::Spreadsheet {
            path: path.display().to_string(),
            message,
        };

        let mut workbook = open_workbook_auto(path).map_err(|e| spreadsheet_err(e.to_string()))?;
        let range = match sheet {
            Some(name) => workbook.worksheet_range(name),
            None => workbook
                .worksheet_range_at(0)
                .ok_or_else(|| spreadsheet_err("workbook has no sheets".to_string()))?,
        }
        .map_err(|e| spreadsheet_err(e.to_string()))?;

        let mut rows = range
            .rows()
            .map(|row| row.iter().map(ToString::to_string).collect::<Vec<String>>())
            .skip_while(|row| row.iter().all(|c| c.trim().is_empty()));

        let headers = rows.next().unwrap_or_default();
        let rows: Vec<Vec<String>> = rows
            .filter(|row| row.iter().any(|c| !c.trim().is_empty()))
            .collect();

        Ok(Self::new(file_label(path), headers, rows))
    }

    /// Loads a source's cached tabular file according to its format.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the file cannot be read or parsed.
    pub fn load(source: &SourceDefinition, data_dir: &Path) -> Result<Self, SourceError> {
        let path = source.table_path(data_dir);
        let table = match &source.format {
            SourceFormat::Spreadsheet { sheet } => Self::from_spreadsheet(&path, sheet.as_deref())?,
            SourceFormat::Csv | SourceFormat::ZipCsv { .. } => Self::from_csv_path(&path)?,
        };
        log::debug!(
            "Loaded {} rows x {} columns from {}",
            table.len(),
            table.headers().len(),
            table.name()
        );
        Ok(table)
    }
}

/// Reads every record of a CSV file without treating any row as a header.
///
/// Used for files that carry a free-text preamble above the real header.
///
/// # Errors
///
/// Returns [`SourceError`] if the file cannot be opened or parsed.
pub fn read_records(path: &Path) -> Result<Vec<Vec<String>>, SourceError> {
    let file = std::fs::File::open(path).map_err(|e| SourceError::io(path, e))?;
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(std::io::BufReader::new(file));

    let mut records = Vec::new();
    for record in rdr.records() {
        let record = record.map_err(|e| SourceError::Csv {
            path: path.display().to_string(),
            source: e,
        })?;
        records.push(record.iter().map(String::from).collect());
    }
    Ok(records)
}

/// Parses a numeric cell.
///
/// Accepts surrounding whitespace and thousands separators. Blank,
/// non-numeric and non-finite cells yield `None`.
#[must_use]
pub fn parse_number(cell: &str) -> Option<f64> {
    let cleaned = cell.trim().replace(',', "");
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn clean_header(header: &str) -> String {
    header.trim_start_matches('\u{feff}').trim().to_string()
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned())
}
