//! Canonical file paths for the pipeline's data directory.
//!
//! Defaults are relative to the workspace root; the data directory can be
//! moved with the `PIP_EXPLORER_DATA_DIR` environment variable.

use std::path::{Path, PathBuf};

/// Environment variable overriding [`data_dir`].
pub const DATA_DIR_ENV: &str = "PIP_EXPLORER_DATA_DIR";

/// Default filename of the dashboard dataset.
pub const OUTPUT_FILENAME: &str = "data.json";

/// Default filename of the per-MSOA LSOA document.
pub const LSOA_DATA_FILENAME: &str = "lsoa_data.json";

/// Default filename of the filtered LSOA boundary file.
pub const BOUNDARIES_FILENAME: &str = "pip_lsoa_boundaries.geojson";

/// Returns the workspace root directory.
///
/// Resolved at compile time from `CARGO_MANIFEST_DIR`.
///
/// # Panics
///
/// Panics if the project root cannot be resolved.
#[must_use]
pub fn project_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .ancestors()
        .nth(2)
        .expect("Failed to find project root from CARGO_MANIFEST_DIR")
        .to_path_buf()
}

/// Returns the cache directory for downloaded sources.
#[must_use]
pub fn data_dir() -> PathBuf {
    std::env::var_os(DATA_DIR_ENV)
        .filter(|v| !v.is_empty())
        .map_or_else(|| project_root().join("data"), PathBuf::from)
}

/// Returns the default path of the dashboard dataset.
#[must_use]
pub fn default_output_path() -> PathBuf {
    project_root().join(OUTPUT_FILENAME)
}

/// Ensures a directory exists, creating it if necessary.
///
/// # Errors
///
/// Returns an I/O error if the directory cannot be created.
pub fn ensure_dir(path: &Path) -> std::io::Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}

/// Sibling path used while a file is being written.
#[must_use]
pub fn partial_path(dest: &Path) -> PathBuf {
    let name = dest
        .file_name()
        .map_or_else(|| "download".into(), |n| n.to_string_lossy().into_owned());
    dest.with_file_name(format!("{name}.part"))
}

/// Writes `contents` to a `.tmp` sibling of `dest` and renames it into
/// place, so readers never observe a half-written file.
///
/// # Errors
///
/// Returns an I/O error if the temporary file cannot be written or renamed.
pub fn write_atomic(dest: &Path, contents: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
        ensure_dir(parent)?;
    }
    let name = dest
        .file_name()
        .map_or_else(|| "output".into(), |n| n.to_string_lossy().into_owned());
    let tmp = dest.with_file_name(format!("{name}.tmp"));
    std::fs::write(&tmp, contents)?;
    std::fs::rename(&tmp, dest)
}
