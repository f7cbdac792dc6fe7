//! Cached downloads of source files.
//!
//! A file already present in the data directory is reused unless `force`
//! is set. There is no staleness check: presence is the only cache key.
//! Downloads stream to a `.part` sibling and are renamed into place once
//! complete, so an interrupted run never leaves a truncated cache entry.

use std::path::{Path, PathBuf};
use std::time::Duration;

use futures::StreamExt as _;
use pip_explorer_source_models::{SourceDefinition, SourceFormat};
use tokio::io::AsyncWriteExt as _;

use crate::SourceError;
use crate::archive::extract_member;
use crate::paths::partial_path;

/// Per-request ceiling. There is no retry.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

const USER_AGENT: &str = "pip-explorer/0.1";

/// Builds the HTTP client used for every source download.
///
/// # Errors
///
/// Returns [`SourceError`] if the client cannot be built.
pub fn build_client() -> Result<reqwest::Client, SourceError> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(Into::into)
}

/// Downloads `url` to `dest` unless `dest` already exists.
///
/// # Errors
///
/// Returns [`SourceError`] if the request fails, the server answers with a
/// non-success status, or the file cannot be written.
pub async fn download_file(
    client: &reqwest::Client,
    url: &str,
    dest: &Path,
    force: bool,
) -> Result<PathBuf, SourceError> {
    let label = dest
        .file_name()
        .map_or_else(|| dest.display().to_string(), |n| n.to_string_lossy().into_owned());

    if dest.exists() && !force {
        log::info!("  Using cached: {label}");
        return Ok(dest.to_path_buf());
    }

    log::info!("  Downloading: {label}...");

    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| SourceError::io(parent, e))?;
    }

    let response = client.get(url).send().await?;
    if !response.status().is_success() {
        return Err(SourceError::HttpStatus {
            url: url.to_string(),
            status: response.status().as_u16(),
        });
    }

    let tmp = partial_path(dest);
    let downloaded = match write_body(response, &tmp).await {
        Ok(bytes) => bytes,
        Err(e) => {
            if let Err(cleanup) = tokio::fs::remove_file(&tmp).await
                && cleanup.kind() != std::io::ErrorKind::NotFound
            {
                log::warn!("Failed to remove {}: {cleanup}", tmp.display());
            }
            return Err(e);
        }
    };

    tokio::fs::rename(&tmp, dest)
        .await
        .map_err(|e| SourceError::io(dest, e))?;

    #[allow(clippy::cast_precision_loss)]
    let mb = downloaded as f64 / 1_048_576.0;
    log::debug!("  {label}: {mb:.1} MB");

    Ok(dest.to_path_buf())
}

/// Streams `response`'s body into `tmp`, returning the byte count.
async fn write_body(response: reqwest::Response, tmp: &Path) -> Result<u64, SourceError> {
    let mut file = tokio::fs::File::create(tmp)
        .await
        .map_err(|e| SourceError::io(tmp, e))?;

    let mut stream = response.bytes_stream();
    let mut downloaded: u64 = 0;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk)
            .await
            .map_err(|e| SourceError::io(tmp, e))?;
        downloaded += chunk.len() as u64;
    }
    file.flush().await.map_err(|e| SourceError::io(tmp, e))?;

    Ok(downloaded)
}

/// Makes a source's tabular file available locally and returns its path.
///
/// For zip payloads the wanted member is extracted next to the archive; an
/// already-extracted member short-circuits the download entirely.
///
/// # Errors
///
/// Returns [`SourceError`] if the download fails or the archive lacks the
/// expected member.
pub async fn fetch_source(
    client: &reqwest::Client,
    source: &SourceDefinition,
    data_dir: &Path,
    force: bool,
) -> Result<PathBuf, SourceError> {
    match &source.format {
        SourceFormat::Csv | SourceFormat::Spreadsheet { .. } => {
            download_file(client, &source.url, &source.download_path(data_dir), force).await
        }
        SourceFormat::ZipCsv { member_marker } => {
            let table_path = source.table_path(data_dir);
            if table_path.exists() && !force {
                log::info!(
                    "  Using cached: {}",
                    table_path
                        .file_name()
                        .map_or_else(String::new, |n| n.to_string_lossy().into_owned())
                );
                return Ok(table_path);
            }

            let zip_path =
                download_file(client, &source.url, &source.download_path(data_dir), force).await?;
            let member = extract_member(&zip_path, member_marker, &table_path)?;
            log::info!("  Extracted: {member}");
            Ok(table_path)
        }
    }
}
