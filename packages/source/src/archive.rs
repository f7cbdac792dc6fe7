//! Zip member extraction.
//!
//! Census bulk releases ship one CSV per geography level inside a single
//! archive. Only the member whose name carries the level marker is needed.

use std::path::Path;

use crate::SourceError;
use crate::paths::partial_path;

/// Returns the first CSV member name containing `marker`
/// (case-insensitive).
#[must_use]
pub fn find_member<'a>(names: impl IntoIterator<Item = &'a str>, marker: &str) -> Option<&'a str> {
    let marker = marker.to_lowercase();
    names.into_iter().find(|name| {
        let lower = name.to_lowercase();
        lower.contains(&marker) && lower.ends_with(".csv")
    })
}

/// Extracts the CSV member matching `marker` from `archive_path` to `dest`.
///
/// Returns the member's name inside the archive.
///
/// # Errors
///
/// Returns [`SourceError::MemberNotFound`] if no member matches, or an
/// I/O or zip error if the archive cannot be read or `dest` written.
pub fn extract_member(
    archive_path: &Path,
    marker: &str,
    dest: &Path,
) -> Result<String, SourceError> {
    let file = std::fs::File::open(archive_path).map_err(|e| SourceError::io(archive_path, e))?;
    let mut archive = zip::ZipArchive::new(file).map_err(|e| SourceError::Zip {
        path: archive_path.display().to_string(),
        source: e,
    })?;

    let names: Vec<String> = archive.file_names().map(ToString::to_string).collect();
    let Some(member) =
        find_member(names.iter().map(String::as_str), marker).map(ToString::to_string)
    else {
        return Err(SourceError::MemberNotFound {
            archive: archive_path.display().to_string(),
            marker: marker.to_string(),
        });
    };

    let mut entry = archive.by_name(&member).map_err(|e| SourceError::Zip {
        path: archive_path.display().to_string(),
        source: e,
    })?;

    let tmp = partial_path(dest);
    let mut out = std::fs::File::create(&tmp).map_err(|e| SourceError::io(&tmp, e))?;
    std::io::copy(&mut entry, &mut out).map_err(|e| SourceError::io(&tmp, e))?;
    drop(out);
    std::fs::rename(&tmp, dest).map_err(|e| SourceError::io(dest, e))?;

    Ok(member)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    fn write_zip(path: &Path, members: &[(&str, &[u8])]) {
        let file = std::fs::File::create(path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        let options = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated);
        for (name, data) in members {
            writer.start_file(*name, options).unwrap();
            writer.write_all(data).unwrap();
        }
        writer.finish().unwrap();
    }

    #[test]
    fn finds_member_by_marker() {
        let names = [
            "census2021-ts066-ctry.csv",
            "census2021-ts066-lsoa.csv",
            "census2021-ts066-msoa.csv",
            "metadata/msoa-notes.txt",
        ];
        assert_eq!(find_member(names, "MSOA"), Some("census2021-ts066-msoa.csv"));
        assert_eq!(find_member(names, "oa21"), None);
    }

    #[test]
    fn extracts_matching_member() {
        let tmp = std::env::temp_dir().join("pip_explorer_archive_extract_test");
        let _ = std::fs::remove_dir_all(&tmp);
        std::fs::create_dir_all(&tmp).unwrap();

        let zip_path = tmp.join("ts037.zip");
        write_zip(
            &zip_path,
            &[
                ("census2021-ts037-lsoa.csv", &b"lsoa"[..]),
                (
                    "census2021-ts037-msoa.csv",
                    &b"geography code,total\nE02000001,10\n"[..],
                ),
            ],
        );

        let dest = tmp.join("ts037_msoa.csv");
        let member = extract_member(&zip_path, "msoa", &dest).unwrap();
        assert_eq!(member, "census2021-ts037-msoa.csv");
        assert_eq!(
            std::fs::read_to_string(&dest).unwrap(),
            "geography code,total\nE02000001,10\n"
        );
        assert!(!partial_path(&dest).exists());

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn missing_member_is_an_error() {
        let tmp = std::env::temp_dir().join("pip_explorer_archive_missing_test");
        let _ = std::fs::remove_dir_all(&tmp);
        std::fs::create_dir_all(&tmp).unwrap();

        let zip_path = tmp.join("ts011.zip");
        write_zip(&zip_path, &[("census2021-ts011-ltla.csv", &b"x"[..])]);

        let err = extract_member(&zip_path, "msoa", &tmp.join("out.csv")).unwrap_err();
        assert!(matches!(err, SourceError::MemberNotFound { .. }));

        let _ = std::fs::remove_dir_all(&tmp);
    }
}
