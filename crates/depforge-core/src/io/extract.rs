//! Archive extraction
//!
//! Upstream source drops (ICU, mimalloc) ship as zip archives.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use zip::ZipArchive;

/// Extraction failures.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// Reading the archive or writing a file failed.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// The archive is malformed or has an unsafe entry.
    #[error("Archive error: {0}")]
    Archive(String),
}

/// Extract a zip archive into `dest_dir`, returning the relative paths of
/// the files written.
///
/// Entries whose names would escape `dest_dir` (absolute paths, `..`) are
/// rejected.
///
/// # Errors
///
/// [`ExtractError::Archive`] for malformed archives or unsafe entry names,
/// [`ExtractError::Io`] when writing fails.
pub fn extract_zip(archive_path: &Path, dest_dir: &Path) -> Result<Vec<PathBuf>, ExtractError> {
    let file = File::open(archive_path)?;
    let mut archive = ZipArchive::new(file).map_err(|e| ExtractError::Archive(e.to_string()))?;

    fs::create_dir_all(dest_dir)?;
    let mut extracted = Vec::new();

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| ExtractError::Archive(e.to_string()))?;
        let Some(relative_path) = entry.enclosed_name().map(|p| p.to_owned()) else {
            return Err(ExtractError::Archive(format!(
                "Invalid path in archive: {}",
                entry.name()
            )));
        };

        let absolute_path = dest_dir.join(&relative_path);
        if entry.is_dir() {
            fs::create_dir_all(&absolute_path)?;
            continue;
        }
        if let Some(parent) = absolute_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut outfile = File::create(&absolute_path)?;
        io::copy(&mut entry, &mut outfile)?;

        #[cfg(unix)]
        if let Some(mode) = entry.unix_mode() {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&absolute_path, fs::Permissions::from_mode(mode))?;
        }

        extracted.push(relative_path);
    }

    Ok(extracted)
}
