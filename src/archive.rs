//! ZIP assembly of a batch's saved images
//!
//! Members that cannot be opened or copied are skipped; the archive is always
//! finalized, so an all-skipped input still yields a valid (empty) ZIP.

use crate::error::{ArchiveMemberError, Error, Result};
use std::collections::HashSet;
use std::fs::File;
use std::io::{Cursor, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use zip::write::FileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

/// A finished archive and what went into it
#[derive(Debug)]
pub struct ArchiveSummary {
    /// Complete ZIP file contents
    pub bytes: Vec<u8>,
    /// Entry names in the order they were written
    pub entries: Vec<String>,
    /// Members that were left out
    pub skipped: Vec<ArchiveMemberError>,
}

/// Build a ZIP containing one entry per readable file in `paths`
///
/// Entries are named after the file's basename; repeated names get a numeric
/// suffix (`pic.png`, `pic_1.png`, ...). Entries are stored without
/// compression and with a fixed timestamp, so equal inputs give equal bytes.
pub fn assemble_zip(paths: &[PathBuf]) -> Result<ArchiveSummary> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default()
        .compression_method(CompressionMethod::Stored)
        .last_modified_time(DateTime::default())
        .unix_permissions(0o644);

    let mut entries = Vec::with_capacity(paths.len());
    let mut taken = HashSet::new();
    let mut skipped = Vec::new();

    for path in paths {
        let name = unique_entry_name(&entry_name(path), &taken);
        match add_member(&mut writer, path, &name, options) {
            Ok(bytes) => {
                debug!(path = ?path, entry = %name, bytes, "added archive member");
                taken.insert(name.clone());
                entries.push(name);
            }
            Err(e) => {
                warn!(error = %e, "skipping archive member");
                skipped.push(e);
            }
        }
    }

    let bytes = writer
        .finish()
        .map_err(|e| Error::Archive(format!("failed to finalize archive: {}", e)))?
        .into_inner();

    info!(
        entries = entries.len(),
        skipped = skipped.len(),
        size = bytes.len(),
        "archive assembled"
    );

    Ok(ArchiveSummary {
        bytes,
        entries,
        skipped,
    })
}

/// [`assemble_zip`] on the blocking thread pool
pub async fn assemble_zip_blocking(paths: Vec<PathBuf>) -> Result<ArchiveSummary> {
    tokio::task::spawn_blocking(move || assemble_zip(&paths))
        .await
        .map_err(|e| Error::Archive(format!("archive task failed: {}", e)))?
}

fn add_member(
    writer: &mut ZipWriter<Cursor<Vec<u8>>>,
    path: &Path,
    name: &str,
    options: FileOptions,
) -> std::result::Result<u64, ArchiveMemberError> {
    let mut file = File::open(path).map_err(|source| ArchiveMemberError::Open {
        path: path.to_path_buf(),
        source,
    })?;

    // Read before starting the entry so a failing read never leaves a partial entry
    let mut body = Vec::new();
    file.read_to_end(&mut body)
        .map_err(|source| ArchiveMemberError::Copy {
            path: path.to_path_buf(),
            source,
        })?;

    writer
        .start_file(name, options)
        .map_err(|e| ArchiveMemberError::Entry {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    writer
        .write_all(&body)
        .map_err(|source| ArchiveMemberError::Copy {
            path: path.to_path_buf(),
            source,
        })?;

    Ok(body.len() as u64)
}

fn entry_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| "image.jpg".to_string())
}

/// First of `name`, `stem_1.ext`, `stem_2.ext`, ... not already in `taken`
fn unique_entry_name(name: &str, taken: &HashSet<String>) -> String {
    if !taken.contains(name) {
        return name.to_string();
    }

    let (stem, ext) = match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
        _ => (name, None),
    };

    (1..)
        .map(|i| match ext {
            Some(ext) => format!("{}_{}.{}", stem, i, ext),
            None => format!("{}_{}", stem, i),
        })
        .find(|candidate| !taken.contains(candidate))
        .unwrap_or_else(|| name.to_string())
}
