//! Two-pass bundle extraction: entries first, then the symlink manifest.

pub mod manifest;
pub mod symlinks;

use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::Path;

use tracing::{debug, info, warn};
use zip::ZipArchive;

use crate::core::cancel::CancelToken;
use crate::core::config::ExtractSettings;
use crate::core::errors::ExtractError;
use crate::core::fs::{create_truncating, ensure_dir};

pub use manifest::{MalformedLine, SymlinkEntry, SymlinkManifest, MANIFEST_NAME, SEPARATOR};
pub use symlinks::{reconstruct, SymlinkReport};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractReport {
    /// Files and directories written.
    pub extracted: usize,
    /// Entries with unsafe names that were not written.
    pub skipped: usize,
    pub symlinks: SymlinkReport,
    pub malformed_links: usize,
}

/// Unpack `archive` into `dest_root`, then build the links listed in `SYMLINKS.txt`.
///
/// `on_progress` receives the running entry count every `progress_stride` entries and once
/// after the last entry.
///
/// # Errors
/// Returns [`ExtractError`] when the archive cannot be read or an entry cannot be written.
/// Malformed manifest lines and failed links are logged and counted instead.
pub fn extract(
    archive: &Path,
    dest_root: &Path,
    settings: &ExtractSettings,
    cancel: &CancelToken,
    on_progress: &mut dyn FnMut(usize),
) -> Result<ExtractReport, ExtractError> {
    let corrupt = |source| ExtractError::Corrupt {
        path: archive.to_path_buf(),
        source,
    };
    let file = File::open(archive).map_err(|source| ExtractError::Open {
        path: archive.to_path_buf(),
        source,
    })?;
    let mut zip = ZipArchive::new(file).map_err(corrupt)?;
    ensure_dir(dest_root).map_err(|source| ExtractError::Write {
        path: dest_root.to_path_buf(),
        source,
    })?;

    let stride = settings.progress_stride.max(1);
    let mut report = ExtractReport::default();
    let mut manifest_text: Option<String> = None;

    for index in 0..zip.len() {
        if cancel.is_cancelled() {
            return Err(ExtractError::Cancelled);
        }
        let mut entry = zip.by_index(index).map_err(corrupt)?;
        let name = entry.name().to_string();
        if is_manifest(&name) {
            let mut raw = Vec::new();
            entry
                .read_to_end(&mut raw)
                .map_err(|source| ExtractError::EntryRead {
                    archive: archive.to_path_buf(),
                    entry: name.clone(),
                    source,
                })?;
            manifest_text = Some(String::from_utf8_lossy(&raw).into_owned());
            continue;
        }
        let Some(target) = entry.enclosed_name().map(|rel| dest_root.join(rel)) else {
            warn!(entry = %name, "skipping archive entry with unsafe path");
            report.skipped += 1;
            continue;
        };
        let write_err = |source| ExtractError::Write {
            path: target.clone(),
            source,
        };
        if entry.is_dir() || name.ends_with('/') {
            ensure_dir(&target).map_err(write_err)?;
        } else {
            if let Some(parent) = target.parent() {
                ensure_dir(parent).map_err(write_err)?;
            }
            unlink_stale_symlink(&target).map_err(write_err)?;
            let mut out = create_truncating(&target).map_err(write_err)?;
            copy_entry(&mut entry, &mut out).map_err(|failure| match failure {
                CopyFailure::Read(source) => ExtractError::EntryRead {
                    archive: archive.to_path_buf(),
                    entry: name.clone(),
                    source,
                },
                CopyFailure::Write(source) => write_err(source),
            })?;
        }
        report.extracted += 1;
        if report.extracted % stride == 0 {
            on_progress(report.extracted);
        }
    }
    on_progress(report.extracted);

    match manifest_text {
        Some(text) => {
            let manifest = SymlinkManifest::parse(&text);
            report.malformed_links = manifest.malformed.len();
            report.symlinks = reconstruct(&manifest, dest_root);
        }
        None => debug!("bundle has no {MANIFEST_NAME}"),
    }

    info!(
        entries = report.extracted,
        symlinks = report.symlinks.created,
        malformed = report.malformed_links,
        "bundle extracted"
    );
    Ok(report)
}

enum CopyFailure {
    Read(io::Error),
    Write(io::Error),
}

/// `io::copy` that keeps decompression and CRC failures apart from disk failures.
fn copy_entry(entry: &mut impl Read, out: &mut impl Write) -> Result<u64, CopyFailure> {
    let mut buf = [0u8; 8192];
    let mut total = 0u64;
    loop {
        let read = match entry.read(&mut buf) {
            Ok(0) => return Ok(total),
            Ok(read) => read,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(CopyFailure::Read(err)),
        };
        out.write_all(&buf[..read]).map_err(CopyFailure::Write)?;
        total += read as u64;
    }
}

fn is_manifest(name: &str) -> bool {
    name.trim_start_matches("./") == MANIFEST_NAME
}

/// A link left by a previous install would redirect the write into its target.
fn unlink_stale_symlink(path: &Path) -> io::Result<()> {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.file_type().is_symlink() => fs::remove_file(path),
        _ => Ok(()),
    }
}
