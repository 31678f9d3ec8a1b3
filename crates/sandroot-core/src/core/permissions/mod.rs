//! Best-effort executable/readable bits for the installed `bin` and `lib` trees.

pub mod appliers;

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::core::errors::PermissionError;

pub use appliers::{AttributeBits, ChmodCommand, ModeSyscall, PermissionApplier};

pub const EXECUTABLE_MODE: u32 = 0o755;

/// Binaries that get an individual pass with every mechanism after the bulk walk.
pub const CRITICAL_BINARIES: &[&str] = &[
    "bash", "sh", "apt", "dpkg", "cat", "ls", "chmod", "chown", "ln", "cp", "mv", "rm", "mkdir",
];

#[derive(Debug, Default)]
pub struct PermissionReport {
    pub visited: usize,
    pub fixed: usize,
    pub critical: usize,
    pub failures: Vec<PermissionError>,
}

impl PermissionReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

pub struct PermissionNormalizer {
    appliers: Vec<Box<dyn PermissionApplier>>,
}

impl std::fmt::Debug for PermissionNormalizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<_> = self.appliers.iter().map(|a| a.name()).collect();
        f.debug_struct("PermissionNormalizer")
            .field("appliers", &names)
            .finish()
    }
}

impl Default for PermissionNormalizer {
    fn default() -> Self {
        let mut appliers: Vec<Box<dyn PermissionApplier>> = vec![Box::new(ModeSyscall)];
        if let Some(chmod) = ChmodCommand::locate() {
            appliers.push(Box::new(chmod));
        }
        appliers.push(Box::new(AttributeBits));
        Self { appliers }
    }
}

impl PermissionNormalizer {
    #[must_use]
    pub fn with_appliers(appliers: Vec<Box<dyn PermissionApplier>>) -> Self {
        Self { appliers }
    }

    /// Make everything under `bin_dir` and `lib_dir` readable and executable, then give the
    /// critical binaries an extra pass. Never fails; problems are in the report.
    pub fn normalize(&self, bin_dir: &Path, lib_dir: &Path) -> PermissionReport {
        let mut report = PermissionReport::default();
        for dir in [bin_dir, lib_dir] {
            self.walk(dir, &mut report);
        }
        for name in CRITICAL_BINARIES {
            let path = bin_dir.join(name);
            if fs::symlink_metadata(&path).is_err() {
                continue;
            }
            match self.force_mode(&path, EXECUTABLE_MODE) {
                Ok(()) => report.critical += 1,
                Err(err) => {
                    warn!("{err}");
                    report.failures.push(err);
                }
            }
        }
        info!(
            visited = report.visited,
            fixed = report.fixed,
            critical = report.critical,
            failures = report.failures.len(),
            "permissions normalized"
        );
        report
    }

    /// Try each mechanism in order until the mode is observed on disk.
    ///
    /// # Errors
    /// Returns a [`PermissionError`] describing the last failure when no mechanism stuck.
    pub fn ensure_mode(&self, path: &Path, mode: u32) -> Result<&'static str, PermissionError> {
        let mut reason = String::from("no permission mechanism configured");
        for applier in &self.appliers {
            match applier.apply(path, mode) {
                Ok(()) if has_mode(path, mode) => return Ok(applier.name()),
                Ok(()) => reason = format!("{} reported success but mode did not change", applier.name()),
                Err(err) => reason = format!("{}: {err:#}", applier.name()),
            }
            debug!(path = %path.display(), applier = applier.name(), "permission mechanism fell through");
        }
        Err(PermissionError {
            path: path.to_path_buf(),
            mode,
            reason,
        })
    }

    /// Run every mechanism regardless of earlier successes.
    fn force_mode(&self, path: &Path, mode: u32) -> Result<(), PermissionError> {
        let mut last_reason = None;
        for applier in &self.appliers {
            if let Err(err) = applier.apply(path, mode) {
                last_reason = Some(format!("{}: {err:#}", applier.name()));
            }
        }
        if has_mode(path, mode) {
            return Ok(());
        }
        Err(PermissionError {
            path: path.to_path_buf(),
            mode,
            reason: last_reason.unwrap_or_else(|| "mode did not change".to_string()),
        })
    }

    fn walk(&self, dir: &Path, report: &mut PermissionReport) {
        if !dir.is_dir() {
            debug!(dir = %dir.display(), "skipping missing directory");
            return;
        }
        for entry in WalkDir::new(dir).follow_links(false) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!(dir = %dir.display(), "unable to walk: {err}");
                    continue;
                }
            };
            if entry.file_type().is_symlink() {
                continue;
            }
            report.visited += 1;
            if has_mode(entry.path(), EXECUTABLE_MODE) {
                continue;
            }
            match self.ensure_mode(entry.path(), EXECUTABLE_MODE) {
                Ok(_) => report.fixed += 1,
                Err(err) => {
                    warn!("{err}");
                    report.failures.push(err);
                }
            }
        }
    }
}

fn has_mode(path: &Path, mode: u32) -> bool {
    fs::metadata(path).is_ok_and(|meta| meta.permissions().mode() & mode == mode)
}
