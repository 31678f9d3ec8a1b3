use std::os::unix::fs::symlink;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, warn};

use super::manifest::{SymlinkEntry, SymlinkManifest};
use crate::core::fs::{ensure_dir, remove_path_for_replace};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SymlinkReport {
    pub created: usize,
    pub failed: usize,
}

/// Create every manifest link under `dest_root`, replacing whatever node is there.
///
/// Targets are not validated; dangling links are expected.
pub fn reconstruct(manifest: &SymlinkManifest, dest_root: &Path) -> SymlinkReport {
    let mut report = SymlinkReport::default();
    for entry in &manifest.entries {
        match create_link(entry, dest_root) {
            Ok(()) => report.created += 1,
            Err(err) => {
                warn!(link = %entry.link_path, target = %entry.target, "failed to create symlink: {err:#}");
                report.failed += 1;
            }
        }
    }
    debug!(created = report.created, failed = report.failed, "symlinks reconstructed");
    report
}

fn create_link(entry: &SymlinkEntry, dest_root: &Path) -> Result<()> {
    let link = dest_root.join(&entry.link_path);
    if let Some(parent) = link.parent() {
        ensure_dir(parent).with_context(|| format!("failed to create {}", parent.display()))?;
    }
    remove_path_for_replace(&link)?;
    symlink(&entry.target, &link)
        .with_context(|| format!("failed to link {} -> {}", link.display(), entry.target))
}
