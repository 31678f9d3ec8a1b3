//! Startup self-healing: one sentinel read, full catalog rewrite on mismatch.

use std::fs;
use std::io;

use anyhow::Result;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::core::commands::{is_engine_generated, CatalogInstall, CommandCatalog, SENTINEL_SCRIPT};
use crate::core::layout::SandboxLayout;
use crate::core::permissions::PermissionNormalizer;
use crate::core::state::VersionMarker;

/// State of the sentinel script on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SentinelState {
    Valid,
    Missing,
    /// Present but without the engine stamp; something else wrote it.
    Foreign,
    Unreadable,
}

impl SentinelState {
    #[must_use]
    pub fn is_valid(self) -> bool {
        self == Self::Valid
    }
}

/// Inspect the sentinel script only.
#[must_use]
pub fn sentinel_state(layout: &SandboxLayout) -> SentinelState {
    let path = layout.bin().join(SENTINEL_SCRIPT);
    match fs::read_to_string(&path) {
        Ok(content) if is_engine_generated(&content) => SentinelState::Valid,
        Ok(_) => SentinelState::Foreign,
        Err(err) if err.kind() == io::ErrorKind::NotFound => SentinelState::Missing,
        Err(err) => {
            error!(path = %path, "unable to read sentinel script: {err}");
            SentinelState::Unreadable
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HealReport {
    /// Set when the catalog was rewritten.
    pub regenerated: Option<CatalogInstall>,
    pub marker_restored: bool,
}

impl HealReport {
    #[must_use]
    pub fn was_needed(&self) -> bool {
        self.regenerated.is_some() || self.marker_restored
    }
}

/// Rewrite the whole catalog when the sentinel is missing or foreign, and put back a missing
/// version marker in the same pass.
///
/// # Errors
/// Returns an error when the catalog or the marker cannot be written.
pub fn regenerate_if_needed(
    layout: &SandboxLayout,
    catalog: &CommandCatalog,
    marker: &VersionMarker,
    normalizer: &PermissionNormalizer,
) -> Result<HealReport> {
    let state = sentinel_state(layout);
    if state.is_valid() {
        return Ok(HealReport::default());
    }
    warn!(sentinel = SENTINEL_SCRIPT, ?state, "generated commands invalid, regenerating");
    let summary = catalog.install(layout.bin().as_std_path(), normalizer)?;
    let mut report = HealReport {
        regenerated: Some(summary),
        marker_restored: false,
    };
    if !marker.exists() {
        marker.write()?;
        report.marker_restored = true;
    }
    info!(
        written = report.regenerated.as_ref().map_or(0, |s| s.written),
        marker_restored = report.marker_restored,
        "generated commands regenerated"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::commands::ScriptContext;
    use camino::Utf8PathBuf;
    use std::time::Duration;

    fn setup() -> (tempfile::TempDir, SandboxLayout, CommandCatalog, VersionMarker) {
        let temp = tempfile::tempdir().expect("tempdir");
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).expect("utf8");
        let layout = SandboxLayout::new(root).expect("layout");
        layout.ensure_dirs().expect("dirs");
        let catalog = CommandCatalog::render(&ScriptContext::new(
            &layout,
            "com.termux",
            Duration::from_millis(300),
        ));
        let marker = VersionMarker::new(&layout, "v-test");
        (temp, layout, catalog, marker)
    }

    #[test]
    fn healthy_sentinel_is_left_alone() {
        let (_temp, layout, catalog, marker) = setup();
        catalog
            .install(layout.bin().as_std_path(), &PermissionNormalizer::default())
            .expect("install");
        fs::remove_file(layout.bin().join("termux-toast")).expect("remove");

        let report =
            regenerate_if_needed(&layout, &catalog, &marker, &PermissionNormalizer::default())
                .expect("heal");
        assert!(!report.was_needed());
        assert!(!layout.bin().join("termux-toast").exists(), "only the sentinel is checked");
        assert!(!marker.exists());
    }

    #[test]
    fn foreign_sentinel_triggers_full_rewrite_and_marker_restore() {
        let (_temp, layout, catalog, marker) = setup();
        let sentinel = layout.bin().join(SENTINEL_SCRIPT);
        fs::write(&sentinel, "#!/bin/sh\nset -e -u\nexec other-api BatteryStatus\n").expect("seed");
        assert_eq!(sentinel_state(&layout), SentinelState::Foreign);

        let report =
            regenerate_if_needed(&layout, &catalog, &marker, &PermissionNormalizer::default())
                .expect("heal");
        assert!(report.marker_restored);
        assert_eq!(report.regenerated.expect("regenerated").written, catalog.len());
        assert_eq!(sentinel_state(&layout), SentinelState::Valid);
        assert!(catalog.verify(layout.bin().as_std_path()).is_intact());
        assert!(marker.matches());
    }

    #[test]
    fn existing_marker_is_not_rewritten() {
        let (_temp, layout, catalog, marker) = setup();
        fs::write(marker.path(), "older-version").expect("marker");
        assert_eq!(sentinel_state(&layout), SentinelState::Missing);

        let report =
            regenerate_if_needed(&layout, &catalog, &marker, &PermissionNormalizer::default())
                .expect("heal");
        assert!(report.regenerated.is_some());
        assert!(!report.marker_restored);
        assert_eq!(fs::read_to_string(marker.path()).expect("read"), "older-version");
    }
}
