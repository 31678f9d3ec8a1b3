//! Paths of the installed tree, derived from one sandbox root.

use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};

use crate::core::fs::ensure_dir;

pub const MARKER_FILE: &str = ".sandroot_version";
pub const ETC_VERSION_FILE: &str = "sandroot-version";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum LayoutError {
    #[error("home directory {home} must not be inside prefix {prefix}")]
    HomeInsidePrefix { home: Utf8PathBuf, prefix: Utf8PathBuf },
}

/// Every persisted location under the sandbox root.
///
/// `prefix` and `home` are siblings; scripts and identity files rely on that.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxLayout {
    root: Utf8PathBuf,
    prefix: Utf8PathBuf,
    home: Utf8PathBuf,
}

impl SandboxLayout {
    /// Standard layout: `<root>/usr` and `<root>/home`.
    ///
    /// # Errors
    /// Never fails for the standard layout; the signature matches [`Self::with_paths`].
    pub fn new(root: impl Into<Utf8PathBuf>) -> Result<Self, LayoutError> {
        let root = root.into();
        let prefix = root.join("usr");
        let home = root.join("home");
        Self::with_paths(root, prefix, home)
    }

    /// Layout with explicit prefix and home directories.
    ///
    /// # Errors
    /// Returns [`LayoutError::HomeInsidePrefix`] when `home` equals or nests inside `prefix`.
    pub fn with_paths(
        root: impl Into<Utf8PathBuf>,
        prefix: impl Into<Utf8PathBuf>,
        home: impl Into<Utf8PathBuf>,
    ) -> Result<Self, LayoutError> {
        let prefix = prefix.into();
        let home = home.into();
        if home.starts_with(&prefix) {
            return Err(LayoutError::HomeInsidePrefix { home, prefix });
        }
        Ok(Self {
            root: root.into(),
            prefix,
            home,
        })
    }

    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    #[must_use]
    pub fn prefix(&self) -> &Utf8Path {
        &self.prefix
    }

    #[must_use]
    pub fn home(&self) -> &Utf8Path {
        &self.home
    }

    #[must_use]
    pub fn bin(&self) -> Utf8PathBuf {
        self.prefix.join("bin")
    }

    #[must_use]
    pub fn lib(&self) -> Utf8PathBuf {
        self.prefix.join("lib")
    }

    #[must_use]
    pub fn etc(&self) -> Utf8PathBuf {
        self.prefix.join("etc")
    }

    #[must_use]
    pub fn tmp(&self) -> Utf8PathBuf {
        self.prefix.join("tmp")
    }

    #[must_use]
    pub fn var(&self) -> Utf8PathBuf {
        self.prefix.join("var")
    }

    #[must_use]
    pub fn share(&self) -> Utf8PathBuf {
        self.prefix.join("share")
    }

    /// The checked idempotency marker.
    #[must_use]
    pub fn version_marker(&self) -> Utf8PathBuf {
        self.prefix.join(MARKER_FILE)
    }

    /// Human-readable copy of the installed version under `etc`.
    #[must_use]
    pub fn etc_version(&self) -> Utf8PathBuf {
        self.etc().join(ETC_VERSION_FILE)
    }

    /// Spool directory shared by generated wrappers and the in-process API channel.
    #[must_use]
    pub fn api_spool(&self) -> Utf8PathBuf {
        self.tmp().join("api-requests")
    }

    /// Create the directory skeleton of the installed tree.
    ///
    /// # Errors
    /// Returns an error when any directory cannot be created.
    pub fn ensure_dirs(&self) -> Result<()> {
        let dirs = [
            self.prefix.clone(),
            self.bin(),
            self.lib(),
            self.etc(),
            self.tmp(),
            self.var(),
            self.share(),
            self.home.clone(),
        ];
        for dir in &dirs {
            ensure_dir(dir.as_std_path()).with_context(|| format!("failed to create {dir}"))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_layout_keeps_home_beside_prefix() {
        let layout = SandboxLayout::new("/data/files").expect("layout");
        assert_eq!(layout.prefix(), "/data/files/usr");
        assert_eq!(layout.home(), "/data/files/home");
        assert_eq!(layout.bin(), "/data/files/usr/bin");
        assert_eq!(layout.version_marker(), "/data/files/usr/.sandroot_version");
        assert_eq!(layout.etc_version(), "/data/files/usr/etc/sandroot-version");
    }

    #[test]
    fn home_nested_in_prefix_is_rejected() {
        let err = SandboxLayout::with_paths("/r", "/r/usr", "/r/usr/home").expect_err("nested");
        assert!(matches!(err, LayoutError::HomeInsidePrefix { .. }));
        let err = SandboxLayout::with_paths("/r", "/r/usr", "/r/usr").expect_err("alias");
        assert!(err.to_string().contains("must not be inside prefix"));
    }

    #[test]
    fn sibling_with_shared_name_prefix_is_allowed() {
        let layout = SandboxLayout::with_paths("/r", "/r/usr", "/r/usr-home").expect("layout");
        assert_eq!(layout.home(), "/r/usr-home");
    }

    #[test]
    fn ensure_dirs_creates_skeleton() {
        let temp = tempfile::tempdir().expect("tempdir");
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).expect("utf8");
        let layout = SandboxLayout::new(root).expect("layout");
        layout.ensure_dirs().expect("dirs");
        layout.ensure_dirs().expect("idempotent");
        for dir in [layout.bin(), layout.lib(), layout.etc(), layout.tmp(), layout.var(), layout.share()] {
            assert!(dir.is_dir(), "{dir} missing");
        }
        assert!(layout.home().is_dir());
    }
}
