//! The version marker: the only durable record of a completed install.

use std::fs;
use std::io;

use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use tracing::debug;

use crate::core::fs::write_atomic;
use crate::core::layout::SandboxLayout;

/// Binaries whose presence stands in for "a real bundle was extracted".
pub const SENTINEL_BINARIES: [&str; 2] = ["bash", "apt"];

/// What the marker file currently says.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstalledVersion {
    Absent,
    Present(String),
}

impl InstalledVersion {
    #[must_use]
    pub fn as_deref(&self) -> Option<&str> {
        match self {
            Self::Absent => None,
            Self::Present(version) => Some(version),
        }
    }
}

#[derive(Debug, Clone)]
pub struct VersionMarker {
    path: Utf8PathBuf,
    expected: String,
}

impl VersionMarker {
    #[must_use]
    pub fn new(layout: &SandboxLayout, expected: impl Into<String>) -> Self {
        Self {
            path: layout.version_marker(),
            expected: expected.into(),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Utf8PathBuf {
        &self.path
    }

    #[must_use]
    pub fn expected(&self) -> &str {
        &self.expected
    }

    /// Read the marker, trimmed.
    ///
    /// # Errors
    /// Returns an error for I/O failures other than the file being absent.
    pub fn current(&self) -> Result<InstalledVersion> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => Ok(InstalledVersion::Present(raw.trim().to_string())),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(InstalledVersion::Absent),
            Err(err) => Err(err).with_context(|| format!("failed to read {}", self.path)),
        }
    }

    /// Whether the marker holds exactly the expected version. Unreadable counts as no.
    #[must_use]
    pub fn matches(&self) -> bool {
        matches!(self.current(), Ok(InstalledVersion::Present(ref v)) if *v == self.expected)
    }

    /// # Errors
    /// Returns an error when the marker cannot be written.
    pub fn write(&self) -> Result<()> {
        write_atomic(self.path.as_std_path(), self.expected.as_bytes())?;
        debug!(path = %self.path, version = %self.expected, "version marker written");
        Ok(())
    }

    #[must_use]
    pub fn exists(&self) -> bool {
        self.path.exists()
    }
}

/// Cheap install check: sentinel binaries present and the marker matches.
#[must_use]
pub fn is_installed(layout: &SandboxLayout, marker: &VersionMarker) -> bool {
    let bin = layout.bin();
    SENTINEL_BINARIES.iter().all(|name| bin.join(name).exists()) && marker.matches()
}
