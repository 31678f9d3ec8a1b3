//! POSIX identity, network files, home scaffolding, and the spawn environment.

pub mod env;
pub mod files;
pub mod home;

use std::fs;
use std::os::unix::fs::MetadataExt;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::core::layout::SandboxLayout;

pub use env::{build_environment, EnvironmentSet};
pub use files::{write_etc_version, write_identity_files, write_network_files};
pub use home::{ensure_gyp_config, scaffold_home, write_npmrc};

/// Numeric identity of the app user that owns the sandbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AppIdentity {
    pub uid: u32,
    pub gid: u32,
}

impl AppIdentity {
    #[must_use]
    pub fn new(uid: u32, gid: u32) -> Self {
        Self { uid, gid }
    }

    /// Identity of whoever owns the sandbox root directory.
    ///
    /// # Errors
    /// Returns an error when the root cannot be inspected.
    pub fn of_root(layout: &SandboxLayout) -> Result<Self> {
        let meta = fs::metadata(layout.root())
            .with_context(|| format!("failed to stat sandbox root {}", layout.root()))?;
        Ok(Self::new(meta.uid(), meta.gid()))
    }

    /// Android-style per-app user name, `u0_a<app id>`.
    #[must_use]
    pub fn user_name(&self) -> String {
        format!("u0_a{}", self.uid % 100_000)
    }
}
