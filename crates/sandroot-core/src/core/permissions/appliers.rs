use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use anyhow::{bail, Context, Result};

/// One way of setting a mode on a path. Implementations may report success without the
/// filesystem honoring it; callers verify afterwards.
pub trait PermissionApplier: Send + Sync {
    fn name(&self) -> &'static str;

    /// # Errors
    /// Returns an error when the mechanism itself fails.
    fn apply(&self, path: &Path, mode: u32) -> Result<()>;
}

/// `chmod(2)` through `std::fs::set_permissions`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ModeSyscall;

impl PermissionApplier for ModeSyscall {
    fn name(&self) -> &'static str {
        "mode-syscall"
    }

    fn apply(&self, path: &Path, mode: u32) -> Result<()> {
        fs::set_permissions(path, fs::Permissions::from_mode(mode))
            .with_context(|| format!("set_permissions failed for {}", path.display()))
    }
}

/// The external `chmod` binary.
#[derive(Debug, Clone)]
pub struct ChmodCommand {
    program: PathBuf,
}

impl ChmodCommand {
    #[must_use]
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Find `chmod` on `PATH`.
    #[must_use]
    pub fn locate() -> Option<Self> {
        which::which("chmod").ok().map(Self::new)
    }
}

impl PermissionApplier for ChmodCommand {
    fn name(&self) -> &'static str {
        "chmod-command"
    }

    fn apply(&self, path: &Path, mode: u32) -> Result<()> {
        let mut command = Command::new(&self.program);
        if path.is_dir() {
            command.arg("-R");
        }
        let status = command
            .arg(format!("{mode:o}"))
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .with_context(|| format!("failed to spawn {}", self.program.display()))?;
        if !status.success() {
            bail!("{} exited with {status}", self.program.display());
        }
        Ok(())
    }
}

/// Read-modify-write of the existing mode, adding the requested bits.
#[derive(Debug, Default, Clone, Copy)]
pub struct AttributeBits;

impl PermissionApplier for AttributeBits {
    fn name(&self) -> &'static str {
        "attribute-bits"
    }

    fn apply(&self, path: &Path, mode: u32) -> Result<()> {
        let meta = fs::metadata(path).with_context(|| format!("failed to stat {}", path.display()))?;
        let mut perms = meta.permissions();
        perms.set_mode((perms.mode() & 0o7777) | mode);
        fs::set_permissions(path, perms)
            .with_context(|| format!("failed to update attributes of {}", path.display()))
    }
}
