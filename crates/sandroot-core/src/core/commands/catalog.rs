use std::fs;
use std::io;
use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use camino::Utf8PathBuf;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use super::{am, api, utilities};
use crate::core::fs::write_atomic;
use crate::core::layout::SandboxLayout;
use crate::core::permissions::{PermissionNormalizer, EXECUTABLE_MODE};

/// Stamp carried by every engine-generated script.
pub const STAMP_PREFIX: &str = "# sandroot API: ";
/// The script whose stamp the self-healing check inspects.
pub const SENTINEL_SCRIPT: &str = "termux-battery-status";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptKind {
    /// Goes through the request spool.
    Wrapper,
    /// Local logic only.
    Utility,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WritePolicy {
    Always,
    /// Left alone when something already occupies the name.
    IfAbsent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedScript {
    pub name: String,
    pub content: String,
    pub kind: ScriptKind,
    pub policy: WritePolicy,
}

impl GeneratedScript {
    #[must_use]
    pub fn digest(&self) -> String {
        sha256_hex(self.content.as_bytes())
    }
}

/// Paths and timing substituted into script templates.
#[derive(Debug, Clone)]
pub struct ScriptContext {
    bin: Utf8PathBuf,
    prefix: Utf8PathBuf,
    home: Utf8PathBuf,
    tmp: Utf8PathBuf,
    spool: Utf8PathBuf,
    package_name: String,
    wait: Duration,
}

impl ScriptContext {
    #[must_use]
    pub fn new(layout: &SandboxLayout, package_name: &str, wait: Duration) -> Self {
        Self {
            bin: layout.bin(),
            prefix: layout.prefix().to_path_buf(),
            home: layout.home().to_path_buf(),
            tmp: layout.tmp(),
            spool: layout.api_spool(),
            package_name: package_name.to_string(),
            wait,
        }
    }

    fn expand(&self, template: &str) -> String {
        template
            .replace("@BIN@", self.bin.as_str())
            .replace("@PREFIX@", self.prefix.as_str())
            .replace("@HOME@", self.home.as_str())
            .replace("@TMP@", self.tmp.as_str())
            .replace("@SPOOL@", self.spool.as_str())
            .replace("@PACKAGE@", &self.package_name)
            .replace("@SLOW_WAIT@", &seconds(self.wait * 2))
            .replace("@WAIT@", &seconds(self.wait))
            .replace("@AM_VERSION@", am::AM_VERSION)
    }

    fn header(&self, shell: &str, name: &str) -> String {
        format!("#!{}/{shell}\n{STAMP_PREFIX}{name}\n", self.bin)
    }
}

/// `sleep`-compatible decimal seconds.
fn seconds(wait: Duration) -> String {
    let millis = wait.as_millis();
    let text = format!("{}.{:03}", millis / 1000, millis % 1000);
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}

fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Scripts that stay POSIX `sh`.
const SH_SCRIPTS: &[&str] = &[
    "termux-open-url",
    "termux-open",
    "xdg-open",
    "sensible-browser",
    "open",
    "am",
];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogInstall {
    pub written: usize,
    pub skipped: usize,
    pub permission_failures: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogStatus {
    pub missing: Vec<String>,
    pub altered: Vec<String>,
}

impl CatalogStatus {
    #[must_use]
    pub fn is_intact(&self) -> bool {
        self.missing.is_empty() && self.altered.is_empty()
    }
}

/// The full, deterministic set of generated commands for one sandbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandCatalog {
    scripts: Vec<GeneratedScript>,
}

impl CommandCatalog {
    #[must_use]
    pub fn render(ctx: &ScriptContext) -> Self {
        let mut scripts = Vec::new();
        let call = ctx.expand(api::CALL_FUNCTION);
        let wrapper = |name: &str, body: String| GeneratedScript {
            name: name.to_string(),
            content: format!("{}{call}\n{}", ctx.header("bash", name), ctx.expand(&body)),
            kind: ScriptKind::Wrapper,
            policy: WritePolicy::Always,
        };
        for (name, method, args) in api::SIMPLE {
            scripts.push(wrapper(*name, api::simple_body(method, args)));
        }
        for (name, body) in api::SHAPED {
            scripts.push(wrapper(*name, (*body).to_string()));
        }

        let utility = |name: &str, body: &str, policy: WritePolicy| {
            let shell = if SH_SCRIPTS.contains(&name) {
                "sh"
            } else {
                "bash"
            };
            GeneratedScript {
                name: name.to_string(),
                content: format!("{}{}", ctx.header(shell, name), ctx.expand(body)),
                kind: ScriptKind::Utility,
                policy,
            }
        };
        for (name, body) in utilities::UTILITIES {
            scripts.push(utility(*name, *body, WritePolicy::Always));
        }
        let (name, body) = utilities::PKG_CONFIG;
        scripts.push(utility(name, body, WritePolicy::IfAbsent));
        scripts.push(utility("am", am::AM_SHIM, WritePolicy::Always));
        Self { scripts }
    }

    #[must_use]
    pub fn scripts(&self) -> &[GeneratedScript] {
        &self.scripts
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&GeneratedScript> {
        self.scripts.iter().find(|script| script.name == name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.scripts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty()
    }

    /// SHA-256 over every `(name, content)` pair in catalog order.
    #[must_use]
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        for script in &self.scripts {
            hasher.update(script.name.as_bytes());
            hasher.update([0]);
            hasher.update(script.content.as_bytes());
            hasher.update([0]);
        }
        hex::encode(hasher.finalize())
    }

    /// Write every script into `bin` and mark it executable.
    ///
    /// # Errors
    /// Returns an error when a script cannot be written. Mode failures are only counted.
    pub fn install(&self, bin: &Path, normalizer: &PermissionNormalizer) -> Result<CatalogInstall> {
        self.install_matching(bin, normalizer, |_| true)
    }

    /// [`Self::install`] restricted to the scripts `filter` accepts.
    ///
    /// # Errors
    /// Returns an error when a script cannot be written.
    pub fn install_matching(
        &self,
        bin: &Path,
        normalizer: &PermissionNormalizer,
        filter: impl Fn(&GeneratedScript) -> bool,
    ) -> Result<CatalogInstall> {
        let mut summary = CatalogInstall::default();
        for script in self.scripts.iter().filter(|script| filter(script)) {
            let path = bin.join(&script.name);
            if script.policy == WritePolicy::IfAbsent && fs::symlink_metadata(&path).is_ok() {
                debug!(script = %script.name, "keeping existing command");
                summary.skipped += 1;
                continue;
            }
            write_atomic(&path, script.content.as_bytes())?;
            if let Err(err) = normalizer.ensure_mode(&path, EXECUTABLE_MODE) {
                warn!("{err}");
                summary.permission_failures += 1;
            }
            summary.written += 1;
        }
        info!(
            written = summary.written,
            skipped = summary.skipped,
            digest = %self.digest(),
            "command catalog installed"
        );
        Ok(summary)
    }

    /// Compare on-disk scripts with their rendered bytes.
    #[must_use]
    pub fn verify(&self, bin: &Path) -> CatalogStatus {
        let mut status = CatalogStatus::default();
        for script in &self.scripts {
            let path = bin.join(&script.name);
            match fs::read(&path) {
                Ok(bytes) => {
                    if script.policy == WritePolicy::Always && sha256_hex(&bytes) != script.digest() {
                        status.altered.push(script.name.clone());
                    }
                }
                Err(err) if err.kind() == io::ErrorKind::NotFound => {
                    status.missing.push(script.name.clone());
                }
                Err(err) => {
                    warn!(path = %path.display(), "unable to read command: {err}");
                    status.altered.push(script.name.clone());
                }
            }
        }
        status
    }
}

/// Whether `content` carries the engine stamp.
#[must_use]
pub fn is_engine_generated(content: &str) -> bool {
    content.contains(STAMP_PREFIX)
}
