use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

use crate::core::net;

pub const DEFAULT_BUNDLE_URL: &str = "https://github.com/termux/termux-packages/releases/download/bootstrap-2026.01.04-r1%2Bapt.android-7/bootstrap-aarch64.zip";
pub const DEFAULT_BUNDLE_VERSION: &str = "sandroot-v1.8.1";
pub const DEFAULT_PACKAGE_NAME: &str = "com.termux";
pub const DEFAULT_REDIRECT_LIMIT: usize = 5;
pub const DEFAULT_CHUNK_SIZE: usize = 8 * 1024;
pub const DEFAULT_PROGRESS_STRIDE: usize = 100;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlobalOptions {
    pub quiet: bool,
    pub verbose: u8,
    pub trace: bool,
    pub json: bool,
    pub no_color: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct EnvSnapshot {
    vars: HashMap<String, String>,
}

impl EnvSnapshot {
    pub(crate) fn capture() -> Self {
        Self {
            vars: env::vars().collect(),
        }
    }

    pub(crate) fn var(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    fn non_empty(&self, key: &str) -> Option<&str> {
        self.var(key).map(str::trim).filter(|value| !value.is_empty())
    }

    #[cfg(test)]
    pub(crate) fn testing(pairs: &[(&str, &str)]) -> Self {
        let vars = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Self { vars }
    }
}

/// Explicit values that win over both defaults and the environment.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub root: Option<PathBuf>,
    pub cache_dir: Option<PathBuf>,
    pub bundle_url: Option<String>,
    pub bundle_version: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapConfig {
    pub(crate) bundle: BundleConfig,
    pub(crate) sandbox: SandboxConfig,
    pub(crate) transfer: TransferSettings,
    pub(crate) extract: ExtractSettings,
    pub(crate) dispatch: DispatchSettings,
}

impl BootstrapConfig {
    /// Builds a configuration from defaults, the current process environment, and `overrides`.
    ///
    /// # Errors
    /// Returns an error if the sandbox root or cache directory cannot be resolved to a UTF-8 path.
    pub fn from_env(overrides: &ConfigOverrides) -> Result<Self> {
        let snapshot = EnvSnapshot::capture();
        Self::from_snapshot(&snapshot, overrides)
    }

    pub(crate) fn from_snapshot(snapshot: &EnvSnapshot, overrides: &ConfigOverrides) -> Result<Self> {
        let root = match overrides.root.clone() {
            Some(root) => utf8(root)?,
            None => match snapshot.non_empty("SANDROOT_ROOT") {
                Some(root) => Utf8PathBuf::from(root),
                None => default_root()?,
            },
        };
        let cache_dir = match overrides.cache_dir.clone() {
            Some(dir) => utf8(dir)?,
            None => match snapshot.non_empty("SANDROOT_CACHE_DIR") {
                Some(dir) => Utf8PathBuf::from(dir),
                None => default_cache_dir(&root),
            },
        };
        let url = overrides
            .bundle_url
            .clone()
            .or_else(|| snapshot.non_empty("SANDROOT_BUNDLE_URL").map(ToOwned::to_owned))
            .unwrap_or_else(|| DEFAULT_BUNDLE_URL.to_string());
        let version = overrides
            .bundle_version
            .clone()
            .or_else(|| {
                snapshot
                    .non_empty("SANDROOT_BUNDLE_VERSION")
                    .map(ToOwned::to_owned)
            })
            .unwrap_or_else(|| DEFAULT_BUNDLE_VERSION.to_string());

        Ok(Self {
            bundle: BundleConfig { url, version },
            sandbox: SandboxConfig {
                root,
                cache_dir,
                package_name: DEFAULT_PACKAGE_NAME.to_string(),
            },
            transfer: TransferSettings {
                keep_proxies: net::keep_proxies(snapshot),
                ..TransferSettings::default()
            },
            extract: ExtractSettings::default(),
            dispatch: DispatchSettings::default(),
        })
    }

    /// Configuration rooted at `root` with every other value at its default.
    #[must_use]
    pub fn for_root(root: impl Into<Utf8PathBuf>) -> Self {
        let root = root.into();
        Self {
            bundle: BundleConfig {
                url: DEFAULT_BUNDLE_URL.to_string(),
                version: DEFAULT_BUNDLE_VERSION.to_string(),
            },
            sandbox: SandboxConfig {
                cache_dir: root.join(".cache"),
                root,
                package_name: DEFAULT_PACKAGE_NAME.to_string(),
            },
            transfer: TransferSettings::default(),
            extract: ExtractSettings::default(),
            dispatch: DispatchSettings::default(),
        }
    }

    #[must_use]
    pub fn with_bundle(mut self, url: impl Into<String>, version: impl Into<String>) -> Self {
        self.bundle.url = url.into();
        self.bundle.version = version.into();
        self
    }

    #[must_use]
    pub fn with_dispatch_wait(mut self, wait: Duration) -> Self {
        self.dispatch.wait = wait;
        self
    }

    #[must_use]
    pub fn bundle(&self) -> &BundleConfig {
        &self.bundle
    }

    #[must_use]
    pub fn sandbox(&self) -> &SandboxConfig {
        &self.sandbox
    }

    #[must_use]
    pub fn transfer(&self) -> &TransferSettings {
        &self.transfer
    }

    #[must_use]
    pub fn extract(&self) -> &ExtractSettings {
        &self.extract
    }

    #[must_use]
    pub fn dispatch(&self) -> &DispatchSettings {
        &self.dispatch
    }
}

fn utf8(path: PathBuf) -> Result<Utf8PathBuf> {
    Utf8PathBuf::from_path_buf(path)
        .map_err(|path| anyhow!("path is not valid UTF-8: {}", path.display()))
}

fn default_root() -> Result<Utf8PathBuf> {
    let base = dirs_next::data_dir()
        .or_else(|| dirs_next::home_dir().map(|home| home.join(".local").join("share")))
        .context("unable to determine a data directory for the sandbox root")?;
    Ok(utf8(base)?.join("sandroot").join("files"))
}

fn default_cache_dir(root: &Utf8Path) -> Utf8PathBuf {
    dirs_next::cache_dir()
        .and_then(|dir| Utf8PathBuf::from_path_buf(dir).ok())
        .map_or_else(|| root.join(".cache"), |dir| dir.join("sandroot"))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BundleConfig {
    pub url: String,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SandboxConfig {
    pub root: Utf8PathBuf,
    pub cache_dir: Utf8PathBuf,
    pub package_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferSettings {
    pub redirect_limit: usize,
    pub connect_timeout: Duration,
    /// Longest stall allowed on a single read or write once connected.
    pub read_timeout: Duration,
    pub chunk_size: usize,
    pub keep_proxies: bool,
}

impl Default for TransferSettings {
    fn default() -> Self {
        Self {
            redirect_limit: DEFAULT_REDIRECT_LIMIT,
            connect_timeout: Duration::from_secs(30),
            read_timeout: Duration::from_secs(30),
            chunk_size: DEFAULT_CHUNK_SIZE,
            keep_proxies: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ExtractSettings {
    pub progress_stride: usize,
}

impl Default for ExtractSettings {
    fn default() -> Self {
        Self {
            progress_stride: DEFAULT_PROGRESS_STRIDE,
        }
    }
}

/// Reply timing for the request spool. Slow wrappers wait twice as long.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DispatchSettings {
    pub wait: Duration,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            wait: Duration::from_millis(300),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    struct EnvGuard {
        key: &'static str,
        previous: Option<String>,
    }

    impl EnvGuard {
        fn set(key: &'static str, value: Option<&str>) -> Self {
            let previous = env::var(key).ok();
            match value {
                Some(value) => env::set_var(key, value),
                None => env::remove_var(key),
            }
            Self { key, previous }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            match &self.previous {
                Some(value) => env::set_var(self.key, value),
                None => env::remove_var(self.key),
            }
        }
    }

    #[test]
    #[serial]
    fn from_env_captures_process_environment() {
        let _root = EnvGuard::set("SANDROOT_ROOT", Some("/tmp/sandroot-env-root"));
        let _version = EnvGuard::set("SANDROOT_BUNDLE_VERSION", None);
        let _url = EnvGuard::set("SANDROOT_BUNDLE_URL", None);
        let config = BootstrapConfig::from_env(&ConfigOverrides::default()).expect("config");
        assert_eq!(config.sandbox().root, Utf8PathBuf::from("/tmp/sandroot-env-root"));
        assert_eq!(config.bundle().version, DEFAULT_BUNDLE_VERSION);
        assert_eq!(config.bundle().url, DEFAULT_BUNDLE_URL);
        assert_eq!(config.dispatch().wait, Duration::from_millis(300));
    }

    #[test]
    fn environment_overrides_defaults() {
        let snapshot = EnvSnapshot::testing(&[
            ("SANDROOT_ROOT", "/data/sandbox"),
            ("SANDROOT_CACHE_DIR", "/data/cache"),
            ("SANDROOT_BUNDLE_URL", "https://mirror.example/bundle.zip"),
            ("SANDROOT_BUNDLE_VERSION", "custom-1"),
        ]);
        let config =
            BootstrapConfig::from_snapshot(&snapshot, &ConfigOverrides::default()).expect("config");
        assert_eq!(config.sandbox().root, Utf8PathBuf::from("/data/sandbox"));
        assert_eq!(config.sandbox().cache_dir, Utf8PathBuf::from("/data/cache"));
        assert_eq!(config.bundle().url, "https://mirror.example/bundle.zip");
        assert_eq!(config.bundle().version, "custom-1");
        assert_eq!(config.transfer().redirect_limit, 5);
        assert_eq!(config.transfer().chunk_size, 8192);
    }

    #[test]
    fn explicit_overrides_beat_environment() {
        let snapshot = EnvSnapshot::testing(&[
            ("SANDROOT_ROOT", "/data/sandbox"),
            ("SANDROOT_BUNDLE_VERSION", "from-env"),
        ]);
        let overrides = ConfigOverrides {
            root: Some(PathBuf::from("/flag/root")),
            bundle_version: Some("from-flag".into()),
            ..ConfigOverrides::default()
        };
        let config = BootstrapConfig::from_snapshot(&snapshot, &overrides).expect("config");
        assert_eq!(config.sandbox().root, Utf8PathBuf::from("/flag/root"));
        assert_eq!(config.bundle().version, "from-flag");
        assert_eq!(config.bundle().url, DEFAULT_BUNDLE_URL);
    }

    #[test]
    fn blank_environment_values_fall_back_to_defaults() {
        let snapshot = EnvSnapshot::testing(&[
            ("SANDROOT_ROOT", "/data/sandbox"),
            ("SANDROOT_BUNDLE_VERSION", "  "),
        ]);
        let config =
            BootstrapConfig::from_snapshot(&snapshot, &ConfigOverrides::default()).expect("config");
        assert_eq!(config.bundle().version, DEFAULT_BUNDLE_VERSION);
    }

    #[test]
    fn keep_proxies_flows_into_transfer_settings() {
        let snapshot = EnvSnapshot::testing(&[
            ("SANDROOT_ROOT", "/data/sandbox"),
            ("SANDROOT_KEEP_PROXIES", "yes"),
        ]);
        let config =
            BootstrapConfig::from_snapshot(&snapshot, &ConfigOverrides::default()).expect("config");
        assert!(config.transfer().keep_proxies);
        assert_eq!(config.transfer().connect_timeout, Duration::from_secs(30));
        assert_eq!(config.transfer().read_timeout, Duration::from_secs(30));
    }
}
