use anyhow::{Context, Result};
use indexmap::IndexMap;

use super::AppIdentity;
use crate::core::fs::ensure_dir;
use crate::core::layout::SandboxLayout;

const TERMUX_VERSION: &str = "0.118.0";
const APK_RELEASE: &str = "SANDROOT";
const EXEC_PRELOAD: &str = "libtermux-exec-ld-preload.so";

/// Ordered, duplicate-free `KEY=VALUE` set handed to a spawned shell.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvironmentSet {
    vars: IndexMap<String, String>,
}

impl EnvironmentSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `key`. An existing key keeps its position and takes the new value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(key.into(), value.into());
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    #[must_use]
    pub fn to_strings(&self) -> Vec<String> {
        self.iter().map(|(k, v)| format!("{k}={v}")).collect()
    }
}

/// Assemble the environment for one shell spawn. Creates `tmp` and `var/run` on the way.
///
/// # Errors
/// Returns an error when the runtime directories cannot be created.
pub fn build_environment(
    layout: &SandboxLayout,
    identity: AppIdentity,
    package_name: &str,
    pid: u32,
) -> Result<EnvironmentSet> {
    let prefix = layout.prefix();
    let home = layout.home();
    let bin = layout.bin();
    let lib = layout.lib();
    let tmp = layout.tmp();
    let var_run = layout.var().join("run");
    for dir in [&tmp, &var_run] {
        ensure_dir(dir.as_std_path()).with_context(|| format!("failed to create {dir}"))?;
    }
    let user = identity.user_name();

    let mut env = EnvironmentSet::new();
    env.insert("HOME", home.as_str());
    env.insert("PREFIX", prefix.as_str());
    env.insert("PATH", format!("{bin}:/system/bin:/system/xbin"));
    env.insert("LD_LIBRARY_PATH", lib.as_str());
    env.insert("TMPDIR", tmp.as_str());
    env.insert("PWD", home.as_str());
    env.insert("TERM", "xterm-256color");
    env.insert("COLORTERM", "truecolor");
    env.insert("LANG", "en_US.UTF-8");
    env.insert("SHELL", bin.join("bash").as_str());
    env.insert("USER", user.clone());
    env.insert("LOGNAME", user);

    env.insert("TERMUX_VERSION", TERMUX_VERSION);
    env.insert("TERMUX_APK_RELEASE", APK_RELEASE);
    env.insert("TERMUX_IS_DEBUGGABLE_BUILD", "0");
    env.insert("TERMUX_MAIN_PACKAGE_FORMAT", "debian");
    env.insert("TERMUX__PREFIX", prefix.as_str());
    env.insert("TERMUX__HOME", home.as_str());
    env.insert("TERMUX__ROOTFS_DIR", layout.root().as_str());

    env.insert("TERMUX_APP_PID", pid.to_string());
    env.insert("TERMUX_APP__PID", pid.to_string());
    env.insert("TERMUX_APP__UID", identity.uid.to_string());
    env.insert("TERMUX_APP__PACKAGE_NAME", package_name);
    env.insert("TERMUX_APP__VERSION_NAME", env!("CARGO_PKG_VERSION"));
    env.insert("TERMUX_APP__VERSION_CODE", "1");
    env.insert("TERMUX_APP__TARGET_SDK", "28");
    env.insert("TERMUX_APP__USER_ID", "0");
    env.insert("TERMUX_APP__IS_DEBUGGABLE_BUILD", "false");
    env.insert("TERMUX_APP__APK_RELEASE", APK_RELEASE);
    env.insert("TERMUX_APP__PACKAGE_MANAGER", "apt");
    env.insert("TERMUX_APP__PACKAGE_VARIANT", "apt-android-7");
    env.insert("TERMUX_APP__FILES_DIR", layout.root().as_str());
    env.insert("TERMUX_APP__DATA_DIR", format!("/data/user/0/{package_name}"));
    env.insert("TERMUX_APP__LEGACY_DATA_DIR", format!("/data/data/{package_name}"));

    env.insert("ANDROID_DATA", "/data");
    env.insert("ANDROID_ROOT", "/system");
    env.insert("EXTERNAL_STORAGE", "/sdcard");
    env.insert("ANDROID_STORAGE", "/storage");

    env.insert("TMUX_TMPDIR", var_run.as_str());
    env.insert("BROWSER", "termux-open-url");
    env.insert("COREPACK_ENABLE_AUTO_PIN", "0");

    let cert = layout.etc().join("tls").join("cert.pem");
    if cert.exists() {
        env.insert("SSL_CERT_FILE", cert.as_str());
        env.insert("NODE_EXTRA_CA_CERTS", cert.as_str());
        env.insert("CURL_CA_BUNDLE", cert.as_str());
    }
    let preload = lib.join(EXEC_PRELOAD);
    if preload.exists() {
        env.insert("LD_PRELOAD", preload.as_str());
    }
    Ok(env)
}
