use anyhow::Result;
use tracing::debug;

use crate::core::fs::{write_atomic, write_if_absent};
use crate::core::layout::SandboxLayout;

const NPMRC: &str = "foreground-scripts=true\n";
const GYP_INCLUDE: &str = "{\n  'variables': {\n    'android_ndk_path': ''\n  }\n}\n";

fn bashrc(layout: &SandboxLayout) -> String {
    format!(
        r#"# sandroot bashrc
export PREFIX="{prefix}"
export HOME="{home}"
export PATH="$PREFIX/bin:/system/bin"
export LD_LIBRARY_PATH="$PREFIX/lib"
export LANG=en_US.UTF-8
export TERM=xterm-256color

alias ll='ls -la'
alias la='ls -A'
alias l='ls -CF'

PS1='\[\e[32m\]\u@sandroot\[\e[0m\]:\[\e[34m\]\w\[\e[0m\]$ '
"#,
        prefix = layout.prefix(),
        home = layout.home(),
    )
}

const PROFILE: &str = "# sandroot profile\nif [ -f ~/.bashrc ]; then\n    . ~/.bashrc\nfi\n";

/// Create `.bashrc` and `.profile` when missing. Existing files are user territory.
///
/// # Errors
/// Returns an error when a missing file cannot be created.
pub fn scaffold_home(layout: &SandboxLayout) -> Result<()> {
    let home = layout.home();
    if write_if_absent(home.join(".bashrc").as_std_path(), bashrc(layout).as_bytes())? {
        debug!("created ~/.bashrc");
    }
    if write_if_absent(home.join(".profile").as_std_path(), PROFILE.as_bytes())? {
        debug!("created ~/.profile");
    }
    Ok(())
}

/// # Errors
/// Returns an error when `.npmrc` cannot be written.
pub fn write_npmrc(layout: &SandboxLayout) -> Result<()> {
    write_atomic(layout.home().join(".npmrc").as_std_path(), NPMRC.as_bytes())
}

/// Native node modules look for `~/.gyp/include.gypi`.
///
/// # Errors
/// Returns an error when the file is missing and cannot be created.
pub fn ensure_gyp_config(layout: &SandboxLayout) -> Result<()> {
    let path = layout.home().join(".gyp").join("include.gypi");
    if write_if_absent(path.as_std_path(), GYP_INCLUDE.as_bytes())? {
        debug!(path = %path, "created gyp include");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use std::fs;

    #[test]
    fn scaffold_keeps_user_edits_but_npmrc_is_reset() {
        let temp = tempfile::tempdir().expect("tempdir");
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).expect("utf8");
        let layout = SandboxLayout::new(root).expect("layout");
        layout.ensure_dirs().expect("dirs");
        fs::write(layout.home().join(".bashrc"), "# mine\n").expect("seed");
        fs::write(layout.home().join(".npmrc"), "registry=x\n").expect("seed");

        scaffold_home(&layout).expect("scaffold");
        write_npmrc(&layout).expect("npmrc");
        ensure_gyp_config(&layout).expect("gyp");

        let home = layout.home();
        assert_eq!(fs::read_to_string(home.join(".bashrc")).expect("bashrc"), "# mine\n");
        assert!(fs::read_to_string(home.join(".profile"))
            .expect("profile")
            .contains(". ~/.bashrc"));
        assert_eq!(fs::read_to_string(home.join(".npmrc")).expect("npmrc"), NPMRC);
        assert!(fs::read_to_string(home.join(".gyp/include.gypi"))
            .expect("gyp")
            .contains("android_ndk_path"));
    }

    #[test]
    fn bashrc_points_at_layout() {
        let layout = SandboxLayout::new("/data/files").expect("layout");
        let text = bashrc(&layout);
        assert!(text.contains("export PREFIX=\"/data/files/usr\""));
        assert!(text.contains("export HOME=\"/data/files/home\""));
    }
}
