use anyhow::Result;
use tracing::{debug, info};

use super::AppIdentity;
use crate::core::fs::{write_atomic, write_if_absent};
use crate::core::layout::SandboxLayout;

const HOSTS: &str = "127.0.0.1       localhost\n::1             localhost\n";
const RESOLV_CONF: &str = "nameserver 8.8.8.8\nnameserver 8.8.4.4\n";

/// Rewrite `etc/passwd` and `etc/group` for `root` and the app user.
///
/// # Errors
/// Returns an error when either file cannot be written.
pub fn write_identity_files(layout: &SandboxLayout, identity: AppIdentity) -> Result<()> {
    let etc = layout.etc();
    let home = layout.home();
    let shell = layout.bin().join("bash");
    let user = identity.user_name();

    let passwd = format!(
        "root:x:0:0:root:{home}:{shell}\n{user}:x:{uid}:{gid}::{home}:{shell}\n",
        uid = identity.uid,
        gid = identity.gid,
    );
    write_atomic(etc.join("passwd").as_std_path(), passwd.as_bytes())?;

    let group = format!("root:x:0:root\n{user}:x:{gid}:\n", gid = identity.gid);
    write_atomic(etc.join("group").as_std_path(), group.as_bytes())?;
    info!(uid = identity.uid, gid = identity.gid, user = %user, "identity files written");
    Ok(())
}

/// Seed `etc/hosts` and `etc/resolv.conf` unless they already exist.
///
/// # Errors
/// Returns an error when a missing file cannot be created.
pub fn write_network_files(layout: &SandboxLayout) -> Result<()> {
    let etc = layout.etc();
    if write_if_absent(etc.join("hosts").as_std_path(), HOSTS.as_bytes())? {
        debug!("created etc/hosts");
    }
    if write_if_absent(etc.join("resolv.conf").as_std_path(), RESOLV_CONF.as_bytes())? {
        debug!("created etc/resolv.conf");
    }
    Ok(())
}

/// # Errors
/// Returns an error when the file cannot be written.
pub fn write_etc_version(layout: &SandboxLayout, version: &str) -> Result<()> {
    write_atomic(layout.etc_version().as_std_path(), format!("{version}\n").as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use std::fs;

    fn layout(temp: &tempfile::TempDir) -> SandboxLayout {
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).expect("utf8");
        let layout = SandboxLayout::new(root).expect("layout");
        layout.ensure_dirs().expect("dirs");
        layout
    }

    #[test]
    fn passwd_and_group_describe_app_user() {
        let temp = tempfile::tempdir().expect("tempdir");
        let layout = layout(&temp);
        write_identity_files(&layout, AppIdentity::new(10_157, 10_157)).expect("write");

        let passwd = fs::read_to_string(layout.etc().join("passwd")).expect("passwd");
        let home = layout.home();
        let shell = layout.bin().join("bash");
        assert_eq!(
            passwd,
            format!("root:x:0:0:root:{home}:{shell}\nu0_a10157:x:10157:10157::{home}:{shell}\n")
        );
        let group = fs::read_to_string(layout.etc().join("group")).expect("group");
        assert_eq!(group, "root:x:0:root\nu0_a10157:x:10157:\n");
    }

    #[test]
    fn network_files_respect_local_edits() {
        let temp = tempfile::tempdir().expect("tempdir");
        let layout = layout(&temp);
        fs::write(layout.etc().join("resolv.conf"), "nameserver 1.1.1.1\n").expect("seed");
        write_network_files(&layout).expect("write");

        let resolv = fs::read_to_string(layout.etc().join("resolv.conf")).expect("resolv");
        assert_eq!(resolv, "nameserver 1.1.1.1\n");
        let hosts = fs::read_to_string(layout.etc().join("hosts")).expect("hosts");
        assert!(hosts.contains("127.0.0.1"));
        assert!(hosts.contains("::1"));
    }
}
