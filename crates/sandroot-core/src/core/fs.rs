use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};

/// Create `path` and its parents, treating "already exists" as success.
pub(crate) fn ensure_dir(path: &Path) -> io::Result<()> {
    match fs::create_dir_all(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::AlreadyExists && path.is_dir() => Ok(()),
        Err(err) => Err(err),
    }
}

/// Remove whatever node sits at `path` so it can be recreated.
///
/// Symlinks are unlinked without touching their targets; directories are removed
/// recursively. A missing node is not an error.
pub(crate) fn remove_path_for_replace(path: &Path) -> Result<()> {
    let meta = match fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(err) => return Err(err).with_context(|| format!("failed to stat {}", path.display())),
    };
    let file_type = meta.file_type();

    if file_type.is_symlink() {
        fs::remove_file(path)
            .or_else(|err| {
                if err.kind() == io::ErrorKind::NotFound {
                    Ok(())
                } else {
                    Err(err)
                }
            })
            .with_context(|| format!("failed to remove symlink {}", path.display()))?;
        return Ok(());
    }

    if file_type.is_dir() {
        if fs::remove_dir(path).is_ok() {
            return Ok(());
        }
        fs::remove_dir_all(path)
            .with_context(|| format!("failed to remove dir {}", path.display()))?;
        return Ok(());
    }

    fs::remove_file(path).with_context(|| format!("failed to remove file {}", path.display()))?;
    Ok(())
}

/// Open `path` for writing with truncate semantics.
///
/// A file that exists but refuses writes (for example a read-only entry left by a previous
/// bundle) is unlinked and created fresh.
pub(crate) fn create_truncating(path: &Path) -> io::Result<File> {
    match File::create(path) {
        Ok(file) => Ok(file),
        Err(err) if err.kind() == io::ErrorKind::PermissionDenied && path.is_file() => {
            fs::remove_file(path)?;
            File::create(path)
        }
        Err(err) => Err(err),
    }
}

/// Write `contents` through a sibling temp file and rename it into place.
pub(crate) fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    ensure_dir(parent).with_context(|| format!("failed to create {}", parent.display()))?;
    let mut tmp = tempfile::NamedTempFile::new_in(parent)
        .with_context(|| format!("failed to create temp file under {}", parent.display()))?;
    tmp.write_all(contents)
        .with_context(|| format!("failed to write {}", path.display()))?;
    tmp.flush()?;
    if fs::symlink_metadata(path).is_ok_and(|meta| meta.is_dir()) {
        remove_path_for_replace(path)?;
    }
    tmp.persist(path)
        .map_err(|err| anyhow::anyhow!("unable to persist {}: {err}", path.display()))?;
    Ok(())
}

/// Write `contents` only when nothing exists at `path`. Returns whether a write happened.
pub(crate) fn write_if_absent(path: &Path, contents: &[u8]) -> Result<bool> {
    if fs::symlink_metadata(path).is_ok() {
        return Ok(false);
    }
    write_atomic(path, contents)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remove_path_for_replace_handles_every_node_kind() {
        let temp = tempfile::tempdir().expect("tempdir");
        let file = temp.path().join("file");
        let dir = temp.path().join("dir");
        let link = temp.path().join("link");
        fs::write(&file, b"x").expect("file");
        fs::create_dir_all(dir.join("nested")).expect("dir");
        fs::write(dir.join("nested/inner"), b"y").expect("inner");
        std::os::unix::fs::symlink(&file, &link).expect("link");

        remove_path_for_replace(&link).expect("link removed");
        assert!(file.exists(), "symlink target must survive");
        remove_path_for_replace(&dir).expect("dir removed");
        remove_path_for_replace(&file).expect("file removed");
        remove_path_for_replace(&temp.path().join("missing")).expect("missing is fine");

        assert!(fs::symlink_metadata(&link).is_err());
        assert!(!dir.exists());
        assert!(!file.exists());
    }

    #[test]
    fn write_if_absent_keeps_existing_content() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("nested/.profile");
        assert!(write_if_absent(&path, b"first").expect("write"));
        assert!(!write_if_absent(&path, b"second").expect("skip"));
        assert_eq!(fs::read_to_string(&path).expect("read"), "first");
    }

    #[test]
    fn create_truncating_replaces_read_only_file() {
        use std::os::unix::fs::PermissionsExt;
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("locked");
        fs::write(&path, b"old contents").expect("seed");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o444)).expect("chmod");

        let mut file = create_truncating(&path).expect("reopen");
        file.write_all(b"new").expect("write");
        drop(file);
        assert_eq!(fs::read(&path).expect("read"), b"new");
    }
}
