#![allow(dead_code)]

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use camino::Utf8PathBuf;
use sandroot_core::{BootstrapConfig, Installer, LocalBundleSource};
use tempfile::TempDir;
use zip::write::FileOptions;
use zip::ZipWriter;

pub const TEST_VERSION: &str = "sandroot-test-1";

pub const MANIFEST: &str = "dash←./bin/sh\n\
libz.so.1.3←./lib/libz.so.1\n\
../../missing←./share/dangling\n\
no separator here\n\
a←b←c\n";

/// A miniature bundle: the two sentinel binaries, a shell, a library, and a manifest.
pub fn write_bundle(dir: &Path) -> PathBuf {
    write_padded_bundle(dir, 0)
}

/// Same bundle plus an uncompressed `share/padding.bin` of `padding` bytes.
pub fn write_padded_bundle(dir: &Path, padding: usize) -> PathBuf {
    let path = dir.join("bundle.zip");
    let file = fs::File::create(&path).expect("create bundle");
    let mut zip = ZipWriter::new(file);
    let options = FileOptions::default();
    zip.add_directory("bin/", options).expect("bin dir");
    for (name, body) in [
        ("bin/bash", "#!/bin/sh\necho bash\n"),
        ("bin/apt", "#!/bin/sh\necho apt\n"),
        ("bin/dash", "#!/bin/sh\necho dash\n"),
        ("lib/libz.so.1.3", "ELF"),
        ("etc/motd", "welcome\n"),
    ] {
        zip.start_file(name, options).expect("start entry");
        zip.write_all(body.as_bytes()).expect("entry body");
    }
    if padding > 0 {
        let stored = FileOptions::default().compression_method(zip::CompressionMethod::Stored);
        zip.start_file("share/padding.bin", stored).expect("padding entry");
        zip.write_all(&vec![0x5a; padding]).expect("padding body");
    }
    zip.start_file("SYMLINKS.txt", options).expect("manifest");
    zip.write_all(MANIFEST.as_bytes()).expect("manifest body");
    zip.finish().expect("finish bundle");
    path
}

pub struct Sandbox {
    pub temp: TempDir,
    pub root: Utf8PathBuf,
    pub bundle: PathBuf,
}

impl Sandbox {
    pub fn new() -> Self {
        let temp = tempfile::tempdir().expect("tempdir");
        let root = Utf8PathBuf::from_path_buf(temp.path().join("files")).expect("utf8 root");
        let bundle = write_bundle(temp.path());
        Self { temp, root, bundle }
    }

    pub fn config(&self) -> BootstrapConfig {
        BootstrapConfig::for_root(self.root.clone()).with_bundle("file:///unused", TEST_VERSION)
    }

    pub fn installer(&self) -> Installer {
        Installer::with_source(self.config(), Box::new(LocalBundleSource::new(&self.bundle)))
            .expect("installer")
    }

    pub fn prefix(&self) -> Utf8PathBuf {
        self.root.join("usr")
    }

    pub fn bin(&self) -> Utf8PathBuf {
        self.prefix().join("bin")
    }
}
