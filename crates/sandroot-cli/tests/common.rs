#![allow(dead_code)]

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use tempfile::TempDir;
use zip::write::FileOptions;
use zip::ZipWriter;

pub struct Fixture {
    pub temp: TempDir,
    pub root: PathBuf,
    pub bundle: PathBuf,
}

impl Fixture {
    pub fn new() -> Self {
        let temp = tempfile::tempdir().expect("tempdir");
        let root = temp.path().join("files");
        let bundle = write_bundle(temp.path());
        Self { temp, root, bundle }
    }

    /// `sandroot` pinned to this fixture's root, cache, and version.
    pub fn cmd(&self) -> Command {
        let mut cmd = cargo_bin_cmd!("sandroot");
        cmd.env_remove("SANDROOT_BUNDLE_URL")
            .env_remove("SANDROOT_KEEP_PROXIES")
            .env("NO_COLOR", "1")
            .arg("--root")
            .arg(&self.root)
            .arg("--cache-dir")
            .arg(self.temp.path().join("cache"))
            .args(["--bundle-version", "cli-test-1"]);
        cmd
    }

    pub fn install(&self) {
        self.cmd()
            .args(["install", "--bundle-file"])
            .arg(&self.bundle)
            .assert()
            .success();
    }
}

pub fn write_bundle(dir: &Path) -> PathBuf {
    let path = dir.join("bundle.zip");
    let mut zip = ZipWriter::new(fs::File::create(&path).expect("bundle"));
    let options = FileOptions::default();
    for (name, body) in [
        ("bin/bash", "#!/bin/sh\n"),
        ("bin/apt", "#!/bin/sh\n"),
        ("bin/dash", "#!/bin/sh\n"),
    ] {
        zip.start_file(name, options).expect("entry");
        zip.write_all(body.as_bytes()).expect("body");
    }
    zip.start_file("SYMLINKS.txt", options).expect("manifest");
    zip.write_all("dash←./bin/sh\n".as_bytes()).expect("manifest body");
    zip.finish().expect("finish");
    path
}

pub fn stdout(output: &std::process::Output) -> String {
    String::from_utf8(output.stdout.clone()).expect("utf8 stdout")
}
