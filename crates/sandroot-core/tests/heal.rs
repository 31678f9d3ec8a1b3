mod common;

use std::fs;

use common::{Sandbox, TEST_VERSION};
use sandroot_core::commands::{is_engine_generated, SENTINEL_SCRIPT, STAMP_PREFIX};
use sandroot_core::{sentinel_state, CancelToken, NullSink, SentinelState};

#[test]
fn replaced_sentinel_regenerates_catalog_and_marker() {
    let sandbox = Sandbox::new();
    let installer = sandbox.installer();
    installer
        .install(&mut NullSink, &CancelToken::new())
        .expect("install");
    let sentinel = sandbox.bin().join(SENTINEL_SCRIPT);
    let toast = sandbox.bin().join("termux-toast");

    fs::write(&sentinel, "#!/bin/sh\nset -e -u\n/usr/libexec/other-api BatteryStatus\n")
        .expect("overwrite");
    fs::write(&toast, "#!/bin/sh\nset -e -u\n").expect("overwrite toast");
    fs::remove_file(sandbox.prefix().join(".sandroot_version")).expect("marker");
    assert!(!installer.is_installed());

    let report = installer.regenerate_api_scripts_if_needed();
    assert!(report.marker_restored);
    assert!(report.regenerated.is_some());
    assert!(installer.is_installed());
    assert_eq!(sentinel_state(installer.layout()), SentinelState::Valid);
    let content = fs::read_to_string(&sentinel).expect("sentinel");
    assert!(is_engine_generated(&content));
    assert!(content.contains(&format!("{STAMP_PREFIX}{SENTINEL_SCRIPT}")));
    assert!(fs::read_to_string(&toast).expect("toast").contains(STAMP_PREFIX));
    assert_eq!(
        fs::read_to_string(sandbox.prefix().join(".sandroot_version")).expect("marker"),
        TEST_VERSION
    );
}

#[test]
fn deleted_sentinel_is_recreated_and_status_turns_clean() {
    let sandbox = Sandbox::new();
    let installer = sandbox.installer();
    installer
        .install(&mut NullSink, &CancelToken::new())
        .expect("install");
    fs::remove_file(sandbox.bin().join(SENTINEL_SCRIPT)).expect("remove");

    let status = installer.status().expect("status");
    assert_eq!(status.sentinel, SentinelState::Missing);
    assert_eq!(status.missing_commands, vec![SENTINEL_SCRIPT.to_string()]);

    let report = installer.regenerate_api_scripts_if_needed();
    assert!(report.was_needed());
    assert!(!report.marker_restored, "marker was still present");

    let status = installer.status().expect("status");
    assert!(status.installed);
    assert_eq!(status.sentinel, SentinelState::Valid);
    assert!(status.missing_commands.is_empty());
    assert!(status.altered_commands.is_empty());
    assert_eq!(status.marker.as_deref(), Some(TEST_VERSION));
}

#[test]
fn healthy_install_is_untouched() {
    let sandbox = Sandbox::new();
    let installer = sandbox.installer();
    installer
        .install(&mut NullSink, &CancelToken::new())
        .expect("install");
    let report = installer.regenerate_api_scripts_if_needed();
    assert!(!report.was_needed());
}
