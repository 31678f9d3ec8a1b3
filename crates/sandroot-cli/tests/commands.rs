use serde_json::Value;

mod common;

use common::{stdout, Fixture};

#[test]
fn help_lists_every_command() {
    let fixture = Fixture::new();
    let assert = fixture.cmd().arg("--help").assert().success();
    let output = stdout(assert.get_output());
    for command in ["install", "status", "verify", "heal", "env", "call"] {
        assert!(output.contains(command), "{command} missing from help: {output}");
    }
}

#[test]
fn status_reports_not_installed_on_empty_root() {
    let fixture = Fixture::new();
    let assert = fixture.cmd().arg("status").assert().success();
    assert!(stdout(assert.get_output()).contains("not installed"));
}

#[test]
fn install_from_local_bundle_then_status_json() {
    let fixture = Fixture::new();
    fixture.install();
    assert!(fixture.root.join("usr/bin/termux-battery-status").exists());

    let assert = fixture.cmd().args(["--json", "status"]).assert().success();
    let payload: Value = serde_json::from_str(&stdout(assert.get_output())).expect("json");
    assert_eq!(payload["status"], "ok");
    assert_eq!(payload["details"]["installed"], true);
    assert_eq!(payload["details"]["marker"], "cli-test-1");
    assert_eq!(payload["details"]["sentinel"], "valid");

    let assert = fixture.cmd().arg("install").assert().success();
    assert!(stdout(assert.get_output()).contains("already installed"));
}

#[test]
fn corrupt_bundle_exits_with_failure_code() {
    let fixture = Fixture::new();
    std::fs::write(&fixture.bundle, b"not a zip").expect("corrupt");
    let assert = fixture
        .cmd()
        .args(["--json", "install", "--bundle-file"])
        .arg(&fixture.bundle)
        .assert()
        .code(2);
    let payload: Value = serde_json::from_str(&stdout(assert.get_output())).expect("json");
    assert_eq!(payload["status"], "failure");
    assert_eq!(payload["details"]["code"], "SR120");
}

#[test]
fn verify_requires_an_install() {
    let fixture = Fixture::new();
    fixture.cmd().arg("verify").assert().code(1);
    fixture.install();
    fixture.cmd().arg("verify").assert().success();
}

#[test]
fn heal_rewrites_overwritten_sentinel() {
    let fixture = Fixture::new();
    fixture.install();
    let sentinel = fixture.root.join("usr/bin/termux-battery-status");
    std::fs::write(&sentinel, "#!/bin/sh\nset -e -u\n").expect("overwrite");

    let assert = fixture.cmd().arg("heal").assert().success();
    assert!(stdout(assert.get_output()).contains("regenerated"));
    let content = std::fs::read_to_string(&sentinel).expect("sentinel");
    assert!(content.contains("# sandroot API: termux-battery-status"));

    let assert = fixture.cmd().arg("heal").assert().success();
    assert!(stdout(assert.get_output()).contains("intact"));
}

#[test]
fn env_prints_key_value_lines() {
    let fixture = Fixture::new();
    fixture.install();
    let assert = fixture.cmd().arg("env").assert().success();
    let output = stdout(assert.get_output());
    let home = format!("HOME={}", fixture.root.join("home").display());
    assert!(output.lines().any(|line| line == home), "{output}");
    assert!(output.lines().all(|line| line.contains('=')));
}

#[test]
fn unanswered_call_times_out_as_user_error() {
    let fixture = Fixture::new();
    fixture.install();
    let assert = fixture
        .cmd()
        .args(["call", "--timeout-ms", "50", "battery-status"])
        .assert()
        .code(1);
    assert!(stdout(assert.get_output()).contains("no reply to battery-status"));
}
