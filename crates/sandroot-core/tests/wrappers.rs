mod common;

use std::fs;
use std::process::Command;
use std::thread;
use std::time::Duration;

use common::Sandbox;
use sandroot_core::commands::{ApiRequest, ResultFileReceiver};
use sandroot_core::{CancelToken, Installer, LocalBundleSource, NullSink};

fn installed(sandbox: &Sandbox) -> Installer {
    let config = sandbox.config().with_dispatch_wait(Duration::from_millis(800));
    let installer = Installer::with_source(config, Box::new(LocalBundleSource::new(&sandbox.bundle)))
        .expect("installer");
    installer
        .install(&mut NullSink, &CancelToken::new())
        .expect("install");
    installer
}

#[test]
fn shell_wrapper_round_trips_through_the_receiver() {
    let Ok(bash) = which::which("bash") else {
        return;
    };
    let sandbox = Sandbox::new();
    let installer = installed(&sandbox);
    let layout = installer.layout();
    let receiver = ResultFileReceiver::new(layout.api_spool(), layout.tmp());
    let cancel = CancelToken::new();
    let server = {
        let cancel = cancel.clone();
        thread::spawn(move || {
            let handler = |request: &ApiRequest| Some(format!("{}:{}", request.method, request.args));
            receiver.serve_until(&handler, &cancel, Duration::from_millis(10));
        })
    };

    let output = Command::new(&bash)
        .arg(sandbox.bin().join("termux-toast"))
        .args(["hello", "world"])
        .output()
        .expect("run wrapper");
    cancel.cancel();
    server.join().expect("receiver");

    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout), "toast:hello world");
}

#[test]
fn unanswered_wrapper_prints_nothing_and_withdraws_request() {
    let Ok(bash) = which::which("bash") else {
        return;
    };
    let sandbox = Sandbox::new();
    let installer = installed(&sandbox);

    let output = Command::new(&bash)
        .arg(sandbox.bin().join("termux-battery-status"))
        .output()
        .expect("run wrapper");
    assert!(output.status.success());
    assert!(output.stdout.is_empty());
    let pending = fs::read_dir(installer.layout().api_spool())
        .expect("spool")
        .count();
    assert_eq!(pending, 0);
}
