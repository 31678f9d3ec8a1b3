use std::io::{self, IsTerminal, Write};
use std::time::Duration;

use color_eyre::eyre::{eyre, Result, WrapErr};
use sandroot_core::commands::{ApiChannel, ApiReply, ResultFileChannel};
use sandroot_core::{
    BootstrapConfig, ConfigOverrides, GlobalOptions, InstallOutcome, Installer, LocalBundleSource,
    ProgressEvent,
};
use serde::Serialize;
use serde_json::{json, Value};

use crate::cli::{CallArgs, CommandKind, InstallArgs, SandrootCli};
use crate::style::Style;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Ok,
    UserError,
    Failure,
}

impl Status {
    pub fn exit_code(self) -> i32 {
        match self {
            Self::Ok => 0,
            Self::UserError => 1,
            Self::Failure => 2,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Outcome {
    pub status: Status,
    pub message: String,
    pub details: Value,
    /// Printed verbatim instead of the status line.
    #[serde(skip)]
    pub passthrough: Option<String>,
}

impl Outcome {
    fn new(status: Status, message: impl Into<String>, details: Value) -> Self {
        Self {
            status,
            message: message.into(),
            details,
            passthrough: None,
        }
    }

    fn with_passthrough(mut self, text: String) -> Self {
        self.passthrough = Some(text);
        self
    }
}

pub fn config_from(cli: &SandrootCli) -> Result<BootstrapConfig> {
    let overrides = ConfigOverrides {
        root: cli.root.clone(),
        cache_dir: cli.cache_dir.clone(),
        bundle_url: cli.bundle_url.clone(),
        bundle_version: cli.bundle_version.clone(),
    };
    BootstrapConfig::from_env(&overrides).map_err(|err| eyre!("{err:#}"))
}

pub fn run(cli: &SandrootCli, global: &GlobalOptions) -> Result<Outcome> {
    let config = config_from(cli)?;
    match &cli.command {
        CommandKind::Install(args) => install(config, args, global),
        CommandKind::Status => status(&installer(config)?),
        CommandKind::Verify => verify(&installer(config)?),
        CommandKind::Heal => heal(&installer(config)?),
        CommandKind::Env => environment(&installer(config)?),
        CommandKind::Call(args) => call(&installer(config)?, args),
    }
}

fn installer(config: BootstrapConfig) -> Result<Installer> {
    Installer::new(config).map_err(|err| eyre!("{err:#}"))
}

fn install(config: BootstrapConfig, args: &InstallArgs, global: &GlobalOptions) -> Result<Outcome> {
    let installer = match &args.bundle_file {
        Some(path) => Installer::with_source(config, Box::new(LocalBundleSource::new(path))),
        None => Installer::new(config),
    }
    .map_err(|err| eyre!("{err:#}"))?;
    let root = installer.layout().root().to_string();
    let version = installer.marker().expected().to_string();

    let handle = installer
        .spawn_install()
        .wrap_err("failed to start install worker")?;
    let mut renderer = ProgressRenderer::new(global);
    for event in handle.events() {
        renderer.render(&event);
    }
    renderer.finish();

    let details = json!({ "root": root, "version": version });
    Ok(match handle.join() {
        Ok(InstallOutcome::AlreadyInstalled) => {
            Outcome::new(Status::Ok, format!("{version} already installed"), details)
        }
        Ok(InstallOutcome::Installed) => {
            Outcome::new(Status::Ok, format!("installed {version} into {root}"), details)
        }
        Err(err) => Outcome::new(
            Status::Failure,
            err.to_string(),
            json!({
                "root": root,
                "version": version,
                "code": err.code(),
                "retryable": err.is_retryable(),
            }),
        ),
    })
}

fn status(installer: &Installer) -> Result<Outcome> {
    let status = installer.status().map_err(|err| eyre!("{err:#}"))?;
    let message = match (status.installed, &status.marker) {
        (true, _) => format!("installed ({})", status.expected_version),
        (false, Some(found)) => format!(
            "not installed (marker {found}, expected {})",
            status.expected_version
        ),
        (false, None) => "not installed".to_string(),
    };
    let details = serde_json::to_value(&status)?;
    Ok(Outcome::new(Status::Ok, message, details))
}

fn verify(installer: &Installer) -> Result<Outcome> {
    if !installer.is_installed() {
        return Ok(Outcome::new(
            Status::UserError,
            "nothing to verify: bundle is not installed",
            json!({ "hint": "run `sandroot install` first" }),
        ));
    }
    Ok(if installer.verify_and_fix() {
        Outcome::new(Status::Ok, "permissions and package config verified", Value::Null)
    } else {
        Outcome::new(Status::Failure, "verify failed; see log output", Value::Null)
    })
}

fn heal(installer: &Installer) -> Result<Outcome> {
    let report = installer.regenerate_api_scripts_if_needed();
    let written = report.regenerated.as_ref().map(|summary| summary.written);
    let message = match written {
        Some(count) => format!("regenerated {count} generated commands"),
        None => "generated commands intact".to_string(),
    };
    Ok(Outcome::new(
        Status::Ok,
        message,
        json!({ "regenerated": written, "marker_restored": report.marker_restored }),
    ))
}

fn environment(installer: &Installer) -> Result<Outcome> {
    let env = installer.environment().map_err(|err| eyre!("{err:#}"))?;
    let lines = env.to_strings();
    let text = lines.join("\n");
    Ok(
        Outcome::new(Status::Ok, format!("{} variables", lines.len()), json!(lines))
            .with_passthrough(text),
    )
}

fn call(installer: &Installer, args: &CallArgs) -> Result<Outcome> {
    let layout = installer.layout();
    let channel = ResultFileChannel::new(layout.api_spool(), layout.tmp());
    let joined = args.args.join(" ");
    let reply = channel
        .call(&args.method, &joined, Duration::from_millis(args.timeout_ms))
        .wrap_err_with(|| format!("failed to send {}", args.method))?;
    Ok(match reply {
        ApiReply::Output(text) => Outcome::new(
            Status::Ok,
            format!("{} replied", args.method),
            json!({ "method": args.method, "reply": text }),
        )
        .with_passthrough(text),
        ApiReply::TimedOut => Outcome::new(
            Status::UserError,
            format!("no reply to {} within {} ms", args.method, args.timeout_ms),
            json!({
                "method": args.method,
                "hint": "is an API receiver serving the request spool?",
            }),
        ),
    })
}

/// Renders install progress on stderr; a terminal gets one self-overwriting line.
struct ProgressRenderer {
    style: Style,
    enabled: bool,
    overwrite: bool,
    last: Option<i32>,
}

impl ProgressRenderer {
    fn new(global: &GlobalOptions) -> Self {
        let is_tty = io::stderr().is_terminal();
        Self {
            style: Style::new(global.no_color, is_tty),
            enabled: !global.quiet && !global.json,
            overwrite: is_tty,
            last: None,
        }
    }

    fn render(&mut self, event: &ProgressEvent) {
        if !self.enabled {
            return;
        }
        let line = self.style.progress(event.percent, &event.message);
        let mut stderr = io::stderr();
        if self.overwrite && !event.is_failure() {
            let _ = write!(stderr, "\r\x1b[2K{line}");
        } else {
            if self.overwrite && self.last.is_some() {
                let _ = writeln!(stderr);
            }
            let _ = writeln!(stderr, "{line}");
        }
        let _ = stderr.flush();
        self.last = Some(event.percent);
    }

    fn finish(&mut self) {
        if self.enabled && self.overwrite && self.last.is_some_and(|pct| pct >= 0) {
            let _ = writeln!(io::stderr());
        }
    }
}
