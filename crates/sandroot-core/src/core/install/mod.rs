//! The install / verify / repair entry points.

pub mod progress;
pub mod source;
pub mod task;

use std::fmt;
use std::fs;
use std::io;
use std::sync::mpsc;
use std::thread;

use anyhow::{Context, Result};
use tracing::{error, info, warn};

use crate::core::archive;
use crate::core::cancel::CancelToken;
use crate::core::commands::{CatalogStatus, CommandCatalog, ScriptContext};
use crate::core::config::BootstrapConfig;
use crate::core::errors::{BootstrapError, ExtractError, TransferError};
use crate::core::fs::ensure_dir;
use crate::core::heal::{self, HealReport, SentinelState};
use crate::core::identity::{self, AppIdentity, EnvironmentSet};
use crate::core::layout::SandboxLayout;
use crate::core::permissions::{PermissionNormalizer, EXECUTABLE_MODE};
use crate::core::state::{self, InstalledVersion, VersionMarker};
use crate::core::transfer::TransferProgress;

pub use progress::{
    download_percent, extract_percent, NullSink, ProgressEvent, ProgressSink, FAILURE_PERCENT,
};
pub use source::{BundleSource, FetchedBundle, HttpBundleSource, LocalBundleSource, ARCHIVE_NAME};
pub use task::{InstallHandle, InstallOutcome, KeepAwake, KeepAwakeGuard, NoKeepAwake, Stage};

const ACTIVITY_MANAGER: &str = "am";
const DOWNLOAD_REPORT_BYTES: u64 = 1024 * 1024;

type StageHook = Box<dyn Fn(Stage) -> Result<()> + Send + Sync>;

/// Point-in-time view of an installed tree.
#[derive(Debug, Clone, serde::Serialize)]
pub struct InstallStatus {
    pub installed: bool,
    pub expected_version: String,
    pub marker: Option<String>,
    pub sentinel: SentinelState,
    pub missing_commands: Vec<String>,
    pub altered_commands: Vec<String>,
}

pub struct Installer {
    config: BootstrapConfig,
    layout: SandboxLayout,
    marker: VersionMarker,
    normalizer: PermissionNormalizer,
    source: Box<dyn BundleSource>,
    keep_awake: Box<dyn KeepAwake>,
    stage_hook: Option<StageHook>,
}

impl fmt::Debug for Installer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Installer")
            .field("layout", &self.layout)
            .field("version", &self.marker.expected())
            .field("source", &self.source.describe())
            .finish_non_exhaustive()
    }
}

impl Installer {
    /// Installer for `config`, downloading the configured bundle URL.
    ///
    /// # Errors
    /// Returns an error when the layout is invalid or the HTTP client cannot be built.
    pub fn new(config: BootstrapConfig) -> Result<Self> {
        let source = HttpBundleSource::new(&config)?;
        Self::with_source(config, Box::new(source))
    }

    /// # Errors
    /// Returns an error when the sandbox layout is invalid.
    pub fn with_source(config: BootstrapConfig, source: Box<dyn BundleSource>) -> Result<Self> {
        let layout = SandboxLayout::new(config.sandbox().root.clone())?;
        let marker = VersionMarker::new(&layout, config.bundle().version.clone());
        Ok(Self {
            config,
            layout,
            marker,
            normalizer: PermissionNormalizer::default(),
            source,
            keep_awake: Box::new(NoKeepAwake),
            stage_hook: None,
        })
    }

    #[must_use]
    pub fn with_normalizer(mut self, normalizer: PermissionNormalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    #[must_use]
    pub fn with_keep_awake(mut self, keep_awake: Box<dyn KeepAwake>) -> Self {
        self.keep_awake = keep_awake;
        self
    }

    /// Run `hook` as each stage begins; an error aborts the pipeline at that stage.
    #[must_use]
    pub fn on_stage(mut self, hook: impl Fn(Stage) -> Result<()> + Send + Sync + 'static) -> Self {
        self.stage_hook = Some(Box::new(hook));
        self
    }

    #[must_use]
    pub fn config(&self) -> &BootstrapConfig {
        &self.config
    }

    #[must_use]
    pub fn layout(&self) -> &SandboxLayout {
        &self.layout
    }

    #[must_use]
    pub fn marker(&self) -> &VersionMarker {
        &self.marker
    }

    /// Sentinel binaries present and the marker holds the expected version.
    #[must_use]
    pub fn is_installed(&self) -> bool {
        state::is_installed(&self.layout, &self.marker)
    }

    /// The command catalog as this configuration renders it.
    #[must_use]
    pub fn catalog(&self) -> CommandCatalog {
        CommandCatalog::render(&ScriptContext::new(
            &self.layout,
            &self.config.sandbox().package_name,
            self.config.dispatch().wait,
        ))
    }

    /// # Errors
    /// Returns an error when the marker exists but cannot be read.
    pub fn status(&self) -> Result<InstallStatus> {
        let CatalogStatus { missing, altered } = self.catalog().verify(self.layout.bin().as_std_path());
        let marker = match self.marker.current()? {
            InstalledVersion::Absent => None,
            InstalledVersion::Present(version) => Some(version),
        };
        Ok(InstallStatus {
            installed: self.is_installed(),
            expected_version: self.marker.expected().to_string(),
            marker,
            sentinel: heal::sentinel_state(&self.layout),
            missing_commands: missing,
            altered_commands: altered,
        })
    }

    /// Run the full pipeline unless already installed.
    ///
    /// Every failure is also published as a `-1` event carrying the error text. The marker is
    /// written last, so a failed run always reads as not installed and can simply be retried.
    ///
    /// # Errors
    /// Returns the [`BootstrapError`] that aborted the pipeline.
    pub fn install(
        &self,
        sink: &mut dyn ProgressSink,
        cancel: &CancelToken,
    ) -> Result<InstallOutcome, BootstrapError> {
        if self.is_installed() {
            info!(version = %self.marker.expected(), "bundle already installed");
            sink.publish(ProgressEvent::new(100, "Already installed"));
            return Ok(InstallOutcome::AlreadyInstalled);
        }
        let _awake = KeepAwakeGuard::acquire(self.keep_awake.as_ref());
        match self.run_pipeline(sink, cancel) {
            Ok(()) => {
                info!(version = %self.marker.expected(), "bundle installed");
                Ok(InstallOutcome::Installed)
            }
            Err(err) => {
                error!(code = err.code(), "install failed: {err}");
                sink.publish(ProgressEvent::failure(format!("Error: {err}")));
                Err(err)
            }
        }
    }

    /// Run [`Self::install`] on a dedicated worker thread.
    ///
    /// # Errors
    /// Returns an error when the worker thread cannot be spawned.
    pub fn spawn_install(self) -> io::Result<InstallHandle> {
        let (mut tx, rx) = mpsc::channel();
        let cancel = CancelToken::new();
        let worker_cancel = cancel.clone();
        let worker = thread::Builder::new()
            .name("sandroot-install".to_string())
            .spawn(move || self.install(&mut tx, &worker_cancel))?;
        Ok(InstallHandle {
            events: rx,
            cancel,
            worker,
        })
    }

    /// Re-apply permissions and refresh package-manager config on an installed tree.
    ///
    /// Returns `false` when nothing is installed or an unexpected I/O error occurs.
    pub fn verify_and_fix(&self) -> bool {
        if !self.is_installed() {
            return false;
        }
        match self.repair() {
            Ok(()) => true,
            Err(err) => {
                error!("verify failed: {err:#}");
                false
            }
        }
    }

    /// Startup self-healing. Failures are logged and the tree is left as it was.
    pub fn regenerate_api_scripts_if_needed(&self) -> HealReport {
        heal::regenerate_if_needed(&self.layout, &self.catalog(), &self.marker, &self.normalizer)
            .unwrap_or_else(|err| {
                error!("unable to regenerate generated commands: {err:#}");
                HealReport::default()
            })
    }

    /// Environment for one shell spawn.
    ///
    /// # Errors
    /// Returns an error when the sandbox root cannot be inspected or runtime directories
    /// cannot be created.
    pub fn environment(&self) -> Result<EnvironmentSet> {
        let identity = AppIdentity::of_root(&self.layout)?;
        identity::build_environment(
            &self.layout,
            identity,
            &self.config.sandbox().package_name,
            std::process::id(),
        )
    }

    fn repair(&self) -> Result<()> {
        let report = self
            .normalizer
            .normalize(self.layout.bin().as_std_path(), self.layout.lib().as_std_path());
        if !report.is_clean() {
            warn!(failures = report.failures.len(), "some permissions could not be fixed");
        }
        let bash = self.layout.bin().join("bash");
        if bash.exists() {
            let applier = self.normalizer.ensure_mode(bash.as_std_path(), EXECUTABLE_MODE)?;
            info!(applier, "bash permissions fixed");
        }
        identity::write_npmrc(&self.layout)?;
        identity::ensure_gyp_config(&self.layout)?;
        Ok(())
    }

    fn enter(&self, stage: Stage, cancel: &CancelToken) -> Result<(), BootstrapError> {
        if cancel.is_cancelled() {
            return Err(BootstrapError::Cancelled);
        }
        if let Some(hook) = &self.stage_hook {
            hook(stage).map_err(|err| aborted(stage, &err))?;
        }
        Ok(())
    }

    fn run_pipeline(
        &self,
        sink: &mut dyn ProgressSink,
        cancel: &CancelToken,
    ) -> Result<(), BootstrapError> {
        let layout = &self.layout;
        let bin = layout.bin();

        self.enter(Stage::Prepare, cancel)?;
        sink.publish(ProgressEvent::new(0, "Preparing directories..."));
        let cache_dir = &self.config.sandbox().cache_dir;
        layout
            .ensure_dirs()
            .and_then(|()| {
                ensure_dir(cache_dir.as_std_path())
                    .with_context(|| format!("failed to create {cache_dir}"))
            })
            .map_err(|err| aborted(Stage::Prepare, &err))?;

        self.enter(Stage::Download, cancel)?;
        sink.publish(ProgressEvent::new(5, "Downloading bootstrap..."));
        info!(source = %self.source.describe(), "fetching bundle");
        let bundle = {
            let mut last_percent = None;
            let mut last_reported = 0_u64;
            let mut on_progress = |update: TransferProgress| {
                let megs = progress::megabytes(update.received);
                match download_percent(update) {
                    Some(percent) if Some(percent) != last_percent => {
                        last_percent = Some(percent);
                        sink.publish(ProgressEvent::new(percent, format!("Downloading: {megs}MB")));
                    }
                    Some(_) => {}
                    None if update.received >= last_reported + DOWNLOAD_REPORT_BYTES => {
                        last_reported = update.received;
                        sink.publish(ProgressEvent::new(5, format!("Downloading: {megs}MB")));
                    }
                    None => {}
                }
            };
            self.source
                .fetch(
                    cache_dir.join(ARCHIVE_NAME).as_std_path(),
                    cancel,
                    &mut on_progress,
                )
                .map_err(download_error)?
        };

        self.enter(Stage::Extract, cancel)?;
        sink.publish(ProgressEvent::new(50, "Extracting files..."));
        let report = archive::extract(
            &bundle.path,
            layout.prefix().as_std_path(),
            self.config.extract(),
            cancel,
            &mut |entries| {
                sink.publish(ProgressEvent::new(
                    extract_percent(entries),
                    format!("Extracting: {entries} files..."),
                ));
            },
        )
        .map_err(extract_error)?;
        sink.publish(ProgressEvent::new(
            85,
            format!("Created {} symlinks", report.symlinks.created),
        ));

        self.enter(Stage::Permissions, cancel)?;
        sink.publish(ProgressEvent::new(88, "Setting permissions..."));
        let permissions = self
            .normalizer
            .normalize(bin.as_std_path(), layout.lib().as_std_path());
        if !permissions.is_clean() {
            warn!(
                failures = permissions.failures.len(),
                "continuing with partially normalized permissions"
            );
        }

        let catalog = self.catalog();
        self.enter(Stage::ActivityManager, cancel)?;
        sink.publish(ProgressEvent::new(90, "Installing activity manager..."));
        catalog
            .install_matching(bin.as_std_path(), &self.normalizer, |script| {
                script.name == ACTIVITY_MANAGER
            })
            .map_err(|err| aborted(Stage::ActivityManager, &err))?;

        self.enter(Stage::Commands, cancel)?;
        sink.publish(ProgressEvent::new(92, "Installing API scripts..."));
        catalog
            .install_matching(bin.as_std_path(), &self.normalizer, |script| {
                script.name != ACTIVITY_MANAGER
            })
            .map_err(|err| aborted(Stage::Commands, &err))?;

        self.enter(Stage::PackageConfig, cancel)?;
        sink.publish(ProgressEvent::new(94, "Configuring npm..."));
        identity::write_npmrc(layout)
            .and_then(|()| identity::ensure_gyp_config(layout))
            .map_err(|err| aborted(Stage::PackageConfig, &err))?;

        self.enter(Stage::Identity, cancel)?;
        sink.publish(ProgressEvent::new(96, "Writing identity files..."));
        self.materialize_identity()
            .map_err(|err| aborted(Stage::Identity, &err))?;

        self.enter(Stage::Finalize, cancel)?;
        sink.publish(ProgressEvent::new(97, "Finalizing..."));
        self.marker
            .write()
            .map_err(|err| aborted(Stage::Finalize, &err))?;
        if bundle.disposable {
            if let Err(err) = fs::remove_file(&bundle.path) {
                warn!(path = %bundle.path.display(), "unable to remove downloaded archive: {err}");
            }
        }
        sink.publish(ProgressEvent::new(100, "Complete!"));
        Ok(())
    }

    fn materialize_identity(&self) -> Result<()> {
        let layout = &self.layout;
        let identity = AppIdentity::of_root(layout)?;
        identity::write_identity_files(layout, identity)?;
        identity::write_network_files(layout)?;
        identity::write_etc_version(layout, self.marker.expected())?;
        identity::scaffold_home(layout)?;
        Ok(())
    }
}

fn aborted(stage: Stage, err: &anyhow::Error) -> BootstrapError {
    BootstrapError::InstallAborted {
        stage: stage.to_string(),
        message: format!("{err:#}"),
    }
}

fn download_error(err: TransferError) -> BootstrapError {
    match err {
        TransferError::Cancelled => BootstrapError::Cancelled,
        other => BootstrapError::DownloadFailed(other),
    }
}

fn extract_error(err: ExtractError) -> BootstrapError {
    match err {
        ExtractError::Cancelled => BootstrapError::Cancelled,
        other => BootstrapError::ExtractionFailed(other),
    }
}
