//! Background supervision of one install run.

use std::fmt;
use std::sync::mpsc::Receiver;
use std::thread::JoinHandle;

use serde::Serialize;
use tracing::debug;

use super::progress::ProgressEvent;
use crate::core::cancel::CancelToken;
use crate::core::errors::BootstrapError;

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Prepare,
    Download,
    Extract,
    Permissions,
    ActivityManager,
    Commands,
    PackageConfig,
    Identity,
    Finalize,
}

impl Stage {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Prepare => "prepare",
            Self::Download => "download",
            Self::Extract => "extract",
            Self::Permissions => "permissions",
            Self::ActivityManager => "activity-manager",
            Self::Commands => "commands",
            Self::PackageConfig => "package-config",
            Self::Identity => "identity",
            Self::Finalize => "finalize",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallOutcome {
    /// The marker already matched; nothing was written.
    AlreadyInstalled,
    Installed,
}

/// Something that keeps the host from suspending while a long install runs.
pub trait KeepAwake: Send + Sync {
    fn acquire(&self);
    fn release(&self);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoKeepAwake;

impl KeepAwake for NoKeepAwake {
    fn acquire(&self) {}
    fn release(&self) {}
}

/// Holds a [`KeepAwake`] until dropped, on success and failure alike.
pub struct KeepAwakeGuard<'a> {
    lock: &'a dyn KeepAwake,
}

impl<'a> KeepAwakeGuard<'a> {
    pub fn acquire(lock: &'a dyn KeepAwake) -> Self {
        lock.acquire();
        debug!("keep-awake acquired");
        Self { lock }
    }
}

impl Drop for KeepAwakeGuard<'_> {
    fn drop(&mut self) {
        self.lock.release();
        debug!("keep-awake released");
    }
}

/// A running install: its progress stream, cancellation, and final result.
#[derive(Debug)]
pub struct InstallHandle {
    pub(crate) events: Receiver<ProgressEvent>,
    pub(crate) cancel: CancelToken,
    pub(crate) worker: JoinHandle<Result<InstallOutcome, BootstrapError>>,
}

impl InstallHandle {
    /// Progress events; the stream ends when the worker exits.
    #[must_use]
    pub fn events(&self) -> &Receiver<ProgressEvent> {
        &self.events
    }

    /// Ask the worker to stop at the next stage boundary or download chunk.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    #[must_use]
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.worker.is_finished()
    }

    /// Wait for the worker.
    ///
    /// # Errors
    /// Returns the pipeline's error, or [`BootstrapError::InstallAborted`] if the worker panicked.
    pub fn join(self) -> Result<InstallOutcome, BootstrapError> {
        self.worker
            .join()
            .unwrap_or_else(|_| {
                Err(BootstrapError::InstallAborted {
                    stage: "worker".to_string(),
                    message: "install worker panicked".to_string(),
                })
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counting {
        held: AtomicUsize,
        released: AtomicUsize,
    }

    impl KeepAwake for Counting {
        fn acquire(&self) {
            self.held.fetch_add(1, Ordering::SeqCst);
        }

        fn release(&self) {
            self.released.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn guard_releases_on_early_return() {
        fn fallible(lock: &dyn KeepAwake) -> Result<(), &'static str> {
            let _guard = KeepAwakeGuard::acquire(lock);
            Err("stage failed")
        }
        let lock = Counting::default();
        assert!(fallible(&lock).is_err());
        assert_eq!(lock.held.load(Ordering::SeqCst), 1);
        assert_eq!(lock.released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn stage_names_are_stable() {
        assert_eq!(Stage::ActivityManager.to_string(), "activity-manager");
        assert_eq!(Stage::Finalize.as_str(), "finalize");
    }
}
