//! Where the bundle archive comes from.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::core::cancel::CancelToken;
use crate::core::config::BootstrapConfig;
use crate::core::errors::TransferError;
use crate::core::transfer::{TransferClient, TransferProgress};

pub const ARCHIVE_NAME: &str = "bootstrap.zip";

/// An archive ready for extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedBundle {
    pub path: PathBuf,
    /// Whether the installer owns the file and removes it afterwards.
    pub disposable: bool,
}

pub trait BundleSource: Send + Sync {
    /// Human-readable origin, for logs.
    fn describe(&self) -> String;

    /// Make the archive available locally. `staging` is a suggested path the source may use.
    ///
    /// # Errors
    /// Returns [`TransferError`] when the archive cannot be obtained.
    fn fetch(
        &self,
        staging: &Path,
        cancel: &CancelToken,
        on_progress: &mut dyn FnMut(TransferProgress),
    ) -> Result<FetchedBundle, TransferError>;
}

/// Downloads the configured bundle URL into the cache directory.
#[derive(Debug, Clone)]
pub struct HttpBundleSource {
    client: TransferClient,
    url: String,
}

impl HttpBundleSource {
    /// # Errors
    /// Returns an error when the HTTP client cannot be built.
    pub fn new(config: &BootstrapConfig) -> anyhow::Result<Self> {
        Ok(Self {
            client: TransferClient::new(config.transfer())?,
            url: config.bundle().url.clone(),
        })
    }
}

impl BundleSource for HttpBundleSource {
    fn describe(&self) -> String {
        self.url.clone()
    }

    fn fetch(
        &self,
        staging: &Path,
        cancel: &CancelToken,
        on_progress: &mut dyn FnMut(TransferProgress),
    ) -> Result<FetchedBundle, TransferError> {
        let path = self.client.download(&self.url, staging, cancel, on_progress)?;
        Ok(FetchedBundle {
            path,
            disposable: true,
        })
    }
}

/// An archive already on disk. It is read in place and never deleted.
#[derive(Debug, Clone)]
pub struct LocalBundleSource {
    path: PathBuf,
}

impl LocalBundleSource {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl BundleSource for LocalBundleSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn fetch(
        &self,
        _staging: &Path,
        cancel: &CancelToken,
        on_progress: &mut dyn FnMut(TransferProgress),
    ) -> Result<FetchedBundle, TransferError> {
        if cancel.is_cancelled() {
            return Err(TransferError::Cancelled);
        }
        let meta = fs::metadata(&self.path).map_err(|source| TransferError::Io {
            path: self.path.clone(),
            source,
        })?;
        on_progress(TransferProgress {
            received: meta.len(),
            total: Some(meta.len()),
        });
        debug!(path = %self.path.display(), "using local bundle");
        Ok(FetchedBundle {
            path: self.path.clone(),
            disposable: false,
        })
    }
}
