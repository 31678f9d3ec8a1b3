//! Redirect-following bundle download.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use reqwest::blocking::{Client, Response};
use reqwest::header::LOCATION;
use reqwest::redirect::Policy;
use reqwest::StatusCode;
use tempfile::NamedTempFile;
use tracing::{debug, info};
use url::Url;

use crate::core::cancel::CancelToken;
use crate::core::config::TransferSettings;
use crate::core::errors::TransferError;
use crate::core::fs::ensure_dir;

const USER_AGENT: &str = concat!("sandroot/", env!("CARGO_PKG_VERSION"));

/// Bytes received so far and the announced body length, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferProgress {
    pub received: u64,
    pub total: Option<u64>,
}

impl TransferProgress {
    /// Whole-number percentage, only when the server announced a content length.
    #[must_use]
    pub fn percent(&self) -> Option<u8> {
        let total = self.total.filter(|total| *total > 0)?;
        let pct = self.received.saturating_mul(100) / total;
        Some(u8::try_from(pct.min(100)).unwrap_or(100))
    }
}

#[derive(Debug, Clone)]
pub struct TransferClient {
    client: Client,
    settings: TransferSettings,
}

impl TransferClient {
    /// Build a client that never follows redirects on its own.
    ///
    /// # Errors
    /// Returns an error when the TLS backend cannot be initialised.
    pub fn new(settings: &TransferSettings) -> anyhow::Result<Self> {
        let builder = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(Policy::none())
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.read_timeout);
        let builder = if settings.keep_proxies {
            builder
        } else {
            builder.no_proxy()
        };
        let client = builder.build().context("failed to build HTTP client")?;
        Ok(Self {
            client,
            settings: settings.clone(),
        })
    }

    /// Fetch `url` into `dest`, following up to `redirect_limit` redirects.
    ///
    /// The body is streamed through a temp file next to `dest` and renamed into place, so a
    /// failed transfer never leaves a truncated file at `dest`.
    ///
    /// # Errors
    /// Returns [`TransferError`] for network failures, non-success statuses, redirect loops,
    /// cancellation, and local write failures.
    pub fn download(
        &self,
        url: &str,
        dest: &Path,
        cancel: &CancelToken,
        on_progress: &mut dyn FnMut(TransferProgress),
    ) -> Result<PathBuf, TransferError> {
        let response = self.resolve(url, cancel)?;
        self.stream_to(response, dest, cancel, on_progress)
    }

    fn resolve(&self, url: &str, cancel: &CancelToken) -> Result<Response, TransferError> {
        let mut current = Url::parse(url).map_err(|err| TransferError::InvalidLocation {
            location: url.to_string(),
            reason: err.to_string(),
        })?;
        let mut hops = 0usize;
        loop {
            if cancel.is_cancelled() {
                return Err(TransferError::Cancelled);
            }
            let response = self
                .client
                .get(current.clone())
                .send()
                .map_err(|source| TransferError::Http {
                    url: current.to_string(),
                    source,
                })?;
            let status = response.status();
            if is_redirect(status) {
                hops += 1;
                if hops > self.settings.redirect_limit {
                    return Err(TransferError::TooManyRedirects {
                        limit: self.settings.redirect_limit,
                    });
                }
                let location = response
                    .headers()
                    .get(LOCATION)
                    .and_then(|value| value.to_str().ok())
                    .ok_or_else(|| TransferError::MissingLocation {
                        url: current.to_string(),
                    })?;
                let next = current
                    .join(location)
                    .map_err(|err| TransferError::InvalidLocation {
                        location: location.to_string(),
                        reason: err.to_string(),
                    })?;
                debug!(hop = hops, from = %current, to = %next, "following redirect");
                current = next;
                continue;
            }
            if !status.is_success() {
                return Err(TransferError::Status {
                    code: status.as_u16(),
                    url: current.to_string(),
                });
            }
            return Ok(response);
        }
    }

    fn stream_to(
        &self,
        mut response: Response,
        dest: &Path,
        cancel: &CancelToken,
        on_progress: &mut dyn FnMut(TransferProgress),
    ) -> Result<PathBuf, TransferError> {
        let io_err = |source| TransferError::Io {
            path: dest.to_path_buf(),
            source,
        };
        let parent = dest.parent().unwrap_or_else(|| Path::new("."));
        ensure_dir(parent).map_err(io_err)?;
        let mut tmp = NamedTempFile::new_in(parent).map_err(io_err)?;

        let url = response.url().to_string();
        let total = response.content_length();
        let mut progress = TransferProgress { received: 0, total };
        on_progress(progress);

        let mut buffer = vec![0_u8; self.settings.chunk_size.max(1)];
        loop {
            if cancel.is_cancelled() {
                return Err(TransferError::Cancelled);
            }
            let read = response
                .read(&mut buffer)
                .map_err(|source| TransferError::Stream {
                    url: url.clone(),
                    source,
                })?;
            if read == 0 {
                break;
            }
            tmp.write_all(&buffer[..read]).map_err(io_err)?;
            progress.received += read as u64;
            on_progress(progress);
        }
        tmp.flush().map_err(io_err)?;
        tmp.persist(dest).map_err(|err| io_err(err.error))?;
        info!(path = %dest.display(), bytes = progress.received, "bundle downloaded");
        Ok(dest.to_path_buf())
    }
}

fn is_redirect(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::MOVED_PERMANENTLY
            | StatusCode::FOUND
            | StatusCode::SEE_OTHER
            | StatusCode::TEMPORARY_REDIRECT
            | StatusCode::PERMANENT_REDIRECT
    )
}
