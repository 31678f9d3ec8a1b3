use std::path::PathBuf;

/// Failures while fetching the bundle over HTTP.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("too many redirects (limit {limit})")]
    TooManyRedirects { limit: usize },
    #[error("redirect from {url} has no Location header")]
    MissingLocation { url: String },
    #[error("invalid redirect target '{location}': {reason}")]
    InvalidLocation { location: String, reason: String },
    #[error("unexpected HTTP status {code} for {url}")]
    Status { code: u16, url: String },
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("stream error for {url}: {source}")]
    Stream {
        url: String,
        #[source]
        source: std::io::Error,
    },
    #[error("i/o error while writing {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("download cancelled")]
    Cancelled,
}

/// Failures while unpacking the bundle archive.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("unable to open archive {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("corrupt archive {}: {source}", .path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },
    #[error("corrupt entry '{entry}' in {}: {source}", .archive.display())]
    EntryRead {
        archive: PathBuf,
        entry: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("extraction cancelled")]
    Cancelled,
}

/// A single path the permission normalizer could not fix.
#[derive(Debug, Clone, thiserror::Error)]
#[error("unable to set mode {mode:o} on {}: {reason}", .path.display())]
pub struct PermissionError {
    pub path: PathBuf,
    pub mode: u32,
    pub reason: String,
}

/// Top-level engine errors surfaced through the install contract.
#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    #[error("[SR110] download failed: {0}")]
    DownloadFailed(#[from] TransferError),
    #[error("[SR120] extraction failed: {0}")]
    ExtractionFailed(#[from] ExtractError),
    #[error("[SR130] permission normalization failed: {0}")]
    PermissionFailed(#[from] PermissionError),
    #[error("[SR140] install aborted during {stage}: {message}")]
    InstallAborted { stage: String, message: String },
    #[error("[SR150] install cancelled")]
    Cancelled,
}

impl BootstrapError {
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::DownloadFailed(_) => "SR110",
            Self::ExtractionFailed(_) => "SR120",
            Self::PermissionFailed(_) => "SR130",
            Self::InstallAborted { .. } => "SR140",
            Self::Cancelled => "SR150",
        }
    }

    /// Whether re-invoking `install()` can reasonably succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn too_many_redirects_reads_as_download_failure() {
        let err = BootstrapError::from(TransferError::TooManyRedirects { limit: 5 });
        assert_eq!(err.code(), "SR110");
        let text = err.to_string();
        assert!(text.contains("download failed"), "{text}");
        assert!(text.contains("too many redirects"), "{text}");
    }

    #[test]
    fn aborted_install_names_stage() {
        let err = BootstrapError::InstallAborted {
            stage: "extract".into(),
            message: "disk full".into(),
        };
        assert_eq!(err.to_string(), "[SR140] install aborted during extract: disk full");
        assert!(err.is_retryable());
        assert!(!BootstrapError::Cancelled.is_retryable());
    }
}
