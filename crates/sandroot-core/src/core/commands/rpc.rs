//! Synchronous calls over the request-spool / result-file exchange.
//!
//! A request is a file `req_*.req` in the spool directory:
//!
//! ```text
//! method=<name>
//! result=<absolute path the reply must be written to>
//! args=<everything up to end of file>
//! ```
//!
//! Requests are written to a `.tmp` sibling first and renamed, so readers never see a partial
//! request. Replies are written the same way.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::core::cancel::CancelToken;
use crate::core::fs::{ensure_dir, write_atomic};

const REQUEST_EXT: &str = "req";
const POLL_INTERVAL: Duration = Duration::from_millis(20);

#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    #[error("malformed request {}: {reason}", .path.display())]
    MalformedRequest { path: PathBuf, reason: &'static str },
    #[error("result path {} is outside {}", .path.display(), .root.display())]
    ForeignResultPath { path: PathBuf, root: PathBuf },
    #[error("spool i/o failed for {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Outcome of one call. A missing reply is a normal result, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiReply {
    Output(String),
    TimedOut,
}

impl ApiReply {
    /// Reply text; empty on timeout, matching the shell wrappers.
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::Output(text) => text,
            Self::TimedOut => "",
        }
    }
}

pub trait ApiChannel {
    /// # Errors
    /// Returns [`RpcError`] when the request cannot be delivered.
    fn call(&self, method: &str, args: &str, timeout: Duration) -> Result<ApiReply, RpcError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    pub method: String,
    pub result: PathBuf,
    pub args: String,
}

impl ApiRequest {
    #[must_use]
    pub fn encode(&self) -> String {
        format!(
            "method={}\nresult={}\nargs={}",
            self.method,
            self.result.display(),
            self.args
        )
    }

    /// # Errors
    /// Returns [`RpcError::MalformedRequest`] when a header is missing.
    pub fn decode(path: &Path, text: &str) -> Result<Self, RpcError> {
        let malformed = |reason| RpcError::MalformedRequest {
            path: path.to_path_buf(),
            reason,
        };
        let (method_line, rest) = text.split_once('\n').ok_or_else(|| malformed("truncated"))?;
        let (result_line, args_part) = rest.split_once('\n').ok_or_else(|| malformed("truncated"))?;
        let method = method_line
            .strip_prefix("method=")
            .filter(|m| !m.is_empty())
            .ok_or_else(|| malformed("missing method"))?;
        let result = result_line
            .strip_prefix("result=")
            .filter(|r| !r.is_empty())
            .ok_or_else(|| malformed("missing result path"))?;
        let args = args_part
            .strip_prefix("args=")
            .ok_or_else(|| malformed("missing args"))?;
        Ok(Self {
            method: method.to_string(),
            result: PathBuf::from(result),
            args: args.to_string(),
        })
    }
}

/// Client half: drops a request and polls for the reply until `timeout`.
#[derive(Debug)]
pub struct ResultFileChannel {
    spool: PathBuf,
    results: PathBuf,
    sequence: AtomicU64,
}

impl ResultFileChannel {
    #[must_use]
    pub fn new(spool: impl Into<PathBuf>, results: impl Into<PathBuf>) -> Self {
        Self {
            spool: spool.into(),
            results: results.into(),
            sequence: AtomicU64::new(0),
        }
    }
}

impl ApiChannel for ResultFileChannel {
    fn call(&self, method: &str, args: &str, timeout: Duration) -> Result<ApiReply, RpcError> {
        let io_err = |path: &Path| {
            let path = path.to_path_buf();
            move |source| RpcError::Io { path, source }
        };
        ensure_dir(&self.spool).map_err(io_err(&self.spool))?;
        ensure_dir(&self.results).map_err(io_err(&self.results))?;

        let id = format!(
            "{}_{}",
            std::process::id(),
            self.sequence.fetch_add(1, Ordering::SeqCst)
        );
        let result = self.results.join(format!("api_result_{id}"));
        let request_path = self.spool.join(format!("req_{id}.{REQUEST_EXT}"));
        let request = ApiRequest {
            method: method.to_string(),
            result: result.clone(),
            args: args.to_string(),
        };
        let _ = fs::remove_file(&result);
        write_atomic(&request_path, request.encode().as_bytes()).map_err(|err| RpcError::Io {
            path: request_path.clone(),
            source: io::Error::other(format!("{err:#}")),
        })?;
        debug!(method, request = %request_path.display(), "api request queued");

        let deadline = Instant::now() + timeout;
        loop {
            match fs::read_to_string(&result) {
                Ok(text) => {
                    let _ = fs::remove_file(&result);
                    return Ok(ApiReply::Output(text));
                }
                Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                Err(source) => return Err(RpcError::Io { path: result, source }),
            }
            if Instant::now() >= deadline {
                let _ = fs::remove_file(&request_path);
                debug!(method, "api request timed out");
                return Ok(ApiReply::TimedOut);
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
}

/// Something that can answer API methods. `None` leaves the caller to time out.
pub trait ApiHandler {
    fn handle(&self, request: &ApiRequest) -> Option<String>;
}

impl<F> ApiHandler for F
where
    F: Fn(&ApiRequest) -> Option<String>,
{
    fn handle(&self, request: &ApiRequest) -> Option<String> {
        self(request)
    }
}

/// Server half: claims pending requests and writes replies.
#[derive(Debug, Clone)]
pub struct ResultFileReceiver {
    spool: PathBuf,
    results: PathBuf,
}

impl ResultFileReceiver {
    /// Replies are only written beneath `results`.
    #[must_use]
    pub fn new(spool: impl Into<PathBuf>, results: impl Into<PathBuf>) -> Self {
        Self {
            spool: spool.into(),
            results: results.into(),
        }
    }

    /// Serve every request currently in the spool. Returns how many were answered.
    ///
    /// # Errors
    /// Returns an error when the spool directory cannot be listed.
    pub fn poll_once(&self, handler: &dyn ApiHandler) -> Result<usize, RpcError> {
        let entries = match fs::read_dir(&self.spool) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(0),
            Err(source) => {
                return Err(RpcError::Io {
                    path: self.spool.clone(),
                    source,
                })
            }
        };
        let mut pending: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == REQUEST_EXT))
            .collect();
        pending.sort();

        let mut answered = 0;
        for path in pending {
            match self.serve(&path, handler) {
                Ok(true) => answered += 1,
                Ok(false) => {}
                Err(err) => warn!("{err}"),
            }
        }
        Ok(answered)
    }

    /// Poll until `cancel` fires.
    pub fn serve_until(&self, handler: &dyn ApiHandler, cancel: &CancelToken, interval: Duration) {
        while !cancel.is_cancelled() {
            if let Err(err) = self.poll_once(handler) {
                warn!("{err}");
            }
            thread::sleep(interval);
        }
    }

    fn serve(&self, path: &Path, handler: &dyn ApiHandler) -> Result<bool, RpcError> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(false),
            Err(source) => {
                return Err(RpcError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        match fs::remove_file(path) {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(false),
            Err(source) => {
                return Err(RpcError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        }
        let request = ApiRequest::decode(path, &text)?;
        let escapes = request
            .result
            .components()
            .any(|part| matches!(part, Component::ParentDir));
        if escapes || !request.result.starts_with(&self.results) {
            return Err(RpcError::ForeignResultPath {
                path: request.result,
                root: self.results.clone(),
            });
        }
        let Some(reply) = handler.handle(&request) else {
            debug!(method = %request.method, "no reply for api request");
            return Ok(false);
        };
        write_atomic(&request.result, reply.as_bytes()).map_err(|err| RpcError::Io {
            path: request.result.clone(),
            source: io::Error::other(format!("{err:#}")),
        })?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn request_round_trips_multiline_args() {
        let request = ApiRequest {
            method: "share".into(),
            result: PathBuf::from("/tmp/api_result_1"),
            args: "text|line one\nline two".into(),
        };
        let decoded = ApiRequest::decode(Path::new("req"), &request.encode()).expect("decode");
        assert_eq!(decoded, request);
    }

    #[test]
    fn decode_rejects_missing_headers() {
        let err = ApiRequest::decode(Path::new("req"), "result=/x\nargs=").expect_err("no method");
        assert!(matches!(err, RpcError::MalformedRequest { reason: "missing method", .. }));
        let err = ApiRequest::decode(Path::new("req"), "method=x").expect_err("truncated");
        assert!(err.to_string().contains("truncated"));
    }

    #[test]
    fn call_times_out_without_receiver() {
        let temp = tempfile::tempdir().expect("tempdir");
        let spool = temp.path().join("spool");
        let channel = ResultFileChannel::new(&spool, temp.path());
        let reply = channel
            .call("battery-status", "", Duration::from_millis(50))
            .expect("call");
        assert_eq!(reply, ApiReply::TimedOut);
        assert_eq!(reply.text(), "");
        assert_eq!(fs::read_dir(&spool).expect("spool").count(), 0, "request withdrawn");
    }

    #[test]
    fn receiver_answers_channel_calls() {
        let temp = tempfile::tempdir().expect("tempdir");
        let spool = temp.path().join("spool");
        let results = temp.path().join("tmp");
        let channel = ResultFileChannel::new(&spool, &results);
        let receiver = ResultFileReceiver::new(&spool, &results);
        let cancel = CancelToken::new();

        let server = {
            let cancel = cancel.clone();
            let receiver = receiver.clone();
            thread::spawn(move || {
                let handler = |request: &ApiRequest| Some(format!("{}:{}", request.method, request.args));
                receiver.serve_until(&handler, &cancel, Duration::from_millis(5));
            })
        };
        let reply = channel
            .call("toast", "hello there", Duration::from_secs(5))
            .expect("call");
        cancel.cancel();
        server.join().expect("server");
        assert_eq!(reply, ApiReply::Output("toast:hello there".into()));
    }

    #[test]
    fn receiver_refuses_foreign_result_paths() {
        let temp = tempfile::tempdir().expect("tempdir");
        let spool = temp.path().join("spool");
        let results = temp.path().join("tmp");
        fs::create_dir_all(&spool).expect("spool");
        let outside = temp.path().join("outside");
        let request = ApiRequest {
            method: "toast".into(),
            result: outside.clone(),
            args: String::new(),
        };
        fs::write(spool.join("req_1.req"), request.encode()).expect("request");
        let calls = Arc::new(AtomicU64::new(0));
        let counter = calls.clone();
        let handler = move |_: &ApiRequest| {
            counter.fetch_add(1, Ordering::SeqCst);
            Some("x".to_string())
        };
        let answered = ResultFileReceiver::new(&spool, &results)
            .poll_once(&handler)
            .expect("poll");
        assert_eq!(answered, 0);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(!outside.exists());
    }
}
