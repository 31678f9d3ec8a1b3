use std::sync::mpsc::Sender;

use serde::Serialize;

use crate::core::transfer::TransferProgress;

pub const FAILURE_PERCENT: i32 = -1;

const DOWNLOAD_START: i32 = 5;
const DOWNLOAD_SPAN: u64 = 45;
const EXTRACT_START: i32 = 50;
const EXTRACT_CEILING: usize = 30;

/// One `(percent, message)` update. `percent == -1` is the terminal failure event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressEvent {
    pub percent: i32,
    pub message: String,
}

impl ProgressEvent {
    #[must_use]
    pub fn new(percent: i32, message: impl Into<String>) -> Self {
        Self {
            percent,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn failure(message: impl Into<String>) -> Self {
        Self::new(FAILURE_PERCENT, message)
    }

    #[must_use]
    pub fn is_failure(&self) -> bool {
        self.percent == FAILURE_PERCENT
    }
}

/// Receiver of install progress. Publishing never blocks the pipeline on the consumer.
pub trait ProgressSink: Send {
    fn publish(&mut self, event: ProgressEvent);
}

impl ProgressSink for Sender<ProgressEvent> {
    fn publish(&mut self, event: ProgressEvent) {
        // A dropped receiver just means nobody is watching.
        let _ = self.send(event);
    }
}

impl ProgressSink for Vec<ProgressEvent> {
    fn publish(&mut self, event: ProgressEvent) {
        self.push(event);
    }
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl ProgressSink for NullSink {
    fn publish(&mut self, _event: ProgressEvent) {}
}

/// Download progress scaled into 5..=50.
#[must_use]
pub fn download_percent(progress: TransferProgress) -> Option<i32> {
    let pct = u64::from(progress.percent()?);
    i32::try_from(pct * DOWNLOAD_SPAN / 100)
        .ok()
        .map(|scaled| DOWNLOAD_START + scaled)
}

/// Extraction progress: one point per hundred entries, capped at 80.
#[must_use]
pub fn extract_percent(entries: usize) -> i32 {
    let step = (entries / 100).min(EXTRACT_CEILING);
    EXTRACT_START + i32::try_from(step).unwrap_or(0)
}

pub(crate) fn megabytes(bytes: u64) -> u64 {
    bytes / 1024 / 1024
}
