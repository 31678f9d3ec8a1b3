//! The `SYMLINKS.txt` side-channel: one `target←link_path` record per line.

use std::path::{Component, Path};

use tracing::warn;

pub const MANIFEST_NAME: &str = "SYMLINKS.txt";
pub const SEPARATOR: char = '←';

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymlinkEntry {
    /// Stored verbatim; may be relative and may dangle.
    pub target: String,
    /// Relative to the extraction root, leading `./` and `/` removed.
    pub link_path: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedLine {
    pub line_number: usize,
    pub content: String,
    pub reason: &'static str,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymlinkManifest {
    pub entries: Vec<SymlinkEntry>,
    pub malformed: Vec<MalformedLine>,
}

impl SymlinkManifest {
    /// Parse manifest text. Bad lines are collected and logged, never fatal.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let mut manifest = Self::default();
        for (idx, raw) in text.lines().enumerate() {
            let line = raw.trim_end_matches('\r');
            if line.trim().is_empty() {
                continue;
            }
            match parse_line(line) {
                Ok(entry) => manifest.entries.push(entry),
                Err(reason) => {
                    warn!(line = idx + 1, content = line, reason, "skipping malformed symlink record");
                    manifest.malformed.push(MalformedLine {
                        line_number: idx + 1,
                        content: line.to_string(),
                        reason,
                    });
                }
            }
        }
        manifest
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn parse_line(line: &str) -> Result<SymlinkEntry, &'static str> {
    let mut parts = line.split(SEPARATOR);
    let (Some(target), Some(link), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err("expected exactly one separator");
    };
    let target = target.trim();
    if target.is_empty() {
        return Err("empty link target");
    }
    let mut link = link.trim();
    loop {
        let rest = link.trim_start_matches('/');
        let rest = rest.strip_prefix("./").unwrap_or(rest);
        if rest.len() == link.len() {
            break;
        }
        link = rest;
    }
    if link.is_empty() {
        return Err("empty link path");
    }
    if Path::new(link)
        .components()
        .any(|component| matches!(component, Component::ParentDir))
    {
        return Err("link path escapes the extraction root");
    }
    Ok(SymlinkEntry {
        target: target.to_string(),
        link_path: link.to_string(),
    })
}
