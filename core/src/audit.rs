//! Append-only audit log.
//!
//! Human-oriented, line-based text meant for `tail -f`:
//!
//! ```text
//! [14:02:11] CALLED: git status
//! [14:02:12] ALLOW
//!   cmd: git status
//!   model: "{\"decision\":\"auto_approve\"}"
//! ```
//!
//! Several gate processes may append to the same file concurrently. Each
//! record is rendered up front and written with a single `write_all` on an
//! append-mode handle, so records from different processes do not interleave.
//! Writing is best-effort: callers log failures and carry on.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use crate::decision::Verdict;

/// Commands longer than this are cut in the log.
pub const MAX_COMMAND_CHARS: usize = 120;

const TIMESTAMP_FORMAT: &str = "%H:%M:%S";

/// Status line of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuditStatus {
    Allow,
    Escalate,
    Error,
}

impl AuditStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Allow => "ALLOW",
            Self::Escalate => "ESCALATE",
            Self::Error => "ERROR",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ALLOW" => Some(Self::Allow),
            "ESCALATE" => Some(Self::Escalate),
            "ERROR" => Some(Self::Error),
            _ => None,
        }
    }
}

impl std::fmt::Display for AuditStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One resolved invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditRecord {
    /// When the command was first observed.
    pub observed_at: DateTime<Local>,
    /// Command prefix, at most [`MAX_COMMAND_CHARS`] characters.
    pub command: String,
    pub status: AuditStatus,
    pub raw_response: Option<String>,
    pub error: Option<String>,
}

impl AuditRecord {
    /// Record for `verdict` on a command first seen at `observed_at`.
    pub fn new(observed_at: DateTime<Local>, command: &str, verdict: &Verdict) -> Self {
        let (raw_response, error) = match verdict {
            Verdict::Allow { raw } | Verdict::Escalate { raw } => (Some(raw.clone()), None),
            Verdict::Error { detail } => (None, Some(single_line(detail))),
        };
        Self {
            observed_at,
            command: single_line(truncate_command(command)),
            status: verdict.status(),
            raw_response,
            error,
        }
    }

    /// Render the record as one self-contained block of lines.
    pub fn render(&self) -> String {
        let mut out = format!(
            "[{}] {}\n  cmd: {}\n",
            self.observed_at.format(TIMESTAMP_FORMAT),
            self.status,
            self.command
        );
        if let Some(raw) = &self.raw_response {
            out.push_str(&format!("  model: {raw:?}\n"));
        }
        if let Some(error) = &self.error {
            out.push_str(&format!("  error: {error}\n"));
        }
        out
    }
}

/// First [`MAX_COMMAND_CHARS`] characters of `command`.
pub fn truncate_command(command: &str) -> &str {
    match command.char_indices().nth(MAX_COMMAND_CHARS) {
        Some((idx, _)) => &command[..idx],
        None => command,
    }
}

/// Escape control characters so one field can never span (or forge) lines.
fn single_line(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if c.is_control() {
            out.extend(c.escape_debug());
        } else {
            out.push(c);
        }
    }
    out
}

/// Handle on the shared log file.
#[derive(Debug, Clone)]
pub struct AuditLog {
    path: PathBuf,
}

impl AuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Note that a command arrived, before classification starts.
    pub fn observe(&self, at: DateTime<Local>, command: &str) -> io::Result<()> {
        self.write_block(&format!(
            "[{}] CALLED: {}\n",
            at.format(TIMESTAMP_FORMAT),
            single_line(truncate_command(command))
        ))
    }

    /// Append one resolved record.
    pub fn append(&self, record: &AuditRecord) -> io::Result<()> {
        self.write_block(&record.render())
    }

    fn write_block(&self, block: &str) -> io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(block.as_bytes())
    }
}
