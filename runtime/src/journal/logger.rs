//! JSONL session journal — append-only log of map session events.

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// A single journal entry.
#[derive(Debug, Clone, Serialize)]
pub struct JournalEvent {
    pub timestamp: String,
    pub session_id: Option<String>,
    pub event: String,
    pub detail: Option<String>,
    pub duration_ms: u64,
    pub status: String,
}

/// Append-only JSONL writer.
pub struct JournalLogger {
    file: File,
    path: PathBuf,
}

impl JournalLogger {
    /// Open or create the journal file.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("failed to open session journal: {}", path.display()))?;

        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn log(&mut self, event: &JournalEvent) -> Result<()> {
        let json = serde_json::to_string(event)?;
        writeln!(self.file, "{json}")?;
        Ok(())
    }

    /// Log an event stamped with the current time.
    pub fn log_event(
        &mut self,
        session_id: Option<&str>,
        event: &str,
        detail: Option<&str>,
        duration_ms: u64,
        status: &str,
    ) -> Result<()> {
        self.log(&JournalEvent {
            timestamp: Utc::now().to_rfc3339(),
            session_id: session_id.map(String::from),
            event: event.to_string(),
            detail: detail.map(String::from),
            duration_ms,
            status: status.to_string(),
        })
    }
}
