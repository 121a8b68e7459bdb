//! Session journal — optional record of loads, routes and searches.

pub mod logger;

pub use logger::{JournalEvent, JournalLogger};

use anyhow::Result;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::warn;

/// Shared, cloneable handle to a [`JournalLogger`].
///
/// Recording is best-effort: a write failure is logged and otherwise ignored
/// so the map keeps working when the disk does not.
#[derive(Clone)]
pub struct Journal {
    inner: Arc<Mutex<JournalLogger>>,
}

impl Journal {
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self {
            inner: Arc::new(Mutex::new(JournalLogger::open(path)?)),
        })
    }

    pub fn record(
        &self,
        session_id: Option<&str>,
        event: &str,
        detail: Option<&str>,
        duration_ms: u64,
        status: &str,
    ) {
        let mut logger = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = logger.log_event(session_id, event, detail, duration_ms, status) {
            warn!("failed to write journal {}: {e}", logger.path().display());
        }
    }
}
