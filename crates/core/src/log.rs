//! Debug-log collaborator shared by the fetcher, resolver and execution host.
//!
//! One instance is created per dispatcher and handed to every component that
//! wants to leave a trace of what it tried (URLs, cache hits, fallbacks).

use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

/// Sink for human-readable debug records.
pub trait DebugLog: Send + Sync {
    /// Record one message.
    fn record(&self, message: &str);
}

/// Forwards records to `tracing` only.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLog;

impl DebugLog for TracingLog {
    fn record(&self, message: &str) {
        tracing::debug!(target: "nuro::debug", "{message}");
    }
}

/// Appends timestamped records to a log file and forwards them to `tracing`.
///
/// Write failures are swallowed: the debug log must never break a command.
#[derive(Debug)]
pub struct FileDebugLog {
    path: PathBuf,
    file: Mutex<Option<std::fs::File>>,
}

impl FileDebugLog {
    /// Create a log appending to `path`. The file is opened lazily.
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            file: Mutex::new(None),
        }
    }

    /// Location of the log file.
    #[must_use]
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    fn open(&self) -> Option<std::fs::File> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).ok()?;
        }
        std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .ok()
    }
}

impl DebugLog for FileDebugLog {
    fn record(&self, message: &str) {
        tracing::debug!(target: "nuro::debug", "{message}");

        let line = format!(
            "[{}] {message}\n",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
        );
        let Ok(mut guard) = self.file.lock() else {
            return;
        };
        if guard.is_none() {
            *guard = self.open();
        }
        if let Some(file) = guard.as_mut() {
            let _ = file.write_all(line.as_bytes());
        }
    }
}

/// Keeps every record in memory; used to observe what a dispatch attempted.
#[derive(Debug, Default)]
pub struct MemoryLog {
    records: Mutex<Vec<String>>,
}

impl MemoryLog {
    /// Create an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all records so far.
    #[must_use]
    pub fn records(&self) -> Vec<String> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }

    /// Number of records containing `needle`.
    #[must_use]
    pub fn count_containing(&self, needle: &str) -> usize {
        self.records()
            .iter()
            .filter(|record| record.contains(needle))
            .count()
    }
}

impl DebugLog for MemoryLog {
    fn record(&self, message: &str) {
        tracing::trace!(target: "nuro::debug", "{message}");
        if let Ok(mut records) = self.records.lock() {
            records.push(message.to_string());
        }
    }
}
