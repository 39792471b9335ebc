use super::{EventSink, SyncEvent};
use crate::utils::format_log_time;
use chrono::Utc;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::{info, warn};

/// Console + append-only log file sink.
///
/// Console output goes through `tracing`; the file gets one timestamped line
/// per event. Writes are serialized through a mutex so lines from different
/// tasks never interleave.
pub struct EventLog {
    path: PathBuf,
    file: Mutex<Option<File>>,
}

impl EventLog {
    /// Open (or create) the log file in append mode
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, std::io::Error> {
        let path = path.into();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            file: Mutex::new(Some(file)),
        })
    }

    /// Appends synchronously: one short line per event, and the mutex keeps
    /// lines in the order events were recorded
    fn append(&self, line: &str) -> Result<(), std::io::Error> {
        // A poisoned lock only means another writer panicked mid-line
        let mut guard = self.file.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(file) = guard.as_mut() {
            file.write_all(line.as_bytes())?;
            file.flush()?;
        }
        Ok(())
    }
}

impl EventSink for EventLog {
    fn record(&self, event: &SyncEvent) {
        if event.is_error() {
            warn!("{}", event);
        } else {
            info!("{}", event);
        }

        let line = format!("{} {}\n", format_log_time(Utc::now()), event);
        if let Err(e) = self.append(&line) {
            warn!(path = %self.path.display(), error = %e, "Failed to write log file");
        }
    }
}

/// Sink that keeps events in memory, for embedding and tests
#[derive(Default)]
pub struct MemorySink {
    events: Mutex<Vec<SyncEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All events recorded so far, oldest first
    pub fn events(&self) -> Vec<SyncEvent> {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Rendered messages, oldest first
    pub fn messages(&self) -> Vec<String> {
        self.events().iter().map(ToString::to_string).collect()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}

impl EventSink for MemorySink {
    fn record(&self, event: &SyncEvent) {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(event.clone());
    }
}
