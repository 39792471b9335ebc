//! Event recording for sync passes.
//!
//! Every notable thing a pass does (copy, delete, new-file notice, error) is
//! reported as a [`SyncEvent`] to an [`EventSink`]. The sink decides where the
//! event ends up; the core never depends on it succeeding.

mod sink;

pub use sink::{EventLog, MemorySink};

use std::fmt;
use std::path::PathBuf;

use crate::utils::display_relative;

/// Something worth recording that happened during a pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// A file was copied into the replica
    Copied(PathBuf),
    /// A file was removed from the replica
    Deleted(PathBuf),
    /// A file appeared in the source since the previous pass
    NewFile(PathBuf),
    /// The source root was missing when a pass started
    SourceMissing(PathBuf),
    /// Any failure, with enough detail to diagnose it
    Error(String),
}

impl SyncEvent {
    pub fn is_error(&self) -> bool {
        matches!(self, SyncEvent::Error(_) | SyncEvent::SourceMissing(_))
    }
}

impl fmt::Display for SyncEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncEvent::Copied(path) => write!(f, "Copied: {}", display_relative(path)),
            SyncEvent::Deleted(path) => write!(f, "Deleted: {}", display_relative(path)),
            SyncEvent::NewFile(path) => {
                write!(f, "New file detected: {}", display_relative(path))
            }
            SyncEvent::SourceMissing(root) => {
                write!(f, "Source folder not found: {}", root.display())
            }
            SyncEvent::Error(detail) => write!(f, "Error: {}", detail),
        }
    }
}

/// Destination for sync events.
///
/// Implementations must be callable from several tasks at once and must not
/// fail: a sink that cannot write should swallow the problem.
pub trait EventSink: Send + Sync {
    fn record(&self, event: &SyncEvent);
}
