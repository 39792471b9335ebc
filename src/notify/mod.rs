//! New-file notices between consecutive source snapshots.

use crate::events::{EventSink, SyncEvent};
use crate::snapshot::Snapshot;
use std::path::PathBuf;

/// Record a notice for every file in `current` that `previous` did not have.
///
/// Without a previous snapshot nothing is reported, so the first pass of a
/// process does not flag every existing file as new. Files the previous scan
/// could not see because their folder was unreadable are not reported either.
/// Returns the reported paths in order.
pub fn notify_new_files(
    previous: Option<&Snapshot>,
    current: &Snapshot,
    sink: &dyn EventSink,
) -> Vec<PathBuf> {
    let Some(previous) = previous else {
        return Vec::new();
    };

    let new_files: Vec<PathBuf> = current
        .paths()
        .filter(|path| !previous.contains(path) && !previous.is_obscured(path))
        .map(PathBuf::from)
        .collect();

    for path in &new_files {
        sink.record(&SyncEvent::NewFile(path.clone()));
    }

    new_files
}
