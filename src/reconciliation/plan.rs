use crate::compare::ContentComparator;
use crate::events::EventSink;
use crate::snapshot::Snapshot;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A single step of a reconciliation plan
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncAction {
    /// Copy the source file at this relative path into the replica
    Copy(PathBuf),
    /// Remove this relative path from the replica
    Delete(PathBuf),
}

impl SyncAction {
    pub fn path(&self) -> &Path {
        match self {
            SyncAction::Copy(path) | SyncAction::Delete(path) => path,
        }
    }
}

/// Why a file was scheduled for copying
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyReason {
    /// Not present in the replica
    Missing,
    /// Replica copy is older than the source
    Outdated,
    /// Timestamps agree but the bytes do not
    ContentDiffers,
}

/// The reconciliation plan
#[derive(Debug, Clone, Default)]
pub struct ReconciliationPlan {
    /// Ordered actions: every copy comes before any delete
    pub actions: Vec<SyncAction>,

    /// Files that are already identical in both trees
    pub up_to_date: Vec<PathBuf>,
}

impl ReconciliationPlan {
    /// True when the replica already mirrors the source
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn copies(&self) -> impl Iterator<Item = &Path> {
        self.actions.iter().filter_map(|a| match a {
            SyncAction::Copy(path) => Some(path.as_path()),
            SyncAction::Delete(_) => None,
        })
    }

    pub fn deletes(&self) -> impl Iterator<Item = &Path> {
        self.actions.iter().filter_map(|a| match a {
            SyncAction::Delete(path) => Some(path.as_path()),
            SyncAction::Copy(_) => None,
        })
    }
}

/// Work out what must change in the replica so it matches the source.
///
/// A replica file older than its source is copied without looking at the
/// content, so an identical file with a newer source timestamp is still
/// re-copied. Otherwise content is compared and any difference, including a
/// failed comparison, schedules a copy. Replica files under a source path the
/// scan could not read are never deleted.
pub async fn build_reconciliation_plan(
    source: &Snapshot,
    replica: &Snapshot,
    comparator: &ContentComparator,
    sink: &dyn EventSink,
) -> ReconciliationPlan {
    let mut plan = ReconciliationPlan::default();
    let mut deletes = Vec::new();

    for entry in source {
        let path = &entry.relative_path;

        let reason = match replica.get(path) {
            None => Some(CopyReason::Missing),
            Some(existing) if existing.modified < entry.modified => Some(CopyReason::Outdated),
            Some(_) => {
                let same = comparator
                    .equal(&source.absolute(path), &replica.absolute(path), sink)
                    .await;
                (!same).then_some(CopyReason::ContentDiffers)
            }
        };

        match reason {
            Some(reason) => {
                debug!(path = %path.display(), ?reason, "Planned copy");
                plan.actions.push(SyncAction::Copy(path.clone()));
            }
            None => plan.up_to_date.push(path.clone()),
        }
    }

    for entry in replica {
        let path = &entry.relative_path;
        if source.contains(path) {
            continue;
        }
        if source.is_obscured(path) {
            debug!(path = %path.display(), "Source side unreadable, keeping replica file");
            continue;
        }
        debug!(path = %path.display(), "Planned delete");
        deletes.push(SyncAction::Delete(path.clone()));
    }

    plan.actions.extend(deletes);
    plan
}
