use super::plan::{ReconciliationPlan, SyncAction};
use crate::events::{EventSink, SyncEvent};
use crate::utils::{display_relative, TEMP_SUFFIX};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum ExecuteError {
    #[error("Failed to copy {path}: {source}")]
    Copy {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to delete {path}: {source}")]
    Delete {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// An action that could not be applied
#[derive(Debug, Clone)]
pub struct FailedAction {
    pub action: SyncAction,
    pub error: String,
}

/// Result of reconciliation execution
#[derive(Debug, Clone, Default)]
pub struct ReconciliationResult {
    pub copied: Vec<PathBuf>,
    pub deleted: Vec<PathBuf>,
    pub failed: Vec<FailedAction>,
}

impl ReconciliationResult {
    /// True when every planned action succeeded
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Applies plan actions to a replica tree
#[derive(Debug, Clone)]
pub struct ReconcileExecutor {
    source_root: PathBuf,
    replica_root: PathBuf,
}

impl ReconcileExecutor {
    pub fn new(source_root: impl Into<PathBuf>, replica_root: impl Into<PathBuf>) -> Self {
        Self {
            source_root: source_root.into(),
            replica_root: replica_root.into(),
        }
    }

    /// Apply a single action
    pub async fn apply(&self, action: &SyncAction) -> Result<(), ExecuteError> {
        match action {
            SyncAction::Copy(relative) => self.copy_file(relative).await,
            SyncAction::Delete(relative) => self.delete_file(relative).await,
        }
    }

    /// Apply every action in order, recording one event per action.
    ///
    /// A failing action is recorded and skipped; the rest still run.
    pub async fn execute(&self, plan: &ReconciliationPlan, sink: &dyn EventSink) -> ReconciliationResult {
        let mut result = ReconciliationResult::default();

        for action in &plan.actions {
            match self.apply(action).await {
                Ok(()) => match action {
                    SyncAction::Copy(path) => {
                        sink.record(&SyncEvent::Copied(path.clone()));
                        result.copied.push(path.clone());
                    }
                    SyncAction::Delete(path) => {
                        sink.record(&SyncEvent::Deleted(path.clone()));
                        result.deleted.push(path.clone());
                    }
                },
                Err(e) => {
                    warn!(path = %action.path().display(), error = %e, "Action failed");
                    sink.record(&SyncEvent::Error(e.to_string()));
                    result.failed.push(FailedAction {
                        action: action.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        result
    }

    async fn copy_file(&self, relative: &Path) -> Result<(), ExecuteError> {
        let from = self.source_root.join(relative);
        let to = self.replica_root.join(relative);
        let temp = temp_path_for(&to);

        let outcome = copy_via_temp(&from, &temp, &to).await;
        if outcome.is_err() {
            // Best effort: never leave a half-written temp file behind
            let _ = fs::remove_file(&temp).await;
        }

        outcome.map_err(|e| ExecuteError::Copy {
            path: display_relative(relative),
            source: e,
        })
    }

    async fn delete_file(&self, relative: &Path) -> Result<(), ExecuteError> {
        let target = self.replica_root.join(relative);

        match fs::remove_file(&target).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %target.display(), "Already gone");
            }
            Err(e) => {
                return Err(ExecuteError::Delete {
                    path: display_relative(relative),
                    source: e,
                });
            }
        }

        self.prune_empty_parents(relative).await;
        Ok(())
    }

    /// Remove replica directories emptied by a delete, stopping at the root
    /// or at any directory that still exists in the source
    async fn prune_empty_parents(&self, relative: &Path) {
        let mut current = relative.parent();

        while let Some(dir) = current.filter(|d| !d.as_os_str().is_empty()) {
            if fs::metadata(self.source_root.join(dir))
                .await
                .map(|m| m.is_dir())
                .unwrap_or(false)
            {
                break;
            }

            // remove_dir refuses non-empty directories, which ends the walk
            if fs::remove_dir(self.replica_root.join(dir)).await.is_err() {
                break;
            }
            debug!(dir = %dir.display(), "Pruned empty directory");
            current = dir.parent();
        }
    }
}

/// Temporary sibling used while a copy is in flight: `dir/.name.dirmirror-tmp`
fn temp_path_for(destination: &Path) -> PathBuf {
    let name = destination
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    destination.with_file_name(format!(".{}{}", name, TEMP_SUFFIX))
}

async fn copy_via_temp(from: &Path, temp: &Path, to: &Path) -> Result<(), std::io::Error> {
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent).await?;
    }

    let modified = fs::metadata(from).await?.modified()?;
    fs::copy(from, temp).await?;

    // Carry the source timestamp over so the next pass sees matching times
    let file = fs::OpenOptions::new().write(true).open(temp).await?;
    file.into_std().await.set_modified(modified)?;

    fs::rename(temp, to).await
}
