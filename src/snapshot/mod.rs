//! Point-in-time listings of a directory tree.

mod types;

pub use types::{FileEntry, Snapshot, UnreadablePath};

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tracing::{debug, warn};
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("Folder not found: {}", .0.display())]
    RootNotFound(PathBuf),

    #[error("Not a folder: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("Cannot read {}: {source}", .path.display())]
    Access {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Capture every regular file under `root`.
///
/// Fails if `root` itself is missing or unreadable. Entries below the root
/// that cannot be read during the walk are left out of the listing and
/// reported through [`Snapshot::unreadable`].
pub async fn capture(root: &Path) -> Result<Snapshot, SnapshotError> {
    let metadata = match fs::metadata(root).await {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(SnapshotError::RootNotFound(root.to_path_buf()));
        }
        Err(e) => {
            return Err(SnapshotError::Access {
                path: root.to_path_buf(),
                source: e,
            });
        }
    };

    if !metadata.is_dir() {
        return Err(SnapshotError::NotADirectory(root.to_path_buf()));
    }

    // Opening the directory up front surfaces permission problems on the root
    // instead of silently producing an empty snapshot
    fs::read_dir(root).await.map_err(|e| SnapshotError::Access {
        path: root.to_path_buf(),
        source: e,
    })?;

    let owned_root = root.to_path_buf();
    let snapshot = tokio::task::spawn_blocking(move || walk_tree(&owned_root))
        .await
        .map_err(|e| SnapshotError::Access {
            path: root.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::Other, e),
        })?;

    debug!(root = %root.display(), files = snapshot.len(), "Captured snapshot");
    Ok(snapshot)
}

/// Like [`capture`], but an absent root yields an empty snapshot
pub async fn capture_or_empty(root: &Path) -> Result<Snapshot, SnapshotError> {
    match capture(root).await {
        Err(SnapshotError::RootNotFound(_)) => Ok(Snapshot::empty(root)),
        other => other,
    }
}

fn walk_tree(root: &Path) -> Snapshot {
    let mut snapshot = Snapshot::empty(root);

    for entry in WalkDir::new(root).min_depth(1).follow_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                let relative = e
                    .path()
                    .and_then(|p| p.strip_prefix(root).ok())
                    .map(Path::to_path_buf)
                    .unwrap_or_default();
                let cause = e
                    .io_error()
                    .map(ToString::to_string)
                    .unwrap_or_else(|| e.to_string());
                warn!(root = %root.display(), path = %relative.display(), error = %cause, "Skipping unreadable entry");
                snapshot.mark_unreadable(relative, cause);
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let Ok(relative) = entry.path().strip_prefix(root).map(Path::to_path_buf) else {
            continue;
        };

        let metadata = match entry.metadata() {
            Ok(m) => m,
            Err(e) => {
                warn!(path = %entry.path().display(), error = %e, "Skipping file without metadata");
                snapshot.mark_unreadable(relative, e.to_string());
                continue;
            }
        };

        let modified = match metadata.modified() {
            Ok(time) => DateTime::<Utc>::from(time),
            Err(e) => {
                warn!(path = %entry.path().display(), error = %e, "Skipping file without mtime");
                snapshot.mark_unreadable(relative, e.to_string());
                continue;
            }
        };

        snapshot.insert(FileEntry {
            relative_path: relative,
            modified,
            size: metadata.len(),
        });
    }

    snapshot
}
