use chrono::{DateTime, Utc};
use std::collections::btree_map;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// One file observed during a scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Path relative to the snapshot root
    pub relative_path: PathBuf,
    pub modified: DateTime<Utc>,
    /// Size in bytes
    pub size: u64,
}

/// A path below the root that the scan could not read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnreadablePath {
    /// Path relative to the snapshot root; empty when the failure could not be placed
    pub relative_path: PathBuf,
    pub error: String,
}

/// Point-in-time listing of the files under one root, ordered by relative path.
///
/// Files under an unreadable path are absent from the listing; the path itself
/// is kept in `unreadable` so callers can tell "gone" from "not seen".
#[derive(Debug, Clone)]
pub struct Snapshot {
    root: PathBuf,
    entries: BTreeMap<PathBuf, FileEntry>,
    unreadable: Vec<UnreadablePath>,
}

impl Snapshot {
    /// An empty snapshot of `root`
    pub fn empty(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            entries: BTreeMap::new(),
            unreadable: Vec::new(),
        }
    }

    /// Build a snapshot from already captured entries
    pub fn from_entries(root: impl Into<PathBuf>, entries: impl IntoIterator<Item = FileEntry>) -> Self {
        let mut snapshot = Self::empty(root);
        for entry in entries {
            snapshot.insert(entry);
        }
        snapshot
    }

    pub(crate) fn insert(&mut self, entry: FileEntry) {
        self.entries.insert(entry.relative_path.clone(), entry);
    }

    pub(crate) fn mark_unreadable(&mut self, relative_path: PathBuf, error: String) {
        self.unreadable.push(UnreadablePath {
            relative_path,
            error,
        });
    }

    /// Paths the scan had to skip
    pub fn unreadable(&self) -> &[UnreadablePath] {
        &self.unreadable
    }

    /// True if `relative` lies at or below a path the scan could not read
    pub fn is_obscured(&self, relative: &Path) -> bool {
        self.unreadable
            .iter()
            .any(|u| relative.starts_with(&u.relative_path))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute location of a relative path inside this snapshot's tree
    pub fn absolute(&self, relative: &Path) -> PathBuf {
        self.root.join(relative)
    }

    pub fn get(&self, relative: &Path) -> Option<&FileEntry> {
        self.entries.get(relative)
    }

    pub fn contains(&self, relative: &Path) -> bool {
        self.entries.contains_key(relative)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in relative path order
    pub fn iter(&self) -> btree_map::Values<'_, PathBuf, FileEntry> {
        self.entries.values()
    }

    /// Relative paths in order
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.entries.keys().map(PathBuf::as_path)
    }
}

impl<'a> IntoIterator for &'a Snapshot {
    type Item = &'a FileEntry;
    type IntoIter = btree_map::Values<'a, PathBuf, FileEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
