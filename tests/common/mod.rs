use dirmirror::{ContentComparator, MemorySink, SyncScheduler};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use walkdir::WalkDir;

/// A scratch source/replica pair that is removed when dropped
pub struct Trees {
    _dir: TempDir,
    pub source: PathBuf,
    pub replica: PathBuf,
}

pub fn create_trees() -> Trees {
    let dir = tempfile::tempdir().expect("Should create temp dir");
    let source = dir.path().join("source");
    let replica = dir.path().join("replica");
    std::fs::create_dir_all(&source).unwrap();
    std::fs::create_dir_all(&replica).unwrap();
    Trees {
        _dir: dir,
        source,
        replica,
    }
}

pub fn write_file(root: &Path, relative: &str, content: &[u8]) {
    let path = root.join(relative);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

pub fn scheduler_for(trees: &Trees, sink: Arc<MemorySink>) -> SyncScheduler {
    SyncScheduler::new(
        &trees.source,
        &trees.replica,
        Duration::from_millis(25),
        ContentComparator::new(1024),
        sink,
    )
}

/// Relative paths of every regular file under `root`, with forward slashes
pub fn relative_files(root: &Path) -> BTreeSet<String> {
    WalkDir::new(root)
        .min_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            e.path()
                .strip_prefix(root)
                .unwrap()
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/")
        })
        .collect()
}

/// Assert the replica holds exactly the source's files with the same bytes
pub fn assert_mirrored(trees: &Trees) {
    let source_files = relative_files(&trees.source);
    let replica_files = relative_files(&trees.replica);
    assert_eq!(source_files, replica_files, "File sets should match");

    for relative in &source_files {
        let a = std::fs::read(trees.source.join(relative)).unwrap();
        let b = std::fs::read(trees.replica.join(relative)).unwrap();
        assert_eq!(a, b, "Content of {} should match", relative);
    }
}
