//! Byte-for-byte file comparison via size and SHA-256.

use crate::events::{EventSink, SyncEvent};
use crate::utils::{compute_file_hash, DEFAULT_CHUNK_SIZE};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tracing::debug;

#[derive(Error, Debug)]
pub enum CompareError {
    #[error("Cannot compare {}: {source}", .path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Decides whether two files hold the same bytes
#[derive(Debug, Clone, Copy)]
pub struct ContentComparator {
    chunk_size: usize,
}

impl Default for ContentComparator {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE)
    }
}

impl ContentComparator {
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
        }
    }

    /// Compare two files, surfacing I/O failures.
    ///
    /// Differing sizes short-circuit without reading any content.
    pub async fn compare(&self, a: &Path, b: &Path) -> Result<bool, CompareError> {
        let size_a = file_size(a).await?;
        let size_b = file_size(b).await?;
        if size_a != size_b {
            debug!(a = %a.display(), b = %b.display(), "Sizes differ");
            return Ok(false);
        }

        let hash_a = hash(a, self.chunk_size).await?;
        let hash_b = hash(b, self.chunk_size).await?;
        Ok(hash_a == hash_b)
    }

    /// Compare two files, treating any failure as "different".
    ///
    /// The failure is recorded on `sink` so the caller can still re-copy.
    pub async fn equal(&self, a: &Path, b: &Path, sink: &dyn EventSink) -> bool {
        match self.compare(a, b).await {
            Ok(same) => same,
            Err(e) => {
                sink.record(&SyncEvent::Error(e.to_string()));
                false
            }
        }
    }
}

async fn file_size(path: &Path) -> Result<u64, CompareError> {
    fs::metadata(path)
        .await
        .map(|m| m.len())
        .map_err(|e| CompareError::Unreadable {
            path: path.to_path_buf(),
            source: e,
        })
}

async fn hash(path: &Path, chunk_size: usize) -> Result<String, CompareError> {
    compute_file_hash(path, chunk_size)
        .await
        .map_err(|e| CompareError::Unreadable {
            path: path.to_path_buf(),
            source: e,
        })
}
