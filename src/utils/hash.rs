use sha2::{Digest, Sha256};
use std::path::Path;
use tokio::fs::File;
use tokio::io::AsyncReadExt;

/// Default read size when streaming a file through the hasher (64 KiB)
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Compute SHA-256 hash of a file's contents.
///
/// The file is read in `chunk_size` pieces so large files are never held in
/// memory at once.
pub async fn compute_file_hash(path: &Path, chunk_size: usize) -> Result<String, std::io::Error> {
    let mut file = File::open(path).await?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; chunk_size.max(1)];

    loop {
        let read = file.read(&mut buf).await?;
        if read == 0 {
            break;
        }
        hasher.update(&buf[..read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_compute_file_hash_known_digest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hello.txt");
        std::fs::write(&path, "hello world").unwrap();

        let hash = compute_file_hash(&path, DEFAULT_CHUNK_SIZE).await.unwrap();
        assert_eq!(
            hash,
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[tokio::test]
    async fn test_file_hash_matches_in_memory_hash() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.bin");
        let content: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
        std::fs::write(&path, &content).unwrap();

        // A tiny chunk size forces many reads
        let streamed = compute_file_hash(&path, 7).await.unwrap();
        assert_eq!(streamed, hex::encode(Sha256::digest(&content)));
    }

    #[tokio::test]
    async fn test_file_hash_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = compute_file_hash(&dir.path().join("nope"), DEFAULT_CHUNK_SIZE).await;
        assert!(result.is_err());
    }
}
