mod cli;

pub use cli::Cli;

use crate::utils::{DEFAULT_CHUNK_SIZE, DEFAULT_LOG_FILE};
use serde::Deserialize;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tokio::fs;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read config file {}: {source}", .path.display())]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Missing required setting: {0}")]
    Missing(&'static str),

    #[error("Sync interval must be a positive number of seconds")]
    InvalidInterval,

    #[error("Hash chunk size must be greater than zero")]
    InvalidChunkSize,

    #[error("Source and replica folders must not contain each other: {} / {}", .source_dir.display(), .replica_dir.display())]
    OverlappingFolders {
        source_dir: PathBuf,
        replica_dir: PathBuf,
    },

    #[error("Failed to create folder {}: {source}", .path.display())]
    CreateFolder {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Settings as they appear in a JSON config file or on the command line.
/// Every field is optional so layers can be merged.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct ConfigLayer {
    pub source: Option<PathBuf>,
    pub replica: Option<PathBuf>,
    pub interval_secs: Option<u64>,
    pub log_file: Option<PathBuf>,
    pub chunk_size: Option<usize>,
}

impl ConfigLayer {
    /// Overlay `other` on top of `self`; values set in `other` win
    pub fn merge(self, other: ConfigLayer) -> ConfigLayer {
        ConfigLayer {
            source: other.source.or(self.source),
            replica: other.replica.or(self.replica),
            interval_secs: other.interval_secs.or(self.interval_secs),
            log_file: other.log_file.or(self.log_file),
            chunk_size: other.chunk_size.or(self.chunk_size),
        }
    }

    /// Fill in defaults and validate
    pub fn resolve(self) -> Result<MirrorConfig, ConfigError> {
        let config = MirrorConfig {
            source: self.source.ok_or(ConfigError::Missing("source folder"))?,
            replica: self.replica.ok_or(ConfigError::Missing("replica folder"))?,
            interval_secs: self
                .interval_secs
                .ok_or(ConfigError::Missing("sync interval"))?,
            log_file: self
                .log_file
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_FILE)),
            chunk_size: self.chunk_size.unwrap_or(DEFAULT_CHUNK_SIZE),
        };
        config.validate()?;
        Ok(config)
    }
}

/// Fully resolved mirror configuration
#[derive(Debug, Clone)]
pub struct MirrorConfig {
    pub source: PathBuf,
    pub replica: PathBuf,
    pub interval_secs: u64,
    pub log_file: PathBuf,
    /// Read size used when hashing files
    pub chunk_size: usize,
}

impl MirrorConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval_secs == 0 {
            return Err(ConfigError::InvalidInterval);
        }
        if self.chunk_size == 0 {
            return Err(ConfigError::InvalidChunkSize);
        }

        let source = absolute_lexical(&self.source);
        let replica = absolute_lexical(&self.replica);
        if source.starts_with(&replica) || replica.starts_with(&source) {
            return Err(ConfigError::OverlappingFolders {
                source_dir: self.source.clone(),
                replica_dir: self.replica.clone(),
            });
        }

        Ok(())
    }
}

/// Read a JSON config file
pub async fn read_config_file(path: &Path) -> Result<ConfigLayer, ConfigError> {
    let content = fs::read_to_string(path)
        .await
        .map_err(|e| ConfigError::IoError {
            path: path.to_path_buf(),
            source: e,
        })?;
    let layer: ConfigLayer = serde_json::from_str(&content)?;
    Ok(layer)
}

/// Create the source and replica folders if they are missing.
///
/// Returns the folders that had to be created.
pub async fn prepare_folders(config: &MirrorConfig) -> Result<Vec<PathBuf>, ConfigError> {
    let mut created = Vec::new();

    for folder in [&config.source, &config.replica] {
        if fs::metadata(folder).await.is_ok() {
            continue;
        }
        fs::create_dir_all(folder)
            .await
            .map_err(|e| ConfigError::CreateFolder {
                path: folder.clone(),
                source: e,
            })?;
        created.push(folder.clone());
    }

    Ok(created)
}

/// Make `path` absolute against the working directory and fold `.`/`..`
/// without touching the filesystem (the folders may not exist yet)
fn absolute_lexical(path: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };

    let mut normalized = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}
