use super::{read_config_file, ConfigError, ConfigLayer, MirrorConfig};
use clap::Parser;
use std::path::PathBuf;

/// dirmirror - keep a replica folder identical to a source folder
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Folder to mirror from
    #[arg(required_unless_present = "config")]
    pub source: Option<PathBuf>,

    /// Folder to mirror into; files not in the source are deleted here
    #[arg(required_unless_present = "config")]
    pub replica: Option<PathBuf>,

    /// Seconds between sync passes
    #[arg(
        required_unless_present = "config",
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub interval_secs: Option<u64>,

    /// Log file to append events to [default: SyncFile.log]
    #[arg(env = "DIRMIRROR_LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// JSON config file; command-line values override it
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Read size in bytes used when hashing files
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub chunk_size: Option<u64>,

    /// Run a single pass and exit
    #[arg(long)]
    pub once: bool,
}

impl Cli {
    /// Settings given directly on the command line
    pub fn layer(&self) -> ConfigLayer {
        ConfigLayer {
            source: self.source.clone(),
            replica: self.replica.clone(),
            interval_secs: self.interval_secs,
            log_file: self.log_file.clone(),
            chunk_size: self.chunk_size.map(|n| n as usize),
        }
    }

    /// Merge the config file (if any) with command-line values and validate
    pub async fn resolve(&self) -> Result<MirrorConfig, ConfigError> {
        let base = match &self.config {
            Some(path) => read_config_file(path).await?,
            None => ConfigLayer::default(),
        };
        base.merge(self.layer()).resolve()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positional_arguments() {
        let cli = Cli::try_parse_from(["dirmirror", "/src", "/dst", "5", "sync.log"]).unwrap();
        assert_eq!(cli.source, Some(PathBuf::from("/src")));
        assert_eq!(cli.replica, Some(PathBuf::from("/dst")));
        assert_eq!(cli.interval_secs, Some(5));
        assert_eq!(cli.log_file, Some(PathBuf::from("sync.log")));
        assert!(!cli.once);
    }

    #[test]
    fn test_missing_arguments_is_an_error() {
        assert!(Cli::try_parse_from(["dirmirror", "/src", "/dst"]).is_err());
    }

    #[test]
    fn test_non_numeric_interval_is_an_error() {
        assert!(Cli::try_parse_from(["dirmirror", "/src", "/dst", "soon"]).is_err());
    }

    #[test]
    fn test_zero_interval_is_an_error() {
        assert!(Cli::try_parse_from(["dirmirror", "/src", "/dst", "0"]).is_err());
    }

    #[test]
    fn test_config_file_makes_positionals_optional() {
        let cli = Cli::try_parse_from(["dirmirror", "--config", "mirror.json", "--once"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("mirror.json")));
        assert!(cli.once);
        assert_eq!(cli.layer().source, None);
    }

    #[tokio::test]
    async fn test_resolve_merges_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mirror.json");
        std::fs::write(
            &path,
            r#"{"source": "/from-file/src", "replica": "/from-file/dst", "intervalSecs": 60}"#,
        )
        .unwrap();

        let cli = Cli::try_parse_from([
            "dirmirror",
            "--config",
            path.to_str().unwrap(),
            "--chunk-size",
            "512",
        ])
        .unwrap();
        let config = cli.resolve().await.unwrap();

        assert_eq!(config.source, PathBuf::from("/from-file/src"));
        assert_eq!(config.interval_secs, 60);
        assert_eq!(config.chunk_size, 512);
    }
}
