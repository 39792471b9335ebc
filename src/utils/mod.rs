mod hash;

pub use hash::{compute_file_hash, DEFAULT_CHUNK_SIZE};

use chrono::{DateTime, Utc};
use std::path::{Component, Path};

/// Default log file name when none is configured
pub const DEFAULT_LOG_FILE: &str = "SyncFile.log";

/// Suffix of the temporary files the executor writes before renaming into place
pub const TEMP_SUFFIX: &str = ".dirmirror-tmp";

/// Format a timestamp the way log lines are stamped (`2024-05-01 12:00:00Z`)
pub fn format_log_time(time: DateTime<Utc>) -> String {
    time.format("%Y-%m-%d %H:%M:%SZ").to_string()
}

/// Render a relative path with forward slashes regardless of platform
pub fn display_relative(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_log_time() {
        let time = Utc.with_ymd_and_hms(2024, 5, 1, 8, 3, 9).unwrap();
        assert_eq!(format_log_time(time), "2024-05-01 08:03:09Z");
    }

    #[test]
    fn test_display_relative_uses_forward_slashes() {
        let path = Path::new("docs").join("nested").join("a.txt");
        assert_eq!(display_relative(&path), "docs/nested/a.txt");
    }
}
