//! Commit log rotation surface consumed by the snapshot driver.

use crate::error::Result;
use std::path::PathBuf;

/// Marker identifying the active commit log segment after a rotation.
///
/// A snapshot is only durable relative to a known log position: replay after
/// a crash restores the snapshot, then re-applies segments from the marker
/// onward. The snapshot driver binds every snapshot session to the marker
/// returned by the rotation that preceded it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitLogFile {
    /// Path of the segment file the log rotated to.
    pub path: PathBuf,

    /// Monotonic index of the segment within the commit log.
    pub index: i64,
}

impl CommitLogFile {
    /// Creates a marker for the segment at `path` with the given index.
    pub fn new(path: impl Into<PathBuf>, index: i64) -> Self {
        Self {
            path: path.into(),
            index,
        }
    }
}

/// Commit log surface consumed by the snapshot driver.
pub trait CommitLog: Send + Sync {
    /// Rotates the log to a fresh segment and returns its marker.
    fn rotate_logs(&self) -> Result<CommitLogFile>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commit_log_file_marker() {
        let marker = CommitLogFile::new("/var/lib/corsac/commitlog/segment-7.log", 7);
        assert_eq!(
            marker.path,
            PathBuf::from("/var/lib/corsac/commitlog/segment-7.log")
        );
        assert_eq!(marker.index, 7);
        assert_eq!(marker, marker.clone());
    }
}
