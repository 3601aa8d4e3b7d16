//! Persistence session surfaces for the three flush pipelines.
//!
//! Sessions are process-wide singletons per kind: `start_*` fails with
//! [`crate::FlushError::SessionActive`] while a session of that kind is
//! open, and every successful start must be paired with exactly one
//! matching `done_*` call, on every exit path. The flush manager never
//! holds more than one session at a time.

use crate::commitlog::CommitLogFile;
use crate::error::Result;
use crate::retention::Timestamp;
use std::fmt;

/// Kind of persistence session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionKind {
    /// Warm flush of sealed blocks.
    Flush,
    /// Crash-recovery snapshot of unsealed blocks.
    Snapshot,
    /// Inverted index persistence.
    Index,
}

impl fmt::Display for SessionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SessionKind::Flush => "flush",
            SessionKind::Snapshot => "snapshot",
            SessionKind::Index => "index",
        })
    }
}

/// Handle to an open warm-flush session.
pub trait FlushPreparer: Send + Sync {
    /// Closes the session.
    fn done_flush(&self) -> Result<()>;
}

/// Handle to an open snapshot session.
pub trait SnapshotPreparer: Send + Sync {
    /// Closes the session, recording that snapshots taken at `now` are
    /// superseded by commit log segments from `marker` onward.
    fn done_snapshot(&self, now: Timestamp, marker: &CommitLogFile) -> Result<()>;
}

/// Handle to an open index-persist session.
pub trait IndexPreparer: Send + Sync {
    /// Closes the session.
    fn done_index(&self) -> Result<()>;
}

/// Node-wide persistence manager handing out sessions.
pub trait PersistManager: Send + Sync {
    /// Opens the warm-flush session.
    fn start_flush_persist(&self) -> Result<Box<dyn FlushPreparer>>;

    /// Opens the snapshot session against a rotated commit log `marker`.
    fn start_snapshot_persist(&self, marker: &CommitLogFile) -> Result<Box<dyn SnapshotPreparer>>;

    /// Opens the index-persist session.
    fn start_index_persist(&self) -> Result<Box<dyn IndexPreparer>>;
}
