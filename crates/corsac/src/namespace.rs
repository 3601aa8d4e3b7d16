//! Namespace and database capability surfaces consumed by the flush manager.
//!
//! The flush manager never owns series data; it borrows a snapshot of the
//! node's namespace list each tick and drives the per-namespace persistence
//! operations through these traits. Implementations live in the storage
//! layer; tests swap in doubles.

use crate::error::Result;
use crate::persist::{FlushPreparer, IndexPreparer, PersistManager, SnapshotPreparer};
use crate::retention::{RetentionOptions, Timestamp};
use std::fmt;
use std::sync::Arc;

/// Identifier of a namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NamespaceId(String);

impl NamespaceId {
    /// Creates an identifier from a name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NamespaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Per-namespace durability options.
#[derive(Debug, Clone)]
pub struct NamespaceOptions {
    /// Retention policy governing block eligibility.
    pub retention: RetentionOptions,

    /// Whether sealed blocks of this namespace are warm flushed.
    pub flush_enabled: bool,

    /// Whether unsealed blocks of this namespace are snapshotted.
    pub snapshot_enabled: bool,

    /// Whether this namespace maintains an inverted index that needs
    /// flushing after its data is durable.
    pub index_enabled: bool,
}

impl Default for NamespaceOptions {
    fn default() -> Self {
        Self {
            retention: RetentionOptions::default(),
            flush_enabled: true,
            snapshot_enabled: true,
            index_enabled: false,
        }
    }
}

impl NamespaceOptions {
    /// Sets the retention options.
    pub fn with_retention(mut self, retention: RetentionOptions) -> Self {
        self.retention = retention;
        self
    }

    /// Enables or disables warm flushing.
    pub fn with_flush_enabled(mut self, enabled: bool) -> Self {
        self.flush_enabled = enabled;
        self
    }

    /// Enables or disables snapshotting.
    pub fn with_snapshot_enabled(mut self, enabled: bool) -> Self {
        self.snapshot_enabled = enabled;
        self
    }

    /// Enables or disables index flushing.
    pub fn with_index_enabled(mut self, enabled: bool) -> Self {
        self.index_enabled = enabled;
        self
    }
}

/// Capability surface of one namespace.
pub trait Namespace: Send + Sync {
    /// Returns the namespace identifier.
    fn id(&self) -> &NamespaceId;

    /// Returns the namespace options.
    fn options(&self) -> &NamespaceOptions;

    /// Reports whether any series data in `[start, end]` still needs to be
    /// flushed to disk.
    fn needs_flush(&self, start: Timestamp, end: Timestamp) -> Result<bool>;

    /// Seals and persists the in-memory data of the block starting at
    /// `block_start` through the open flush session.
    fn warm_flush(&self, block_start: Timestamp, persist: &dyn FlushPreparer) -> Result<()>;

    /// Writes a crash-recovery checkpoint of unsealed data for the given
    /// block starts (newest first) through the open snapshot session.
    fn snapshot(
        &self,
        block_starts: &[Timestamp],
        now: Timestamp,
        persist: &dyn SnapshotPreparer,
    ) -> Result<()>;

    /// Persists the namespace's inverted index segments through the open
    /// index session.
    fn flush_index(&self, persist: &dyn IndexPreparer) -> Result<()>;
}

/// Database surface the flush manager borrows each tick.
pub trait Database: Send + Sync {
    /// Returns a snapshot of the namespaces this node currently owns.
    fn owned_namespaces(&self) -> Result<Vec<Arc<dyn Namespace>>>;

    /// Returns the node-wide persistence manager.
    fn persist_manager(&self) -> Arc<dyn PersistManager>;
}
