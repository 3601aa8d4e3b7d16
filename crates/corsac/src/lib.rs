//! Corsac - flush orchestration for a time series storage node.
//!
//! A storage node buffers recent writes in memory, appends them to a shared
//! commit log, and periodically persists them as immutable on-disk blocks.
//! This crate provides the coordinator for that pipeline: on every supervisor
//! tick it decides which block ranges are ready to become permanent files,
//! which recent writes need a crash-recovery snapshot, and which inverted
//! indexes must be persisted, then drives those operations in order.
//!
//! # Components
//!
//! - [`FlushManager`]: single-flight tick state machine composing the
//!   warm-flush, snapshot, and index-flush stages
//! - [`RetentionOptions`] and the window math in [`retention`]: which blocks
//!   are eligible for warm flush and snapshot at a given time
//! - [`Namespace`] / [`Database`]: capability traits over the node's storage
//! - [`PersistManager`]: scoped persistence sessions, one active per kind
//! - [`CommitLog`]: rotation markers that make snapshots replayable
//!
//! # Example
//!
//! ```rust,ignore
//! use corsac::FlushManager;
//!
//! let manager = FlushManager::new(database, commit_log, &registry);
//!
//! // Driven periodically by the node supervisor.
//! if let Err(err) = manager.flush(now) {
//!     tracing::warn!("flush tick failed: {}", err);
//! }
//! ```

#![deny(missing_docs)]

pub mod commitlog;
pub mod error;
pub mod flush;
pub mod metrics;
pub mod namespace;
pub mod persist;
pub mod retention;

pub use commitlog::{CommitLog, CommitLogFile};
pub use error::{FlushError, MultiError, Result};
pub use flush::FlushManager;
pub use namespace::{Database, Namespace, NamespaceId, NamespaceOptions};
pub use persist::{
    FlushPreparer, IndexPreparer, PersistManager, SessionKind, SnapshotPreparer,
};
pub use retention::{RetentionOptions, Timestamp};
