//! Error and Result types for flush orchestration.

use crate::namespace::NamespaceId;
use crate::persist::SessionKind;
use crate::retention::Timestamp;
use std::fmt;
use thiserror::Error;

/// A convenience `Result` type for flush operations.
pub type Result<T> = std::result::Result<T, FlushError>;

/// The error type for flush operations.
#[derive(Debug, Error)]
pub enum FlushError {
    /// A flush tick is already running; callers may retry on the next tick.
    #[error("flush already in progress")]
    InProgress,

    /// Commit log rotation failed; the snapshot stage was aborted.
    #[error("cannot rotate commit log: {source}")]
    CommitLogRotation {
        /// Underlying rotation failure.
        source: Box<FlushError>,
    },

    /// A persist session of the given kind is already active.
    #[error("{kind} persist session already active")]
    SessionActive {
        /// Kind of session that was double-started.
        kind: SessionKind,
    },

    /// Flush-time planning failed for a namespace.
    #[error("namespace {namespace} failed to compute flush times: {source}")]
    NamespaceFlushTimes {
        /// Namespace whose plan failed.
        namespace: NamespaceId,
        /// Underlying probe failure.
        source: Box<FlushError>,
    },

    /// Warm flush of one block failed for a namespace.
    #[error("namespace {namespace} failed to warm flush block {block_start}: {source}")]
    NamespaceWarmFlush {
        /// Namespace whose block failed to flush.
        namespace: NamespaceId,
        /// Start of the failed block, in nanoseconds since the epoch.
        block_start: Timestamp,
        /// Underlying flush failure.
        source: Box<FlushError>,
    },

    /// Snapshot failed for a namespace.
    #[error("namespace {namespace} failed to snapshot data: {source}")]
    NamespaceSnapshot {
        /// Namespace whose snapshot failed.
        namespace: NamespaceId,
        /// Underlying snapshot failure.
        source: Box<FlushError>,
    },

    /// Index flush failed for a namespace.
    #[error("namespace {namespace} failed to flush index: {source}")]
    NamespaceIndexFlush {
        /// Namespace whose index flush failed.
        namespace: NamespaceId,
        /// Underlying index persistence failure.
        source: Box<FlushError>,
    },

    /// Several errors accumulated over a stage or tick.
    #[error(transparent)]
    Multiple(MultiError),

    /// Failure reported by a storage collaborator.
    #[error("{0}")]
    Storage(String),
}

/// Accumulates errors across blocks, namespaces, and stages.
///
/// A tick must keep going when one block or one namespace fails, so drivers
/// collect failures here and convert the batch into a single result at the
/// end. Each leaf message survives verbatim in the joined `Display` output.
#[derive(Debug, Default)]
pub struct MultiError {
    errors: Vec<FlushError>,
}

impl MultiError {
    /// Creates an empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an error.
    pub fn push(&mut self, err: FlushError) {
        self.errors.push(err);
    }

    /// Records the error of `result`, if any.
    pub fn add(&mut self, result: Result<()>) {
        if let Err(err) = result {
            self.errors.push(err);
        }
    }

    /// Returns true if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns the number of recorded errors.
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Collapses the accumulator into a result.
    ///
    /// Empty becomes `Ok(())` and a single recorded error is returned as
    /// itself, so callers observing one failure see it unwrapped.
    pub fn final_error(self) -> Result<()> {
        let mut errors = self.errors;
        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(FlushError::Multiple(MultiError { errors })),
        }
    }
}

impl fmt::Display for MultiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.errors.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{}", err)?;
        }
        Ok(())
    }
}

impl std::error::Error for MultiError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_final_error_empty_is_ok() {
        let errors = MultiError::new();
        assert!(errors.is_empty());
        assert!(errors.final_error().is_ok());
    }

    #[test]
    fn test_final_error_single_unwraps() {
        let mut errors = MultiError::new();
        errors.push(FlushError::Storage("boom".to_string()));
        let err = errors.final_error().unwrap_err();
        assert_eq!(err.to_string(), "boom");
    }

    #[test]
    fn test_final_error_multiple_joins_messages() {
        let mut errors = MultiError::new();
        errors.push(FlushError::Storage("first failure".to_string()));
        errors.push(FlushError::InProgress);
        let err = errors.final_error().unwrap_err();
        let message = err.to_string();
        assert!(message.contains("first failure"));
        assert!(message.contains("flush already in progress"));
        assert!(message.contains("; "));
    }

    #[test]
    fn test_add_records_only_errors() {
        let mut errors = MultiError::new();
        errors.add(Ok(()));
        errors.add(Err(FlushError::Storage("bad".to_string())));
        errors.add(Ok(()));
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_wrapped_error_preserves_leaf_message() {
        let err = FlushError::NamespaceSnapshot {
            namespace: NamespaceId::new("metrics"),
            source: Box::new(FlushError::Storage("disk unplugged".to_string())),
        };
        let message = err.to_string();
        assert!(message.contains("metrics"));
        assert!(message.contains("disk unplugged"));
    }
}
