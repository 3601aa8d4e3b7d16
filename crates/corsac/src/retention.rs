//! Retention options and block-aligned flush/snapshot window math.
//!
//! Data on a node lives in fixed-duration blocks aligned to the Unix epoch:
//! the block holding `t` starts at `t - (t mod block_size)`. A namespace's
//! retention options decide, for a given wall-clock time, which block starts
//! are eligible for a warm flush (their write buffer has fully closed) and
//! which must be covered by a crash-recovery snapshot (they may still hold
//! or receive writable data).

use std::time::Duration;

/// Nanoseconds since the Unix epoch.
pub type Timestamp = i64;

/// Default retention period: 2 days.
pub const DEFAULT_RETENTION_PERIOD: Duration = Duration::from_secs(2 * 86_400);

/// Default block size: 2 hours.
pub const DEFAULT_BLOCK_SIZE: Duration = Duration::from_secs(2 * 60 * 60);

/// Default past write buffer: 10 minutes.
pub const DEFAULT_BUFFER_PAST: Duration = Duration::from_secs(10 * 60);

/// Default future write buffer: 10 minutes.
pub const DEFAULT_BUFFER_FUTURE: Duration = Duration::from_secs(10 * 60);

/// Retention policy of one namespace.
///
/// All durations must be positive and `block_size` non-zero. The window
/// functions treat a pre-epoch clock as the epoch: window starts and the
/// snapshot end clamp at zero, and a flush window ending before the epoch
/// is empty.
///
/// # Examples
/// ```rust,ignore
/// use corsac::retention::RetentionOptions;
/// use std::time::Duration;
///
/// let opts = RetentionOptions::default()
///     .with_retention_period(Duration::from_secs(7 * 86_400))
///     .with_block_size(Duration::from_secs(3_600));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetentionOptions {
    /// How long data is kept on the node before it ages out.
    pub retention_period: Duration,

    /// Duration of one block, the unit of immutable on-disk persistence.
    pub block_size: Duration,

    /// How long a block keeps accepting late writes after it ends.
    pub buffer_past: Duration,

    /// How far ahead of now future-dated writes are accepted.
    pub buffer_future: Duration,
}

impl Default for RetentionOptions {
    fn default() -> Self {
        Self {
            retention_period: DEFAULT_RETENTION_PERIOD,
            block_size: DEFAULT_BLOCK_SIZE,
            buffer_past: DEFAULT_BUFFER_PAST,
            buffer_future: DEFAULT_BUFFER_FUTURE,
        }
    }
}

impl RetentionOptions {
    /// Sets the retention period.
    pub fn with_retention_period(mut self, period: Duration) -> Self {
        self.retention_period = period;
        self
    }

    /// Sets the block size.
    pub fn with_block_size(mut self, block_size: Duration) -> Self {
        self.block_size = block_size;
        self
    }

    /// Sets the past write buffer.
    pub fn with_buffer_past(mut self, buffer: Duration) -> Self {
        self.buffer_past = buffer;
        self
    }

    /// Sets the future write buffer.
    pub fn with_buffer_future(mut self, buffer: Duration) -> Self {
        self.buffer_future = buffer;
        self
    }

    /// Returns the block size in nanoseconds.
    pub fn block_size_nanos(&self) -> i64 {
        self.block_size.as_nanos() as i64
    }
}

/// Earliest block start eligible for warm flush at `now`.
///
/// Aligned down from `now - retention_period` and clamped at the epoch:
/// pre-epoch block starts are meaningless on a node whose clock is sane.
pub fn flush_time_start(opts: &RetentionOptions, now: Timestamp) -> Timestamp {
    let start = align(now - opts.retention_period.as_nanos() as i64, opts.block_size_nanos());
    start.max(0)
}

/// Latest block start eligible for warm flush at `now`, inclusive.
///
/// A block `[s, s + block_size)` keeps accepting late writes until
/// `s + block_size + buffer_past`, so the newest sealed block start is
/// `align(now - buffer_past - block_size)`. The result is deliberately not
/// clamped: a value before [`flush_time_start`] denotes an empty window,
/// which is the normal state early in a node's lifetime.
pub fn flush_time_end(opts: &RetentionOptions, now: Timestamp) -> Timestamp {
    let buffer_past = opts.buffer_past.as_nanos() as i64;
    align(
        now - buffer_past - opts.block_size_nanos(),
        opts.block_size_nanos(),
    )
}

/// Latest block start that could hold data writable at `now`, inclusive.
///
/// Future-dated writes land up to `buffer_future` ahead, so snapshots must
/// cover through `align(now + buffer_future)`. Clamped at the epoch like
/// [`flush_time_start`].
pub fn snapshot_time_end(opts: &RetentionOptions, now: Timestamp) -> Timestamp {
    let end = align(
        now + opts.buffer_future.as_nanos() as i64,
        opts.block_size_nanos(),
    );
    end.max(0)
}

/// Warm-flush candidate block starts at `now`, ascending.
///
/// These are the aligned starts from [`flush_time_start`] through
/// [`flush_time_end`]; the per-namespace planner narrows them to the blocks
/// that actually hold unflushed data. Empty when the window is.
///
/// # Examples
/// ```rust,ignore
/// use corsac::retention::{flush_candidates, RetentionOptions};
///
/// let candidates = flush_candidates(&RetentionOptions::default(), now);
/// ```
pub fn flush_candidates(opts: &RetentionOptions, now: Timestamp) -> Vec<Timestamp> {
    block_starts_ascending(
        flush_time_start(opts, now),
        flush_time_end(opts, now),
        opts.block_size_nanos(),
    )
}

/// Snapshot block starts at `now`, newest first.
///
/// Enumerates every aligned start from [`snapshot_time_end`] down to
/// [`flush_time_start`], both inclusive. The descending order is observable:
/// the snapshot layer streams the freshest blocks first so a crash
/// mid-snapshot still preserves the most valuable data. Never empty: both
/// bounds clamp at the epoch, so even a pre-epoch clock covers the epoch
/// block.
pub fn snapshot_block_starts(opts: &RetentionOptions, now: Timestamp) -> Vec<Timestamp> {
    let mut blocks = block_starts_ascending(
        flush_time_start(opts, now),
        snapshot_time_end(opts, now),
        opts.block_size_nanos(),
    );
    blocks.reverse();
    blocks
}

/// Aligned block starts in `[start, end_inclusive]`, ascending.
fn block_starts_ascending(
    start: Timestamp,
    end_inclusive: Timestamp,
    block_nanos: i64,
) -> Vec<Timestamp> {
    if end_inclusive < start {
        return Vec::new();
    }
    let count = ((end_inclusive - start) / block_nanos + 1) as usize;
    let mut blocks = Vec::with_capacity(count);
    let mut current = start;
    while current <= end_inclusive {
        blocks.push(current);
        current += block_nanos;
    }
    blocks
}

fn align(timestamp: Timestamp, block_nanos: i64) -> Timestamp {
    let (quotient, _) = div_floor(timestamp, block_nanos);
    quotient * block_nanos
}

fn div_floor(value: i64, divisor: i64) -> (i64, i64) {
    let mut quotient = value / divisor;
    let mut remainder = value % divisor;
    if remainder < 0 {
        quotient -= 1;
        remainder += divisor;
    }
    (quotient, remainder)
}
