//! Flush manager: single-flight tick orchestration across the warm-flush,
//! snapshot, and index-flush stages.
//!
//! # Tick anatomy
//!
//! ```text
//! flush(now)
//!   warm flush    seal and persist every block whose write buffer closed
//!   snapshot      rotate the commit log, checkpoint unsealed blocks newest first
//!   index flush   persist inverted indexes whose data is durable on disk
//! ```
//!
//! Stages always run in this order and every stage runs even when an earlier
//! one failed; errors accumulate and surface as one aggregate per tick. The
//! per-namespace order `warm_flush`, then `snapshot`, then `flush_index` is
//! what keeps in-memory series data alive until the index entries pointing
//! at it have reached disk.

use crate::commitlog::CommitLog;
use crate::error::{FlushError, MultiError, Result};
use crate::metrics::FlushMetrics;
use crate::namespace::{Database, Namespace, NamespaceId};
use crate::persist::PersistManager;
use crate::retention::{self, Timestamp};
use prometheus::Registry;
use std::collections::HashSet;
use std::sync::atomic::{AtomicI64, AtomicU8, Ordering};
use std::sync::Arc;
use tracing::{debug, error};

/// Gate states of the tick pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
enum ManagerState {
    Idle = 0,
    Flushing = 1,
    Snapshotting = 2,
    IndexFlushing = 3,
}

/// Sentinel for "no successful snapshot since process start".
const NO_SNAPSHOT: i64 = -1;

/// Coordinates the durability pipeline of a storage node.
///
/// One instance exists per node, created before the supervisor starts
/// ticking and dropped at shutdown once no tick is in flight. [`flush`]
/// is strictly serial: a call arriving while a tick runs is rejected with
/// [`FlushError::InProgress`] without queueing or touching any state.
///
/// [`flush`]: FlushManager::flush
pub struct FlushManager {
    database: Arc<dyn Database>,
    commit_log: Arc<dyn CommitLog>,
    persist_manager: Arc<dyn PersistManager>,
    state: AtomicU8,
    last_successful_snapshot: AtomicI64,
    metrics: FlushMetrics,
}

/// Per-stage record of which namespaces completed and what failed.
#[derive(Default)]
struct StageOutcome {
    completed: HashSet<NamespaceId>,
    errors: MultiError,
}

/// Resets the gate to idle when a tick unwinds, normally or otherwise.
struct GateReset<'a> {
    state: &'a AtomicU8,
}

impl Drop for GateReset<'_> {
    fn drop(&mut self) {
        self.state.store(ManagerState::Idle as u8, Ordering::Release);
    }
}

impl FlushManager {
    /// Creates a flush manager over the node's database and commit log,
    /// registering its metrics with `registry`.
    ///
    /// # Examples
    /// ```rust,ignore
    /// use corsac::FlushManager;
    /// use prometheus::Registry;
    ///
    /// let manager = FlushManager::new(database, commit_log, &Registry::new());
    /// ```
    pub fn new(
        database: Arc<dyn Database>,
        commit_log: Arc<dyn CommitLog>,
        registry: &Registry,
    ) -> Self {
        let persist_manager = database.persist_manager();
        Self {
            database,
            commit_log,
            persist_manager,
            state: AtomicU8::new(ManagerState::Idle as u8),
            last_successful_snapshot: AtomicI64::new(NO_SNAPSHOT),
            metrics: FlushMetrics::new(registry),
        }
    }

    /// Runs one durability tick at `now`.
    ///
    /// Blocks for the full duration of the tick, which can be many seconds
    /// while namespaces write blocks. Returns the aggregate of every error
    /// the stages accumulated; partial failures never stop later stages.
    /// The only fatal early exits are a concurrent tick
    /// ([`FlushError::InProgress`]) and a failed namespace enumeration.
    ///
    /// A `now` before the epoch is treated as the epoch.
    pub fn flush(&self, now: Timestamp) -> Result<()> {
        let now = now.max(0);
        if self
            .state
            .compare_exchange(
                ManagerState::Idle as u8,
                ManagerState::Flushing as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_err()
        {
            return Err(FlushError::InProgress);
        }
        let _gate = GateReset { state: &self.state };

        let namespaces = self.database.owned_namespaces()?;
        debug!(
            "Flush tick at {} across {} namespaces",
            now,
            namespaces.len()
        );

        let mut errors = MultiError::new();

        let warm = self.warm_flush(&namespaces, now);
        errors.add(warm.errors.final_error());

        self.set_state(ManagerState::Snapshotting);
        let snapshot = self.snapshot(&namespaces, now);
        let snapshot_ok = snapshot.errors.is_empty();
        errors.add(snapshot.errors.final_error());
        if snapshot_ok {
            self.last_successful_snapshot.store(now, Ordering::Release);
        }

        self.set_state(ManagerState::IndexFlushing);
        let mut eligible = warm.completed;
        eligible.retain(|id| snapshot.completed.contains(id));
        errors.add(self.index_flush(&namespaces, &eligible).final_error());

        self.metrics.ticks.inc();
        if !errors.is_empty() {
            self.metrics.tick_errors.inc();
        }
        errors.final_error()
    }

    /// Returns the start time of the last tick whose snapshot stage fully
    /// succeeded, or `None` if none has since process start.
    ///
    /// Safe to call concurrently with a running tick; health endpoints poll
    /// this to detect a node that has stopped checkpointing.
    pub fn last_successful_snapshot_start_time(&self) -> Option<Timestamp> {
        match self.last_successful_snapshot.load(Ordering::Acquire) {
            NO_SNAPSHOT => None,
            time => Some(time),
        }
    }

    /// Exports the currently running stage as in-progress gauges.
    ///
    /// Intended to be called periodically by the node's metrics reporter.
    pub fn report(&self) {
        let state = self.state.load(Ordering::Acquire);
        self.metrics
            .flush_in_progress
            .set((state == ManagerState::Flushing as u8) as i64);
        self.metrics
            .snapshot_in_progress
            .set((state == ManagerState::Snapshotting as u8) as i64);
        self.metrics
            .index_flush_in_progress
            .set((state == ManagerState::IndexFlushing as u8) as i64);
    }

    fn set_state(&self, state: ManagerState) {
        self.state.store(state as u8, Ordering::Release);
    }

    /// Warm-flush stage: seal and persist every block whose write buffer has
    /// closed, for every flush-enabled namespace.
    ///
    /// One bad block must not block other blocks or other namespaces, so
    /// per-block failures accumulate and the loop continues. The session is
    /// closed unconditionally and its error joins the stage aggregate.
    fn warm_flush(&self, namespaces: &[Arc<dyn Namespace>], now: Timestamp) -> StageOutcome {
        let mut out = StageOutcome::default();
        let _timer = self.metrics.flush_duration_secs.start_timer();

        let flush_persist = match self.persist_manager.start_flush_persist() {
            Ok(preparer) => preparer,
            Err(err) => {
                out.errors.push(err);
                return out;
            }
        };

        for ns in namespaces {
            if !ns.options().flush_enabled {
                // Opted out: nothing can be pending, so the namespace still
                // counts as flushed for index eligibility.
                out.completed.insert(ns.id().clone());
                continue;
            }
            let flush_times = match namespace_flush_times(ns.as_ref(), now) {
                Ok(times) => times,
                Err(err) => {
                    error!(
                        "Flush planning failed for namespace {}: {:?}",
                        ns.id(),
                        err
                    );
                    out.errors.push(FlushError::NamespaceFlushTimes {
                        namespace: ns.id().clone(),
                        source: Box::new(err),
                    });
                    continue;
                }
            };
            debug!(
                "Warm flushing namespace {} ({} blocks)",
                ns.id(),
                flush_times.len()
            );
            for block_start in flush_times {
                if let Err(err) = ns.warm_flush(block_start, flush_persist.as_ref()) {
                    error!(
                        "Warm flush failed for namespace {} block {}: {:?}",
                        ns.id(),
                        block_start,
                        err
                    );
                    out.errors.push(FlushError::NamespaceWarmFlush {
                        namespace: ns.id().clone(),
                        block_start,
                        source: Box::new(err),
                    });
                }
            }
            // Failed blocks are retried next tick; they do not make the
            // namespace ineligible for index flush.
            out.completed.insert(ns.id().clone());
        }

        out.errors.add(flush_persist.done_flush());
        out
    }

    /// Snapshot stage: rotate the commit log once, then checkpoint every
    /// snapshot-enabled namespace against the rotation marker.
    ///
    /// A failed rotation aborts the whole stage: a snapshot without a
    /// matching log marker could never be replayed consistently.
    fn snapshot(&self, namespaces: &[Arc<dyn Namespace>], now: Timestamp) -> StageOutcome {
        let mut out = StageOutcome::default();
        let _timer = self.metrics.snapshot_duration_secs.start_timer();

        let marker = match self.commit_log.rotate_logs() {
            Ok(marker) => marker,
            Err(err) => {
                out.errors.push(FlushError::CommitLogRotation {
                    source: Box::new(err),
                });
                return out;
            }
        };
        debug!(
            "Rotated commit log to {} (segment {})",
            marker.path.display(),
            marker.index
        );

        let snapshot_persist = match self.persist_manager.start_snapshot_persist(&marker) {
            Ok(preparer) => preparer,
            Err(err) => {
                out.errors.push(err);
                return out;
            }
        };

        for ns in namespaces {
            if !ns.options().snapshot_enabled {
                out.completed.insert(ns.id().clone());
                continue;
            }
            let block_starts = retention::snapshot_block_starts(&ns.options().retention, now);
            debug!(
                "Snapshotting namespace {} ({} blocks)",
                ns.id(),
                block_starts.len()
            );
            match ns.snapshot(&block_starts, now, snapshot_persist.as_ref()) {
                Ok(()) => {
                    out.completed.insert(ns.id().clone());
                }
                Err(err) => {
                    error!("Snapshot failed for namespace {}: {:?}", ns.id(), err);
                    out.errors.push(FlushError::NamespaceSnapshot {
                        namespace: ns.id().clone(),
                        source: Box::new(err),
                    });
                }
            }
        }

        out.errors.add(snapshot_persist.done_snapshot(now, &marker));
        out
    }

    /// Index-flush stage: persist inverted indexes for every index-enabled
    /// namespace whose warm flush and snapshot both completed this tick, so
    /// the data the index points at is already durable.
    fn index_flush(
        &self,
        namespaces: &[Arc<dyn Namespace>],
        eligible: &HashSet<NamespaceId>,
    ) -> MultiError {
        let mut errors = MultiError::new();
        let _timer = self.metrics.index_flush_duration_secs.start_timer();

        let index_persist = match self.persist_manager.start_index_persist() {
            Ok(preparer) => preparer,
            Err(err) => {
                errors.push(err);
                return errors;
            }
        };

        for ns in namespaces {
            if !ns.options().index_enabled {
                continue;
            }
            if !eligible.contains(ns.id()) {
                // Data the index would point at is not durable yet; retried
                // once a later tick completes both prior stages.
                debug!("Skipping index flush for namespace {}", ns.id());
                continue;
            }
            if let Err(err) = ns.flush_index(index_persist.as_ref()) {
                error!("Index flush failed for namespace {}: {:?}", ns.id(), err);
                errors.push(FlushError::NamespaceIndexFlush {
                    namespace: ns.id().clone(),
                    source: Box::new(err),
                });
            }
        }

        errors.add(index_persist.done_index());
        errors
    }
}

/// Returns the ascending block starts of `ns` that still need a warm flush.
///
/// Probes every candidate in the flush window with `needs_flush`; the first
/// probe error aborts the plan for this namespace, so a half-built list is
/// never acted on.
fn namespace_flush_times(ns: &dyn Namespace, now: Timestamp) -> Result<Vec<Timestamp>> {
    let mut times = Vec::new();
    for block_start in retention::flush_candidates(&ns.options().retention, now) {
        if ns.needs_flush(block_start, block_start)? {
            times.push(block_start);
        }
    }
    Ok(times)
}
