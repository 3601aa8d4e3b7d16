//! Prometheus instrumentation for the flush manager.

use prometheus::{Histogram, HistogramOpts, IntCounter, IntGauge, Opts, Registry};
use std::fmt;

/// Histogram buckets (seconds) for stage durations. Stages finish in
/// milliseconds on an idle node and can run for minutes under write load.
const STAGE_DURATION_BUCKETS: &[f64] = &[0.005, 0.05, 0.25, 1.0, 5.0, 15.0, 60.0, 300.0, 900.0];

/// Metrics for one flush manager instance.
pub struct FlushMetrics {
    /// 1 while the warm-flush stage is running.
    pub flush_in_progress: IntGauge,

    /// 1 while the snapshot stage is running.
    pub snapshot_in_progress: IntGauge,

    /// 1 while the index-flush stage is running.
    pub index_flush_in_progress: IntGauge,

    /// Ticks that ran the pipeline (rejected concurrent calls not counted).
    pub ticks: IntCounter,

    /// Ticks that finished with at least one error.
    pub tick_errors: IntCounter,

    /// Warm-flush stage duration in seconds.
    pub flush_duration_secs: Histogram,

    /// Snapshot stage duration in seconds.
    pub snapshot_duration_secs: Histogram,

    /// Index-flush stage duration in seconds.
    pub index_flush_duration_secs: Histogram,
}

// Manual Debug impl because prometheus types don't derive Debug.
impl fmt::Debug for FlushMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlushMetrics").finish_non_exhaustive()
    }
}

impl FlushMetrics {
    /// Creates the metric set and registers it with `registry`.
    pub fn new(registry: &Registry) -> Self {
        let flush_in_progress = IntGauge::with_opts(Opts::new(
            "corsac_flush_in_progress",
            "Warm-flush stage currently running",
        ))
        .expect("flush_in_progress gauge");
        let snapshot_in_progress = IntGauge::with_opts(Opts::new(
            "corsac_snapshot_in_progress",
            "Snapshot stage currently running",
        ))
        .expect("snapshot_in_progress gauge");
        let index_flush_in_progress = IntGauge::with_opts(Opts::new(
            "corsac_index_flush_in_progress",
            "Index-flush stage currently running",
        ))
        .expect("index_flush_in_progress gauge");

        let ticks = IntCounter::with_opts(Opts::new(
            "corsac_flush_ticks_total",
            "Flush ticks that ran the pipeline",
        ))
        .expect("ticks counter");
        let tick_errors = IntCounter::with_opts(Opts::new(
            "corsac_flush_tick_errors_total",
            "Flush ticks that finished with errors",
        ))
        .expect("tick_errors counter");

        let flush_duration_secs = Histogram::with_opts(
            HistogramOpts::new(
                "corsac_flush_duration_seconds",
                "Warm-flush stage duration in seconds",
            )
            .buckets(STAGE_DURATION_BUCKETS.to_vec()),
        )
        .expect("flush_duration histogram");
        let snapshot_duration_secs = Histogram::with_opts(
            HistogramOpts::new(
                "corsac_snapshot_duration_seconds",
                "Snapshot stage duration in seconds",
            )
            .buckets(STAGE_DURATION_BUCKETS.to_vec()),
        )
        .expect("snapshot_duration histogram");
        let index_flush_duration_secs = Histogram::with_opts(
            HistogramOpts::new(
                "corsac_index_flush_duration_seconds",
                "Index-flush stage duration in seconds",
            )
            .buckets(STAGE_DURATION_BUCKETS.to_vec()),
        )
        .expect("index_flush_duration histogram");

        registry
            .register(Box::new(flush_in_progress.clone()))
            .expect("register flush_in_progress");
        registry
            .register(Box::new(snapshot_in_progress.clone()))
            .expect("register snapshot_in_progress");
        registry
            .register(Box::new(index_flush_in_progress.clone()))
            .expect("register index_flush_in_progress");
        registry
            .register(Box::new(ticks.clone()))
            .expect("register ticks");
        registry
            .register(Box::new(tick_errors.clone()))
            .expect("register tick_errors");
        registry
            .register(Box::new(flush_duration_secs.clone()))
            .expect("register flush_duration");
        registry
            .register(Box::new(snapshot_duration_secs.clone()))
            .expect("register snapshot_duration");
        registry
            .register(Box::new(index_flush_duration_secs.clone()))
            .expect("register index_flush_duration");

        Self {
            flush_in_progress,
            snapshot_in_progress,
            index_flush_in_progress,
            ticks,
            tick_errors,
            flush_duration_secs,
            snapshot_duration_secs,
            index_flush_duration_secs,
        }
    }
}
