//! Prometheus counters for the worker loops, gathered by
//! [`crate::telemetry::serve`]'s `/metrics` handler.

use prometheus::{IntCounter, IntCounterVec, Opts, Registry};

/// Per-worker-loop counters, registered into one shared [`Registry`].
pub struct Metrics {
    pub registry: std::sync::Arc<Registry>,
    pub monitor_processes_synced: IntCounter,
    pub tick_errors: IntCounterVec,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let monitor_processes_synced = IntCounter::new(
            "sequencer_monitor_processes_synced_total",
            "Process records created or updated by the Process Monitor",
        )
        .expect("metric name and help are valid");
        registry
            .register(Box::new(monitor_processes_synced.clone()))
            .expect("metric registered exactly once");

        let tick_errors = IntCounterVec::new(
            Opts::new("sequencer_worker_tick_errors_total", "Tick errors by worker"),
            &["worker"],
        )
        .expect("metric name and help are valid");
        registry
            .register(Box::new(tick_errors.clone()))
            .expect("metric registered exactly once");

        Self {
            registry: std::sync::Arc::new(registry),
            monitor_processes_synced,
            tick_errors,
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
