//! Metrics collection using metrics-rs.

use metrics::{Unit, counter, histogram};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

/// Whether metrics have been initialized.
static METRICS_INITIALIZED: AtomicBool = AtomicBool::new(false);

const PLUGINS_DISCOVERED: &str = "filterhost_plugins_discovered";
const RUNS_STARTED: &str = "filterhost_runs_started";
const RUNS_FAILED: &str = "filterhost_runs_failed";
const RUNS_CANCELLED: &str = "filterhost_runs_cancelled";
const TILES_DELIVERED: &str = "filterhost_tiles_delivered";
const SUITE_ALLOCATION_FAILURES: &str = "filterhost_suite_allocation_failures";
const RUN_TIME_NS: &str = "filterhost_run_time_ns";

/// Initialize metrics descriptions.
///
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init_metrics() {
    if METRICS_INITIALIZED.swap(true, Ordering::SeqCst) {
        return;
    }

    metrics::describe_counter!(
        PLUGINS_DISCOVERED,
        Unit::Count,
        "Plugin records produced by catalog scans"
    );
    metrics::describe_counter!(RUNS_STARTED, Unit::Count, "Filter runs started");
    metrics::describe_counter!(RUNS_FAILED, Unit::Count, "Filter runs that ended in an error");
    metrics::describe_counter!(RUNS_CANCELLED, Unit::Count, "Filter runs cancelled by the user");
    metrics::describe_counter!(TILES_DELIVERED, Unit::Count, "Tiles provisioned to filters");
    metrics::describe_counter!(
        SUITE_ALLOCATION_FAILURES,
        Unit::Count,
        "Suite allocations that ran out of memory"
    );
    metrics::describe_histogram!(RUN_TIME_NS, Unit::Nanoseconds, "Wall time of a filter run");
}

/// Record records produced by a catalog scan.
#[inline]
pub fn record_plugins_discovered(count: usize) {
    counter!(PLUGINS_DISCOVERED).increment(count as u64);
}

/// Record a suite allocation that failed.
#[inline]
pub fn record_suite_allocation_failure(suite: &'static str) {
    counter!(SUITE_ALLOCATION_FAILURES, "suite" => suite).increment(1);
}

/// Record tiles handed to a filter.
#[inline]
pub fn record_tiles_delivered(plugin: &str, count: u64) {
    counter!(TILES_DELIVERED, "plugin" => plugin.to_string()).increment(count);
}

/// Per-run metrics with the plugin label applied.
///
/// Counts the run as started on creation; call exactly one of the
/// finishing methods.
#[derive(Debug)]
pub struct RunMetrics {
    plugin: String,
    started: Instant,
}

impl RunMetrics {
    /// Start recording a run of `plugin`.
    pub fn start(plugin: &str) -> Self {
        counter!(RUNS_STARTED, "plugin" => plugin.to_string()).increment(1);
        Self {
            plugin: plugin.to_string(),
            started: Instant::now(),
        }
    }

    fn elapsed(&self) {
        histogram!(RUN_TIME_NS, "plugin" => self.plugin.clone())
            .record(self.started.elapsed().as_nanos() as f64);
    }

    /// The run completed.
    pub fn succeeded(self) {
        self.elapsed();
    }

    /// The run failed.
    pub fn failed(self) {
        self.elapsed();
        counter!(RUNS_FAILED, "plugin" => self.plugin).increment(1);
    }

    /// The user cancelled the run.
    pub fn cancelled(self) {
        self.elapsed();
        counter!(RUNS_CANCELLED, "plugin" => self.plugin).increment(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_metrics_idempotent() {
        init_metrics();
        init_metrics();
        assert!(METRICS_INITIALIZED.load(Ordering::SeqCst));
    }

    #[test]
    fn test_recording_without_recorder() {
        record_plugins_discovered(3);
        record_suite_allocation_failure("handle");
        let run = RunMetrics::start("Blur");
        run.cancelled();
    }
}
