//! Observability: metrics and tracing.
//!
//! ## Metrics
//!
//! filterhost exposes the following metrics:
//!
//! | Metric | Type | Description |
//! |--------|------|-------------|
//! | `filterhost_plugins_discovered` | Counter | Records produced by catalog scans |
//! | `filterhost_runs_started` | Counter | Filter runs started |
//! | `filterhost_runs_failed` | Counter | Filter runs that ended in an error |
//! | `filterhost_runs_cancelled` | Counter | Filter runs cancelled by the user |
//! | `filterhost_tiles_delivered` | Counter | Tiles provisioned to filters |
//! | `filterhost_suite_allocation_failures` | Counter | Suite allocations that ran out of memory |
//! | `filterhost_run_time_ns` | Histogram | Wall time of a filter run |
//!
//! ## Tracing
//!
//! Runs are wrapped in a `filter_run` span and each selector call in a
//! `filter_phase` span. Suites log their arguments at trace level.
//!
//! ## Example
//!
//! ```rust,ignore
//! use filterhost::observability::init_metrics;
//!
//! // Describe metrics once at startup, then install any exporter.
//! init_metrics();
//! ```

mod metrics;
mod tracing_support;

pub use metrics::{
    RunMetrics, init_metrics, record_plugins_discovered, record_suite_allocation_failure,
    record_tiles_delivered,
};
pub use tracing_support::{span_phase, span_run};
