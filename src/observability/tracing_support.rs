//! Spans for filter runs.

use tracing::{Level, Span, span};

/// Span covering one filter run.
///
/// # Example
///
/// ```rust,ignore
/// use filterhost::observability::span_run;
///
/// let span = span_run("Blur", "Gaussian Blur");
/// let _guard = span.enter();
/// ```
#[inline]
pub fn span_run(category: &str, title: &str) -> Span {
    span!(Level::INFO, "filter_run", category = %category, title = %title)
}

/// Span covering one selector call.
#[inline]
pub fn span_phase(selector: crate::abi::Selector) -> Span {
    span!(Level::DEBUG, "filter_phase", selector = ?selector)
}
