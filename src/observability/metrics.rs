//! Metrics collection.
//!
//! Prometheus-compatible metrics with label cardinality protection and
//! typed convenience functions for recording measurements.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::error::StagecueError;

/// Guard to prevent double-initialization of the metrics recorder.
static METRICS_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Maximum length for phase id labels.
///
/// Phase ids come from user config and are used directly as Prometheus
/// labels. This caps the label length to prevent cardinality issues.
const MAX_PHASE_LABEL_LEN: usize = 64;

/// Initializes the global metrics recorder.
///
/// When `port` is `Some`, a Prometheus HTTP listener is started on
/// `127.0.0.1:<port>`. When `None`, the recorder is installed without an
/// HTTP endpoint.
///
/// # Errors
///
/// Returns `StagecueError::Io` if the recorder or HTTP listener cannot
/// be installed (e.g. port already in use).
pub fn init_metrics(port: Option<u16>) -> Result<(), StagecueError> {
    if METRICS_INITIALIZED.swap(true, Ordering::SeqCst) {
        tracing::debug!("metrics already initialized, skipping");
        return Ok(());
    }
    port.map_or_else(
        || PrometheusBuilder::new().install_recorder().map(|_| ()),
        |p| {
            PrometheusBuilder::new()
                .with_http_listener(([127, 0, 0, 1], p))
                .install()
        },
    )
    .map_err(|e| StagecueError::Io(std::io::Error::other(e.to_string())))?;

    describe_metrics();
    Ok(())
}

/// Registers metric descriptions with the global recorder.
fn describe_metrics() {
    describe_counter!(
        "stagecue_sub_steps_total",
        "Total number of sub-steps advanced"
    );
    describe_counter!(
        "stagecue_fallback_lines_total",
        "Log lines substituted after a line source failure"
    );
    describe_counter!(
        "stagecue_runs_settled_total",
        "Runs settled, by terminal status"
    );
    describe_gauge!("stagecue_progress_percent", "Latest published progress");
    describe_histogram!(
        "stagecue_run_duration_ms",
        "Wall-clock run duration in milliseconds"
    );
}

/// Records a completed sub-step for a phase.
pub fn record_sub_step(phase_id: &str) {
    counter!("stagecue_sub_steps_total", "phase" => sanitize_phase_label(phase_id)).increment(1);
}

/// Records a fallback-line substitution for a phase.
pub fn record_fallback(phase_id: &str) {
    counter!("stagecue_fallback_lines_total", "phase" => sanitize_phase_label(phase_id))
        .increment(1);
}

/// Records a run settlement by terminal status.
pub fn record_run_settled(status: &'static str) {
    counter!("stagecue_runs_settled_total", "status" => status).increment(1);
}

/// Sets the latest published progress percentage.
pub fn set_progress(percent: f64) {
    gauge!("stagecue_progress_percent").set(percent);
}

/// Records a run's wall-clock duration.
pub fn record_run_duration(duration: Duration) {
    histogram!("stagecue_run_duration_ms").record(duration.as_secs_f64() * 1000.0);
}

/// Sanitizes a phase id for use as a metrics label.
///
/// Truncates to [`MAX_PHASE_LABEL_LEN`] characters and replaces any
/// characters invalid in Prometheus labels with underscores.
fn sanitize_phase_label(id: &str) -> String {
    id.chars()
        .take(MAX_PHASE_LABEL_LEN)
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_keeps_safe_chars() {
        assert_eq!(sanitize_phase_label("preflight-2"), "preflight-2");
    }

    #[test]
    fn sanitize_replaces_unsafe_chars() {
        assert_eq!(sanitize_phase_label("a b/c"), "a_b_c");
    }

    #[test]
    fn sanitize_truncates_long_ids() {
        let long = "x".repeat(10_000);
        assert_eq!(sanitize_phase_label(&long).len(), MAX_PHASE_LABEL_LEN);
    }

    #[test]
    fn record_functions_do_not_panic_without_recorder() {
        // metrics macros silently no-op when no global recorder is installed
        record_sub_step("preflight");
        record_fallback("preflight");
        record_run_settled("completed");
        record_run_settled("cancelled");
        set_progress(42.0);
        record_run_duration(Duration::from_millis(500));
    }
}
