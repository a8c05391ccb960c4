//! Prometheus metrics for the match pipeline
//!
//! Call [`init_metrics`] once at startup. If registration fails the
//! recording helpers become no-ops, so the pipeline never depends on the
//! metrics registry being healthy.

use prometheus::{
    register_int_counter, register_int_counter_vec, Encoder, IntCounter, IntCounterVec,
    TextEncoder,
};
use std::sync::OnceLock;

use crate::models::{NotificationKind, TransitionKind};

/// Container for all pipeline metrics
struct PipelineMetrics {
    runs_total: IntCounter,
    teachers_processed: IntCounter,
    teachers_matched: IntCounter,
    teachers_unmatched: IntCounter,
    transitions: IntCounterVec,
    notifications: IntCounterVec,
}

static METRICS: OnceLock<PipelineMetrics> = OnceLock::new();
static INIT_RESULT: OnceLock<Result<(), String>> = OnceLock::new();

/// Register all metrics with the default registry.
///
/// Safe to call more than once, including concurrently; only the first
/// call registers.
pub fn init_metrics() -> Result<(), Box<dyn std::error::Error>> {
    let result = INIT_RESULT.get_or_init(|| register_all().map_err(|e| e.to_string()));
    result.clone().map_err(|e| e.into())
}

fn register_all() -> Result<(), prometheus::Error> {
    let metrics = PipelineMetrics {
        runs_total: register_int_counter!(
            "acompanar_match_runs_total",
            "Number of match runs executed"
        )?,
        teachers_processed: register_int_counter!(
            "acompanar_teachers_processed_total",
            "Teachers processed across all match runs"
        )?,
        teachers_matched: register_int_counter!(
            "acompanar_teachers_matched_total",
            "Teachers that ended a run with a specialist"
        )?,
        teachers_unmatched: register_int_counter!(
            "acompanar_teachers_unmatched_total",
            "Teachers that ended a run without a specialist"
        )?,
        transitions: register_int_counter_vec!(
            "acompanar_transitions_total",
            "Transition classifications by kind",
            &["kind"]
        )?,
        notifications: register_int_counter_vec!(
            "acompanar_notifications_emitted_total",
            "Notifications emitted by kind",
            &["kind"]
        )?,
    };

    METRICS.set(metrics).ok();
    Ok(())
}

/// Record the totals of one finished run
pub fn record_run(processed: usize, matched: usize, unmatched: usize) {
    if let Some(m) = METRICS.get() {
        m.runs_total.inc();
        m.teachers_processed.inc_by(processed as u64);
        m.teachers_matched.inc_by(matched as u64);
        m.teachers_unmatched.inc_by(unmatched as u64);
    }
}

/// Record one transition classification
pub fn record_transition(kind: TransitionKind) {
    if let Some(m) = METRICS.get() {
        m.transitions.with_label_values(&[kind.as_str()]).inc();
    }
}

/// Record one emitted notification
pub fn record_notification(kind: NotificationKind) {
    if let Some(m) = METRICS.get() {
        m.notifications.with_label_values(&[kind.as_str()]).inc();
    }
}

/// Render the default registry in the Prometheus text format
pub fn gather() -> String {
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    let encoder = TextEncoder::new();
    if encoder.encode(&metric_families, &mut buffer).is_err() {
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        init_metrics().unwrap();
        init_metrics().unwrap();
    }

    #[test]
    fn test_recording_without_init_is_noop() {
        // Must not panic even when called before init in some other test
        record_transition(TransitionKind::Mantenido);
        record_notification(NotificationKind::Desasignacion);
        record_run(10, 7, 3);
    }

    #[test]
    fn test_gather_includes_run_counter() {
        init_metrics().unwrap();
        record_run(5, 3, 2);
        let rendered = gather();
        assert!(rendered.contains("acompanar_match_runs_total"));
    }
}
