//! Prometheus metric definitions.
//!
//! All metrics follow Prometheus naming conventions:
//! - `parley_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! Labels are bounded: `operation` is fixed by code, `outcome` is
//! success/error/unknown.

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Initialize the Prometheus metrics recorder and return the handle for
/// serving `/metrics`.
///
/// Must be called before any metrics are recorded.
///
/// # Errors
///
/// Returns an error if the recorder fails to install (e.g., already
/// installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Prefix("parley_store_write".to_string()),
            &[0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.000],
        )
        .map_err(|e| format!("Failed to set store write buckets: {e}"))?
        .set_buckets_for_metric(
            Matcher::Prefix("parley_identity_lookup".to_string()),
            &[0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.000, 2.000],
        )
        .map_err(|e| format!("Failed to set identity lookup buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

/// Record a client connection opening.
pub fn record_connection_opened() {
    counter!("parley_connections_opened_total").increment(1);
}

/// Record a client connection closing, with its session length.
pub fn record_connection_closed(session_seconds: i64) {
    counter!("parley_connections_closed_total").increment(1);
    histogram!("parley_session_duration_seconds").record(session_seconds.max(0) as f64);
}

/// Record a room being created in the directory.
pub fn record_room_created() {
    counter!("parley_rooms_created_total").increment(1);
}

/// Record a room emptying and being removed from the directory.
pub fn record_room_closed() {
    counter!("parley_rooms_closed_total").increment(1);
}

/// Record one chat broadcast and its fan-out width.
pub fn record_chat_broadcast(recipients: usize) {
    counter!("parley_chat_messages_total").increment(1);
    counter!("parley_chat_deliveries_total").increment(recipients as u64);
}

/// Record a signaling envelope relayed to its target.
pub fn record_signal_relayed() {
    counter!("parley_signals_total", "outcome" => "relayed").increment(1);
}

/// Record a signaling envelope dropped (unresolved target or gone channel).
pub fn record_signal_dropped() {
    counter!("parley_signals_total", "outcome" => "dropped").increment(1);
}

/// Record an outbound event dropped on a full client buffer.
pub fn record_event_dropped() {
    counter!("parley_events_dropped_total").increment(1);
}

/// Record a durable store write.
pub fn record_store_write(operation: &'static str, success: bool, duration: Duration) {
    let outcome = if success { "success" } else { "error" };
    counter!("parley_store_writes_total", "operation" => operation, "outcome" => outcome)
        .increment(1);
    histogram!("parley_store_write_duration_seconds", "operation" => operation)
        .record(duration.as_secs_f64());
}

/// Record an identity lookup.
pub fn record_identity_lookup(outcome: &'static str, duration: Duration) {
    counter!("parley_identity_lookups_total", "outcome" => outcome).increment(1);
    histogram!("parley_identity_lookup_duration_seconds").record(duration.as_secs_f64());
}
