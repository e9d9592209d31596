//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define profiler metrics (sessions, outbound calls, lookups, evictions)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `profiler_sessions_started_total` (counter): sessions created
//! - `profiler_sessions_skipped_total` (counter): requests bypassed by policy
//! - `profiler_sessions_stored` (gauge): sessions currently in the registry
//! - `profiler_sessions_evicted_total` (counter): evictions by reason
//! - `profiler_outbound_calls_total` (counter): outbound calls by outcome
//! - `profiler_outbound_call_duration_seconds` (histogram): outbound latency
//! - `profiler_results_lookups_total` (counter): results lookups by result
//! - `profiler_infrastructure_errors_total` (counter): swallowed profiler faults
//!
//! # Design Decisions
//! - The `metrics` facade is a no-op until an exporter is installed

use std::net::SocketAddr;
use std::time::Duration;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter with its own HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_session_started() {
    counter!("profiler_sessions_started_total").increment(1);
}

pub fn record_session_skipped() {
    counter!("profiler_sessions_skipped_total").increment(1);
}

pub fn record_sessions_stored(count: usize) {
    gauge!("profiler_sessions_stored").set(count as f64);
}

pub fn record_sessions_evicted(reason: &'static str, count: usize) {
    counter!("profiler_sessions_evicted_total", "reason" => reason).increment(count as u64);
}

pub fn record_outbound_call(outcome: &'static str, duration: Duration) {
    counter!("profiler_outbound_calls_total", "outcome" => outcome).increment(1);
    histogram!("profiler_outbound_call_duration_seconds").record(duration.as_secs_f64());
}

pub fn record_results_lookup(result: &'static str) {
    counter!("profiler_results_lookups_total", "result" => result).increment(1);
}

pub fn record_infrastructure_error(kind: &'static str) {
    counter!("profiler_infrastructure_errors_total", "kind" => kind).increment(1);
}
