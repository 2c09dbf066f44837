//! Metrics collection.
//!
//! # Metrics
//! - `escrow_orchestrations_total` (counter): by operation, outcome
//! - `escrow_orchestration_duration_seconds` (histogram): by operation
//! - `escrow_api_requests_total` (counter): by endpoint, outcome
//! - `escrow_api_request_duration_seconds` (histogram): by endpoint
//! - `escrow_wallet_events_total` (counter): by backend, event
//!
//! Recording goes through the `metrics` facade; without an installed
//! recorder every call is a no-op. The process-wide switch is set from
//! `observability.metrics_enabled`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

static ENABLED: AtomicBool = AtomicBool::new(true);

/// Turn recording on or off for the whole process.
pub fn set_enabled(enabled: bool) {
    ENABLED.store(enabled, Ordering::Relaxed);
}

fn enabled() -> bool {
    ENABLED.load(Ordering::Relaxed)
}

/// Record a finished orchestration.
pub fn record_orchestration(operation: &'static str, outcome: &'static str, elapsed: Duration) {
    if !enabled() {
        return;
    }
    metrics::counter!(
        "escrow_orchestrations_total",
        "operation" => operation,
        "outcome" => outcome
    )
    .increment(1);
    metrics::histogram!("escrow_orchestration_duration_seconds", "operation" => operation)
        .record(elapsed.as_secs_f64());
}

/// Record one escrow API call.
pub fn record_api_request(endpoint: &str, outcome: &'static str, elapsed: Duration) {
    if !enabled() {
        return;
    }
    metrics::counter!(
        "escrow_api_requests_total",
        "endpoint" => endpoint.to_string(),
        "outcome" => outcome
    )
    .increment(1);
    metrics::histogram!("escrow_api_request_duration_seconds", "endpoint" => endpoint.to_string())
        .record(elapsed.as_secs_f64());
}

/// Record a wallet event (connect, sign, disconnect and their failures).
pub fn record_wallet_event(backend: &'static str, event: &'static str) {
    if !enabled() {
        return;
    }
    metrics::counter!(
        "escrow_wallet_events_total",
        "backend" => backend,
        "event" => event
    )
    .increment(1);
}
