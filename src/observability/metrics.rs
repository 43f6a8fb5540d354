//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (gauge): persisted request counter
//! - `gateway_unique_visitors` (gauge): derived visitor count
//! - `gateway_keys_issued_total` (counter): keys issued or rotated
//! - `gateway_key_validation_total` (counter): validations by outcome
//! - `gateway_upstream_requests_total` (counter): upstream fetches by route, outcome
//! - `gateway_upstream_duration_seconds` (histogram): upstream latency by route
//! - `gateway_persistence_failures_total` (counter): failed saves by store
//!
//! Recording is a no-op until [`init_metrics`] installs the Prometheus recorder.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_usage_totals(total_requests: u64, total_visitors: u64) {
    gauge!("gateway_requests_total").set(total_requests as f64);
    gauge!("gateway_unique_visitors").set(total_visitors as f64);
}

pub fn record_key_issued() {
    counter!("gateway_keys_issued_total").increment(1);
}

pub fn record_key_validation(outcome: &'static str) {
    counter!("gateway_key_validation_total", "outcome" => outcome).increment(1);
}

pub fn record_upstream(route: &str, outcome: &'static str, start: Instant) {
    let route = route.to_string();
    counter!(
        "gateway_upstream_requests_total",
        "route" => route.clone(),
        "outcome" => outcome
    )
    .increment(1);
    histogram!("gateway_upstream_duration_seconds", "route" => route)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_persistence_failure(store: &'static str) {
    counter!("gateway_persistence_failures_total", "store" => store).increment(1);
}
