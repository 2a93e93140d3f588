//! Metrics collection and exposition.
//!
//! # Metrics
//! - `shield_decisions_total` (counter): decisions by action and stage
//! - `shield_requests_per_second` (gauge): rate over the last metrics tick
//! - `shield_severity` (gauge): 0=low, 1=medium, 2=high, 3=critical
//! - `shield_blacklist_size` (gauge): blacklisted addresses
//! - `shield_active_rate_limiters` (gauge): tracked rate-limit buckets
//! - `shield_circuit_open_total` (counter): breaker openings by key
//! - `shield_lookup_failures_total` (counter): failed collaborator lookups
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   exporter every call is a no-op
//! - Prometheus exposition on its own listener, separate from traffic

use ::metrics::{counter, gauge};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::net::SocketAddr;

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Prometheus exporter listening");
    Ok(())
}

pub fn record_decision(action: &'static str, stage: &'static str) {
    counter!("shield_decisions_total", "action" => action, "stage" => stage).increment(1);
}

pub fn record_circuit_open(key: &str) {
    counter!("shield_circuit_open_total", "key" => key.to_string()).increment(1);
}

pub fn record_lookup_failure(collaborator: &'static str) {
    counter!("shield_lookup_failures_total", "collaborator" => collaborator).increment(1);
}

pub fn set_requests_per_second(rps: f64) {
    gauge!("shield_requests_per_second").set(rps);
}

pub fn set_severity(level: u8) {
    gauge!("shield_severity").set(f64::from(level));
}

pub fn set_blacklist_size(count: usize) {
    gauge!("shield_blacklist_size").set(count as f64);
}

pub fn set_active_rate_limiters(count: usize) {
    gauge!("shield_active_rate_limiters").set(count as f64);
}
