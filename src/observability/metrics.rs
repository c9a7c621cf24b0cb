//! Metrics collection and exposition.
//!
//! # Metrics
//! - `relay_batches_total` (counter): log batches by outcome
//!   (`delivered`, `duplicate`, `sink_error`, or a rejection kind)
//! - `relay_events_delivered_total` (counter): events the sink acknowledged
//! - `relay_duplicates_total` (counter): events skipped as already processed
//! - `relay_reconnects_total` (counter): subscription reconnect attempts
//! - `relay_submissions_total` (counter): shield submissions by outcome
//! - `relay_subscription_state` (gauge): current loop state
//! - `relay_dedup_entries` (gauge): processed signatures on record
//! - `relay_rpc_healthy` (gauge): 1=healthy, 0=unhealthy
//!
//! Without an installed recorder every call is a no-op.

use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_batch(outcome: &'static str) {
    ::metrics::counter!("relay_batches_total", "outcome" => outcome).increment(1);
    match outcome {
        "delivered" => ::metrics::counter!("relay_events_delivered_total").increment(1),
        "duplicate" => ::metrics::counter!("relay_duplicates_total").increment(1),
        _ => {}
    }
}

pub fn record_reconnect() {
    ::metrics::counter!("relay_reconnects_total").increment(1);
}

pub fn record_subscription_state(state: f64) {
    ::metrics::gauge!("relay_subscription_state").set(state);
}

pub fn record_dedup_entries(entries: usize) {
    ::metrics::gauge!("relay_dedup_entries").set(entries as f64);
}

pub fn record_submission(outcome: &'static str) {
    ::metrics::counter!("relay_submissions_total", "outcome" => outcome).increment(1);
}

pub fn record_rpc_health(healthy: bool) {
    ::metrics::gauge!("relay_rpc_healthy").set(if healthy { 1.0 } else { 0.0 });
}
