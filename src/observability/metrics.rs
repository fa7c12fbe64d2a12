//! Metrics collection and exposition.
//!
//! # Metrics
//! - `db_router_transitions_total` (counter): failovers/failbacks by from, to
//! - `db_router_active_endpoint` (gauge): 0 = primary, 1 = standby
//! - `db_router_probes_total` (counter): probes by endpoint, result
//! - `db_router_probe_failures_total` (counter): failed probes by reason
//! - `db_router_probe_duration_seconds` (histogram): probe latency
//! - `db_router_pool_acquire_total` (counter): acquisitions by endpoint, result
//!
//! Recording is a no-op until a recorder is installed.

use std::net::SocketAddr;
use std::time::Duration;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::pool::EndpointRole;

/// Install the Prometheus recorder and serve it on `addr`.
///
/// Must be called from inside a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_transition(from: &'static str, to: &'static str) {
    ::metrics::counter!("db_router_transitions_total", "from" => from, "to" => to).increment(1);
}

pub fn set_active_endpoint(role: EndpointRole) {
    let value = match role {
        EndpointRole::Primary => 0.0,
        EndpointRole::Standby => 1.0,
    };
    ::metrics::gauge!("db_router_active_endpoint").set(value);
}

pub fn record_probe(endpoint: &'static str, healthy: bool, latency: Duration) {
    let result = if healthy { "healthy" } else { "unhealthy" };
    ::metrics::counter!("db_router_probes_total", "endpoint" => endpoint, "result" => result)
        .increment(1);
    ::metrics::histogram!("db_router_probe_duration_seconds", "endpoint" => endpoint)
        .record(latency.as_secs_f64());
}

pub fn record_probe_failure(reason: &'static str) {
    ::metrics::counter!("db_router_probe_failures_total", "reason" => reason).increment(1);
}

pub fn record_acquire(endpoint: &'static str, result: &'static str) {
    ::metrics::counter!("db_router_pool_acquire_total", "endpoint" => endpoint, "result" => result)
        .increment(1);
}
