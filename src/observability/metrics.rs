//! Metrics collection and exposition.
//!
//! # Metrics
//! - `db_queries_total{target,outcome}` (counter): routed operations
//! - `db_query_duration_seconds{target}` (histogram): operation latency
//! - `db_replica_fallbacks_total` (counter): replica failures retried on primary
//! - `db_replica_probes_total{outcome}` (counter): health checks by result
//! - `db_replica_healthy` (gauge): 1=healthy, 0=unhealthy
//! - `db_replica_lag_seconds` (gauge): last observed replication lag
//! - `db_replica_consecutive_failures` (gauge)
//!
//! Recording is a no-op until a recorder is installed.

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::net::SocketAddr;
use std::time::Duration;

use crate::health::ReplicaHealthStatus;
use crate::routing::Target;

/// Buckets for database round trips, 1ms to 10s.
const QUERY_LATENCY_BUCKETS: &[f64] = &[0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 10.0];

/// Install the Prometheus recorder with an HTTP scrape listener on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .set_buckets(QUERY_LATENCY_BUCKETS)?
        .install()?;

    describe_counter!("db_queries_total", "Routed database operations by target and outcome");
    describe_histogram!("db_query_duration_seconds", "Routed operation duration in seconds");
    describe_counter!("db_replica_fallbacks_total", "Replica failures retried on the primary");
    describe_counter!("db_replica_probes_total", "Replica health checks by outcome");
    describe_gauge!("db_replica_healthy", "1 if reads may be routed to the replica");
    describe_gauge!("db_replica_lag_seconds", "Last observed replication lag");
    describe_gauge!("db_replica_consecutive_failures", "Current replica failure streak");

    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_query(target: Target, success: bool, duration: Duration) {
    let outcome = if success { "ok" } else { "error" };
    counter!("db_queries_total", "target" => target.as_str(), "outcome" => outcome).increment(1);
    histogram!("db_query_duration_seconds", "target" => target.as_str()).record(duration.as_secs_f64());
}

pub fn record_fallback() {
    counter!("db_replica_fallbacks_total").increment(1);
}

pub fn record_probe(outcome: &'static str) {
    counter!("db_replica_probes_total", "outcome" => outcome).increment(1);
}

pub fn record_replica_health(status: &ReplicaHealthStatus) {
    gauge!("db_replica_healthy").set(if status.healthy { 1.0 } else { 0.0 });
    gauge!("db_replica_consecutive_failures").set(f64::from(status.consecutive_failures));
    if let Some(lag) = status.lag {
        gauge!("db_replica_lag_seconds").set(lag.as_secs_f64());
    }
}
