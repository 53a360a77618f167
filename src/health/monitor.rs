//! Active replica health checking.
//!
//! # Responsibilities
//! - Periodically probe replica liveness and replication lag
//! - Fold probe results into the shared health record
//! - Bound every probe with a fixed timeout so one hung round trip never
//!   stalls the schedule

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use crate::client::{ClientError, DatabaseClient, Row};
use crate::config::ReplicaConfig;
use crate::health::state::{ReplicaHealthStatus, SharedHealth};
use crate::lifecycle::Shutdown;
use crate::observability::metrics;

/// Upper bound on each probe round trip, independent of caller timeouts.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Why a health check could not read the replica. Never leaves this module.
#[derive(Debug, Error)]
enum ProbeError {
    #[error("probe timed out after {0:?}")]
    Timeout(Duration),

    #[error("probe query failed: {0}")]
    Query(#[from] ClientError),

    #[error("unreadable lag value: {0}")]
    InvalidLag(String),
}

/// Probes the replica and updates [`SharedHealth`].
pub struct HealthMonitor<C> {
    replica: Arc<C>,
    health: Arc<SharedHealth>,
    probe_query: String,
    lag_query: String,
    interval: Duration,
}

impl<C> Clone for HealthMonitor<C> {
    fn clone(&self) -> Self {
        Self {
            replica: self.replica.clone(),
            health: self.health.clone(),
            probe_query: self.probe_query.clone(),
            lag_query: self.lag_query.clone(),
            interval: self.interval,
        }
    }
}

impl<C: DatabaseClient> HealthMonitor<C> {
    pub fn new(replica: Arc<C>, health: Arc<SharedHealth>, config: &ReplicaConfig) -> Self {
        Self {
            replica,
            interval: health.thresholds().health_check_interval,
            health,
            probe_query: config.probe_query.clone(),
            lag_query: config.lag_query.clone(),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run a single health-check cycle and return the resulting status.
    pub async fn check_once(&self) -> ReplicaHealthStatus {
        match self.probe().await {
            Ok(lag) => {
                let max = self.health.thresholds().max_replication_lag;
                if let Some(lag) = lag.filter(|lag| *lag > max) {
                    tracing::warn!(
                        lag_ms = lag.as_millis() as u64,
                        max_lag_ms = max.as_millis() as u64,
                        "Replication lag above threshold"
                    );
                    metrics::record_probe("lagging");
                } else {
                    metrics::record_probe("ok");
                }
                self.health.record_check(lag)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Replica health check failed");
                metrics::record_probe("failed");
                self.health.record_probe_failure()
            }
        }
    }

    /// Run checks at the configured interval until `shutdown` fires.
    /// The first check happens immediately. A check in flight when
    /// `shutdown` fires is abandoned without touching the health record.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            interval_ms = self.interval.as_millis() as u64,
            "Replica health monitor starting"
        );

        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown.recv() => {
                    tracing::info!("Replica health monitor received shutdown signal, exiting loop");
                    break;
                }
            }

            tokio::select! {
                status = self.check_once() => {
                    tracing::debug!(
                        healthy = status.healthy,
                        consecutive_failures = status.consecutive_failures,
                        "Replica health check complete"
                    );
                }
                _ = shutdown.recv() => {
                    tracing::info!("Replica health monitor shut down during a check");
                    break;
                }
            }
        }
    }

    /// Spawn [`run`](Self::run) on the current runtime.
    pub fn spawn(self) -> MonitorHandle {
        let shutdown = Shutdown::new();
        let receiver = shutdown.subscribe();
        let task = tokio::spawn(self.run(receiver));
        MonitorHandle { shutdown, task }
    }

    async fn probe(&self) -> Result<Option<Duration>, ProbeError> {
        self.bounded_query(&self.probe_query).await?;
        let rows = self.bounded_query(&self.lag_query).await?;
        parse_lag(&rows)
    }

    async fn bounded_query(&self, sql: &str) -> Result<Vec<Row>, ProbeError> {
        match time::timeout(PROBE_TIMEOUT, self.replica.raw_query(sql, &[])).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(ProbeError::Timeout(PROBE_TIMEOUT)),
        }
    }
}

/// A running monitor task.
#[derive(Debug)]
pub struct MonitorHandle {
    shutdown: Shutdown,
    task: JoinHandle<()>,
}

impl MonitorHandle {
    /// Signal the task and wait for it to exit. An in-flight check is
    /// abandoned after [`PROBE_TIMEOUT`].
    pub async fn stop(self) {
        let MonitorHandle { shutdown, mut task } = self;
        shutdown.trigger();

        if time::timeout(PROBE_TIMEOUT, &mut task).await.is_err() {
            tracing::warn!("Replica health monitor did not stop in time, aborting");
            task.abort();
        }
    }
}

/// Read the lag in milliseconds from the first column of the first row.
/// No row or NULL means no lag signal.
fn parse_lag(rows: &[Row]) -> Result<Option<Duration>, ProbeError> {
    let Some(value) = rows.first().and_then(|row| row.values().next()) else {
        return Ok(None);
    };

    let millis = match value {
        serde_json::Value::Null => return Ok(None),
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .ok_or_else(|| ProbeError::InvalidLag(value.to_string()))?;

    // Clock skew between hosts can make the replay timestamp look like the future.
    let micros = (millis.max(0.0) * 1000.0).round();
    if !micros.is_finite() || micros > u64::MAX as f64 {
        return Err(ProbeError::InvalidLag(value.to_string()));
    }
    Ok(Some(Duration::from_micros(micros as u64)))
}
