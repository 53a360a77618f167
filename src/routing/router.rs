//! Read/write routing with one-shot fallback to the primary.
//!
//! # Responsibilities
//! - Choose primary or replica per call
//! - Run the caller's operation and record its outcome
//! - Retry a failed replica operation once on the primary
//! - Own the health monitor task and the handles' lifetime

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use crate::client::{ClientError, Connector, DatabaseClient, PgClient, PgConnector, Row};
use crate::config::validation::{join_errors, validate_config};
use crate::config::{ReplicaConfig, RouterConfig};
use crate::connection::ConnectionSet;
use crate::error::{RouterError, RouterResult};
use crate::health::{HealthMonitor, MonitorHandle, ReplicaHealthStatus, SharedHealth};
use crate::observability::metrics;
use crate::resilience::with_deadline;
use crate::routing::{QueryOptions, Target};

/// Entry point for all database access.
pub struct ReplicaRouter<C: DatabaseClient> {
    connections: ConnectionSet<C>,
    health: Arc<SharedHealth>,
    monitor: HealthMonitor<C>,
    running: Mutex<Option<MonitorHandle>>,
    closed: AtomicBool,
}

impl ReplicaRouter<PgClient> {
    /// Connect to PostgreSQL and start monitoring the replica.
    pub async fn from_config(config: &RouterConfig) -> RouterResult<Self> {
        let connector = PgConnector::new(config.database.max_connections);
        Self::connect(config, &connector).await
    }
}

impl<C: DatabaseClient> ReplicaRouter<C> {
    /// Wrap an existing connection set. Monitoring is not started.
    pub fn new(connections: ConnectionSet<C>, config: &ReplicaConfig) -> Self {
        let health = Arc::new(SharedHealth::new(config.thresholds()));
        let monitor = HealthMonitor::new(connections.replica().clone(), health.clone(), config);
        Self {
            connections,
            health,
            monitor,
            running: Mutex::new(None),
            closed: AtomicBool::new(false),
        }
    }

    /// Open both handles through `connector` and start monitoring.
    pub async fn connect<K>(config: &RouterConfig, connector: &K) -> RouterResult<Self>
    where
        K: Connector<Client = C>,
    {
        let router = Self::open(config, connector).await?;
        router.start_monitoring();
        Ok(router)
    }

    /// Validate `config` and open both handles. Monitoring is not started.
    pub async fn open<K>(config: &RouterConfig, connector: &K) -> RouterResult<Self>
    where
        K: Connector<Client = C>,
    {
        validate_config(config).map_err(|errors| RouterError::Configuration(join_errors(&errors)))?;
        let connections = ConnectionSet::build(&config.database, connector).await?;
        Ok(Self::new(connections, &config.replica))
    }

    /// Start the recurring health check. No-op when replica routing is off,
    /// when already running, or after shutdown.
    pub fn start_monitoring(&self) {
        if !self.connections.replica_routing_enabled() {
            tracing::debug!("Replica routing disabled, health monitor not started");
            return;
        }
        if self.monitor.interval().is_zero() {
            tracing::error!("Replica health check interval is zero, health monitor not started");
            return;
        }

        // `shutdown` sets `closed` before taking this lock.
        let mut running = self.running.lock().unwrap_or_else(PoisonError::into_inner);
        if running.is_none() && !self.is_closed() {
            *running = Some(self.monitor.clone().spawn());
        }
    }

    /// Cancel the recurring health check. Safe to call when not running.
    pub async fn stop_monitoring(&self) {
        let handle = self
            .running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            handle.stop().await;
        }
    }

    pub fn is_monitoring(&self) -> bool {
        self.running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn replica_routing_enabled(&self) -> bool {
        self.connections.replica_routing_enabled()
    }

    /// Run `operation` against the database chosen for `options`.
    ///
    /// A replica failure is retried once on the primary; the caller only
    /// sees an error when the primary fails too.
    pub async fn execute<T, F, Fut>(&self, operation: F, options: QueryOptions) -> RouterResult<T>
    where
        F: Fn(Arc<C>) -> Fut,
        Fut: Future<Output = Result<T, ClientError>>,
    {
        if self.is_closed() {
            return Err(RouterError::Closed);
        }
        with_deadline(options.timeout, self.route(&operation, options)).await
    }

    /// Convenience wrapper running a single statement through [`execute`](Self::execute).
    pub async fn query(
        &self,
        sql: &str,
        args: &[serde_json::Value],
        options: QueryOptions,
    ) -> RouterResult<Vec<Row>> {
        self.execute(move |client| async move { client.raw_query(sql, args).await }, options)
            .await
    }

    /// Which database a call with `options` would use right now.
    pub fn choose_target(&self, options: &QueryOptions) -> Target {
        if options.force_write {
            Target::Primary
        } else if self.connections.replica_routing_enabled() && self.health.is_healthy() {
            Target::Replica
        } else {
            Target::Primary
        }
    }

    async fn route<T, F, Fut>(&self, operation: &F, options: QueryOptions) -> RouterResult<T>
    where
        F: Fn(Arc<C>) -> Fut,
        Fut: Future<Output = Result<T, ClientError>>,
    {
        let target = self.choose_target(&options);

        match self.run_on(target, operation, &options).await {
            Ok(value) => {
                if target == Target::Replica {
                    self.health.record_query_success();
                }
                Ok(value)
            }
            Err(error) if target == Target::Replica => {
                let status = self.health.record_query_failure();
                tracing::warn!(
                    error = %error,
                    consecutive_failures = status.consecutive_failures,
                    "Replica query failed, retrying on primary"
                );
                metrics::record_fallback();

                self.run_on(Target::Primary, operation, &options)
                    .await
                    .map_err(|source| RouterError::QueryExecution {
                        origin: Target::Primary,
                        source,
                    })
            }
            Err(source) => Err(RouterError::QueryExecution {
                origin: Target::Primary,
                source,
            }),
        }
    }

    async fn run_on<T, F, Fut>(
        &self,
        target: Target,
        operation: &F,
        options: &QueryOptions,
    ) -> Result<T, ClientError>
    where
        F: Fn(Arc<C>) -> Fut,
        Fut: Future<Output = Result<T, ClientError>>,
    {
        let client = self.connections.get(target).clone();
        let start = Instant::now();
        let result = operation(client).await;
        let elapsed = start.elapsed();

        metrics::record_query(target, result.is_ok(), elapsed);
        tracing::debug!(
            route = %target,
            duration_ms = elapsed.as_millis() as u64,
            force_write = options.force_write,
            ok = result.is_ok(),
            "Query executed"
        );
        result
    }

    /// Copy of the current replica health.
    pub fn get_replica_health(&self) -> ReplicaHealthStatus {
        self.health.snapshot()
    }

    /// Run one health check now, outside the schedule.
    ///
    /// Without a distinct replica, or after shutdown, nothing is probed and
    /// the current snapshot is returned.
    pub async fn refresh_replica_health(&self) -> ReplicaHealthStatus {
        if self.connections.replica_is_aliased() || self.is_closed() {
            return self.health.snapshot();
        }
        tracing::info!("Manual replica health refresh requested");
        self.monitor.check_once().await
    }

    /// Stop monitoring and close both handles. Idempotent.
    pub async fn shutdown(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            tracing::debug!("Router already shut down");
            return;
        }

        self.stop_monitoring().await;

        if let Err(e) = self.connections.primary().disconnect().await {
            tracing::warn!(error = %e, "Failed to close primary connection");
        }
        if !self.connections.replica_is_aliased() {
            if let Err(e) = self.connections.replica().disconnect().await {
                tracing::warn!(error = %e, "Failed to close replica connection");
            }
        }

        tracing::info!("Database router shut down");
    }
}

impl<C: DatabaseClient> std::fmt::Debug for ReplicaRouter<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplicaRouter")
            .field("replica_routing", &self.connections.replica_routing_enabled())
            .field("replica_aliased", &self.connections.replica_is_aliased())
            .field("health", &self.health.snapshot())
            .field("closed", &self.is_closed())
            .finish()
    }
}
