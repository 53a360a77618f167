//! Shared utilities for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use replica_router::config::{ReplicaConfig, RouterConfig};
use replica_router::{ClientError, ConnectionSet, Connector, DatabaseClient, ReplicaRouter, Row, Target};

pub const PROBE_SQL: &str = "SELECT 1";
pub const LAG_SQL: &str = "SELECT replica_lag_ms";

/// Scriptable in-memory database handle.
#[derive(Debug)]
pub struct MockClient {
    pub name: &'static str,
    pub fail_queries: AtomicBool,
    pub fail_probe: AtomicBool,
    pub hang_probe: AtomicBool,
    pub fail_lag: AtomicBool,
    pub lag: Mutex<Value>,
    pub queries: AtomicUsize,
    pub probes: AtomicUsize,
    pub disconnects: AtomicUsize,
}

impl MockClient {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            fail_queries: AtomicBool::new(false),
            fail_probe: AtomicBool::new(false),
            hang_probe: AtomicBool::new(false),
            fail_lag: AtomicBool::new(false),
            lag: Mutex::new(Value::Null),
            queries: AtomicUsize::new(0),
            probes: AtomicUsize::new(0),
            disconnects: AtomicUsize::new(0),
        }
    }

    pub fn set_fail_queries(&self, fail: bool) {
        self.fail_queries.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_probe(&self, fail: bool) {
        self.fail_probe.store(fail, Ordering::SeqCst);
    }

    pub fn set_hang_probe(&self, hang: bool) {
        self.hang_probe.store(hang, Ordering::SeqCst);
    }

    pub fn set_fail_lag(&self, fail: bool) {
        self.fail_lag.store(fail, Ordering::SeqCst);
    }

    pub fn set_lag_ms(&self, lag: Option<f64>) {
        self.set_lag_value(lag.map_or(Value::Null, |l| json!(l)));
    }

    /// Return `value` verbatim from the lag query.
    pub fn set_lag_value(&self, value: Value) {
        *self.lag.lock().unwrap() = value;
    }

    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    pub fn probe_count(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }

    pub fn disconnect_count(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }

    fn row(key: &str, value: Value) -> Row {
        let mut row = Row::new();
        row.insert(key.to_string(), value);
        row
    }
}

#[async_trait]
impl DatabaseClient for MockClient {
    async fn raw_query(&self, sql: &str, _args: &[Value]) -> Result<Vec<Row>, ClientError> {
        if sql == PROBE_SQL {
            self.probes.fetch_add(1, Ordering::SeqCst);
            if self.hang_probe.load(Ordering::SeqCst) {
                std::future::pending::<()>().await;
            }
            if self.fail_probe.load(Ordering::SeqCst) {
                return Err(ClientError::Database(format!("{} unreachable", self.name)));
            }
            return Ok(vec![Self::row("?column?", json!(1))]);
        }

        if sql == LAG_SQL {
            if self.fail_lag.load(Ordering::SeqCst) {
                return Err(ClientError::Database("recovery functions unavailable".into()));
            }
            let lag = self.lag.lock().unwrap().clone();
            return Ok(vec![Self::row("lag_ms", lag)]);
        }

        self.queries.fetch_add(1, Ordering::SeqCst);
        if self.fail_queries.load(Ordering::SeqCst) {
            return Err(ClientError::Database(format!("{} query failed", self.name)));
        }
        Ok(vec![Self::row("served_by", json!(self.name))])
    }

    async fn disconnect(&self) -> Result<(), ClientError> {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Hands out pre-built mock handles and records the URLs it was given.
#[derive(Default)]
pub struct MockConnector {
    pub urls: Mutex<Vec<(Target, String)>>,
    pub fail_primary: bool,
}

#[async_trait]
impl Connector for MockConnector {
    type Client = MockClient;

    async fn connect(&self, role: Target, url: &str) -> Result<MockClient, ClientError> {
        self.urls.lock().unwrap().push((role, url.to_string()));
        if role == Target::Primary && self.fail_primary {
            return Err(ClientError::Database("connection refused".into()));
        }
        Ok(MockClient::new(role.as_str()))
    }
}

pub fn replica_config(max_failures: u32, max_lag_ms: u64) -> ReplicaConfig {
    ReplicaConfig {
        max_replication_lag_ms: max_lag_ms,
        max_consecutive_failures: max_failures,
        health_check_interval_ms: 30_000,
        probe_query: PROBE_SQL.to_string(),
        lag_query: LAG_SQL.to_string(),
    }
}

pub fn router_config(replica: bool, use_read_replica: bool) -> RouterConfig {
    let mut config = RouterConfig::default();
    config.database.primary_url = Some("postgres://primary/app".into());
    if replica {
        config.database.replica_url = Some("postgres://replica/app".into());
    }
    config.database.use_read_replica = use_read_replica;
    config.replica = replica_config(3, 1000);
    config
}

/// Router over a fresh primary/replica pair with routing enabled and the
/// monitor not started.
pub fn router_with_replica(
    config: &ReplicaConfig,
) -> (ReplicaRouter<MockClient>, Arc<MockClient>, Arc<MockClient>) {
    let primary = Arc::new(MockClient::new("primary"));
    let replica = Arc::new(MockClient::new("replica"));
    let connections = ConnectionSet::from_shared(primary.clone(), Some(replica.clone()), true);
    (ReplicaRouter::new(connections, config), primary, replica)
}

/// Run a read that reports which handle served it.
pub async fn served_by(
    router: &ReplicaRouter<MockClient>,
    options: replica_router::QueryOptions,
) -> Result<String, replica_router::RouterError> {
    router
        .execute(
            |client: Arc<MockClient>| async move {
                let rows = client.raw_query("SELECT * FROM contests", &[]).await?;
                Ok::<_, ClientError>(rows[0]["served_by"].as_str().unwrap_or_default().to_string())
            },
            options,
        )
        .await
}

pub fn millis(ms: u64) -> Duration {
    Duration::from_millis(ms)
}
