//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the router.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration for the access layer.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RouterConfig {
    /// Connection settings for primary and replica.
    pub database: DatabaseConfig,

    /// Replica health thresholds and probe queries.
    pub replica: ReplicaConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Database connection configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Primary connection URL. Required at construction time.
    pub primary_url: Option<String>,

    /// Replica connection URL. Without it the replica aliases the primary.
    pub replica_url: Option<String>,

    /// Route reads to the replica at all.
    pub use_read_replica: bool,

    /// Pool size for each handle.
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            primary_url: None,
            replica_url: None,
            use_read_replica: false,
            max_connections: 10,
        }
    }
}

/// Replica health configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ReplicaConfig {
    /// Lag above this marks the replica unhealthy.
    pub max_replication_lag_ms: u64,

    /// Health check interval in milliseconds.
    pub health_check_interval_ms: u64,

    /// Consecutive failures before marking unhealthy.
    pub max_consecutive_failures: u32,

    /// Liveness probe statement.
    pub probe_query: String,

    /// Statement returning replication lag in milliseconds in its first column.
    /// NULL means no lag signal is available.
    pub lag_query: String,
}

impl Default for ReplicaConfig {
    fn default() -> Self {
        Self {
            max_replication_lag_ms: 1000,
            health_check_interval_ms: 30_000,
            max_consecutive_failures: 3,
            probe_query: "SELECT 1".to_string(),
            lag_query: "SELECT (EXTRACT(EPOCH FROM (now() - pg_last_xact_replay_timestamp())) * 1000)::float8 AS lag_ms".to_string(),
        }
    }
}

impl ReplicaConfig {
    pub fn thresholds(&self) -> Thresholds {
        Thresholds {
            max_replication_lag: Duration::from_millis(self.max_replication_lag_ms),
            max_consecutive_failures: self.max_consecutive_failures,
            health_check_interval: Duration::from_millis(self.health_check_interval_ms),
        }
    }
}

/// Health thresholds, fixed after construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thresholds {
    pub max_replication_lag: Duration,
    pub max_consecutive_failures: u32,
    pub health_check_interval: Duration,
}

impl Default for Thresholds {
    fn default() -> Self {
        ReplicaConfig::default().thresholds()
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
