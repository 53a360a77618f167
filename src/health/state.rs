//! Replica health state machine.
//!
//! # States
//! - Healthy: reads are routed to the replica
//! - Unhealthy: reads go to the primary
//!
//! # State Transitions
//! ```text
//! Healthy → Unhealthy: consecutive failures >= max_consecutive_failures
//!                      (probe or routed query), or a check sees lag > max
//! Unhealthy → Healthy: a scheduled or forced health check with no probe
//!                      error and acceptable lag
//! ```
//!
//! # Design Decisions
//! - Every transition is a pure function on `ReplicaHealthStatus`
//! - All writers go through `SharedHealth::update`, a compare-and-swap loop
//!   on one atomically swapped record; readers take a lock-free snapshot
//! - A successful routed query clears the failure counter but never flips
//!   the replica back to healthy

use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;

use crate::config::Thresholds;
use crate::observability::metrics;

/// Point-in-time view of replica health.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplicaHealthStatus {
    pub healthy: bool,
    pub lag: Option<Duration>,
    pub last_check: DateTime<Utc>,
    pub consecutive_failures: u32,
}

impl ReplicaHealthStatus {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            healthy: true,
            lag: None,
            last_check: now,
            consecutive_failures: 0,
        }
    }

    /// The liveness probe (or lag query) failed.
    pub fn after_probe_failure(&self, thresholds: &Thresholds, now: DateTime<Utc>) -> Self {
        let mut next = self.after_failure(thresholds);
        next.last_check = now;
        next
    }

    /// The probe succeeded and reported `lag`.
    pub fn after_check(
        &self,
        lag: Option<Duration>,
        thresholds: &Thresholds,
        now: DateTime<Utc>,
    ) -> Self {
        let breached = lag.is_some_and(|lag| lag > thresholds.max_replication_lag);
        Self {
            healthy: !breached,
            lag,
            last_check: now,
            // Lag is a separate failure reason; it leaves the counter alone.
            consecutive_failures: if breached { self.consecutive_failures } else { 0 },
        }
    }

    /// A query routed to the replica failed.
    pub fn after_query_failure(&self, thresholds: &Thresholds) -> Self {
        self.after_failure(thresholds)
    }

    /// A query routed to the replica succeeded.
    pub fn after_query_success(&self) -> Self {
        Self {
            consecutive_failures: 0,
            ..self.clone()
        }
    }

    fn after_failure(&self, thresholds: &Thresholds) -> Self {
        let consecutive_failures = self.consecutive_failures.saturating_add(1);
        Self {
            healthy: self.healthy && consecutive_failures < thresholds.max_consecutive_failures,
            consecutive_failures,
            ..self.clone()
        }
    }
}

/// The single shared health record.
#[derive(Debug)]
pub struct SharedHealth {
    current: ArcSwap<ReplicaHealthStatus>,
    thresholds: Thresholds,
}

impl SharedHealth {
    pub fn new(thresholds: Thresholds) -> Self {
        Self {
            current: ArcSwap::from_pointee(ReplicaHealthStatus::new(Utc::now())),
            thresholds,
        }
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    /// Copy of the current record.
    pub fn snapshot(&self) -> ReplicaHealthStatus {
        (**self.current.load()).clone()
    }

    pub fn is_healthy(&self) -> bool {
        self.current.load().healthy
    }

    pub fn record_probe_failure(&self) -> ReplicaHealthStatus {
        let now = Utc::now();
        self.update(|s| s.after_probe_failure(&self.thresholds, now))
    }

    pub fn record_check(&self, lag: Option<Duration>) -> ReplicaHealthStatus {
        let now = Utc::now();
        self.update(|s| s.after_check(lag, &self.thresholds, now))
    }

    pub fn record_query_failure(&self) -> ReplicaHealthStatus {
        self.update(|s| s.after_query_failure(&self.thresholds))
    }

    pub fn record_query_success(&self) -> ReplicaHealthStatus {
        // Skip the swap on the hot path when there is nothing to clear.
        if self.current.load().consecutive_failures == 0 {
            return self.snapshot();
        }
        self.update(ReplicaHealthStatus::after_query_success)
    }

    /// Apply `f` atomically. `f` may run more than once under contention and
    /// must be pure.
    fn update<F>(&self, f: F) -> ReplicaHealthStatus
    where
        F: Fn(&ReplicaHealthStatus) -> ReplicaHealthStatus,
    {
        let previous = self.current.rcu(|current| f(current));
        let next = f(&previous);

        if previous.healthy != next.healthy {
            if next.healthy {
                tracing::info!(lag = ?next.lag, "Replica marked healthy");
            } else {
                tracing::warn!(
                    consecutive_failures = next.consecutive_failures,
                    lag = ?next.lag,
                    "Replica marked unhealthy"
                );
            }
        }
        metrics::record_replica_health(&next);

        next
    }
}
