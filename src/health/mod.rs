//! Replica health subsystem.
//!
//! # Data Flow
//! ```text
//! Active checks (monitor.rs):
//!     Interval tick or forced refresh
//!     → Liveness probe, then lag query, each bounded by PROBE_TIMEOUT
//!     → Update state.rs
//!
//! Passive checks (routing):
//!     Replica query fails → increment failure count
//!     Replica query succeeds → clear failure count
//!
//! State machine (state.rs):
//!     Healthy ←→ Unhealthy
//!     Only an active check moves Unhealthy → Healthy
//! ```

pub mod monitor;
pub mod state;

pub use monitor::{HealthMonitor, MonitorHandle, PROBE_TIMEOUT};
pub use state::{ReplicaHealthStatus, SharedHealth};
