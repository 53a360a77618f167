//! Query routing subsystem.
//!
//! # Data Flow
//! ```text
//! execute(op, options)
//!     → force_write?                  → primary
//!     → replica routing on + healthy? → replica
//!     → otherwise                     → primary
//!     → run op, time it
//!     → replica failed? → record failure → run op once on primary
//! ```
//!
//! # Design Decisions
//! - The health flag is read exactly once per call, so a call never sees a
//!   half-applied transition
//! - Replica success clears the failure streak; only the monitor restores
//!   health

pub mod router;

use serde::Serialize;
use std::fmt;
use std::time::Duration;

pub use router::ReplicaRouter;

/// Which database an operation runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    Primary,
    Replica,
}

impl Target {
    pub fn as_str(&self) -> &'static str {
        match self {
            Target::Primary => "primary",
            Target::Replica => "replica",
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-call routing options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryOptions {
    /// Always run on the primary.
    pub force_write: bool,

    /// Deadline for the whole call, fallback included.
    pub timeout: Option<Duration>,
}

impl QueryOptions {
    /// A read that may be served by the replica.
    pub fn read() -> Self {
        Self::default()
    }

    /// A write, or a read that must see the latest committed data.
    pub fn write() -> Self {
        Self {
            force_write: true,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}
