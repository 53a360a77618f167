//! Error types surfaced by the access layer.
//!
//! Probe failures never appear here: the health monitor contains them and
//! only folds them into the shared health record.

use std::time::Duration;
use thiserror::Error;

use crate::client::ClientError;
use crate::routing::Target;

/// Errors returned by [`ReplicaRouter`](crate::ReplicaRouter) operations.
#[derive(Debug, Error)]
pub enum RouterError {
    /// Construction-time configuration problem. Fatal.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A handle could not be opened at construction time.
    #[error("failed to connect to {role}: {source}")]
    Connection {
        role: Target,
        #[source]
        source: ClientError,
    },

    /// The operation failed on `origin` and no fallback target remained.
    #[error("query failed on {origin}: {source}")]
    QueryExecution {
        origin: Target,
        #[source]
        source: ClientError,
    },

    /// The caller-supplied deadline elapsed first.
    #[error("query timed out after {0:?}")]
    Timeout(Duration),

    /// The router has been shut down.
    #[error("router is shut down")]
    Closed,
}

impl RouterError {
    /// Which database the failure came from, if any.
    pub fn origin(&self) -> Option<Target> {
        match self {
            RouterError::QueryExecution { origin, .. } => Some(*origin),
            _ => None,
        }
    }
}

/// Result type for router operations.
pub type RouterResult<T> = Result<T, RouterError>;
