//! Database client abstraction.
//!
//! # Data Flow
//! ```text
//! config.database.{primary_url, replica_url}
//!     → Connector::connect (one handle per role)
//!     → DatabaseClient (raw_query / disconnect)
//!     → shared via Arc by the router and the health monitor
//! ```
//!
//! # Design Decisions
//! - The router only needs `raw_query` and `disconnect`; anything richer is
//!   the concrete client's business
//! - Rows and arguments are JSON values so the trait stays object-safe and
//!   driver-agnostic
//! - Connectors know which role they open so they can treat the replica
//!   lazily

pub mod postgres;

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::routing::Target;

pub use postgres::{PgClient, PgConnector};

/// A single result row, keyed by column name.
pub type Row = Map<String, Value>;

/// Errors raised by a database client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The driver reported an error.
    #[error("database error: {0}")]
    Database(String),

    /// A column or argument could not be converted.
    #[error("decode error: {0}")]
    Decode(String),

    /// The handle was already closed.
    #[error("client is disconnected")]
    Disconnected,

    /// Error raised by caller code inside an operation.
    #[error("{0}")]
    Operation(String),
}

impl From<sqlx::Error> for ClientError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolClosed => ClientError::Disconnected,
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
                ClientError::Decode(err.to_string())
            }
            other => ClientError::Database(other.to_string()),
        }
    }
}

/// Minimal capability the router needs from an underlying database handle.
#[async_trait]
pub trait DatabaseClient: Send + Sync + 'static {
    /// Run a statement with positional arguments and return its rows.
    async fn raw_query(&self, sql: &str, args: &[Value]) -> Result<Vec<Row>, ClientError>;

    /// Release the handle. Calling it more than once must be harmless.
    async fn disconnect(&self) -> Result<(), ClientError>;
}

/// Opens client handles for a given role.
#[async_trait]
pub trait Connector: Send + Sync {
    type Client: DatabaseClient;

    async fn connect(&self, role: Target, url: &str) -> Result<Self::Client, ClientError>;
}
