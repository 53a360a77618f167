//! Read-replica-aware database access layer.
//!
//! Reads go to the replica while it is healthy, writes and forced reads go
//! to the primary, and a failed replica read is retried once on the primary.
//!
//! ```ignore
//! let config = replica_router::config::load_config(Path::new("router.toml"))?;
//! let router = ReplicaRouter::from_config(&config).await?;
//!
//! let rows = router
//!     .query("SELECT id, name FROM contests WHERE id = $1", &[json!(7)], QueryOptions::read())
//!     .await?;
//!
//! router.shutdown().await;
//! ```

pub mod client;
pub mod config;
pub mod connection;
pub mod error;
pub mod health;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod routing;

pub use client::{ClientError, Connector, DatabaseClient, PgClient, PgConnector, Row};
pub use config::RouterConfig;
pub use connection::ConnectionSet;
pub use error::{RouterError, RouterResult};
pub use health::ReplicaHealthStatus;
pub use routing::{QueryOptions, ReplicaRouter, Target};
