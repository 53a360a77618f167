//! Primary/replica handle pair.

use std::sync::Arc;

use crate::client::{Connector, DatabaseClient};
use crate::config::DatabaseConfig;
use crate::error::{RouterError, RouterResult};
use crate::routing::Target;

/// The two long-lived database handles.
#[derive(Debug)]
pub struct ConnectionSet<C> {
    primary: Arc<C>,
    replica: Arc<C>,
    replica_routing: bool,
}

impl<C: DatabaseClient> ConnectionSet<C> {
    /// Assemble a set from already-open handles. Without a replica the
    /// replica slot aliases the primary and routing stays off.
    pub fn new(primary: C, replica: Option<C>, use_read_replica: bool) -> Self {
        Self::from_shared(Arc::new(primary), replica.map(Arc::new), use_read_replica)
    }

    /// Like [`new`](Self::new) for handles that are already shared.
    pub fn from_shared(primary: Arc<C>, replica: Option<Arc<C>>, use_read_replica: bool) -> Self {
        match replica {
            Some(replica) => Self {
                primary,
                replica,
                replica_routing: use_read_replica,
            },
            None => Self {
                replica: primary.clone(),
                primary,
                replica_routing: false,
            },
        }
    }

    /// Open both handles from configuration.
    pub async fn build<K>(config: &DatabaseConfig, connector: &K) -> RouterResult<Self>
    where
        K: Connector<Client = C>,
    {
        let primary_url = config
            .primary_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| RouterError::Configuration("database.primary_url is required".into()))?;

        let primary = connector
            .connect(Target::Primary, primary_url)
            .await
            .map_err(|source| RouterError::Connection { role: Target::Primary, source })?;

        let replica = match config.replica_url.as_deref().filter(|url| !url.trim().is_empty()) {
            Some(url) => Some(
                connector
                    .connect(Target::Replica, url)
                    .await
                    .map_err(|source| RouterError::Connection { role: Target::Replica, source })?,
            ),
            None => {
                if config.use_read_replica {
                    tracing::warn!("use_read_replica is set but no replica_url is configured, reads will use the primary");
                }
                None
            }
        };

        let set = Self::new(primary, replica, config.use_read_replica);
        tracing::info!(
            replica_configured = !set.replica_is_aliased(),
            replica_routing = set.replica_routing,
            "Database connections ready"
        );
        Ok(set)
    }

    pub fn primary(&self) -> &Arc<C> {
        &self.primary
    }

    pub fn replica(&self) -> &Arc<C> {
        &self.replica
    }

    pub fn get(&self, target: Target) -> &Arc<C> {
        match target {
            Target::Primary => &self.primary,
            Target::Replica => &self.replica,
        }
    }

    /// True when no distinct replica exists.
    pub fn replica_is_aliased(&self) -> bool {
        Arc::ptr_eq(&self.primary, &self.replica)
    }

    /// True when reads may be sent to the replica at all.
    pub fn replica_routing_enabled(&self) -> bool {
        self.replica_routing
    }
}
