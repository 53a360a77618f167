//! Connection provider.
//!
//! # Data Flow
//! ```text
//! DatabaseConfig
//!     → primary_url missing? → RouterError::Configuration (fatal)
//!     → Connector::connect(Primary, primary_url)
//!     → replica_url present? → Connector::connect(Replica, replica_url)
//!                  absent?  → replica = same Arc as primary
//!     → ConnectionSet { primary, replica }
//! ```
//!
//! # Design Decisions
//! - Routing is opt-in: a configured replica is opened but unused unless
//!   `use_read_replica` is set
//! - Handles are long-lived and owned here; the router lends out clones of
//!   the `Arc` per operation

pub mod provider;

pub use provider::ConnectionSet;
