//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     Load config → Validate → Open primary/replica → Start health monitor
//!
//! Shutdown (shutdown.rs):
//!     ReplicaRouter::shutdown → trigger monitor signal → await task
//!     → disconnect primary → disconnect replica (unless aliased)
//! ```
//!
//! # Design Decisions
//! - Ordered shutdown: stop the monitor before closing the handles it uses
//! - Shutdown is idempotent; the second call is a no-op

pub mod shutdown;

pub use shutdown::Shutdown;
