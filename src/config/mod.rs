//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → environment overrides (DATABASE_URL, USE_READ_REPLICA, ...)
//!     → validation.rs (semantic checks)
//!     → RouterConfig (validated, immutable)
//!     → thresholds copied into the health state at construction
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; thresholds never change at runtime
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{DatabaseConfig, ObservabilityConfig, ReplicaConfig, RouterConfig, Thresholds};
pub use validation::ValidationError;
