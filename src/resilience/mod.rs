//! Resilience helpers.
//!
//! # Data Flow
//! ```text
//! execute(op, options):
//!     → timeouts.rs (race the whole call, fallback included, against
//!       options.timeout)
//!     → routing: one-shot fallback from replica to primary
//! ```
//!
//! # Design Decisions
//! - Caller deadlines bound only that caller's call
//! - Health probes carry their own fixed timeout (see health::monitor)
//! - No retries beyond the single fallback; the primary is the last target

pub mod timeouts;

pub use timeouts::with_deadline;
