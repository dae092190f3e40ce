//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Signing, drafting and merging produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → Log aggregation (stderr)
//!     → Whatever metrics recorder the host application installs
//! ```
//!
//! # Design Decisions
//! - Structured fields instead of formatted messages
//! - Metrics are cheap (atomic increments, no-op without a recorder)

pub mod logging;
pub mod metrics;
