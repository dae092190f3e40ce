//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Call to device or RPC:
//!     → retries.rs (classify error, retry transient failures)
//!     → backoff.rs (doubling, capped delays between attempts)
//! ```
//!
//! # Design Decisions
//! - Only transport-level failures are retried
//! - User rejections, outdated firmware and validation errors propagate at once
//! - Every retry loop is bounded

pub mod backoff;
pub mod retries;

pub use backoff::Backoff;
pub use retries::{retry_with_backoff, RetryPolicy, Retryable};
