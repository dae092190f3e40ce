//! Lifecycle of background work.
//!
//! ```text
//! Shutdown::trigger → every subscribed loop (activity sync) returns after its current pass
//! ```

pub mod shutdown;

pub use shutdown::{Shutdown, ShutdownSignal};
