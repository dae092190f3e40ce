//! Activity merge engine.
//!
//! # Data Flow
//! ```text
//! Indexer (one feed per asset):
//!     → sync.rs (poll new items, page history, per-feed cursors)
//!     → slice.rs (mark full pages, trim a cut-off trailing trace)
//!     → store.rs (per-account lock)
//!     → merge.rs (dedup by id, fee from native feed, confirm placeholders)
//!     → sorted timeline
//! ```
//!
//! # Design Decisions
//! - One record per on-chain event; token copies describe it, the native copy pays for it
//! - Malformed items are dropped and counted, merging never fails
//! - Local placeholders are replaced whole, never patched

pub mod merge;
pub mod slice;
pub mod store;
pub mod sync;
pub mod types;

pub use merge::Timeline;
pub use slice::{check_slice, ActivitySlice};
pub use store::ActivityStore;
pub use sync::{ActivitySync, SyncReport, SyncTarget};
pub use types::{CanonicalActivity, FeedKey, MergeReport, RawActivity, Replacement};
