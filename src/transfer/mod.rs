//! Transfer drafting service.
//!
//! # Data Flow
//! ```text
//! Draft request (TON or TRON):
//!     → cache.rs (reuse a fresh result, share in-flight work)
//!     → address.rs (resolve domains, validate destination)
//!     → draft.rs (chain state, emulate mock-signed transfer, balance checks)
//!     → diesel.rs (gasless alternative for token transfers)
//!     → DraftResult (validation failures are data, RPC failures are errors)
//!
//! Confirmed transfer:
//!     → submit.rs (sign, send, add local placeholder to the timeline)
//! ```
//!
//! # Design Decisions
//! - Drafting never mutates wallet state
//! - Transient RPC failures are retried with backoff; rejections are not

pub mod address;
pub mod cache;
pub mod diesel;
pub mod draft;
pub mod submit;
pub mod types;

pub use draft::{apply_fee_factor, TransferDrafter};
pub use submit::{local_activity, LocalTransfer, SubmitError, SubmittedTransfer, TransferSubmitter};
pub use types::{DieselDraft, DraftError, DraftResult, TokenRef, TonDraftRequest, TronDraftRequest};
